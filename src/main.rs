use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use oiaa_calendar::{services::Services, storage::Config};

mod cli;
use cli::{CliMode, USAGE, parse_cli_args, run_agenda_mode, run_export_mode};
mod tui;
use tui::run_tui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match parse_cli_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", USAGE);
            return Ok(());
        }
    };

    let config = Config::load_or_create().context("Failed to load configuration")?;
    let _guard = setup_logging(&config);

    let services = if args.demo {
        Services::demo().await.context("Failed to start demo backend")?
    } else {
        match Services::connect(&config) {
            Ok(services) => services,
            Err(e) => {
                eprintln!("{}", e);
                eprintln!("Run with --demo to try the calendar without a backend.");
                tracing::error!("Startup failed: {}", e);
                return Ok(());
            }
        }
    };

    match args.mode {
        CliMode::Tui => run_tui(services, &config).await?,
        CliMode::Agenda(date) => run_agenda_mode(&services, date).await?,
        CliMode::Export(path) => run_export_mode(&services, &path).await?,
    }
    Ok(())
}

fn setup_logging(config: &Config) -> Option<WorkerGuard> {
    let log_dir = Config::config_dir();
    std::fs::create_dir_all(&log_dir).ok()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = tracing_appender::rolling::daily(log_dir, "oiaa-calendar.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    tracing::info!("oiaa-calendar started");
    Some(guard)
}
