use std::io;
use std::time::Duration;
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as TermEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    Terminal,
};
use oiaa_calendar::{
    app::{AdminPage, AppState, CalendarPage, EventsState, Mode, Notice, ViewMode},
    input::{self, Action, Flow, command_mode, confirm_mode, insert_mode, normal_mode},
    services::Services,
    storage::Config,
    ui::theme::Theme,
};
use crate::tui::presentation::ui;

/// How long to wait for a key before checking the realtime feeds again.
const TICK: Duration = Duration::from_millis(250);

fn build_state(services: &mut Services, config: &Config) -> AppState {
    let view_mode = ViewMode::from_name(&config.ui.default_view).unwrap_or(ViewMode::Calendar);
    let mut calendar = CalendarPage::new(services.event_store(), Local::now().date_naive())
        .with_view_mode(view_mode);
    if let Some(local) = services.take_local_storage() {
        calendar = calendar.with_local_storage(local);
    }
    let admin = AdminPage::new(services.user_store());

    AppState::new(calendar, admin)
        .with_theme(Theme::get_by_name(&config.ui.theme))
        .with_date_format(&config.ui.date_format)
}

pub async fn run_tui(mut services: Services, config: &Config) -> io::Result<()> {
    let mut app = build_state(&mut services, config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.draw(|f| ui(f, &app)).ok();

    input::restore_session(&mut app).await;
    if matches!(app.calendar.events_state(), EventsState::Loading) {
        app.calendar.load().await;
    }
    app.calendar.subscribe().await;

    let res = run_app(&mut terminal, &mut app, &services).await;

    app.calendar.close();
    app.admin.close();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!("Terminal session ended with error: {}", err);
        println!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    services: &Services,
) -> io::Result<()> {
    loop {
        app.calendar.drain_changes();
        app.admin.drain_changes();

        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }

        if let TermEvent::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let action = match app.mode {
                Mode::Normal => normal_mode::handle_key(key.code, app),
                Mode::Insert => insert_mode::handle_key(key.code, app),
                Mode::Command => command_mode::handle_key(key.code, app),
                Mode::Confirm => confirm_mode::handle_key(key.code, app),
            };
            let Some(action) = action else {
                continue;
            };

            let requested_login = action == Action::RequestLogin;
            terminal.draw(|f| ui(f, app))?;
            if input::perform(app, action).await == Flow::Quit {
                return Ok(());
            }
            if requested_login && services.is_demo() {
                show_demo_code(app, services);
            }
        }
    }
}

/// The demo backend sends no mail, so the code is shown in place of the email.
fn show_demo_code(app: &mut AppState, services: &Services) {
    let login = app.admin.login();
    if !login.link_sent {
        return;
    }
    if let Some(code) = services.demo_login_code(login.email.trim()) {
        app.admin.set_notice(Notice::info(format!("Demo mode: your login code is {}", code)));
    }
}
