use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use chrono::{Local, NaiveDate, Utc};

use oiaa_calendar::{
    calendar::{ActiveFilters, CalendarEvent},
    export::{timeline_report, write_report},
    services::Services,
};

pub const USAGE: &str = "Usage: oiaa-calendar [--demo] [--agenda [YYYY/MM/DD] | --export <path>]";

#[derive(Debug, Clone, PartialEq)]
pub enum CliMode {
    Tui,
    Agenda(NaiveDate),
    Export(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub demo: bool,
    pub mode: CliMode,
}

pub fn parse_cli_args() -> Result<CliArgs, String> {
    parse_args(env::args().skip(1))
}

fn parse_args<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut demo = false;
    let mut mode = CliMode::Tui;
    let mut args = args.into_iter().peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--demo" => {
                demo = true;
            }
            "--agenda" => {
                let target_date = match args.next_if(|next| !next.starts_with("--")) {
                    Some(date_str) => NaiveDate::parse_from_str(&date_str, "%Y/%m/%d")
                        .map_err(|_| format!("Invalid date '{}'. Use YYYY/MM/DD.", date_str))?,
                    None => Local::now().date_naive(),
                };
                mode = CliMode::Agenda(target_date);
            }
            "--export" => {
                let path = args
                    .next_if(|next| !next.starts_with("--"))
                    .ok_or_else(|| "--export requires a file path".to_string())?;
                mode = CliMode::Export(PathBuf::from(path));
            }
            "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    Ok(CliArgs { demo, mode })
}

pub async fn run_agenda_mode(services: &Services, date: NaiveDate) -> io::Result<()> {
    let mut events = match services.event_store().list_all().await {
        Ok(list) => list,
        Err(e) => {
            eprintln!("Failed to load events: {}", e);
            tracing::error!("Agenda fetch failed: {}", e);
            Vec::new()
        }
    };

    events.retain(|event| event.starts_on(date));
    events.sort_by(|a, b| a.event_type.cmp(&b.event_type).then_with(|| a.title.cmp(&b.title)));
    let agenda = format_agenda_text(date, &events);
    display_with_pager(&agenda)
}

pub async fn run_export_mode(services: &Services, path: &Path) -> io::Result<()> {
    let events = services
        .event_store()
        .list_all()
        .await
        .map_err(|e| io::Error::other(e.to_string()))?;
    let refs: Vec<&CalendarEvent> = events.iter().collect();
    let report = timeline_report(&refs, &ActiveFilters::all(), Utc::now());
    write_report(path, &report)?;
    println!("Exported {} events to {}", events.len(), path.display());
    Ok(())
}

fn format_agenda_text(date: NaiveDate, events: &[CalendarEvent]) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Agenda - {}", date.format("%A, %B %d, %Y")));
    lines.push(String::new());

    if events.is_empty() {
        lines.push("No events scheduled.".to_string());
    } else {
        for event in events {
            lines.push(format!("- {}", build_agenda_line(event, usize::MAX)));
            for item in &event.action_items {
                lines.push(format!("    * {}", item));
            }
        }
    }

    lines.join("\n")
}

fn build_agenda_line(event: &CalendarEvent, width: usize) -> String {
    let mut line = format!("{:<20} {}", event.event_type.label(), event.title);
    if event.duration_days() > 1
        && let Some(end) = event.end_date
    {
        line.push_str(&format!(" (until {})", end.format("%b %d")));
    }
    truncate_to_width(&line, width)
}

fn truncate_to_width(line: &str, width: usize) -> String {
    if width > 0 && line.chars().count() > width {
        let mut truncated = line.chars().take(width.saturating_sub(1)).collect::<String>();
        truncated.push('…');
        truncated
    } else {
        line.to_string()
    }
}

fn display_with_pager(text: &str) -> io::Result<()> {
    let pager_value = env::var("PAGER").unwrap_or_else(|_| "less".to_string());
    let mut parts = pager_value.split_whitespace();
    let cmd = match parts.next() {
        Some(c) => c,
        None => {
            print!("{text}");
            return Ok(());
        }
    };
    let args: Vec<&str> = parts.collect();

    match Command::new(cmd)
        .args(&args)
        .stdin(Stdio::piped())
        .spawn()
    {
        Ok(mut child) => {
            if let Some(stdin) = child.stdin.as_mut() {
                stdin.write_all(text.as_bytes())?;
            }
            let _ = child.wait();
        }
        Err(_) => {
            print!("{text}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oiaa_calendar::calendar::{EventData, EventType};

    fn args(list: &[&str]) -> Result<CliArgs, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    fn event(title: &str, date: NaiveDate, end: Option<NaiveDate>) -> CalendarEvent {
        let mut data = EventData::new(title, date, EventType::Event);
        data.end_date = end;
        data.action_items = vec!["Book bus".to_string()];
        CalendarEvent::new("e1", data, "tester", Utc::now()).unwrap()
    }

    #[test]
    fn no_arguments_start_the_ui() {
        assert_eq!(args(&[]).unwrap(), CliArgs { demo: false, mode: CliMode::Tui });
    }

    #[test]
    fn agenda_takes_optional_date() {
        let parsed = args(&["--demo", "--agenda", "2025/09/26"]).unwrap();
        assert!(parsed.demo);
        assert_eq!(parsed.mode, CliMode::Agenda(NaiveDate::from_ymd_opt(2025, 9, 26).unwrap()));

        assert!(matches!(args(&["--agenda", "--demo"]).unwrap().mode, CliMode::Agenda(_)));
        assert!(args(&["--agenda", "26.09.2025"]).is_err());
    }

    #[test]
    fn export_requires_path() {
        assert_eq!(
            args(&["--export", "out.txt"]).unwrap().mode,
            CliMode::Export(PathBuf::from("out.txt"))
        );
        assert!(args(&["--export"]).is_err());
        assert!(args(&["--bogus"]).is_err());
    }

    #[test]
    fn agenda_text_lists_events_and_action_items() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 9, 28).unwrap();
        let text = format_agenda_text(date, &[event("Kyoto trip", date, Some(end))]);

        assert!(text.starts_with("Agenda - Friday, September 26, 2025"));
        assert!(text.contains("Kyoto trip (until Sep 28)"));
        assert!(text.contains("* Book bus"));

        assert!(format_agenda_text(date, &[]).contains("No events scheduled."));
    }

    #[test]
    fn truncate_marks_cut_lines() {
        assert_eq!(truncate_to_width("abcdef", 4), "abc…");
        assert_eq!(truncate_to_width("abc", 4), "abc");
    }
}
