use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use oiaa_calendar::{
    app::{AppState, EventsState},
    grid::format_date,
    timeline::date_range_label,
    ui::theme::hex_color,
};

pub fn render(f: &mut Frame, app: &AppState, area: ratatui::layout::Rect) {
    let selected_date = app.calendar.selected_date();
    let date_label = format_date(&selected_date, Some(app.date_format.as_str()))
        .unwrap_or_else(|_| selected_date.to_string());
    let title = format!("Events on {}", date_label);

    let mut lines = vec![
        Line::from(vec![
            Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
    ];

    let events = app.calendar.selected_events();

    match app.calendar.events_state() {
        EventsState::Loading => {
            lines.push(Line::from(Span::styled("Loading events...", Style::default().fg(Color::DarkGray))));
        }
        EventsState::Error(message) => {
            lines.push(Line::from(Span::styled(message.clone(), Style::default().fg(app.theme.error))));
        }
        EventsState::Loaded(_) if events.is_empty() => {
            lines.push(Line::from(vec![
                Span::styled("No events", Style::default().fg(Color::DarkGray)),
            ]));
        }
        EventsState::Loaded(_) => {
            let selected_base = Style::default().bg(app.theme.selected_bg).add_modifier(Modifier::BOLD);

            for (idx, event) in events.iter().enumerate() {
                let is_selected = idx == app.calendar.selected_index();
                let title_style = if is_selected {
                    selected_base.fg(app.theme.selected_fg)
                } else {
                    Style::default().fg(Color::White)
                };
                let cursor = if is_selected { ">" } else { " " };

                lines.push(Line::from(vec![
                    Span::styled(cursor, Style::default().fg(app.theme.selected_bg)),
                    Span::styled("● ", Style::default().fg(hex_color(event.display_color()))),
                    Span::styled(&event.title, title_style),
                ]));
                lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(event.event_type.label(), Style::default().fg(hex_color(event.display_color()))),
                    Span::styled(format!(" | {}", date_range_label(event)), Style::default().fg(Color::DarkGray)),
                ]));

                if is_selected {
                    if let Some(description) = &event.description {
                        for text in description.lines() {
                            lines.push(Line::from(format!("  {}", text)));
                        }
                    }
                    for item in &event.action_items {
                        lines.push(Line::from(format!("  ☐ {}", item)));
                    }
                    lines.push(Line::from(Span::styled(
                        format!("  Created by {}", event.created_by),
                        Style::default().fg(Color::DarkGray),
                    )));
                }

                lines.push(Line::from(""));
            }
        }
    }

    let permissions = app.calendar.permissions();
    let mut hints = vec![
        Span::styled("J/K", Style::default().fg(Color::Cyan)),
        Span::raw(" = Select | "),
        Span::styled("c", Style::default().fg(Color::Cyan)),
        Span::raw(" = Comments"),
    ];
    if permissions.can_create_events {
        hints.push(Span::raw(" | "));
        hints.push(Span::styled("a", Style::default().fg(Color::Green)));
        hints.push(Span::raw(" = Add"));
    }
    if permissions.can_edit_events {
        hints.push(Span::raw(" | "));
        hints.push(Span::styled("e", Style::default().fg(Color::Green)));
        hints.push(Span::raw(" = Edit"));
    }
    if permissions.can_delete_events {
        hints.push(Span::raw(" | "));
        hints.push(Span::styled("x", Style::default().fg(Color::Red)));
        hints.push(Span::raw(" = Delete"));
    }
    lines.push(Line::from(hints));

    let content = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(content, area);
}
