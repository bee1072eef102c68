use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use chrono::Local;
use oiaa_calendar::app::AppState;
use crate::tui::presentation::centered_rect;

pub fn render(f: &mut Frame, app: &AppState) {
    let Some(thread) = app.calendar.thread() else {
        return;
    };

    let area = centered_rect(f.size(), 70, 20);
    f.render_widget(Clear, area);

    let event_title = app
        .calendar
        .find(&thread.event_id)
        .map(|event| event.title.clone())
        .unwrap_or_else(|| "Event".to_string());

    let mut lines = Vec::new();
    if thread.comments.is_empty() {
        lines.push(Line::from(Span::styled("No comments yet", Style::default().fg(Color::DarkGray))));
    }
    for comment in &thread.comments {
        lines.push(Line::from(vec![
            Span::styled(comment.user_name.clone(), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", comment.created_at.with_timezone(&Local).format("%b %d %H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        for text in comment.comment.lines() {
            lines.push(Line::from(format!("  {}", text)));
        }
    }

    let body_height = area.height.saturating_sub(6) as usize;
    let scroll = lines.len().saturating_sub(body_height) as u16;

    lines.push(Line::from(""));
    let prompt = if app.calendar.current_user().is_some() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(app.theme.selected_bg)),
            Span::raw(thread.draft.clone()),
            Span::styled("█", Style::default().fg(app.theme.selected_bg)),
        ])
    } else {
        Line::from(Span::styled("Sign in to comment.", Style::default().fg(Color::DarkGray)))
    };
    lines.push(prompt);
    lines.push(Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Green)),
        Span::raw(" = Post | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" = Close"),
    ]));

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Comments: {} ", event_title))
                .style(Style::default().bg(Color::Black)),
        );
    f.render_widget(panel, area);
}
