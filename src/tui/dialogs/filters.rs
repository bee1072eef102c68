use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use oiaa_calendar::{
    app::AppState,
    calendar::EventType,
    ui::theme::hex_color,
};

/// Legend of the type filters plus the locally saved custom tags, docked top-right.
pub fn render(f: &mut Frame, app: &AppState) {
    let custom = app.calendar.custom_filters();
    let height = (EventType::ALL.len() + custom.len() + 6) as u16;
    let width = 40;
    let screen = f.size();
    let area = Rect {
        x: screen.width.saturating_sub(width + 1),
        y: 3,
        width: width.min(screen.width),
        height: height.min(screen.height.saturating_sub(3)),
    };

    f.render_widget(Clear, area);

    let filters = app.calendar.filters();
    let mut lines = vec![Line::from(Span::styled(
        format!("Showing {} of {} types", filters.len(), EventType::ALL.len()),
        Style::default().fg(app.theme.help_section),
    ))];

    for (idx, event_type) in EventType::ALL.iter().enumerate() {
        let active = filters.contains(*event_type);
        let marker = if active { "[x]" } else { "[ ]" };
        let label_style = if active {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", idx + 1), Style::default().fg(Color::Cyan)),
            Span::raw(format!("{} ", marker)),
            Span::styled("■ ", Style::default().fg(hex_color(event_type.default_color()))),
            Span::styled(event_type.label(), label_style),
        ]));
    }

    lines.push(Line::from(""));
    if custom.is_empty() {
        lines.push(Line::from(Span::styled("No custom tags (:tag name #color)", Style::default().fg(Color::DarkGray))));
    } else {
        lines.push(Line::from(Span::styled("Custom tags", Style::default().fg(app.theme.help_section))));
        for filter in custom {
            lines.push(Line::from(vec![
                Span::styled("■ ", Style::default().fg(hex_color(&filter.color))),
                Span::raw(filter.name.clone()),
            ]));
        }
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Filters (f to close) ")
            .style(Style::default().bg(Color::Black)),
    );
    f.render_widget(panel, area);
}
