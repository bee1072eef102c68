use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use oiaa_calendar::{
    app::AppState,
    ui::{theme::hex_color, timeline_view},
};

pub fn render(f: &mut Frame, app: &AppState, area: Rect) {
    let sections = timeline_view::calculate_sections(&app.calendar);
    let selected_id = app.calendar.selected_event().map(|event| event.id.clone());

    let mut lines = Vec::new();
    let mut selected_line = 0;

    if sections.is_empty() {
        lines.push(Line::from(Span::styled("No events match the current filters", Style::default().fg(Color::DarkGray))));
    }

    for section in &sections {
        lines.push(Line::from(Span::styled(
            section.label.clone(),
            Style::default().fg(app.theme.month_header).add_modifier(Modifier::BOLD),
        )));

        for entry in &section.entries {
            let is_selected = selected_id.as_deref() == Some(entry.id.as_str());
            if is_selected {
                selected_line = lines.len();
            }
            let title_style = if is_selected {
                Style::default().bg(app.theme.selected_bg).fg(app.theme.selected_fg).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            lines.push(Line::from(vec![
                Span::styled("● ", Style::default().fg(hex_color(&entry.color))),
                Span::styled(format!("{:<16}", entry.range), Style::default().fg(Color::Cyan)),
                Span::styled(format!("[{}] ", entry.type_label), Style::default().fg(hex_color(&entry.color))),
                Span::styled(entry.title.clone(), title_style),
            ]));
            if let Some(description) = &entry.description {
                for text in description.lines() {
                    lines.push(Line::from(Span::styled(format!("    {}", text), Style::default().fg(Color::Gray))));
                }
            }
            for item in &entry.action_items {
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled("☐ ", Style::default().fg(Color::Yellow)),
                    Span::raw(item.clone()),
                ]));
            }
        }
        lines.push(Line::from(""));
    }

    let visible = area.height.saturating_sub(2) as usize;
    let scroll = selected_line.saturating_sub(visible / 2) as u16;

    let content = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(" Timeline "));
    f.render_widget(content, area);
}
