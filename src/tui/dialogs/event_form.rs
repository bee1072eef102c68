use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use oiaa_calendar::{
    app::{AppState, EventForm, FormField, Modal},
    calendar::EventType,
    ui::theme::hex_color,
};
use crate::tui::presentation::centered_rect;

fn field_line<'a>(form: &EventForm, field: FormField, value: String, hint: &'a str, app: &AppState) -> Line<'a> {
    let active = form.active_field == field;
    let label_color = if active { app.theme.selected_bg } else { Color::DarkGray };
    let mut spans = vec![
        Span::styled(format!("{:<14}", format!("{}:", field.label())), Style::default().fg(label_color)),
        Span::raw(value),
    ];
    if active {
        spans.push(Span::styled("█", Style::default().fg(label_color)));
        spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

pub fn render(f: &mut Frame, app: &AppState) {
    let Modal::Open { form, error, .. } = app.calendar.modal() else {
        return;
    };

    let form_area = centered_rect(f.size(), 76, 22);
    f.render_widget(Clear, form_area);

    let form_title = if form.is_editing() { "Edit Event" } else { "Create New Event" };

    let type_index = EventType::ALL
        .iter()
        .position(|t| *t == form.event_type)
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut color_line = field_line(form, FormField::Color, form.color.clone(), "  ←/→ presets or #rrggbb", app);
    color_line.spans.push(Span::raw(" "));
    color_line.spans.push(Span::styled("■", Style::default().fg(hex_color(form.display_color()))));

    let mut form_text = vec![
        Line::from(vec![Span::styled(form_title, Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD))]),
        Line::from(""),
        field_line(form, FormField::Title, form.title.clone(), "", app),
        field_line(
            form,
            FormField::Type,
            format!("{} ({}/{})", form.event_type.label(), type_index, EventType::ALL.len()),
            "  ←/→ to change",
            app,
        ),
        field_line(form, FormField::Date, form.date.clone(), "  YYYY-MM-DD", app),
        field_line(form, FormField::EndDate, form.end_date.clone(), "  optional, YYYY-MM-DD", app),
        color_line,
        field_line(form, FormField::Description, form.description.clone(), "", app),
        field_line(form, FormField::ActionItems, form.action_items.clone(), "  separate with ;", app),
        Line::from(""),
    ];

    if let Some(error) = error {
        form_text.push(Line::from(Span::styled(error.clone(), Style::default().fg(app.theme.error))));
        form_text.push(Line::from(""));
    }

    form_text.push(Line::from(vec![
        Span::styled("Tab", Style::default().fg(Color::Cyan)),
        Span::raw(" = Next field | "),
        Span::styled("Enter", Style::default().fg(Color::Green)),
        Span::raw(" = Save | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" = Cancel"),
    ]));

    let block_title = if form.is_editing() { " Edit Event " } else { " New Event " };

    let form_paragraph = Paragraph::new(form_text)
        .wrap(Wrap { trim: false })
        .block(Block::default()
            .borders(Borders::ALL)
            .title(block_title)
            .style(Style::default().bg(Color::Black)))
        .alignment(Alignment::Left);

    f.render_widget(form_paragraph, form_area);
}
