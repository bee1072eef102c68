use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use chrono::{Datelike, Local};
use oiaa_calendar::{
    app::AppState,
    grid::{WEEKDAYS, month_label},
    ui::{month_view, theme::hex_color},
};

pub fn render(f: &mut Frame, app: &AppState, area: Rect) {
    let layout = month_view::calculate_layout(&app.calendar, Local::now().date_naive());

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {} ", month_label(layout.month)),
            Style::default().fg(app.theme.month_header).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut row_constraints = vec![Constraint::Length(1)];
    row_constraints.extend(layout.weeks.iter().map(|_| Constraint::Ratio(1, layout.weeks.len() as u32)));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(inner);

    let columns = |row: Rect| {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 7); 7])
            .split(row)
    };

    for (cell, name) in columns(rows[0]).iter().zip(WEEKDAYS) {
        let header = Paragraph::new(name).style(Style::default().fg(app.theme.weekday_header));
        f.render_widget(header, *cell);
    }

    for (week, row) in layout.weeks.iter().zip(rows.iter().skip(1)) {
        for (day_cell, cell_area) in week.days.iter().zip(columns(*row).iter()) {
            let mut number_style = Style::default();
            if !day_cell.is_current_month {
                number_style = number_style.fg(app.theme.inactive_day);
            } else if day_cell.is_selected {
                number_style = number_style
                    .bg(app.theme.selected_bg)
                    .fg(app.theme.selected_fg)
                    .add_modifier(Modifier::BOLD);
            } else if day_cell.is_today {
                number_style = number_style.fg(app.theme.today).add_modifier(Modifier::BOLD);
            }

            let mut lines = vec![Line::from(Span::styled(format!("{:>2}", day_cell.date.day()), number_style))];
            for chip in &day_cell.chips {
                lines.push(Line::from(vec![
                    Span::styled("▌", Style::default().fg(hex_color(&chip.color))),
                    Span::raw(chip.title.clone()),
                ]));
            }
            if let Some(more) = day_cell.more_label() {
                lines.push(Line::from(Span::styled(more, Style::default().fg(Color::DarkGray))));
            }

            let border_style = if day_cell.is_selected {
                Style::default().fg(app.theme.selected_bg)
            } else {
                Style::default().fg(app.theme.border)
            };
            let cell = Paragraph::new(lines)
                .block(Block::default().borders(Borders::TOP).border_style(border_style));
            f.render_widget(cell, *cell_area);
        }
    }
}
