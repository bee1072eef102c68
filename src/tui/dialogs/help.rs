use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use oiaa_calendar::app::AppState;
use crate::tui::presentation::centered_rect;

pub fn render(f: &mut Frame, app: &AppState) {
    let help_height = 23;
    let help_area = centered_rect(f.size(), 64, help_height);

    f.render_widget(Clear, help_area);

    let section = |title: &'static str| Line::from(vec![Span::styled(title, Style::default().fg(app.theme.help_section))]);

    let help_text = vec![
        Line::from(vec![Span::styled("OIAA Operations Calendar Help", Style::default().fg(app.theme.help_title).add_modifier(Modifier::BOLD))]),
        Line::from(""),
        section("Navigation:"),
        Line::from("  h/l      - Previous/next day"),
        Line::from("  j/k      - Next/previous week"),
        Line::from("  J/K      - Next/previous event on the selected day"),
        Line::from("  t        - Jump to today"),
        Line::from("  { / }    - Previous/next month"),
        Line::from("  v        - Switch between calendar and timeline"),
        Line::from(""),
        section("Filters:"),
        Line::from("  1-6      - Toggle Inbound/Outbound/Events/Study Tour/"),
        Line::from("             University/Holiday"),
        Line::from("  f        - Show or hide the filter panel"),
        Line::from(""),
        section("Events:"),
        Line::from("  a        - Add new event (editors and admins)"),
        Line::from("  e/Enter  - Edit selected event"),
        Line::from("  x        - Delete selected event (admins)"),
        Line::from("  c        - Comments on selected event"),
        Line::from("  r        - Refresh from the server"),
        Line::from(""),
        section("Forms:"),
        Line::from("  Tab      - Next field (Shift-Tab previous)"),
        Line::from("  ←/→      - Change type, color or role"),
        Line::from("  Enter    - Save | Esc - Cancel"),
        Line::from(""),
        section("User Management:"),
        Line::from("  A        - Open user management (admins)"),
        Line::from("  i        - Sign in with an emailed code"),
        Line::from("  a/e/x    - Add/edit/delete user"),
        Line::from("  o        - Sign out"),
        Line::from("  Esc      - Back to the calendar"),
        Line::from(""),
        section("Commands:"),
        Line::from("  :q       - Quit"),
        Line::from("  :r       - Refresh"),
        Line::from("  :goto    - Jump to date (:goto 2025-09-26)"),
        Line::from("  :today   - Jump to today"),
        Line::from("  :new     - Create event (:new [title])"),
        Line::from("  :view    - :view calendar | :view timeline"),
        Line::from("  :filter  - Toggle a type (:filter holiday)"),
        Line::from("  :tag     - Add a custom filter (:tag Housing #10b981)"),
        Line::from("  :export  - Write the timeline (:export timeline.txt)"),
        Line::from("  :theme   - Change theme (:theme nord)"),
        Line::from("  :login   - Request a login code (:login you@oiaa.edu)"),
        Line::from("  :logout  - Sign out"),
        Line::from("  :admin   - User management | :cal - calendar"),
        Line::from("  :help    - Show this help"),
        Line::from(""),
    ];

    let visible_lines = help_height.saturating_sub(3) as usize;
    let total_lines = help_text.len();
    let max_scroll = total_lines.saturating_sub(visible_lines);
    let scroll = app.help_scroll.min(max_scroll);

    let scrolled_text: Vec<Line> = help_text
        .into_iter()
        .skip(scroll)
        .take(visible_lines)
        .collect();

    let help_paragraph = Paragraph::new(scrolled_text)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(format!(" Help (j/k to scroll, q to close) [{}/{}] ", scroll + 1, total_lines))
            .style(Style::default().bg(Color::Black)))
        .alignment(Alignment::Left);

    f.render_widget(help_paragraph, help_area);
}
