use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use oiaa_calendar::app::{AppState, Mode, Page, ViewMode, calendar_page::GUEST_NAME};
use crate::tui::{admin, calendar_views, dialogs};

/// A `width` x `height` box centered in `area`, clipped to it.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn ui(f: &mut Frame, app: &AppState) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.size());

    let signed_in = match app.calendar.current_user() {
        Some(user) => format!("{} ({})", user.name, user.role.label()),
        None => GUEST_NAME.to_string(),
    };
    let title_text = match app.page {
        Page::Calendar => format!(
            "OIAA Operations Calendar - {} View - {:?} Mode - {}",
            app.calendar.view_mode().label(),
            app.mode,
            signed_in
        ),
        Page::Admin => format!("OIAA Operations Calendar - User Management - {}", signed_in),
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, main_chunks[0]);

    match app.page {
        Page::Calendar => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(65),
                    Constraint::Percentage(35),
                ])
                .split(main_chunks[1]);

            match app.calendar.view_mode() {
                ViewMode::Calendar => calendar_views::month::render(f, app, content_chunks[0]),
                ViewMode::Timeline => calendar_views::timeline::render(f, app, content_chunks[0]),
            }
            calendar_views::event_list::render(f, app, content_chunks[1]);
        }
        Page::Admin => admin::render(f, app, main_chunks[1]),
    }

    render_status(f, app, main_chunks[2]);

    if app.page == Page::Calendar {
        if app.show_filters {
            dialogs::filters::render(f, app);
        }
        if app.calendar.thread().is_some() {
            dialogs::comments::render(f, app);
        }
        if app.calendar.modal_form().is_some() {
            dialogs::event_form::render(f, app);
        }
        if app.calendar.pending_delete().is_some() {
            dialogs::delete_confirmation::render(f, app);
        }
    } else if app.admin.pending_delete().is_some() {
        dialogs::delete_confirmation::render(f, app);
    }

    if app.show_help {
        dialogs::help::render(f, app);
    }
}

fn render_status(f: &mut Frame, app: &AppState, area: Rect) {
    let command = matches!(app.mode, Mode::Command);

    let (status_text, status_color) = if command {
        (app.command_buffer.to_string(), app.theme.command_mode)
    } else if let Some(notice) = app.notice() {
        (notice.message.clone(), app.theme.notice_color(notice.level))
    } else {
        let summary = match app.page {
            Page::Calendar => format!(
                "Events: {} of {} | Press 'q' to quit, '?' for help",
                app.calendar.visible_events().len(),
                app.calendar.events().len()
            ),
            Page::Admin => format!(
                "Users: {} | Esc = back to calendar, '?' for help",
                app.admin.users().len()
            ),
        };
        (summary, app.theme.status_bar)
    };

    let status = Paragraph::new(status_text)
        .style(Style::default().fg(status_color))
        .alignment(if command { Alignment::Left } else { Alignment::Center })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_fits_inside_area() {
        let area = Rect { x: 0, y: 0, width: 100, height: 40 };
        assert_eq!(centered_rect(area, 60, 10), Rect { x: 20, y: 15, width: 60, height: 10 });

        let small = Rect { x: 5, y: 5, width: 30, height: 8 };
        assert_eq!(centered_rect(small, 60, 10), small);
    }
}
