use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        block::{Position, Title},
        Block, Borders, Clear, Paragraph, Row, Table, Wrap,
    },
    Frame,
};
use oiaa_calendar::{
    app::{AppState, AuthState, LoginField, UserField, UsersState},
    calendar::Role,
};
use crate::tui::presentation::centered_rect;

pub fn render(f: &mut Frame, app: &AppState, area: Rect) {
    match app.admin.auth_state() {
        AuthState::Authenticated { .. } => {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
                .split(area);
            render_users(f, app, chunks[0]);
            render_roles(f, app, chunks[1]);
            if app.admin.form().is_some() {
                render_user_form(f, app);
            }
        }
        AuthState::Checking => {
            let checking = Paragraph::new("Checking session...")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(checking, area);
        }
        AuthState::Unauthenticated => render_login(f, app, area),
    }
}

fn render_users(f: &mut Frame, app: &AppState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Users ");

    let users = match app.admin.users_state() {
        UsersState::Loading => {
            f.render_widget(Paragraph::new("Loading users...").block(block), area);
            return;
        }
        UsersState::Error(message) => {
            let error = Paragraph::new(message.as_str())
                .style(Style::default().fg(app.theme.error))
                .block(block);
            f.render_widget(error, area);
            return;
        }
        UsersState::Loaded(users) => users,
    };

    let header = Row::new(["Name", "Email", "Role"])
        .style(Style::default().fg(app.theme.weekday_header).add_modifier(Modifier::BOLD));
    let rows = users.iter().enumerate().map(|(idx, user)| {
        let style = if idx == app.admin.selected_index() {
            Style::default().bg(app.theme.selected_bg).fg(app.theme.selected_fg)
        } else {
            Style::default()
        };
        let role_color = match user.role {
            Role::Admin => Color::Red,
            Role::Editor => Color::Yellow,
            Role::Viewer => Color::Gray,
        };
        Row::new(vec![
            Span::raw(user.name.clone()),
            Span::raw(user.email.clone()),
            Span::styled(user.role.label(), Style::default().fg(role_color)),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [Constraint::Percentage(30), Constraint::Percentage(50), Constraint::Percentage(20)],
    )
    .header(header)
    .block(block.title(Title::from(" a = Add | e = Edit | x = Delete | o = Sign out ").position(Position::Bottom)));
    f.render_widget(table, area);
}

fn render_roles(f: &mut Frame, app: &AppState, area: Rect) {
    let mut lines = Vec::new();
    for role in [Role::Admin, Role::Editor, Role::Viewer] {
        lines.push(Line::from(Span::styled(
            role.label(),
            Style::default().fg(app.theme.help_section).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("  {}", role.summary())));
        lines.push(Line::from(""));
    }

    let legend = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Roles "));
    f.render_widget(legend, area);
}

fn render_user_form(f: &mut Frame, app: &AppState) {
    let Some(form) = app.admin.form() else {
        return;
    };

    let area = centered_rect(f.size(), 60, 12);
    f.render_widget(Clear, area);

    let label = |field: UserField, text: &'static str| {
        let color = if form.active_field == field { app.theme.selected_bg } else { Color::DarkGray };
        Span::styled(format!("{:<8}", text), Style::default().fg(color))
    };
    let cursor = |field: UserField| if form.active_field == field { "█" } else { "" };

    let mut lines = vec![
        Line::from(vec![label(UserField::Name, "Name:"), Span::raw(form.name.clone()), Span::raw(cursor(UserField::Name))]),
        Line::from(vec![label(UserField::Email, "Email:"), Span::raw(form.email.clone()), Span::raw(cursor(UserField::Email))]),
        Line::from(vec![
            label(UserField::Role, "Role:"),
            Span::raw(form.role.label()),
            Span::styled(
                if form.active_field == UserField::Role { "  ←/→ to change" } else { "" },
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(Span::styled(format!("        {}", form.role.summary()), Style::default().fg(Color::DarkGray))),
        Line::from(""),
    ];
    if let Some(error) = app.admin.form_error() {
        lines.push(Line::from(Span::styled(error.to_string(), Style::default().fg(app.theme.error))));
    }
    lines.push(Line::from(vec![
        Span::styled("Tab", Style::default().fg(Color::Cyan)),
        Span::raw(" = Next field | "),
        Span::styled("Enter", Style::default().fg(Color::Green)),
        Span::raw(" = Save | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" = Cancel"),
    ]));

    let title = if form.is_editing() { " Edit User " } else { " Add User " };
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(Style::default().bg(Color::Black)),
    );
    f.render_widget(panel, area);
}

fn render_login(f: &mut Frame, app: &AppState, area: Rect) {
    let login = app.admin.login();
    let form_area = centered_rect(area, 56, 11);

    let field_style = |field: LoginField| {
        if login.field == field {
            Style::default().fg(app.theme.selected_bg)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let mut lines = vec![
        Line::from(Span::styled("Admin sign-in", Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(vec![Span::styled("Email: ", field_style(LoginField::Email)), Span::raw(login.email.clone())]),
    ];
    if login.link_sent {
        lines.push(Line::from(vec![
            Span::styled("Code:  ", field_style(LoginField::Code)),
            Span::raw(login.code.clone()),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from("Enter the code from the login email."));
    } else {
        lines.push(Line::from(""));
        lines.push(Line::from("We will email you a one-time login code."));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("i", Style::default().fg(Color::Cyan)),
        Span::raw(" = Type | "),
        Span::styled("Enter", Style::default().fg(Color::Green)),
        Span::raw(if login.link_sent { " = Sign in | " } else { " = Send code | " }),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" = Back"),
    ]));

    let panel = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::ALL).title(" Sign in "));
    f.render_widget(panel, form_area);
}
