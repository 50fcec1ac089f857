use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, InputMode, LoginField, StatusKind};
use crate::render::{paragraphs, split_segments, Segment};
use crate::session::Screen;
use crate::upload::UploadField;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, status, footer
    let [header_area, body_area, status_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Login => render_login_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Upload => render_upload_screen(app, frame, body_area),
    }

    render_status(app, frame, status_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let who = match (
        app.session.session().role,
        app.session.session().identity.as_deref(),
    ) {
        (Some(_), Some(identity)) => format!(" [{}]", identity),
        (Some(role), None) => format!(" [{}]", role.as_str()),
        (None, _) => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" Helpdesk Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(who, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let Some(status) = &app.status else {
        return;
    };
    let style = match status.kind {
        StatusKind::Info => Style::default().fg(Color::Gray),
        StatusKind::Success => Style::default().fg(Color::Green),
        StatusKind::Error => Style::default().fg(Color::Red),
    };
    let line = Paragraph::new(Line::from(Span::styled(
        format!(" {}", status.text),
        style,
    )));
    frame.render_widget(line, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<Span> = match (app.screen, app.input_mode) {
        (Screen::Login, _) => {
            if app.show_employee_form {
                vec![
                    Span::styled(" Tab ", key_style),
                    Span::styled(" field ", label_style),
                    Span::styled(" Enter ", key_style),
                    Span::styled(" login ", label_style),
                    Span::styled(" Esc ", key_style),
                    Span::styled(" back ", label_style),
                ]
            } else {
                vec![
                    Span::styled(" g ", key_style),
                    Span::styled(" guest ", label_style),
                    Span::styled(" e ", key_style),
                    Span::styled(" employee ", label_style),
                    Span::styled(" q ", key_style),
                    Span::styled(" quit ", label_style),
                ]
            }
        }
        (Screen::Chat, InputMode::Normal) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" u ", key_style),
            Span::styled(" upload ", label_style),
            Span::styled(" C ", key_style),
            Span::styled(" clear ", label_style),
            Span::styled(" L ", key_style),
            Span::styled(" logout ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Chat, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" done ", label_style),
        ],
        (Screen::Upload, InputMode::Normal) => vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" field ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" edit ", label_style),
            Span::styled(" s ", key_style),
            Span::styled(" submit ", label_style),
            Span::styled(" c ", key_style),
            Span::styled(" chat ", label_style),
            Span::styled(" L ", key_style),
            Span::styled(" logout ", label_style),
        ],
        (Screen::Upload, InputMode::Editing) => vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" next field ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" done ", label_style),
        ],
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_login_screen(app: &App, frame: &mut Frame, area: Rect) {
    let [_, card_area, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(12),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, card_area, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(50),
        Constraint::Fill(1),
    ])
    .areas(card_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Sign in ")
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "Your ideas, amplified",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Privacy-first AI that helps you create in confidence.",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
    ];

    if app.show_employee_form {
        let focused = Style::default().fg(Color::Yellow);
        let unfocused = Style::default().fg(Color::Gray);

        let email_style = if app.login_focus == LoginField::Email {
            focused
        } else {
            unfocused
        };
        let password_style = if app.login_focus == LoginField::Password {
            focused
        } else {
            unfocused
        };
        let masked: String = "*".repeat(app.login_password.chars().count());

        lines.push(Line::from(vec![
            Span::styled("Email:    ", email_style),
            Span::raw(app.login_email.clone()),
            cursor_span(app.login_focus == LoginField::Email),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Password: ", password_style),
            Span::raw(masked),
            cursor_span(app.login_focus == LoginField::Password),
        ]));
        lines.push(Line::default());
        if app.pending_login.is_some() {
            lines.push(Line::from(Span::styled(
                "Logging in...",
                Style::default().fg(Color::Yellow),
            )));
        }
    } else {
        lines.push(Line::from(vec![
            Span::styled(" g ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" Continue as Guest"),
        ]));
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled(" e ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" Login as Employee"),
        ]));
    }

    let card = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(card, card_area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [messages_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Record chat area size for scroll math on the App
    let inner_width = messages_area.width.saturating_sub(2);
    let inner_height = messages_area.height.saturating_sub(2);
    app.chat_width = inner_width;
    app.chat_height = inner_height;

    let lines = if app.conversation.is_empty() && !app.is_waiting_for_reply() {
        welcome_lines()
    } else {
        conversation_lines(app)
    };

    app.chat_total_lines = estimate_wrapped_lines(&lines, inner_width as usize);

    let messages = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Chat "))
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(messages, messages_area);

    let input_style = match app.input_mode {
        InputMode::Editing => Style::default().fg(Color::Yellow),
        InputMode::Normal => Style::default().fg(Color::Gray),
    };
    let input = Paragraph::new(Line::from(vec![
        Span::raw(app.chat_input.clone()),
        cursor_span(app.input_mode == InputMode::Editing),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Type your message ")
            .border_style(input_style),
    );
    frame.render_widget(input, input_area);

    if app.input_mode == InputMode::Editing {
        let cursor_x = input_area.x
            + 1
            + app
                .chat_input
                .chars()
                .take(app.chat_cursor)
                .count() as u16;
        frame.set_cursor_position((cursor_x.min(input_area.right().saturating_sub(2)), input_area.y + 1));
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    vec![
        Line::default(),
        Line::from(Span::styled(
            "How can we assist you today?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Try: What are the latest product updates?",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            "Try: How do I reset my password?",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            "Try: Where can I find the user manual?",
            Style::default().fg(Color::Gray),
        )),
    ]
}

fn conversation_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    for turn in app.conversation.turns() {
        if !turn.user_text.is_empty() {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).bold(),
            )));
            for paragraph in paragraphs(&turn.user_text) {
                lines.push(Line::from(Span::raw(paragraph.to_string())));
            }
        }
        match &turn.bot_text {
            Some(reply) => {
                lines.push(Line::from(Span::styled(
                    "Bot:",
                    Style::default().fg(Color::Green).bold(),
                )));
                lines.extend(reply_lines(reply));
            }
            None => {
                // Reply still in flight; the shared indicator below covers it.
            }
        }
        lines.push(Line::default());
    }

    if app.is_waiting_for_reply() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            "Bot:",
            Style::default().fg(Color::Green).bold(),
        )));
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::Yellow),
        )));
    }

    lines
}

/// Render a reply, alternating prose paragraphs and highlighted code
/// blocks.
fn reply_lines(reply: &str) -> Vec<Line<'static>> {
    let code_style = Style::default().bg(Color::Black).fg(Color::White);
    let mut lines = Vec::new();

    for segment in split_segments(reply) {
        match segment {
            Segment::Text(text) => {
                for paragraph in paragraphs(&text) {
                    if !paragraph.is_empty() {
                        lines.push(Line::from(Span::raw(paragraph.to_string())));
                    } else {
                        lines.push(Line::default());
                    }
                }
            }
            Segment::Code { language, content } => {
                let label = language.unwrap_or_else(|| "code".to_string());
                lines.push(Line::from(Span::styled(
                    format!("── {} ──", label),
                    Style::default().fg(Color::DarkGray),
                )));
                for code_line in content.lines() {
                    lines.push(Line::from(Span::styled(
                        code_line.to_string(),
                        code_style,
                    )));
                }
            }
        }
    }

    lines
}

fn render_upload_screen(app: &App, frame: &mut Frame, area: Rect) {
    let [_, card_area, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(60),
        Constraint::Fill(1),
    ])
    .areas(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Upload Knowledge ")
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "Add a new file or document to the chatbot's database.",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
    ];

    let fields = [
        (UploadField::File, app.upload_form.file_path.as_str()),
        (UploadField::Title, app.upload_form.title.as_str()),
        (UploadField::Description, app.upload_form.description.as_str()),
        (UploadField::UserName, app.upload_form.user_name.as_str()),
        (UploadField::UserEmail, app.upload_form.user_email.as_str()),
    ];

    for (field, value) in fields {
        let is_focused = app.upload_form.focus == field;
        let label_style = if is_focused {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<13}", field.label()), label_style),
            Span::raw(value.to_string()),
            cursor_span(is_focused && app.input_mode == InputMode::Editing),
        ]));
        lines.push(Line::default());
    }

    if app.pending_upload.is_some() {
        lines.push(Line::from(Span::styled(
            "Submitting...",
            Style::default().fg(Color::Yellow),
        )));
    }

    let card = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(card, card_area);
}

fn cursor_span(visible: bool) -> Span<'static> {
    if visible {
        Span::styled("▏", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("")
    }
}

/// Estimate the post-wrap line count so scrolling can clamp to the real
/// content height.
fn estimate_wrapped_lines(lines: &[Line], width: usize) -> u16 {
    if width == 0 {
        return lines.len() as u16;
    }
    let mut total: u16 = 0;
    for line in lines {
        let w = line.width();
        if w == 0 {
            total = total.saturating_add(1);
        } else {
            total = total.saturating_add(((w.saturating_sub(1) / width) + 1) as u16);
        }
    }
    total
}
