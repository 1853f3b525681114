use chrono::Datelike;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, Focus, InputMode, TextInput};
use crate::session::Sender;

const STEPS: [(&str, &str, &str); 2] = [
    ("Step 1", "Upload your PDF file", "We'll process your file so you can chat with it."),
    ("Step 2", "Start asking questions", "It's that simple! Try out Quill today."),
];

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();

    // Headings and bullets
    let trimmed = text.trim_start();
    if let Some(heading) = trimmed.strip_prefix("# ").or_else(|| trimmed.strip_prefix("## ")) {
        return Line::from(Span::styled(
            heading.to_string(),
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ));
    }
    let body = match trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        Some(rest) => {
            spans.push(Span::raw("• "));
            rest
        }
        None => text,
    };

    let mut chars = body.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area, hints_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let chat_constraint = if app.chat_visible() {
        Constraint::Min(8)
    } else {
        Constraint::Length(0)
    };
    let [landing_area, upload_area, chat_area] = Layout::vertical([
        Constraint::Length(13),
        Constraint::Length(8),
        chat_constraint,
    ])
    .areas(body_area);

    render_landing(app, frame, landing_area);
    render_upload_form(app, frame, upload_area);

    if app.chat_visible() {
        render_chat_panel(app, frame, chat_area);
    } else {
        app.chat_area = None;
    }

    render_footer(frame, footer_area);
    render_hints(app, frame, hints_area);

    if let Some(message) = app.current_alert() {
        render_alert(message, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Quill ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.backend_url().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_landing(app: &App, frame: &mut Frame, area: Rect) {
    let button_style = if app.focus == Focus::GetStarted {
        Style::default().bg(Color::Blue).fg(Color::White).bold()
    } else {
        Style::default().fg(Color::Blue).bold()
    };

    let mut lines = vec![
        Line::from(Span::styled(
            " It is now public! ",
            Style::default().bg(Color::Gray).fg(Color::Black),
        )),
        Line::default(),
        Line::from(Span::raw("Chat with your").bold()),
        Line::from(vec![
            Span::styled("Documents", Style::default().fg(Color::Blue).bold()),
            Span::raw(" in seconds.").bold(),
        ]),
        Line::from(Span::styled(
            "It allows you to have conversations with any PDF document. Simply upload your file and start asking questions right away.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(" Get started ➝ ", button_style)),
        Line::default(),
        Line::from(Span::raw("Start chatting in minutes").bold()),
        Line::from(Span::styled(
            "Chatting with your PDF files has never been easier than with Quill.",
            Style::default().fg(Color::Gray),
        )),
    ];

    for (step, title, desc) in STEPS {
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", step), Style::default().fg(Color::Blue).bold()),
            Span::raw(title),
            Span::styled(format!("  {}", desc), Style::default().fg(Color::Gray)),
        ]));
    }

    let landing = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(landing, area);
}

fn render_upload_form(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" My Files ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [hint_area, input_row, status_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(inner);

    let hint = Paragraph::new(vec![
        Line::from(vec![
            Span::raw("Click to upload or drag and drop"),
            Span::styled("  (or type the path and press Enter)", Style::default().fg(Color::Gray)),
        ]),
        Line::from(Span::styled("PDF files (max 10MB)", Style::default().fg(Color::Gray))),
    ]);
    frame.render_widget(hint, hint_area);

    let [input_area, button_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(12),
    ])
    .areas(input_row);

    let editing = app.focus == Focus::FileInput && app.input_mode == InputMode::Editing;
    render_text_input(
        frame,
        input_area,
        &app.file_input,
        " File ",
        app.focus == Focus::FileInput,
        editing,
    );

    let button_style = if app.focus == Focus::UploadButton {
        Style::default().bg(Color::Blue).fg(Color::White).bold()
    } else {
        Style::default().fg(Color::Blue)
    };
    let button = Paragraph::new(Span::styled(" Upload ", button_style))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(button_style));
    frame.render_widget(button, button_area);

    let status = match &app.selected_file {
        Some(file) => Line::from(vec![
            Span::styled("Selected: ", Style::default().fg(Color::Green)),
            Span::raw(format!("{} ({})", file.file_name(), file.display_size())),
        ]),
        None => Line::from(Span::styled("No file selected", Style::default().fg(Color::Gray))),
    };
    frame.render_widget(Paragraph::new(status), status_area);
}

fn render_chat_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store area and inner size for mouse hit-testing and scroll calculations
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" Chat with Document ");

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.transcript {
        let (alignment, style) = match msg.sender {
            Sender::User => (Alignment::Right, Style::default().fg(Color::Cyan)),
            Sender::Bot => (Alignment::Left, Style::default()),
        };
        for line in msg.text.lines() {
            lines.push(parse_markdown_line(line).style(style).alignment(alignment));
        }
        lines.push(Line::default());
    }

    if app.is_loading() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("Loading{}", dots),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.focus == Focus::Question && app.input_mode == InputMode::Editing;
    render_text_input(
        frame,
        input_area,
        &app.question_input,
        " Ask a question... (Enter to send) ",
        app.focus == Focus::Question,
        editing,
    );
}

/// Bordered single-line input that scrolls horizontally to keep the cursor visible
fn render_text_input(
    frame: &mut Frame,
    area: Rect,
    input: &TextInput,
    title: &str,
    focused: bool,
    editing: bool,
) {
    let border_color = if editing {
        Color::Yellow
    } else if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title.to_string());

    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && input.cursor >= inner_width {
        input.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = input
        .value
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let paragraph = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(paragraph, area);

    if editing {
        let cursor_x = (input.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn copyright_line(year: i32) -> String {
    format!("© {} All rights reserved.", year)
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let year = chrono::Local::now().year();
    let lines = vec![
        Line::from(Span::raw("Developed by Boogeyman").bold()),
        Line::from(Span::styled(copyright_line(year), Style::default().fg(Color::Gray))),
        Line::from(Span::styled(
            "Built with Rust & Ratatui",
            Style::default().fg(Color::Gray),
        )),
    ];

    let footer = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(Color::Black).fg(Color::White));
    frame.render_widget(footer, area);
}

fn render_hints(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mode = match app.input_mode {
        InputMode::Normal => Span::styled(" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => Span::styled(" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let mut hints = vec![mode];
    let pairs: &[(&str, &str)] = if app.current_alert().is_some() {
        &[(" Enter ", " dismiss ")]
    } else {
        match app.input_mode {
            InputMode::Editing => &[(" Enter ", " submit "), (" Esc ", " stop editing "), (" Tab ", " next ")],
            InputMode::Normal => &[
                (" Tab ", " focus "),
                (" Enter ", " select "),
                (" g ", " get started "),
                (" u ", " upload "),
                (" q ", " quit "),
            ],
        }
    };
    for (key, label) in pairs {
        hints.push(Span::styled(*key, key_style));
        hints.push(Span::styled(*label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_alert(message: &str, frame: &mut Frame, area: Rect) {
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 5.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Alert ");

    let text = vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled("Press Enter to continue", Style::default().fg(Color::Gray))),
    ];
    let alert = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(alert, popup_area);
}
