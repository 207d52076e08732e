mod components;

use std::sync::OnceLock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::app::{App, Field, Popup, Section};
use crate::report::ReportState;
use crate::theme::Theme;
use components::{centered_rect, fit_tail, spinner_frame};

// Set once at startup from the configured overrides
static THEME: OnceLock<Theme> = OnceLock::new();

pub fn init_theme(theme: Theme) {
    let _ = THEME.set(theme);
}

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn accent_bright() -> Color { theme().accent_bright }
fn inactive() -> Color { theme().inactive }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &mut App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(8),    // Form + report
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_header(f, chunks[0]);

    // Narrow terminals stack the form above the report
    let body = if area.width < 90 {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(20), Constraint::Min(6)])
            .split(chunks[1])
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
            .split(chunks[1])
    };

    draw_form_column(f, app, body[0]);
    draw_report(f, app, body[1]);
    draw_footer(f, app, chunks[2]);

    if app.popup == Popup::Help {
        draw_help_popup(f);
    }
}

fn panel(title: &str, active: bool) -> Block<'_> {
    let border_color = if active { accent() } else { inactive() };
    let title_style = if active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    Block::default()
        .title(Span::styled(format!(" {} ", title), title_style))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
}

fn draw_header(f: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled(" ▶ ", Style::default().fg(Color::White).bg(accent())),
        Span::styled(
            " YT Strategist",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        ),
    ]));
    f.render_widget(title, area);

    let tagline = Paragraph::new(Span::styled(
        "AI-Powered Growth Plans ",
        Style::default().fg(text_dim()),
    ))
    .alignment(Alignment::Right);
    f.render_widget(tagline, area);
}

fn draw_form_column(f: &mut Frame, app: &App, area: Rect) {
    let show_tip = area.height >= 26;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(if show_tip {
            vec![Constraint::Min(18), Constraint::Length(6)]
        } else {
            vec![Constraint::Min(0)]
        })
        .split(area);

    draw_form(f, app, chunks[0]);
    if show_tip {
        draw_tip(f, chunks[1]);
    }
}

fn draw_form(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Form;
    let block = panel("Channel Details", is_active);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let value_width = usize::from(inner.width.saturating_sub(4));
    let mut lines: Vec<Line> = Vec::new();

    for field in Field::ALL {
        if field == Field::Submit {
            break;
        }
        let focused = is_active && app.field == field;

        let mut label = vec![Span::styled(
            field.label(),
            Style::default().fg(if focused { accent_bright() } else { text() }),
        )];
        match field {
            Field::Topic => label.push(Span::styled(" *", Style::default().fg(danger()))),
            Field::Audience => label.push(Span::styled(" (Optional)", Style::default().fg(text_dim()))),
            _ => {}
        }
        lines.push(Line::from(label));

        let row_style = if focused {
            Style::default().bg(bg_selected()).fg(text())
        } else {
            Style::default().fg(text())
        };
        lines.push(field_value(app, field, focused, value_width).style(row_style));
        lines.push(Line::default());
    }

    lines.push(submit_button(app));

    if let Some(ref error) = app.error {
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled("⚠ ", Style::default().fg(danger())),
            Span::styled(error.as_str(), Style::default().fg(danger())),
        ]));
    }

    let form = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(form, inner);
}

fn field_value<'a>(app: &'a App, field: Field, focused: bool, width: usize) -> Line<'a> {
    match field {
        Field::Topic | Field::Audience => {
            let (value, placeholder) = if field == Field::Topic {
                (&app.input.topic, "e.g. Personal Finance for Gen Z")
            } else {
                (&app.input.audience, "e.g. College students, young professionals")
            };

            if value.is_empty() && !focused {
                return Line::from(vec![
                    Span::raw("  "),
                    Span::styled(placeholder, Style::default().fg(text_dim()).add_modifier(Modifier::ITALIC)),
                ]);
            }
            let mut spans = vec![Span::raw("  "), Span::raw(fit_tail(value, width.saturating_sub(1)))];
            if focused {
                spans.push(Span::styled("▏", Style::default().fg(accent_bright())));
            }
            Line::from(spans)
        }
        Field::Goal | Field::Experience | Field::Capacity => {
            let label = match field {
                Field::Goal => app.input.goal.label(),
                Field::Experience => app.input.experience.label(),
                _ => app.input.capacity.label(),
            };
            let arrow = Style::default().fg(if focused { accent() } else { inactive() });
            Line::from(vec![
                Span::styled("  ‹ ", arrow),
                Span::raw(label),
                Span::styled(" ›", arrow),
            ])
        }
        Field::Submit => Line::default(),
    }
}

fn submit_button(app: &App) -> Line<'static> {
    let focused = app.section == Section::Form && app.field == Field::Submit;

    if app.is_generating() {
        return Line::from(vec![
            Span::styled(
                format!(" {} Generating Strategy... ", spinner_frame(app.spinner)),
                Style::default().fg(text_dim()).bg(bg_selected()),
            ),
        ])
        .alignment(Alignment::Center);
    }

    let style = if !app.can_submit() {
        Style::default().fg(text_dim()).bg(bg_selected())
    } else if focused {
        Style::default()
            .fg(Color::White)
            .bg(accent())
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(Color::White).bg(accent()).add_modifier(Modifier::BOLD)
    };

    Line::from(Span::styled(" ⚡ Generate Strategy ", style)).alignment(Alignment::Center)
}

fn draw_tip(f: &mut Frame, area: Rect) {
    let block = panel("Pro Tip", false);
    let tip = Paragraph::new(Span::styled(
        "The more specific your channel topic and target audience, the more actionable \
         and tailored your strategy will be. Don't be afraid to niche down!",
        Style::default().fg(text_dim()),
    ))
    .wrap(Wrap { trim: true })
    .block(block);
    f.render_widget(tip, area);
}

fn draw_report(f: &mut Frame, app: &mut App, area: Rect) {
    if app.report.is_empty() && !app.is_generating() {
        draw_empty_state(f, area);
        return;
    }

    let is_active = app.section == Section::Report;
    let block = panel("Strategy", is_active);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    // Leave a column for the scrollbar
    let text_area = Rect {
        width: chunks[0].width.saturating_sub(2),
        x: chunks[0].x + 1,
        ..chunks[0]
    };

    app.sync_view(text_area.width, text_area.height);
    let offset = app.scroll_offset();
    let visible: Vec<Line> = app
        .view
        .lines()
        .skip(offset)
        .take(usize::from(text_area.height))
        .cloned()
        .collect();
    f.render_widget(Paragraph::new(visible), text_area);

    let total = app.view.height();
    if total > usize::from(text_area.height) {
        let mut state = ScrollbarState::new(total.saturating_sub(usize::from(text_area.height)))
            .position(offset);
        f.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None)
                .thumb_style(Style::default().fg(inactive())),
            chunks[0],
            &mut state,
        );
    }

    let status = match app.report_state() {
        ReportState::Generating => Line::from(vec![
            Span::styled(format!(" {} ", spinner_frame(app.spinner)), Style::default().fg(accent())),
            Span::styled("AI is writing your strategy...", Style::default().fg(text_dim())),
        ]),
        ReportState::Done => Line::from(vec![
            Span::styled(" ✓ ", Style::default().fg(success())),
            Span::styled(
                format!("Done · {} fragments", app.report.fragments()),
                Style::default().fg(text_dim()),
            ),
        ]),
        ReportState::Failed(_) => Line::from(Span::styled(
            " ⚠ Generation stopped early",
            Style::default().fg(danger()),
        )),
        ReportState::Idle => Line::from(Span::styled(" Cancelled", Style::default().fg(text_dim()))),
    };
    f.render_widget(Paragraph::new(status), chunks[1]);
}

fn draw_empty_state(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(inactive()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let content = vec![
        Line::from(Span::styled("▶", Style::default().fg(accent()))),
        Line::default(),
        Line::from(Span::styled(
            "Ready to build your strategy",
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Fill out the form on the left with your channel details, and the AI will \
             generate a comprehensive, step-by-step growth plan.",
            Style::default().fg(text_dim()),
        )),
    ];

    let height = 7.min(inner.height);
    let centered = Rect {
        y: inner.y + inner.height.saturating_sub(height) / 2,
        height,
        x: inner.x + 2,
        width: inner.width.saturating_sub(4),
    };
    let paragraph = Paragraph::new(content)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, centered);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    // Status message takes over the footer until it expires
    if let Some(ref status) = app.status_message {
        let line = Paragraph::new(Span::styled(status.as_str(), Style::default().fg(warning())))
            .alignment(Alignment::Center);
        f.render_widget(line, area);
        return;
    }

    let mut hints: Vec<(&str, &str)> = match app.section {
        Section::Form if app.field.is_text() => vec![("Tab", "Next"), ("Enter", "Generate"), ("^U", "Clear")],
        Section::Form => vec![("↑↓", "Field"), ("←→", "Change"), ("Enter", "Generate"), ("?", "Help")],
        Section::Report => vec![("↑↓ j/k", "Scroll"), ("PgUp/PgDn", "Page"), ("G", "Follow"), ("Tab", "Form")],
    };
    if app.is_generating() {
        hints.insert(0, ("Esc", "Cancel"));
    }
    hints.push(("^C", "Quit"));

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 3 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            format!("═══ {} ═══", title),
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        ))
    };
    let entry = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<12}", keys), Style::default().fg(accent())),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        section("Form"),
        entry("Tab/S-Tab", "Next / previous field (then the report)"),
        entry("↑/↓", "Move between fields"),
        entry("←/→ Space", "Change the selected option"),
        entry("Enter", "Generate strategy"),
        entry("Ctrl+U", "Clear a text field"),
        Line::default(),
        section("Report"),
        entry("↑/↓ j/k", "Scroll one line"),
        entry("PgUp/PgDn", "Scroll one page"),
        entry("g / G", "Jump to top / follow the stream"),
        entry("Esc", "Cancel a running generation"),
        Line::default(),
        section("General"),
        entry("? / F1", "Toggle this help"),
        entry("q", "Quit (outside text fields)"),
        entry("Ctrl+C", "Quit"),
        Line::default(),
        Line::from(Span::styled(
            "  API key: GEMINI_API_KEY or api_key in config.toml",
            Style::default().fg(text_dim()),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(panel("Help", true))
        .wrap(Wrap { trim: false });
    f.render_widget(help, popup_area);
}
