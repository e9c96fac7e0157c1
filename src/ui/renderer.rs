//! View composition: one draw call per frame, built from read-only
//! projections of the application state. The only state written here is
//! the transcript viewport bookkeeping used to clamp scrolling.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::core::app::ui_state::{Mode, SettingsRow};
use crate::core::app::{App, ConnectionStatus};
use crate::core::catalog::format_context_length;
use crate::core::config::MAX_MESSAGE_LENGTH;
use crate::core::message::{Message, Role};
use crate::core::text_wrapping::wrap_lines;
use crate::core::usage::UsageSnapshot;
use crate::ui::markdown::render_markdown;
use crate::ui::theme::Theme;

pub fn draw(f: &mut Frame, app: &mut App) {
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().bg(app.ui.theme.background_color)),
        area,
    );

    let input_height = (app.ui.textarea.lines().len().clamp(1, 5) as u16) + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(input_height),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, app, chunks[0]);
    draw_usage_meter(f, app, chunks[1]);
    draw_transcript(f, app, chunks[2]);
    draw_input(f, app, chunks[3]);
    draw_status_line(f, app, chunks[4]);

    match app.ui.mode {
        Mode::ModelPicker => draw_model_picker(f, app, area),
        Mode::Settings => draw_settings(f, app, area),
        Mode::ConfirmNewChat => draw_confirm_new_chat(f, app, area),
        Mode::Chat => {}
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let model_label = app
        .catalog
        .selected()
        .map(|m| m.display_name.clone())
        .unwrap_or_else(|| "no model selected".to_string());

    let connection = app.session.connection;
    let connection_style = match connection {
        ConnectionStatus::Connected => theme.connected_style,
        ConnectionStatus::Connecting => theme.connecting_style,
        ConnectionStatus::Disconnected => theme.disconnected_style,
    };
    let status = format!("● {} ", connection.label());

    let mut spans = vec![
        Span::styled(" parley ", theme.title_style.add_modifier(Modifier::BOLD)),
        Span::styled("· ", theme.dim_style),
        Span::styled(model_label, theme.title_style),
    ];
    let used: usize = spans.iter().map(|s| s.content.width()).sum();
    let pad = (area.width as usize)
        .saturating_sub(used)
        .saturating_sub(status.width());
    spans.push(Span::raw(" ".repeat(pad)));
    spans.push(Span::styled(status, connection_style));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_usage_meter(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    match app.ui.usage {
        Some(usage) => {
            let gauge = Gauge::default()
                .ratio(usage.ratio())
                .label(Span::styled(
                    format!("{} tokens", usage.label()),
                    theme.title_style,
                ))
                .gauge_style(theme.usage_style(usage.level()))
                .use_unicode(true);
            f.render_widget(gauge, area);
        }
        None => {
            f.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    " usage unavailable",
                    theme.dim_style,
                ))),
                area,
            );
        }
    }
}

fn draw_transcript(f: &mut Frame, app: &mut App, area: Rect) {
    let theme = app.ui.theme.clone();

    if app.transcript.is_empty() {
        app.ui.record_transcript_metrics(0, area.height);
        let welcome = vec![
            Line::default(),
            Line::from(Span::styled(
                "  Welcome to Parley",
                theme.welcome_style.add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                "  Pick a model with Ctrl+P, type a message, press Enter.",
                theme.welcome_style,
            )),
            Line::from(Span::styled(
                "  Responses stream in as the model generates them.",
                theme.welcome_style,
            )),
        ];
        f.render_widget(Paragraph::new(welcome), area);
        return;
    }

    let width = area.width.saturating_sub(1).max(10);
    let lines = build_transcript_lines(app.transcript.messages(), app, &theme);
    let wrapped = wrap_lines(&lines, width);
    let total = u16::try_from(wrapped.len()).unwrap_or(u16::MAX);
    app.ui.record_transcript_metrics(total, area.height);

    if app.ui.auto_scroll {
        app.ui.scroll_to_bottom();
    } else {
        app.ui.scroll_offset = app.ui.scroll_offset.min(app.ui.max_scroll_offset());
    }

    let paragraph = Paragraph::new(wrapped).scroll((app.ui.scroll_offset, 0));
    f.render_widget(paragraph, area);
}

fn build_transcript_lines(messages: &[Message], app: &App, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        match message.role {
            Role::User => {
                lines.push(Line::from(vec![
                    Span::styled("You", theme.user_prefix_style),
                    Span::styled(
                        format!("  {}", message.timestamp_label()),
                        theme.timestamp_style,
                    ),
                ]));
                for content_line in message.content.lines() {
                    lines.push(Line::from(Span::styled(
                        content_line.to_string(),
                        theme.user_text_style,
                    )));
                }
            }
            Role::Assistant => {
                let speaker = message
                    .model_id
                    .as_deref()
                    .map(|id| {
                        app.catalog
                            .models()
                            .iter()
                            .find(|m| m.id == id)
                            .map(|m| m.display_name.clone())
                            .unwrap_or_else(|| id.to_string())
                    })
                    .unwrap_or_else(|| "assistant".to_string());

                let mut header = vec![
                    Span::styled(speaker, theme.title_style.add_modifier(Modifier::BOLD)),
                    Span::styled(
                        format!("  {}", message.timestamp_label()),
                        theme.timestamp_style,
                    ),
                ];
                if message.is_streaming {
                    header.push(Span::styled("  ●", theme.streaming_indicator_style));
                }
                lines.push(Line::from(header));
                lines.extend(render_markdown(&message.content, theme));
            }
        }
        lines.push(Line::default());
    }
    lines
}

fn draw_input(f: &mut Frame, app: &mut App, area: Rect) {
    let theme = app.ui.theme.clone();
    let count = app.ui.input_text().chars().count();
    let counter_style = if count > MAX_MESSAGE_LENGTH * 9 / 10 {
        theme.usage_danger_style
    } else if count > MAX_MESSAGE_LENGTH * 7 / 10 {
        theme.usage_warning_style
    } else {
        theme.dim_style
    };

    let mut title = vec![Span::styled(" Message ", theme.input_title_style)];
    if count > 0 {
        title.push(Span::styled(format!("({count}) "), counter_style));
    }

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.input_border_style)
        .title(Line::from(title));
    if app.session.is_generating {
        block = block.title_bottom(Line::from(Span::styled(
            " generating… ",
            theme.streaming_indicator_style,
        )));
    }
    app.ui.textarea.set_block(block);
    f.render_widget(&app.ui.textarea, area);
}

fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let line = match &app.ui.toast {
        Some(toast) => Line::from(Span::styled(
            format!(" {}", toast.text),
            theme.toast_style(toast.kind),
        )),
        None => Line::from(Span::styled(
            " Enter send · Ctrl+P models · Ctrl+S settings · Ctrl+N new chat · Ctrl+R regenerate · Ctrl+Y copy · Ctrl+C quit",
            theme.dim_style,
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_model_picker(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let overlay = centered_rect(70, 70, area);
    f.render_widget(Clear, overlay);

    let title = format!(
        " Models — filter: {}▏ category: {} (Tab) ",
        app.ui.picker.filter,
        app.ui.picker.category()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.overlay_border_style)
        .title(Span::styled(title, theme.overlay_title_style))
        .style(Style::default().bg(theme.background_color));
    let inner = block.inner(overlay);
    f.render_widget(block, overlay);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let models = app.catalog.filtered();
    if models.is_empty() {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                " No models found",
                theme.dim_style,
            ))),
            sections[0],
        );
        return;
    }

    let view_height = sections[0].height as usize;
    let first_visible = app
        .ui
        .picker
        .selected
        .saturating_sub(view_height.saturating_sub(1));
    let mut lines = Vec::new();
    for (i, model) in models.iter().enumerate().skip(first_visible).take(view_height) {
        let marker = if app.catalog.selected_id() == Some(model.id.as_str()) {
            "✓ "
        } else {
            "  "
        };
        let label = format!(
            "{}{}  {} · {} ctx · {}",
            marker,
            model.display_name,
            model.provider,
            format_context_length(model.context_length),
            model.pricing
        );
        let style = if i == app.ui.picker.selected {
            theme.selection_highlight_style
        } else {
            theme.title_style
        };
        lines.push(Line::from(Span::styled(label, style)));
    }
    f.render_widget(Paragraph::new(lines), sections[0]);

    let description = models
        .get(app.ui.picker.selected)
        .map(|m| m.description.clone())
        .unwrap_or_default();
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {description}"),
            theme.dim_style,
        ))),
        sections[1],
    );
}

fn draw_settings(f: &mut Frame, app: &App, area: Rect) {
    let Some(panel) = &app.ui.settings_panel else {
        return;
    };
    let theme = &app.ui.theme;
    let overlay = centered_rect(50, 50, area);
    f.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.overlay_border_style)
        .title(Span::styled(" Settings ", theme.overlay_title_style))
        .style(Style::default().bg(theme.background_color));
    let inner = block.inner(overlay);
    f.render_widget(block, overlay);

    let on_off = |enabled: bool| if enabled { "on" } else { "off" };
    let mut lines = vec![Line::default()];
    for (i, row) in SettingsRow::ALL.iter().enumerate() {
        let value = match row {
            SettingsRow::Temperature => format!("{:.1}", panel.draft.temperature),
            SettingsRow::MaxTokens => panel.draft.max_tokens.to_string(),
            SettingsRow::Streaming => on_off(panel.draft.streaming).to_string(),
            SettingsRow::DarkMode => on_off(panel.draft.dark_mode).to_string(),
            SettingsRow::AutoScroll => on_off(panel.draft.auto_scroll).to_string(),
        };
        let label = format!(" {:<20} {:>8} ", row.label(), value);
        let style = if i == panel.row {
            theme.selection_highlight_style
        } else {
            theme.title_style
        };
        lines.push(Line::from(Span::styled(label, style)));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        " ↑↓ select · ←→ adjust · Enter save · r reset · Esc cancel",
        theme.dim_style,
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_confirm_new_chat(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let overlay = centered_rect(50, 20, area);
    f.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.overlay_border_style)
        .title(Span::styled(" New chat ", theme.overlay_title_style))
        .style(Style::default().bg(theme.background_color));
    let inner = block.inner(overlay);
    f.render_widget(block, overlay);

    let lines = vec![
        Line::default(),
        Line::from(Span::styled(
            " Start a new chat? This clears the current conversation.",
            theme.title_style,
        )),
        Line::default(),
        Line::from(Span::styled(" y confirm · n cancel", theme.dim_style)),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

/// The usage meter never renders past full even when the gateway reports
/// an overrun; exposed for tests.
pub fn usage_meter_ratio(usage: &UsageSnapshot) -> f64 {
    usage.ratio()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::connected_test_app;

    #[test]
    fn transcript_lines_carry_headers_and_content() {
        let mut app = connected_test_app();
        app.transcript.push(Message::user("Hi there"));
        app.transcript
            .push(Message::assistant("Hello!", Some("models/gemini-1.5-flash".to_string())));

        let theme = app.ui.theme.clone();
        let lines = build_transcript_lines(app.transcript.messages(), &app, &theme);
        let rendered: Vec<String> = lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect();

        assert!(rendered[0].starts_with("You"));
        assert_eq!(rendered[1], "Hi there");
        // Assistant header resolves the display name from the catalog.
        assert!(rendered.iter().any(|l| l.starts_with("Gemini 1.5 Flash")));
        assert!(rendered.contains(&"Hello!".to_string()));
    }

    #[test]
    fn streaming_replies_show_an_indicator() {
        let mut app = connected_test_app();
        app.transcript.push(Message::user("Hi"));
        app.transcript
            .begin_reply(Some("models/gemini-1.5-flash".to_string()));

        let theme = app.ui.theme.clone();
        let lines = build_transcript_lines(app.transcript.messages(), &app, &theme);
        let header: String = lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .find(|l| l.contains("●"))
            .expect("streaming indicator");
        assert!(header.starts_with("Gemini 1.5 Flash"));
    }

    #[test]
    fn overrun_usage_fills_the_meter_exactly() {
        let usage = UsageSnapshot {
            tokens_used: 12_000,
            limit: 10_000,
            ..UsageSnapshot::default()
        };
        assert_eq!(usage_meter_ratio(&usage), 1.0);
    }
}
