use ratatui::style::{Color, Modifier, Style};

use crate::core::app::ui_state::ToastKind;
use crate::core::usage::UsageLevel;

/// Style bundle for the whole interface. Two built-in variants map onto
/// the persisted `darkMode` setting.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background_color: Color,

    // Transcript
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub assistant_text_style: Style,
    pub timestamp_style: Style,
    pub welcome_style: Style,
    pub streaming_indicator_style: Style,

    // Markdown accents
    pub heading_style: Style,
    pub inline_code_style: Style,
    pub code_block_style: Style,
    pub blockquote_style: Style,
    pub link_style: Style,

    // Chrome
    pub title_style: Style,
    pub dim_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,
    pub input_text_style: Style,
    pub input_cursor_style: Style,
    pub selection_highlight_style: Style,
    pub overlay_border_style: Style,
    pub overlay_title_style: Style,

    // Status tiers
    pub connected_style: Style,
    pub connecting_style: Style,
    pub disconnected_style: Style,
    pub usage_normal_style: Style,
    pub usage_warning_style: Style,
    pub usage_danger_style: Style,
    pub toast_info_style: Style,
    pub toast_success_style: Style,
    pub toast_warning_style: Style,
    pub toast_error_style: Style,

    /// Syntect theme used for fenced code blocks.
    pub syntax_theme: &'static str,
}

impl Theme {
    pub fn for_settings(dark_mode: bool) -> Self {
        if dark_mode {
            Self::dark_default()
        } else {
            Self::light_default()
        }
    }

    pub fn dark_default() -> Self {
        Theme {
            background_color: Color::Black,
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            assistant_text_style: Style::default().fg(Color::White),
            timestamp_style: Style::default().fg(Color::DarkGray),
            welcome_style: Style::default().fg(Color::Gray),
            streaming_indicator_style: Style::default().fg(Color::Magenta),

            heading_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
            inline_code_style: Style::default().fg(Color::LightYellow),
            code_block_style: Style::default().fg(Color::LightGreen),
            blockquote_style: Style::default().fg(Color::Gray),
            link_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),

            title_style: Style::default().fg(Color::Gray),
            dim_style: Style::default().fg(Color::DarkGray),
            input_border_style: Style::default().fg(Color::Gray),
            input_title_style: Style::default().fg(Color::Gray),
            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            selection_highlight_style: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan),
            overlay_border_style: Style::default().fg(Color::Cyan),
            overlay_title_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),

            connected_style: Style::default().fg(Color::Green),
            connecting_style: Style::default().fg(Color::Yellow),
            disconnected_style: Style::default().fg(Color::Red),
            usage_normal_style: Style::default().fg(Color::Green),
            usage_warning_style: Style::default().fg(Color::Yellow),
            usage_danger_style: Style::default().fg(Color::Red),
            toast_info_style: Style::default().fg(Color::LightBlue),
            toast_success_style: Style::default().fg(Color::Green),
            toast_warning_style: Style::default().fg(Color::Yellow),
            toast_error_style: Style::default().fg(Color::Red),

            syntax_theme: "base16-ocean.dark",
        }
    }

    pub fn light_default() -> Self {
        Theme {
            background_color: Color::White,
            user_prefix_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Blue),
            assistant_text_style: Style::default().fg(Color::Black),
            timestamp_style: Style::default().fg(Color::Gray),
            welcome_style: Style::default().fg(Color::DarkGray),
            streaming_indicator_style: Style::default().fg(Color::Magenta),

            heading_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            inline_code_style: Style::default().fg(Color::Rgb(153, 82, 0)),
            code_block_style: Style::default().fg(Color::Rgb(0, 102, 0)),
            blockquote_style: Style::default().fg(Color::DarkGray),
            link_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),

            title_style: Style::default().fg(Color::DarkGray),
            dim_style: Style::default().fg(Color::Gray),
            input_border_style: Style::default().fg(Color::DarkGray),
            input_title_style: Style::default().fg(Color::DarkGray),
            input_text_style: Style::default().fg(Color::Black),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            selection_highlight_style: Style::default()
                .fg(Color::White)
                .bg(Color::Blue),
            overlay_border_style: Style::default().fg(Color::Blue),
            overlay_title_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),

            connected_style: Style::default().fg(Color::Green),
            connecting_style: Style::default().fg(Color::Rgb(178, 121, 0)),
            disconnected_style: Style::default().fg(Color::Red),
            usage_normal_style: Style::default().fg(Color::Green),
            usage_warning_style: Style::default().fg(Color::Rgb(178, 121, 0)),
            usage_danger_style: Style::default().fg(Color::Red),
            toast_info_style: Style::default().fg(Color::Blue),
            toast_success_style: Style::default().fg(Color::Green),
            toast_warning_style: Style::default().fg(Color::Rgb(178, 121, 0)),
            toast_error_style: Style::default().fg(Color::Red),

            syntax_theme: "InspiredGitHub",
        }
    }

    pub fn toast_style(&self, kind: ToastKind) -> Style {
        match kind {
            ToastKind::Info => self.toast_info_style,
            ToastKind::Success => self.toast_success_style,
            ToastKind::Warning => self.toast_warning_style,
            ToastKind::Error => self.toast_error_style,
        }
    }

    pub fn usage_style(&self, level: UsageLevel) -> Style {
        match level {
            UsageLevel::Normal => self.usage_normal_style,
            UsageLevel::Warning => self.usage_warning_style,
            UsageLevel::Danger => self.usage_danger_style,
        }
    }
}
