use std::time::{Duration, Instant};

use tui_textarea::TextArea;

use crate::core::config::Settings;
use crate::core::usage::UsageSnapshot;
use crate::ui::picker::ModelPickerState;
use crate::ui::theme::Theme;

/// How long a toast stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(3);

/// Which surface currently owns key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Chat,
    ModelPicker,
    Settings,
    ConfirmNewChat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    pub shown_at: Instant,
}

/// Rows of the settings panel, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    Temperature,
    MaxTokens,
    Streaming,
    DarkMode,
    AutoScroll,
}

impl SettingsRow {
    pub const ALL: [SettingsRow; 5] = [
        SettingsRow::Temperature,
        SettingsRow::MaxTokens,
        SettingsRow::Streaming,
        SettingsRow::DarkMode,
        SettingsRow::AutoScroll,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsRow::Temperature => "Temperature",
            SettingsRow::MaxTokens => "Max output tokens",
            SettingsRow::Streaming => "Stream responses",
            SettingsRow::DarkMode => "Dark mode",
            SettingsRow::AutoScroll => "Auto-scroll",
        }
    }
}

/// Editable copy of the settings shown in the panel. Nothing persists
/// until the user saves; Esc throws the draft away.
pub struct SettingsPanel {
    pub draft: Settings,
    pub row: usize,
}

impl SettingsPanel {
    pub fn open(settings: Settings) -> Self {
        Self {
            draft: settings,
            row: 0,
        }
    }

    pub fn selected(&self) -> SettingsRow {
        SettingsRow::ALL[self.row]
    }

    pub fn move_up(&mut self) {
        self.row = if self.row == 0 {
            SettingsRow::ALL.len() - 1
        } else {
            self.row - 1
        };
    }

    pub fn move_down(&mut self) {
        self.row = (self.row + 1) % SettingsRow::ALL.len();
    }

    pub fn adjust(&mut self, increase: bool) {
        match self.selected() {
            SettingsRow::Temperature => {
                let step = if increase { 0.1 } else { -0.1 };
                let adjusted = (self.draft.temperature + step).clamp(0.0, 2.0);
                // One decimal place, so repeated stepping can't accumulate
                // float noise in the persisted record.
                self.draft.temperature = (adjusted * 10.0).round() / 10.0;
            }
            SettingsRow::MaxTokens => {
                let tokens = self.draft.max_tokens;
                self.draft.max_tokens = if increase {
                    tokens.saturating_add(256).min(8192)
                } else {
                    tokens.saturating_sub(256).max(256)
                };
            }
            SettingsRow::Streaming => self.draft.streaming = !self.draft.streaming,
            SettingsRow::DarkMode => self.draft.dark_mode = !self.draft.dark_mode,
            SettingsRow::AutoScroll => self.draft.auto_scroll = !self.draft.auto_scroll,
        }
    }
}

/// Everything the renderer needs that isn't conversation data: the
/// composer, scroll state, overlays, the usage meter, and the active
/// toast.
pub struct UiState {
    pub mode: Mode,
    pub textarea: TextArea<'static>,
    pub theme: Theme,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    pub usage: Option<UsageSnapshot>,
    pub toast: Option<Toast>,
    pub picker: ModelPickerState,
    pub settings_panel: Option<SettingsPanel>,
    pub exit_requested: bool,
    /// Transcript viewport metrics from the last draw, used to clamp
    /// scrolling between frames.
    pub transcript_total_lines: u16,
    pub transcript_view_height: u16,
}

impl UiState {
    pub fn new(theme: Theme, settings: &Settings) -> Self {
        let mut ui = Self {
            mode: Mode::Chat,
            textarea: TextArea::default(),
            theme,
            scroll_offset: 0,
            auto_scroll: settings.auto_scroll,
            usage: None,
            toast: None,
            picker: ModelPickerState::new(),
            settings_panel: None,
            exit_requested: false,
            transcript_total_lines: 0,
            transcript_view_height: 0,
        };
        ui.configure_textarea();
        ui
    }

    fn configure_textarea(&mut self) {
        self.textarea.set_cursor_style(self.theme.input_cursor_style);
        self.textarea
            .set_cursor_line_style(self.theme.input_text_style);
        self.textarea.set_style(self.theme.input_text_style);
        self.textarea
            .set_placeholder_text("Message the model (Enter to send, Alt+Enter for newline)");
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.configure_textarea();
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn clear_input(&mut self) {
        self.textarea = TextArea::default();
        self.configure_textarea();
    }

    pub fn show_toast(&mut self, kind: ToastKind, text: impl Into<String>) {
        self.toast = Some(Toast {
            text: text.into(),
            kind,
            shown_at: Instant::now(),
        });
    }

    /// Drops an expired toast; returns true when a redraw is needed.
    pub fn expire_toast(&mut self) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|t| t.shown_at.elapsed() >= TOAST_TTL)
        {
            self.toast = None;
            true
        } else {
            false
        }
    }

    pub fn record_transcript_metrics(&mut self, total_lines: u16, view_height: u16) {
        self.transcript_total_lines = total_lines;
        self.transcript_view_height = view_height;
    }

    pub fn max_scroll_offset(&self) -> u16 {
        self.transcript_total_lines
            .saturating_sub(self.transcript_view_height)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll_offset();
    }

    /// Manual scrolling detaches the view from the live bottom edge;
    /// reaching the bottom again re-attaches it.
    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self
            .scroll_offset
            .saturating_add(lines)
            .min(self.max_scroll_offset());
        if self.scroll_offset == self.max_scroll_offset() {
            self.auto_scroll = true;
        }
    }
}
