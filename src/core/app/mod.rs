pub mod conversation;
pub mod session;
pub mod ui_state;

pub use conversation::ConversationController;
pub use session::{ConnectionStatus, SessionContext};
pub use ui_state::{Mode, SettingsPanel, ToastKind, UiState};

use crate::api::GatewayClient;
use crate::core::catalog::ModelCatalog;
use crate::core::config::{Settings, SettingsError, SettingsStore};
use crate::core::transcript::Transcript;
use crate::ui::theme::Theme;

/// The whole application state, passed explicitly to every handler and to
/// the renderer. No ambient singletons.
pub struct App {
    pub session: SessionContext,
    pub ui: UiState,
    pub catalog: ModelCatalog,
    pub transcript: Transcript,
    pub settings: Settings,
    pub store: SettingsStore,
}

impl App {
    pub fn new(client: GatewayClient, settings: Settings, store: SettingsStore) -> Self {
        let theme = Theme::for_settings(settings.dark_mode);
        Self {
            session: SessionContext::new(client),
            ui: UiState::new(theme, &settings),
            catalog: ModelCatalog::new(),
            transcript: Transcript::new(),
            settings,
            store,
        }
    }

    pub fn conversation(&mut self) -> ConversationController<'_> {
        ConversationController {
            session: &mut self.session,
            transcript: &mut self.transcript,
            ui: &mut self.ui,
            catalog: &self.catalog,
            settings: &self.settings,
        }
    }

    /// The send gate: a model is selected, the composer has non-whitespace
    /// content, no generation is in flight, and the gateway is reachable.
    pub fn can_send(&self) -> bool {
        self.catalog.selected().is_some()
            && !self.ui.input_text().trim().is_empty()
            && !self.session.is_generating
            && self.session.connection.is_connected()
    }

    /// Persists new settings and applies the ones with immediate effect
    /// (theme, auto-scroll).
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), SettingsError> {
        self.store.save(&settings)?;
        if settings.dark_mode != self.settings.dark_mode {
            self.ui.set_theme(Theme::for_settings(settings.dark_mode));
        }
        self.ui.auto_scroll = settings.auto_scroll;
        self.settings = settings;
        Ok(())
    }
}
