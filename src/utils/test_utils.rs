//! Shared fixtures for unit tests.

use crate::api::{GatewayClient, ModelEntry};
use crate::core::app::{App, ConnectionStatus};
use crate::core::config::{Settings, SettingsStore};

pub fn test_model_entries() -> Vec<ModelEntry> {
    vec![
        ModelEntry {
            name: "models/gemini-1.5-flash".to_string(),
            display_name: Some("Gemini 1.5 Flash".to_string()),
            input_token_limit: Some(1_048_576),
        },
        ModelEntry {
            name: "models/gemini-1.5-pro".to_string(),
            display_name: Some("Gemini 1.5 Pro".to_string()),
            input_token_limit: Some(2_097_152),
        },
    ]
}

/// Connected app with an empty catalog. The settings store points into the
/// temp dir and is never written by these fixtures.
pub fn base_test_app() -> App {
    let client = GatewayClient::new(reqwest::Client::new(), "http://localhost:8000");
    let store = SettingsStore::at(std::env::temp_dir().join("parley-test-settings.json"));
    let mut app = App::new(client, Settings::default(), store);
    app.session.connection = ConnectionStatus::Connected;
    app
}

/// Connected app with models loaded but nothing selected.
pub fn connected_app_without_selection() -> App {
    let mut app = base_test_app();
    app.catalog.set_models(test_model_entries());
    app
}

/// Connected app with models loaded and the first one selected — the state
/// right after a successful startup.
pub fn connected_test_app() -> App {
    let mut app = connected_app_without_selection();
    app.catalog.select_first();
    app
}
