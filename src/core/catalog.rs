//! The model catalog: every model the gateway advertises, plus the
//! filtered view the picker renders and the current selection.
//!
//! Provider and category are derived from the model id with fixed
//! substring rules; the gateway itself only reports a name, a display
//! name, and a context window.

use crate::api::ModelEntry;

/// Category filter values, in the order the picker cycles through them.
pub const CATEGORIES: &[&str] = &["all", "gemini", "gpt", "claude", "llama"];

#[derive(Debug, Clone)]
pub struct ModelCard {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub context_length: Option<u64>,
    pub provider: &'static str,
    pub category: &'static str,
    pub pricing: String,
}

pub fn provider_for(id: &str) -> &'static str {
    if id.contains("gemini") {
        "Google"
    } else if id.contains("gpt") {
        "OpenAI"
    } else if id.contains("claude") {
        "Anthropic"
    } else if id.contains("llama") {
        "Meta"
    } else {
        "Google"
    }
}

pub fn category_for(id: &str) -> &'static str {
    if id.contains("gemini") {
        "gemini"
    } else if id.contains("gpt") {
        "gpt"
    } else if id.contains("claude") {
        "claude"
    } else if id.contains("llama") {
        "llama"
    } else {
        "gemini"
    }
}

fn description_for(id: &str) -> &'static str {
    match id {
        "models/gemini-1.0-pro" => "Fast and efficient for most tasks",
        "models/gemini-1.5-flash" => "Lightning fast responses with good quality",
        "models/gemini-1.5-pro" => "Most capable model with large context window",
        "models/gemini-2.5-flash-preview-04-17" => "Latest preview with enhanced capabilities",
        "models/gemini-pro" => "General purpose conversational AI",
        "models/gemini-pro-vision" => "Multimodal model supporting text and images",
        _ => "Advanced AI language model",
    }
}

/// `1_000_000` → `1.0M`, `128_000` → `128K`, unknown → `Unknown`.
pub fn format_context_length(length: Option<u64>) -> String {
    match length {
        Some(length) if length >= 1_000_000 => {
            format!("{:.1}M", length as f64 / 1_000_000.0)
        }
        Some(length) => format!("{:.0}K", length as f64 / 1_000.0),
        None => "Unknown".to_string(),
    }
}

impl ModelCard {
    fn from_entry(entry: ModelEntry) -> Self {
        let display_name = entry.display_name.unwrap_or_else(|| entry.name.clone());
        Self {
            description: description_for(&entry.name).to_string(),
            provider: provider_for(&entry.name),
            category: category_for(&entry.name),
            context_length: entry.input_token_limit,
            pricing: "Free".to_string(),
            id: entry.name,
            display_name,
        }
    }
}

#[derive(Default)]
pub struct ModelCatalog {
    models: Vec<ModelCard>,
    filtered: Vec<ModelCard>,
    selected: Option<String>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the catalog wholesale. The filtered view resets to the full
    /// list, and a selection pointing at a model that no longer exists is
    /// dropped so it can never go stale.
    pub fn set_models(&mut self, entries: Vec<ModelEntry>) {
        self.models = entries.into_iter().map(ModelCard::from_entry).collect();
        self.filtered = self.models.clone();
        if let Some(id) = &self.selected {
            if !self.models.iter().any(|m| &m.id == id) {
                self.selected = None;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[ModelCard] {
        &self.models
    }

    /// The picker's view. Each filter operation replaces it outright; text
    /// and category filters are not composed (last one wins).
    pub fn filtered(&self) -> &[ModelCard] {
        &self.filtered
    }

    pub fn filter_by_text(&mut self, term: &str) {
        let term = term.to_lowercase();
        self.filtered = self
            .models
            .iter()
            .filter(|m| {
                m.display_name.to_lowercase().contains(&term)
                    || m.description.to_lowercase().contains(&term)
                    || m.provider.to_lowercase().contains(&term)
            })
            .cloned()
            .collect();
    }

    pub fn filter_by_category(&mut self, category: &str) {
        if category.is_empty() || category == "all" {
            self.filtered = self.models.clone();
        } else {
            self.filtered = self
                .models
                .iter()
                .filter(|m| m.category == category)
                .cloned()
                .collect();
        }
    }

    /// Selects a model by id. Unknown ids are a silent no-op; membership is
    /// checked against the full catalog, never the filtered view.
    pub fn select(&mut self, id: &str) -> bool {
        if self.models.iter().any(|m| m.id == id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn select_first(&mut self) {
        if let Some(first) = self.models.first() {
            self.selected = Some(first.id.clone());
        }
    }

    pub fn selected(&self) -> Option<&ModelCard> {
        let id = self.selected.as_deref()?;
        self.models.iter().find(|m| m.id == id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> ModelEntry {
        ModelEntry {
            name: name.to_string(),
            display_name: Some(name.trim_start_matches("models/").to_string()),
            input_token_limit: Some(128_000),
        }
    }

    fn gemini_catalog() -> ModelCatalog {
        let mut catalog = ModelCatalog::new();
        catalog.set_models(vec![
            entry("models/gemini-1.5-flash"),
            entry("models/gemini-1.5-pro"),
        ]);
        catalog
    }

    #[test]
    fn provider_and_category_follow_substring_rules() {
        assert_eq!(provider_for("models/gemini-1.5-pro"), "Google");
        assert_eq!(provider_for("gpt-4o"), "OpenAI");
        assert_eq!(provider_for("claude-sonnet"), "Anthropic");
        assert_eq!(provider_for("llama-3-70b"), "Meta");
        assert_eq!(provider_for("mystery-model"), "Google");
        assert_eq!(category_for("mystery-model"), "gemini");
    }

    #[test]
    fn text_filter_matches_name_case_insensitively() {
        let mut catalog = gemini_catalog();
        catalog.filter_by_text("FLASH");
        let ids: Vec<&str> = catalog.filtered().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["models/gemini-1.5-flash"]);
    }

    #[test]
    fn empty_text_filter_restores_full_view() {
        let mut catalog = gemini_catalog();
        catalog.filter_by_text("flash");
        catalog.filter_by_text("");
        assert_eq!(catalog.filtered().len(), 2);
    }

    #[test]
    fn category_filter_replaces_text_filter() {
        let mut catalog = ModelCatalog::new();
        catalog.set_models(vec![entry("models/gemini-1.5-flash"), entry("gpt-4o")]);
        catalog.filter_by_text("flash");
        assert_eq!(catalog.filtered().len(), 1);

        // Last filter wins; the text term is not composed in.
        catalog.filter_by_category("gpt");
        let ids: Vec<&str> = catalog.filtered().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["gpt-4o"]);

        catalog.filter_by_category("all");
        assert_eq!(catalog.filtered().len(), 2);
    }

    #[test]
    fn selecting_unknown_id_is_a_no_op() {
        let mut catalog = gemini_catalog();
        assert!(catalog.select("models/gemini-1.5-pro"));
        assert!(!catalog.select("models/nope"));
        assert_eq!(catalog.selected_id(), Some("models/gemini-1.5-pro"));
    }

    #[test]
    fn refresh_drops_selection_of_removed_models() {
        let mut catalog = gemini_catalog();
        catalog.select("models/gemini-1.5-pro");
        catalog.set_models(vec![entry("models/gemini-1.5-flash")]);
        assert_eq!(catalog.selected_id(), None);
        assert!(catalog.selected().is_none());
    }

    #[test]
    fn context_lengths_format_like_the_picker_shows_them() {
        assert_eq!(format_context_length(Some(1_048_576)), "1.0M");
        assert_eq!(format_context_length(Some(128_000)), "128K");
        assert_eq!(format_context_length(None), "Unknown");
    }
}
