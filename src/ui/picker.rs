use crate::core::catalog::{ModelCatalog, CATEGORIES};

/// Model picker overlay state: a text filter, a category filter, and the
/// cursor position in the filtered list.
///
/// Each edit reruns exactly one catalog filter, so text and category
/// replace each other rather than composing — the picker inherits the
/// catalog's last-filter-wins behavior.
#[derive(Debug, Clone)]
pub struct ModelPickerState {
    pub filter: String,
    pub category_index: usize,
    pub selected: usize,
}

impl Default for ModelPickerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelPickerState {
    pub fn new() -> Self {
        Self {
            filter: String::new(),
            category_index: 0,
            selected: 0,
        }
    }

    pub fn category(&self) -> &'static str {
        CATEGORIES[self.category_index]
    }

    /// Opening resets both filters to the full catalog and parks the cursor
    /// on the current selection when it is visible.
    pub fn open(&mut self, catalog: &mut ModelCatalog) {
        self.filter.clear();
        self.category_index = 0;
        catalog.filter_by_category("all");
        self.selected = catalog
            .selected_id()
            .and_then(|id| catalog.filtered().iter().position(|m| m.id == id))
            .unwrap_or(0);
    }

    pub fn move_up(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.selected = if self.selected == 0 {
            len - 1
        } else {
            self.selected - 1
        };
    }

    pub fn move_down(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn push_char(&mut self, c: char, catalog: &mut ModelCatalog) {
        self.filter.push(c);
        catalog.filter_by_text(&self.filter);
        self.selected = 0;
    }

    pub fn pop_char(&mut self, catalog: &mut ModelCatalog) {
        self.filter.pop();
        catalog.filter_by_text(&self.filter);
        self.selected = 0;
    }

    pub fn cycle_category(&mut self, catalog: &mut ModelCatalog) {
        self.category_index = (self.category_index + 1) % CATEGORIES.len();
        catalog.filter_by_category(self.category());
        self.selected = 0;
    }

    pub fn selected_id<'c>(&self, catalog: &'c ModelCatalog) -> Option<&'c str> {
        catalog
            .filtered()
            .get(self.selected)
            .map(|m| m.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::connected_test_app;

    #[test]
    fn open_parks_cursor_on_the_current_selection() {
        let mut app = connected_test_app();
        app.catalog.select("models/gemini-1.5-pro");

        let mut picker = ModelPickerState::new();
        picker.open(&mut app.catalog);
        assert_eq!(picker.selected, 1);
        assert_eq!(picker.selected_id(&app.catalog), Some("models/gemini-1.5-pro"));
    }

    #[test]
    fn typing_filters_and_resets_the_cursor() {
        let mut app = connected_test_app();
        let mut picker = ModelPickerState::new();
        picker.open(&mut app.catalog);
        picker.move_down(app.catalog.filtered().len());

        picker.push_char('f', &mut app.catalog);
        picker.push_char('l', &mut app.catalog);
        assert_eq!(picker.filter, "fl");
        assert_eq!(picker.selected, 0);
        assert_eq!(
            picker.selected_id(&app.catalog),
            Some("models/gemini-1.5-flash")
        );

        picker.pop_char(&mut app.catalog);
        picker.pop_char(&mut app.catalog);
        assert_eq!(app.catalog.filtered().len(), 2);
    }

    #[test]
    fn category_cycle_wraps_back_to_all() {
        let mut app = connected_test_app();
        let mut picker = ModelPickerState::new();
        picker.open(&mut app.catalog);

        for _ in 0..CATEGORIES.len() {
            picker.cycle_category(&mut app.catalog);
        }
        assert_eq!(picker.category(), "all");
        assert_eq!(app.catalog.filtered().len(), 2);
    }

    #[test]
    fn cursor_movement_wraps_around_the_list() {
        let mut picker = ModelPickerState::new();
        picker.move_up(3);
        assert_eq!(picker.selected, 2);
        picker.move_down(3);
        assert_eq!(picker.selected, 0);
        // An empty list never moves the cursor.
        picker.move_up(0);
        assert_eq!(picker.selected, 0);
    }
}
