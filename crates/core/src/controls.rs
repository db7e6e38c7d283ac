//! Search box + rating filter + mode switch.
//!
//! Typed text goes through a [`Debouncer`]; only the committed text feeds the
//! query key. Rating and mode changes take effect immediately.

use crate::debounce::Debouncer;
use crate::types::{QueryKey, QueryMode, Rating};

/// Rating choices in display order, with their labels.
pub fn rating_options() -> [(Rating, &'static str); 4] {
    Rating::ALL.map(|r| (r, r.label()))
}

pub struct SearchControls {
    raw_text: String,
    committed_text: String,
    rating: Rating,
    mode: QueryMode,
    debouncer: Debouncer<String>,
}

impl SearchControls {
    /// `debouncer` receives every keystroke; its callback is expected to route the
    /// text back into [`SearchControls::commit_text`].
    pub fn new(rating: Rating, debouncer: Debouncer<String>) -> Self {
        Self {
            raw_text: String::new(),
            committed_text: String::new(),
            rating,
            mode: QueryMode::Search,
            debouncer,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn committed_text(&self) -> &str {
        &self.committed_text
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub fn type_text(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.raw_text = value.clone();
        self.debouncer.invoke(value);
    }

    /// Commit debounced text. Returns whether the key may have changed.
    pub fn commit_text(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if value == self.committed_text {
            return false;
        }
        self.committed_text = value;
        self.mode == QueryMode::Search
    }

    /// Clear the box immediately, dropping any pending debounced text.
    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.raw_text.clear();
        self.committed_text.clear();
    }

    pub fn set_rating(&mut self, rating: Rating) -> bool {
        let changed = rating != self.rating;
        self.rating = rating;
        changed
    }

    pub fn set_mode(&mut self, mode: QueryMode) -> bool {
        let changed = mode != self.mode;
        self.mode = mode;
        changed
    }

    /// Text to describe the empty state with: committed text in search mode, none in trending.
    pub fn display_query(&self) -> &str {
        match self.mode {
            QueryMode::Search => &self.committed_text,
            QueryMode::Trending => "",
        }
    }

    pub fn key(&self) -> QueryKey {
        match self.mode {
            QueryMode::Search => QueryKey::search(&self.committed_text, self.rating),
            QueryMode::Trending => QueryKey::trending(self.rating),
        }
    }
}
