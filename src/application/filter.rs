//! Category selection applied to the loaded post collection.

use serde::Serialize;

use crate::domain::entities::PostRecord;

/// Sentinel accepted from query strings and form values for "no filter".
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CategorySelection {
    #[default]
    All,
    Category(String),
}

impl CategorySelection {
    /// Parse a raw selection, mapping the `all` sentinel and blanks to [`CategorySelection::All`].
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some(ALL_CATEGORIES) => CategorySelection::All,
            Some(id) => CategorySelection::Category(id.to_string()),
        }
    }

    pub fn category_id(&self) -> Option<&str> {
        match self {
            CategorySelection::All => None,
            CategorySelection::Category(id) => Some(id.as_str()),
        }
    }

    pub fn matches(&self, post: &PostRecord) -> bool {
        match self {
            CategorySelection::All => true,
            CategorySelection::Category(id) => post.category_id == *id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    selection: CategorySelection,
}

impl CategoryFilter {
    pub fn selection(&self) -> &CategorySelection {
        &self.selection
    }

    /// Select a category (`None` or the `all` sentinel clears the filter).
    /// Returns `true` when the selection actually changed.
    pub fn set_category(&mut self, category_id: Option<&str>) -> bool {
        let next = CategorySelection::parse(category_id);
        if next == self.selection {
            return false;
        }
        self.selection = next;
        true
    }

    pub fn reset(&mut self) {
        self.selection = CategorySelection::All;
    }

    /// Matching subsequence of `posts`, order preserved.
    pub fn apply<'a>(&self, posts: &'a [PostRecord]) -> Vec<&'a PostRecord> {
        posts
            .iter()
            .filter(|post| self.selection.matches(post))
            .collect()
    }
}
