use std::cmp::Ordering;

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::domain::entities::{CategoryRecord, PostRecord};

pub const UNKNOWN_CATEGORY_LABEL: &str = "Unknown Category";
pub const DEFAULT_EXCERPT_CHARS: usize = 150;
pub const CATEGORY_PREVIEW_CHARS: usize = 200;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");

/// Cut `text` to at most `max_chars` characters, appending `...` when shortened.
///
/// Counts Unicode scalar values so Tamil text is never split inside a code point.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head.trim())
}

/// Card excerpt, trimmed the same way the listing grid shows it.
pub fn excerpt(body: &str, max_chars: usize) -> String {
    truncate_text(body, max_chars)
}

/// Resolve the display label for a category reference, tolerating dangling ids.
pub fn category_label<'a>(categories: &'a [CategoryRecord], category_id: &str) -> &'a str {
    categories
        .iter()
        .find(|category| category.id == category_id)
        .map(|category| category.name.as_str())
        .unwrap_or(UNKNOWN_CATEGORY_LABEL)
}

/// Newest first; posts without a timestamp sink to the end, ties fall back to id.
pub fn newest_first(a: &PostRecord, b: &PostRecord) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(left), Some(right)) => right.cmp(&left).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}

/// Keep verified posts only, ordered for public display.
pub fn publicly_visible(mut posts: Vec<PostRecord>) -> Vec<PostRecord> {
    posts.retain(|post| post.verified);
    posts.sort_by(newest_first);
    posts
}

pub fn format_date(value: Option<OffsetDateTime>) -> Option<String> {
    value.and_then(|date| date.format(HUMAN_DATE_FORMAT).ok())
}
