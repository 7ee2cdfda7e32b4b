//! Normalized records shared by every data source adapter.

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub category_id: String,
    /// Moderation gate; unverified posts never reach a public listing.
    pub verified: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}
