//! Request and response shapes of the blog backend REST API.
//!
//! The backend wraps every payload in an envelope (`success`, `data`,
//! optional `message`) and uses camelCase field names. Categories expose their
//! display label as `title`.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Envelope returned by every backend endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCategory {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBlog {
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogRequest {
    pub title: String,
    pub slug: String,
    pub category_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub is_verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blog_tolerates_missing_optional_fields() {
        let raw = r#"{"id":"b1","title":"வணக்கம்","categoryId":"c1"}"#;
        let blog: ApiBlog = serde_json::from_str(raw).expect("blog decodes");

        assert_eq!(blog.id, "b1");
        assert!(!blog.is_verified);
        assert!(blog.created_at.is_none());
        assert!(blog.image_url.is_none());
    }

    #[test]
    fn envelope_failure_carries_message() {
        let raw = r#"{"success":false,"data":null,"message":"db offline"}"#;
        let envelope: ApiEnvelope<Vec<ApiCategory>> =
            serde_json::from_str(raw).expect("envelope decodes");

        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("db offline"));
    }

    #[test]
    fn created_at_parses_iso_timestamps() {
        let raw = r#"{"id":"b2","title":"t","categoryId":"c","isVerified":true,"createdAt":"2024-03-01T10:00:00Z"}"#;
        let blog: ApiBlog = serde_json::from_str(raw).expect("blog decodes");
        let created = blog.created_at.expect("timestamp present");

        assert_eq!(created.year(), 2024);
        assert!(blog.is_verified);
    }
}
