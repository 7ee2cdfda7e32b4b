//! Document-database adapter.
//!
//! Collections hold schemaless documents keyed by id, using the field names
//! the hosted document store uses (`title`, `content`, `imageUrl`,
//! `createdAt`, `categoryId`, `isVerified`, `slug`, `name`). Every write bumps
//! a revision on a watch channel so category listeners can re-read.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{
    BlogSource, BlogWriteRepo, CategoryListener, CreatePostParams, PostQueryFilter, RepoError,
};
use crate::application::subscription::Subscription;
use crate::domain::entities::{CategoryRecord, PostRecord};
use crate::domain::posts::{CATEGORY_PREVIEW_CHARS, truncate_text};
use crate::infra::error::InfraError;

const BACKEND: &str = "documents";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    fn bool_field(&self, key: &str) -> bool {
        self.fields.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn timestamp_field(&self, key: &str) -> Option<OffsetDateTime> {
        match self.fields.get(key)? {
            Value::String(raw) => OffsetDateTime::parse(raw, &Rfc3339).ok(),
            // Exported timestamps arrive as `{ "seconds": .., "nanoseconds": .. }`.
            Value::Object(parts) => {
                let seconds = parts
                    .get("seconds")
                    .or_else(|| parts.get("_seconds"))
                    .and_then(Value::as_i64)?;
                let nanos = parts
                    .get("nanoseconds")
                    .or_else(|| parts.get("_nanoseconds"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                let base = OffsetDateTime::from_unix_timestamp(seconds).ok()?;
                Some(base + time::Duration::nanoseconds(nanos))
            }
            _ => None,
        }
    }
}

/// Seed file layout: one array per top-level collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSeed {
    #[serde(default)]
    pub blogs: Vec<Document>,
    #[serde(default)]
    pub categories: Vec<Document>,
}

#[derive(Debug, Default)]
struct Collections {
    blogs: Vec<Document>,
    categories: Vec<Document>,
    /// `categories/{id}/blogs` previews, keyed by category id.
    category_blogs: BTreeMap<String, Vec<Document>>,
}

#[derive(Debug)]
pub struct DocumentBlogSource {
    collections: RwLock<Collections>,
    revision: watch::Sender<u64>,
}

impl DocumentBlogSource {
    pub fn new(seed: DocumentSeed) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            collections: RwLock::new(Collections {
                blogs: seed.blogs,
                categories: seed.categories,
                category_blogs: BTreeMap::new(),
            }),
            revision,
        }
    }

    pub fn empty() -> Self {
        Self::new(DocumentSeed::default())
    }

    pub fn from_json(raw: &str) -> Result<Self, InfraError> {
        let seed: DocumentSeed = serde_json::from_str(raw)
            .map_err(|err| InfraError::data_source(format!("invalid document seed: {err}")))?;
        Ok(Self::new(seed))
    }

    /// Read a seed file; a missing file yields empty collections.
    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let source = Self::from_json(&raw)?;
                info!(
                    target = "sithai::infra::documents",
                    path = %path.display(),
                    "document seed loaded"
                );
                Ok(source)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    target = "sithai::infra::documents",
                    path = %path.display(),
                    "document seed missing; starting empty"
                );
                Ok(Self::empty())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub async fn insert_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> CategoryRecord {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name.to_string()));
        if let Some(description) = description {
            fields.insert(
                "description".to_string(),
                Value::String(description.to_string()),
            );
        }
        let document = Document {
            id: new_document_id(),
            fields,
        };
        let record = category_from_document(&document);

        self.collections.write().await.categories.push(document);
        self.bump_revision();
        record
    }

    /// Previews recorded under `categories/{category_id}/blogs`.
    pub async fn category_blogs(&self, category_id: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .category_blogs
            .get(category_id)
            .cloned()
            .unwrap_or_default()
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn record(operation: &'static str) {
        counter!(
            "sithai_source_requests_total",
            "backend" => BACKEND,
            "operation" => operation,
            "outcome" => "ok"
        )
        .increment(1);
    }
}

#[async_trait]
impl BlogSource for DocumentBlogSource {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        Self::record("list_categories");
        let collections = self.collections.read().await;
        let mut categories: Vec<CategoryRecord> = collections
            .categories
            .iter()
            .map(category_from_document)
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn list_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError> {
        Self::record("list_posts");
        let collections = self.collections.read().await;
        Ok(collections
            .blogs
            .iter()
            .map(post_from_document)
            .filter(|post| filter.matches(post))
            .collect())
    }

    async fn get_post(&self, id: &str) -> Result<PostRecord, RepoError> {
        Self::record("get_post");
        let collections = self.collections.read().await;
        collections
            .blogs
            .iter()
            .find(|document| document.id == id)
            .map(post_from_document)
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        Self::record("find_by_slug");
        let collections = self.collections.read().await;
        Ok(collections
            .blogs
            .iter()
            .map(post_from_document)
            .find(|post| post.slug == slug))
    }

    /// Push the ordered category list now and again after every write.
    fn pushes_category_updates(&self) -> bool {
        true
    }

    fn subscribe_categories(self: Arc<Self>, listener: CategoryListener) -> Subscription {
        let mut revisions = self.revision.subscribe();
        Subscription::spawn("categories.live", async move {
            loop {
                listener(self.list_categories().await);
                if revisions.changed().await.is_err() {
                    break;
                }
                let revision = *revisions.borrow_and_update();
                debug!(target = "sithai::infra::documents", revision, "collections changed");
            }
        })
    }
}

#[async_trait]
impl BlogWriteRepo for DocumentBlogSource {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        Self::record("create_post");
        let created_at = OffsetDateTime::now_utc();
        let timestamp = created_at
            .format(&Rfc3339)
            .map_err(RepoError::from_persistence)?;
        let image = params
            .image_url
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null);

        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::String(params.title.clone()));
        fields.insert("slug".to_string(), Value::String(params.slug.clone()));
        fields.insert(
            "categoryId".to_string(),
            Value::String(params.category_id.clone()),
        );
        fields.insert("content".to_string(), Value::String(params.body.clone()));
        fields.insert("imageUrl".to_string(), image.clone());
        fields.insert("isVerified".to_string(), Value::Bool(params.verified));
        fields.insert("createdAt".to_string(), Value::String(timestamp.clone()));
        let document = Document {
            id: new_document_id(),
            fields,
        };

        let mut preview = Map::new();
        preview.insert("blogId".to_string(), Value::String(document.id.clone()));
        preview.insert("title".to_string(), Value::String(params.title));
        preview.insert(
            "content".to_string(),
            Value::String(truncate_text(&params.body, CATEGORY_PREVIEW_CHARS)),
        );
        preview.insert("imageUrl".to_string(), image);
        preview.insert("createdAt".to_string(), Value::String(timestamp));
        preview.insert("isVerified".to_string(), Value::Bool(params.verified));
        preview.insert("slug".to_string(), Value::String(params.slug));
        let preview = Document {
            id: new_document_id(),
            fields: preview,
        };

        let record = post_from_document(&document);
        {
            let mut collections = self.collections.write().await;
            collections.blogs.push(document);
            collections
                .category_blogs
                .entry(params.category_id)
                .or_default()
                .push(preview);
        }
        self.bump_revision();

        info!(
            target = "sithai::infra::documents",
            id = %record.id,
            slug = %record.slug,
            "blog document created"
        );
        Ok(record)
    }
}

fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn category_from_document(document: &Document) -> CategoryRecord {
    let name = document
        .str_field("name")
        .or_else(|| document.str_field("title"))
        .unwrap_or_default()
        .to_string();
    CategoryRecord {
        id: document.id.clone(),
        name,
        description: document.str_field("description").map(str::to_string),
    }
}

fn post_from_document(document: &Document) -> PostRecord {
    let slug = document
        .str_field("slug")
        .filter(|slug| !slug.trim().is_empty())
        .unwrap_or(document.id.as_str())
        .to_string();
    PostRecord {
        id: document.id.clone(),
        slug,
        title: document.str_field("title").unwrap_or_default().to_string(),
        body: document.str_field("content").unwrap_or_default().to_string(),
        image_url: document
            .str_field("imageUrl")
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string),
        category_id: document
            .str_field("categoryId")
            .unwrap_or_default()
            .to_string(),
        verified: document.bool_field("isVerified"),
        created_at: document.timestamp_field("createdAt"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    const SEED: &str = r#"{
        "categories": [
            { "id": "c2", "fields": { "name": "Travel" } },
            { "id": "c1", "fields": { "name": "Poetry", "description": "கவிதை" } }
        ],
        "blogs": [
            {
                "id": "b1",
                "fields": {
                    "title": "மழை",
                    "slug": "mazhai",
                    "content": "body",
                    "categoryId": "c1",
                    "isVerified": true,
                    "createdAt": { "seconds": 1704067200, "nanoseconds": 0 }
                }
            },
            {
                "id": "b2",
                "fields": {
                    "title": "Draft",
                    "content": "pending",
                    "categoryId": "c2",
                    "createdAt": "2024-02-01T10:00:00Z"
                }
            }
        ]
    }"#;

    fn params(slug: &str, body: &str) -> CreatePostParams {
        CreatePostParams {
            slug: slug.to_string(),
            title: "Title".to_string(),
            body: body.to_string(),
            category_id: "c1".to_string(),
            image_url: None,
            verified: false,
        }
    }

    #[tokio::test]
    async fn seed_documents_normalize_into_records() {
        let source = DocumentBlogSource::from_json(SEED).expect("seed");

        let categories = source.list_categories().await.expect("categories");
        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Poetry", "Travel"]);
        assert_eq!(categories[0].description.as_deref(), Some("கவிதை"));

        let all = source
            .list_posts(&PostQueryFilter::default())
            .await
            .expect("posts");
        assert_eq!(all.len(), 2);

        let draft = source.get_post("b2").await.expect("draft");
        assert_eq!(draft.slug, "b2");
        assert!(!draft.verified);
        assert_eq!(draft.created_at, Some(datetime!(2024-02-01 10:00 UTC)));

        let verified = source
            .list_posts(&PostQueryFilter::public())
            .await
            .expect("public posts");
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].created_at, Some(datetime!(2024-01-01 0:00 UTC)));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let source = DocumentBlogSource::empty();
        assert!(matches!(
            source.get_post("missing").await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn create_post_records_category_preview() {
        let source = DocumentBlogSource::from_json(SEED).expect("seed");
        let body = "அ".repeat(250);

        let record = source.create_post(params("long", &body)).await.expect("create");
        assert!(!record.verified);
        assert!(record.created_at.is_some());
        assert_eq!(source.revision(), 1);

        let previews = source.category_blogs("c1").await;
        assert_eq!(previews.len(), 1);
        let content = previews[0].str_field("content").expect("content");
        assert_eq!(content.chars().count(), CATEGORY_PREVIEW_CHARS + 3);
        assert!(content.ends_with("..."));
        assert_eq!(previews[0].fields["blogId"], json!(record.id));
        assert_eq!(previews[0].fields["imageUrl"], Value::Null);

        let found = source.find_by_slug("long").await.expect("lookup");
        assert_eq!(found.map(|post| post.id), Some(record.id));
    }
}
