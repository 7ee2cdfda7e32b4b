//! Repository traits describing data source adapters.
//!
//! Both backends (the document store and the REST API) normalize into
//! [`PostRecord`] and [`CategoryRecord`] before anything above this seam sees
//! the data.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::subscription::Subscription;
use crate::domain::entities::{CategoryRecord, PostRecord};

#[derive(Debug, Clone, Error)]
pub enum RepoError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("resource not found")]
    NotFound,
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RepoError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostQueryFilter {
    pub category_id: Option<String>,
    pub verified_only: bool,
}

impl PostQueryFilter {
    pub fn public() -> Self {
        Self {
            category_id: None,
            verified_only: true,
        }
    }

    pub fn matches(&self, post: &PostRecord) -> bool {
        if self.verified_only && !post.verified {
            return false;
        }
        match self.category_id.as_deref() {
            Some(category) => post.category_id == category,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePostParams {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub category_id: String,
    pub image_url: Option<String>,
    pub verified: bool,
}

/// Callback invoked with every category snapshot a subscription observes.
pub type CategoryListener = Arc<dyn Fn(Result<Vec<CategoryRecord>, RepoError>) + Send + Sync>;

#[async_trait]
pub trait BlogSource: Send + Sync + 'static {
    /// Categories ordered by display name.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn list_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError>;

    async fn get_post(&self, id: &str) -> Result<PostRecord, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    /// Whether `subscribe_categories` keeps pushing after the first snapshot.
    fn pushes_category_updates(&self) -> bool {
        false
    }

    /// Push category snapshots to `listener` until the returned handle is dropped.
    ///
    /// Sources without a live feed deliver a single snapshot.
    fn subscribe_categories(self: Arc<Self>, listener: CategoryListener) -> Subscription {
        Subscription::spawn("categories.once", async move {
            listener(self.list_categories().await);
        })
    }
}

#[async_trait]
pub trait BlogWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;
}
