use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::application::repos::{BlogSource, RepoError};
use crate::domain::entities::CategoryRecord;
use crate::domain::posts::{self, UNKNOWN_CATEGORY_LABEL};

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub category: Option<CategoryRecord>,
    pub category_label: String,
    pub published: Option<String>,
}

#[derive(Debug, Error)]
pub enum DetailError {
    #[error("blog post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct PostDetailService {
    source: Arc<dyn BlogSource>,
}

impl PostDetailService {
    pub fn new(source: Arc<dyn BlogSource>) -> Self {
        Self { source }
    }

    /// Look up a verified post by slug. The category is resolved best-effort.
    pub async fn by_slug(&self, slug: &str) -> Result<PostDetail, DetailError> {
        let record = self
            .source
            .find_by_slug(slug)
            .await?
            .filter(|post| post.verified)
            .ok_or(DetailError::NotFound)?;

        let category = match self.source.list_categories().await {
            Ok(categories) => categories
                .into_iter()
                .find(|category| category.id == record.category_id),
            Err(err) => {
                warn!(
                    target = "sithai::detail",
                    slug,
                    error = %err,
                    "category lookup failed"
                );
                None
            }
        };

        let category_label = category
            .as_ref()
            .map(|category| category.name.clone())
            .unwrap_or_else(|| UNKNOWN_CATEGORY_LABEL.to_string());

        Ok(PostDetail {
            id: record.id,
            slug: record.slug,
            title: record.title,
            body: record.body,
            image_url: record.image_url,
            category,
            category_label,
            published: posts::format_date(record.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::application::repos::PostQueryFilter;
    use crate::domain::entities::PostRecord;

    struct StubSource {
        posts: Vec<PostRecord>,
        categories_offline: bool,
    }

    #[async_trait]
    impl BlogSource for StubSource {
        async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
            if self.categories_offline {
                return Err(RepoError::Transport("offline".to_string()));
            }
            Ok(vec![CategoryRecord {
                id: "poems".to_string(),
                name: "கவிதை".to_string(),
                description: None,
            }])
        }

        async fn list_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError> {
            Ok(self
                .posts
                .iter()
                .filter(|post| filter.matches(post))
                .cloned()
                .collect())
        }

        async fn get_post(&self, id: &str) -> Result<PostRecord, RepoError> {
            self.posts
                .iter()
                .find(|post| post.id == id)
                .cloned()
                .ok_or(RepoError::NotFound)
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
            Ok(self.posts.iter().find(|post| post.slug == slug).cloned())
        }
    }

    fn post(slug: &str, verified: bool) -> PostRecord {
        PostRecord {
            id: format!("id-{slug}"),
            slug: slug.to_string(),
            title: "மழை".to_string(),
            body: "body".to_string(),
            image_url: None,
            category_id: "poems".to_string(),
            verified,
            created_at: Some(datetime!(2024-02-05 10:00 UTC)),
        }
    }

    fn service(categories_offline: bool) -> PostDetailService {
        PostDetailService::new(Arc::new(StubSource {
            posts: vec![post("rain", true), post("draft", false)],
            categories_offline,
        }))
    }

    #[tokio::test]
    async fn resolves_category_and_date() {
        let detail = service(false).by_slug("rain").await.expect("detail");

        assert_eq!(detail.category_label, "கவிதை");
        assert_eq!(detail.published.as_deref(), Some("February 5, 2024"));
    }

    #[tokio::test]
    async fn category_failure_falls_back_to_unknown_label() {
        let detail = service(true).by_slug("rain").await.expect("detail");

        assert!(detail.category.is_none());
        assert_eq!(detail.category_label, UNKNOWN_CATEGORY_LABEL);
    }

    #[tokio::test]
    async fn unverified_and_missing_slugs_are_not_found() {
        let service = service(false);

        assert!(matches!(
            service.by_slug("draft").await,
            Err(DetailError::NotFound)
        ));
        assert!(matches!(
            service.by_slug("nowhere").await,
            Err(DetailError::NotFound)
        ));
    }
}
