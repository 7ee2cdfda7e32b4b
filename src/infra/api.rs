//! REST adapter for the blog backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use sithai_api_types::{ApiBlog, ApiCategory, ApiEnvelope, CreateBlogRequest};
use tracing::{debug, warn};

use crate::application::repos::{
    BlogSource, BlogWriteRepo, CreatePostParams, PostQueryFilter, RepoError,
};
use crate::domain::entities::{CategoryRecord, PostRecord};
use crate::infra::error::InfraError;

const BACKEND: &str = "api";

#[derive(Clone, Debug)]
pub struct HttpBlogSource {
    client: Client,
    base: Url,
}

impl HttpBlogSource {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::data_source(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base: with_trailing_slash(base),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("sithai/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RepoError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RepoError::Transport(format!("`{}` cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        segments: &[&str],
        body: Option<serde_json::Value>,
    ) -> Result<T, RepoError> {
        let url = self.url(segments)?;
        debug!(target = "sithai::infra::api", operation, %method, %url, "sending request");

        let started = Instant::now();
        let result = self.send(method, url, body).await;
        histogram!(
            "sithai_source_request_ms",
            "backend" => BACKEND,
            "operation" => operation
        )
        .record(started.elapsed().as_secs_f64() * 1000.0);

        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!(
            "sithai_source_requests_total",
            "backend" => BACKEND,
            "operation" => operation,
            "outcome" => outcome
        )
        .increment(1);

        if let Err(err) = &result {
            warn!(target = "sithai::infra::api", operation, error = %err, "request failed");
        }
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T, RepoError> {
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.map_err(RepoError::transport)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(RepoError::transport)?;

        if status == StatusCode::NOT_FOUND {
            return Err(RepoError::NotFound);
        }
        if !status.is_success() {
            let detail = serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(&bytes)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            return Err(RepoError::Transport(format!("status {status}: {detail}")));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes).map_err(RepoError::decode)?;
        unwrap_envelope(envelope)
    }

    async fn fetch_posts(&self) -> Result<Vec<PostRecord>, RepoError> {
        let blogs: Vec<ApiBlog> = self
            .request("list_posts", Method::GET, &["api", "blogs"], None)
            .await?;
        Ok(blogs.into_iter().map(post_from_api).collect())
    }
}

#[async_trait]
impl BlogSource for HttpBlogSource {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let categories: Vec<ApiCategory> = self
            .request("list_categories", Method::GET, &["api", "categories"], None)
            .await?;
        let mut categories: Vec<CategoryRecord> =
            categories.into_iter().map(category_from_api).collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn list_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError> {
        let mut posts = self.fetch_posts().await?;
        posts.retain(|post| filter.matches(post));
        Ok(posts)
    }

    async fn get_post(&self, id: &str) -> Result<PostRecord, RepoError> {
        let blog: ApiBlog = self
            .request("get_post", Method::GET, &["api", "blogs", id], None)
            .await?;
        Ok(post_from_api(blog))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let posts = self.fetch_posts().await?;
        Ok(posts.into_iter().find(|post| post.slug == slug))
    }
}

#[async_trait]
impl BlogWriteRepo for HttpBlogSource {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let request = CreateBlogRequest {
            title: params.title,
            slug: params.slug,
            category_id: params.category_id,
            content: params.body,
            image_url: params.image_url,
            is_verified: params.verified,
        };
        let body = serde_json::to_value(&request).map_err(RepoError::decode)?;
        let blog: ApiBlog = self
            .request("create_post", Method::POST, &["api", "blogs"], Some(body))
            .await?;
        Ok(post_from_api(blog))
    }
}

fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T, RepoError> {
    if !envelope.success {
        return Err(RepoError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "request was not successful".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| RepoError::Decode("envelope is missing `data`".to_string()))
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn category_from_api(category: ApiCategory) -> CategoryRecord {
    CategoryRecord {
        id: category.id,
        name: category.title,
        description: category.description,
    }
}

fn post_from_api(blog: ApiBlog) -> PostRecord {
    let slug = blog
        .slug
        .filter(|slug| !slug.trim().is_empty())
        .unwrap_or_else(|| blog.id.clone());
    PostRecord {
        id: blog.id,
        slug,
        title: blog.title,
        body: blog.content,
        image_url: blog.image_url.filter(|url| !url.trim().is_empty()),
        category_id: blog.category_id,
        verified: blog.is_verified,
        created_at: blog.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base: &str) -> HttpBlogSource {
        HttpBlogSource::new(Url::parse(base).expect("url"), Duration::from_secs(1))
            .expect("client")
    }

    #[test]
    fn urls_keep_base_path_prefix() {
        let source = source("http://localhost:4000/backend");
        let url = source.url(&["api", "blogs", "a b"]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:4000/backend/api/blogs/a%20b");
    }

    #[test]
    fn rejected_envelope_carries_message() {
        let envelope: ApiEnvelope<Vec<ApiBlog>> = ApiEnvelope::failure("quota exceeded");
        let err = unwrap_envelope(envelope).unwrap_err();
        assert!(matches!(err, RepoError::Rejected(message) if message == "quota exceeded"));
    }

    #[test]
    fn envelope_without_data_is_a_decode_error() {
        let envelope: ApiEnvelope<Vec<ApiBlog>> = ApiEnvelope {
            success: true,
            data: None,
            message: None,
        };
        assert!(matches!(
            unwrap_envelope(envelope),
            Err(RepoError::Decode(_))
        ));
    }

    #[test]
    fn api_category_title_becomes_name() {
        let record = category_from_api(ApiCategory {
            id: "c1".to_string(),
            title: "பயணம்".to_string(),
            description: None,
        });
        assert_eq!(record.name, "பயணம்");
    }

    #[test]
    fn missing_slug_falls_back_to_id() {
        let record = post_from_api(ApiBlog {
            id: "b7".to_string(),
            slug: Some("  ".to_string()),
            title: "t".to_string(),
            content: String::new(),
            image_url: Some(String::new()),
            category_id: "c1".to_string(),
            is_verified: true,
            created_at: None,
        });
        assert_eq!(record.slug, "b7");
        assert!(record.image_url.is_none());
    }
}
