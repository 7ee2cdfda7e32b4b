use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        detail::{PostDetail, PostDetailService},
        error::HttpError,
        feed::{FeedService, HomeFeed, ListingQuery},
        listing::ListingView,
        pagination::Viewport,
        submission::{BlogForm, SubmissionService},
    },
    domain::entities::{CategoryRecord, PostRecord},
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub detail: Arc<PostDetailService>,
    pub submissions: Arc<SubmissionService>,
    pub breakpoint_px: u32,
}

impl HttpState {
    fn viewport(&self, query: &LayoutQuery) -> Viewport {
        match (query.viewport, query.width) {
            (Some(viewport), _) => viewport,
            (None, Some(width)) => Viewport::from_width(width, self.breakpoint_px),
            (None, None) => Viewport::Wide,
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/feed", get(home_feed))
        .route("/api/v1/posts", get(list_posts).post(submit_post))
        .route("/api/v1/posts/{slug}", get(post_detail))
        .route("/api/v1/categories", get(list_categories))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Layout hints: an explicit class wins over a raw width.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LayoutQuery {
    viewport: Option<Viewport>,
    width: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    category: Option<String>,
    page: Option<i64>,
    viewport: Option<Viewport>,
    width: Option<u32>,
}

impl ListQuery {
    fn layout(&self) -> LayoutQuery {
        LayoutQuery {
            viewport: self.viewport,
            width: self.width,
        }
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn home_feed(
    State(state): State<HttpState>,
    Query(query): Query<LayoutQuery>,
) -> Json<HomeFeed> {
    let viewport = state.viewport(&query);
    Json(state.feed.home(viewport).await)
}

async fn list_posts(
    State(state): State<HttpState>,
    Query(query): Query<ListQuery>,
) -> Json<ListingView> {
    let viewport = state.viewport(&query.layout());
    let view = state
        .feed
        .listing(ListingQuery {
            category: query.category,
            page: query.page,
            viewport,
        })
        .await;
    Json(view)
}

async fn post_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetail>, HttpError> {
    let detail = state.detail.by_slug(&slug).await?;
    Ok(Json(detail))
}

async fn list_categories(
    State(state): State<HttpState>,
) -> Result<Json<Vec<CategoryRecord>>, HttpError> {
    let categories = state.feed.categories().await?;
    Ok(Json(categories))
}

async fn submit_post(
    State(state): State<HttpState>,
    Json(mut form): Json<BlogForm>,
) -> Result<Response, HttpError> {
    match state.feed.categories().await {
        Ok(categories) => form.categories_loaded(&categories),
        Err(err) => {
            warn!(
                target = "sithai::http::submit",
                error = %err,
                "categories unavailable; no default category applied"
            );
        }
    }

    let record: PostRecord = state.submissions.submit(&mut form).await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}
