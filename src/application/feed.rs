use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::listing::{
    EmptyState, ListingController, ListingOptions, ListingView, PostCard,
};
use crate::application::pagination::Viewport;
use crate::application::repos::{BlogSource, CategoryListener, PostQueryFilter, RepoError};
use crate::application::subscription::Subscription;
use crate::domain::entities::CategoryRecord;
use crate::domain::posts;

#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub page: Option<i64>,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeFeed {
    pub cards: Vec<PostCard>,
    pub empty: Option<EmptyState>,
    pub error: Option<String>,
    pub viewport: Viewport,
}

/// Public read paths: home feed, paginated listing, category list.
#[derive(Clone)]
pub struct FeedService {
    source: Arc<dyn BlogSource>,
    options: ListingOptions,
    categories: Arc<watch::Sender<Option<Vec<CategoryRecord>>>>,
}

impl FeedService {
    pub fn new(source: Arc<dyn BlogSource>, options: ListingOptions) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            source,
            options,
            categories: Arc::new(sender),
        }
    }

    pub fn options(&self) -> &ListingOptions {
        &self.options
    }

    /// Keep the category cache fed from the source. The caller owns the handle.
    ///
    /// Only sources that push updates fill the cache.
    pub fn watch_categories(&self) -> Subscription {
        let cache = self.categories.clone();
        let live = self.source.pushes_category_updates();
        let listener: CategoryListener =
            Arc::new(move |result: Result<Vec<CategoryRecord>, RepoError>| match result {
                Ok(categories) if live => {
                    info!(
                        target = "sithai::feed",
                        count = categories.len(),
                        "category snapshot received"
                    );
                    cache.send_replace(Some(categories));
                }
                Ok(categories) => {
                    debug!(
                        target = "sithai::feed",
                        count = categories.len(),
                        "one-shot category snapshot left uncached"
                    );
                }
                Err(err) => {
                    warn!(target = "sithai::feed", error = %err, "category subscription failed");
                }
            });
        self.source.clone().subscribe_categories(listener)
    }

    /// Categories from the live cache when populated, otherwise straight from the source.
    pub async fn categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let cached = self.categories.borrow().clone();
        if let Some(cached) = cached {
            return Ok(cached);
        }
        self.source.list_categories().await
    }

    /// First page of the home feed; narrow layouts get fewer cards.
    pub async fn home(&self, viewport: Viewport) -> HomeFeed {
        let limit = self.options.page_sizes.for_viewport(viewport);
        let filter = PostQueryFilter::public();
        let (posts_result, categories_result) =
            futures::join!(self.source.list_posts(&filter), self.categories());

        let mut error = None;
        let categories = categories_result.unwrap_or_else(|err| {
            warn!(target = "sithai::feed", error = %err, "home feed categories failed");
            error = Some("Failed to load categories".to_string());
            Vec::new()
        });

        let (cards, empty) = match posts_result {
            Ok(records) => {
                let cards: Vec<PostCard> = posts::publicly_visible(records)
                    .iter()
                    .take(limit)
                    .map(|record| {
                        PostCard::from_record(record, &categories, self.options.excerpt_chars)
                    })
                    .collect();
                let empty = cards.is_empty().then_some(EmptyState::NoArticles);
                (cards, empty)
            }
            Err(err) => {
                warn!(target = "sithai::feed", error = %err, "home feed posts failed");
                error = Some("Failed to load blogs".to_string());
                (Vec::new(), None)
            }
        };

        HomeFeed {
            cards,
            empty,
            error,
            viewport,
        }
    }

    /// Build the listing for a single request: load, filter, then jump to the asked page.
    pub async fn listing(&self, query: ListingQuery) -> ListingView {
        let mut controller = ListingController::new(self.options, query.viewport);
        let posts_ticket = controller.begin_posts_load();
        let categories_ticket = controller.begin_categories_load();

        let filter = PostQueryFilter::public();
        let (posts_result, categories_result) =
            futures::join!(self.source.list_posts(&filter), self.categories());

        controller.complete_categories_load(categories_ticket, categories_result);
        controller.complete_posts_load(posts_ticket, posts_result);
        controller.set_category(query.category.as_deref());
        if let Some(page) = query.page {
            controller.jump_to(page);
        }
        controller.view()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::domain::entities::PostRecord;

    struct FixedSource {
        posts: Vec<PostRecord>,
        categories: Mutex<Vec<CategoryRecord>>,
        fail_categories: bool,
        fail_posts: bool,
    }

    fn category(id: &str, name: &str) -> CategoryRecord {
        CategoryRecord {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    #[async_trait]
    impl BlogSource for FixedSource {
        async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
            if self.fail_categories {
                return Err(RepoError::Transport("offline".to_string()));
            }
            Ok(self.categories.lock().expect("categories lock").clone())
        }

        async fn list_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError> {
            if self.fail_posts {
                return Err(RepoError::Transport("offline".to_string()));
            }
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

    fn records(count: usize) -> Vec<PostRecord> {
        (0..count)
            .map(|index| PostRecord {
                id: format!("p{index}"),
                slug: format!("p{index}"),
                title: format!("Post {index}"),
                body: "body".to_string(),
                image_url: None,
                category_id: if index % 2 == 0 { "c1" } else { "c2" }.to_string(),
                verified: true,
                created_at: Some(datetime!(2024-01-01 0:00 UTC) + time::Duration::days(index as i64)),
            })
            .collect()
    }

    fn fixed(count: usize) -> FixedSource {
        FixedSource {
            posts: records(count),
            categories: Mutex::new(vec![category("c1", "Travel")]),
            fail_categories: false,
            fail_posts: false,
        }
    }

    fn service(count: usize, fail_categories: bool) -> FeedService {
        FeedService::new(
            Arc::new(FixedSource {
                fail_categories,
                ..fixed(count)
            }),
            ListingOptions::default(),
        )
    }

    #[tokio::test]
    async fn home_feed_respects_viewport_size() {
        let service = service(30, false);

        assert_eq!(service.home(Viewport::Narrow).await.cards.len(), 8);
        let wide = service.home(Viewport::Wide).await;
        assert_eq!(wide.cards.len(), 20);
        assert_eq!(wide.cards[0].id, "p29");
    }

    #[tokio::test]
    async fn home_feed_survives_category_failure() {
        let feed = service(3, true).home(Viewport::Wide).await;

        assert_eq!(feed.cards.len(), 3);
        assert_eq!(feed.error.as_deref(), Some("Failed to load categories"));
        assert!(feed.cards.iter().all(|card| card.category_label == "Unknown Category"));
    }

    #[tokio::test]
    async fn listing_applies_category_and_page() {
        let view = service(45, false)
            .listing(ListingQuery {
                category: Some("c1".to_string()),
                page: Some(9),
                viewport: Viewport::Narrow,
            })
            .await;

        assert_eq!(view.total_items, 23);
        assert_eq!(view.total_pages, 3);
        assert_eq!(view.page, 3);
        assert_eq!(view.cards.len(), 7);
    }

    #[tokio::test]
    async fn one_shot_snapshot_does_not_pin_categories() {
        let source = Arc::new(fixed(1));
        let service = FeedService::new(source.clone(), ListingOptions::default());
        let subscription = service.watch_categories();

        tokio::time::timeout(Duration::from_secs(1), async {
            while subscription.is_active() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("snapshot delivered");

        source
            .categories
            .lock()
            .expect("categories lock")
            .push(category("c2", "Music"));

        let names: Vec<String> = service
            .categories()
            .await
            .expect("categories")
            .into_iter()
            .map(|category| category.name)
            .collect();
        assert_eq!(names, ["Travel", "Music"]);
        assert!(service.categories.borrow().is_none());
    }

    #[tokio::test]
    async fn failed_posts_load_is_not_reported_as_empty() {
        let service = FeedService::new(
            Arc::new(FixedSource {
                fail_posts: true,
                ..fixed(3)
            }),
            ListingOptions::default(),
        );

        let feed = service.home(Viewport::Wide).await;
        assert!(feed.cards.is_empty());
        assert!(feed.empty.is_none());
        assert_eq!(feed.error.as_deref(), Some("Failed to load blogs"));

        let view = service
            .listing(ListingQuery {
                category: None,
                page: None,
                viewport: Viewport::Wide,
            })
            .await;
        assert!(view.empty.is_none());
        assert!(view.error.is_some());
    }

    #[tokio::test]
    async fn empty_source_reports_no_articles() {
        let feed = service(0, false).home(Viewport::Narrow).await;
        assert_eq!(feed.empty, Some(EmptyState::NoArticles));
        assert!(feed.error.is_none());
    }
}
