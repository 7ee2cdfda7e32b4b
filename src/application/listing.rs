//! State machine behind the "all blogs" listing: loaded data, category filter,
//! pagination, load bookkeeping, and the view snapshot handed to presentation.

use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

use crate::application::filter::{CategoryFilter, CategorySelection};
use crate::application::pagination::{
    DEFAULT_MAX_VISIBLE_PAGES, NavigationEvent, PageSizes, Paginator, Viewport, WindowItem,
};
use crate::application::repos::RepoError;
use crate::domain::entities::{CategoryRecord, PostRecord};
use crate::domain::posts::{self, DEFAULT_EXCERPT_CHARS};

/// Identifies one issued load; only the most recent ticket per resource may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Failed,
    /// A newer load was issued after this one; the result was discarded.
    Stale,
}

#[derive(Debug, Default)]
struct LoadTracker {
    issued: u64,
    in_flight: bool,
}

impl LoadTracker {
    fn begin(&mut self) -> LoadTicket {
        self.issued += 1;
        self.in_flight = true;
        LoadTicket {
            generation: self.issued,
        }
    }

    fn accept(&mut self, ticket: LoadTicket) -> bool {
        if ticket.generation != self.issued {
            return false;
        }
        self.in_flight = false;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingOptions {
    pub page_sizes: PageSizes,
    pub max_visible_pages: usize,
    pub excerpt_chars: usize,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_sizes: PageSizes::default(),
            max_visible_pages: DEFAULT_MAX_VISIBLE_PAGES,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    /// Nothing has been published yet.
    NoArticles,
    /// The selected category has no published articles.
    NoArticlesInCategory,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            EmptyState::NoArticles => "No articles have been published yet.",
            EmptyState::NoArticlesInCategory => "No articles found in this category.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub image_url: Option<String>,
    pub category_id: String,
    pub category_label: String,
    pub published: Option<String>,
}

impl PostCard {
    pub fn from_record(
        record: &PostRecord,
        categories: &[CategoryRecord],
        excerpt_chars: usize,
    ) -> Self {
        Self {
            id: record.id.clone(),
            slug: record.slug.clone(),
            title: record.title.clone(),
            excerpt: posts::excerpt(&record.body, excerpt_chars),
            image_url: record.image_url.clone(),
            category_id: record.category_id.clone(),
            category_label: posts::category_label(categories, &record.category_id).to_string(),
            published: posts::format_date(record.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub cards: Vec<PostCard>,
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub window: Vec<WindowItem>,
    pub has_previous: bool,
    pub has_next: bool,
    pub selection: CategorySelection,
    pub categories: Vec<CategoryOption>,
    pub empty: Option<EmptyState>,
    pub error: Option<String>,
    pub loading_posts: bool,
    pub loading_categories: bool,
    pub viewport: Viewport,
}

pub struct ListingController {
    options: ListingOptions,
    viewport: Viewport,
    posts: Vec<PostRecord>,
    categories: Vec<CategoryRecord>,
    filter: CategoryFilter,
    paginator: Paginator,
    posts_load: LoadTracker,
    categories_load: LoadTracker,
    posts_loaded: bool,
    error: Option<String>,
}

impl ListingController {
    pub fn new(options: ListingOptions, viewport: Viewport) -> Self {
        let paginator = Paginator::new(options.page_sizes.for_viewport(viewport));
        Self {
            options,
            viewport,
            posts: Vec::new(),
            categories: Vec::new(),
            filter: CategoryFilter::default(),
            paginator,
            posts_load: LoadTracker::default(),
            categories_load: LoadTracker::default(),
            posts_loaded: false,
            error: None,
        }
    }

    pub fn page(&self) -> usize {
        self.paginator.page()
    }

    pub fn total_pages(&self) -> usize {
        self.paginator.total_pages()
    }

    pub fn selection(&self) -> &CategorySelection {
        self.filter.selection()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_posts_load(&mut self) -> LoadTicket {
        self.posts_load.begin()
    }

    pub fn begin_categories_load(&mut self) -> LoadTicket {
        self.categories_load.begin()
    }

    /// Apply a posts load. Replacing the collection resets the filter and page.
    pub fn complete_posts_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<PostRecord>, RepoError>,
    ) -> LoadOutcome {
        if !self.posts_load.accept(ticket) {
            counter!("sithai_listing_stale_loads_total", "resource" => "posts").increment(1);
            debug!(
                target = "sithai::listing",
                generation = ticket.generation,
                "discarding stale posts load"
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(records) => {
                self.posts = posts::publicly_visible(records);
                self.posts_loaded = true;
                self.filter.reset();
                self.paginator.reset();
                self.refresh_total();
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!(target = "sithai::listing", error = %err, "posts load failed");
                self.error = Some(format!("Failed to load blogs: {err}"));
                LoadOutcome::Failed
            }
        }
    }

    pub fn complete_categories_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<CategoryRecord>, RepoError>,
    ) -> LoadOutcome {
        if !self.categories_load.accept(ticket) {
            counter!("sithai_listing_stale_loads_total", "resource" => "categories").increment(1);
            return LoadOutcome::Stale;
        }

        match result {
            Ok(categories) => {
                self.categories = categories;
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!(target = "sithai::listing", error = %err, "categories load failed");
                self.error = Some(format!("Failed to load categories: {err}"));
                LoadOutcome::Failed
            }
        }
    }

    /// Select a category (`None` / `"all"` clears). Any change returns to page 1.
    pub fn set_category(&mut self, category_id: Option<&str>) -> bool {
        let changed = self.filter.set_category(category_id);
        if changed {
            self.paginator.reset();
            self.refresh_total();
        }
        changed
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.paginator
            .set_page_size(self.options.page_sizes.for_viewport(viewport));
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn next(&mut self) -> Option<NavigationEvent> {
        self.paginator.next()
    }

    pub fn previous(&mut self) -> Option<NavigationEvent> {
        self.paginator.previous()
    }

    pub fn first(&mut self) -> Option<NavigationEvent> {
        self.paginator.first()
    }

    pub fn last(&mut self) -> Option<NavigationEvent> {
        self.paginator.last()
    }

    pub fn jump_to(&mut self, page: i64) -> Option<NavigationEvent> {
        self.paginator.jump_to(page)
    }

    pub fn view(&self) -> ListingView {
        let filtered = self.filter.apply(&self.posts);
        let cards: Vec<PostCard> = self
            .paginator
            .slice(&filtered)
            .iter()
            .map(|record| PostCard::from_record(record, &self.categories, self.options.excerpt_chars))
            .collect();

        // No empty state until a posts load has succeeded.
        let empty = if filtered.is_empty() && self.posts_loaded && !self.posts_load.in_flight {
            Some(match self.filter.selection() {
                CategorySelection::All => EmptyState::NoArticles,
                CategorySelection::Category(_) => EmptyState::NoArticlesInCategory,
            })
        } else {
            None
        };

        let selected = self.filter.selection().category_id();
        let categories = self
            .categories
            .iter()
            .map(|category| CategoryOption {
                id: category.id.clone(),
                name: category.name.clone(),
                selected: selected == Some(category.id.as_str()),
            })
            .collect();

        ListingView {
            cards,
            page: self.paginator.page(),
            total_pages: self.paginator.total_pages(),
            page_size: self.paginator.page_size(),
            total_items: filtered.len(),
            window: self
                .paginator
                .window(self.options.max_visible_pages, self.viewport),
            has_previous: !self.paginator.is_first(),
            has_next: !self.paginator.is_last(),
            selection: self.filter.selection().clone(),
            categories,
            empty,
            error: self.error.clone(),
            loading_posts: self.posts_load.in_flight,
            loading_categories: self.categories_load.in_flight,
            viewport: self.viewport,
        }
    }

    fn refresh_total(&mut self) {
        let total = self
            .posts
            .iter()
            .filter(|post| self.filter.selection().matches(post))
            .count();
        self.paginator.set_total_items(total);
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};

    use super::*;
    use crate::application::pagination::WindowItem::{Ellipsis, Page};

    fn posts(count: usize, category: &str) -> Vec<PostRecord> {
        let base = datetime!(2024-01-01 0:00 UTC);
        (0..count)
            .map(|index| PostRecord {
                id: format!("{category}-{index}"),
                slug: format!("{category}-{index}"),
                title: format!("Post {index}"),
                body: "உள்ளடக்கம் ".repeat(40),
                image_url: None,
                category_id: category.to_string(),
                verified: true,
                created_at: Some(base + Duration::hours(index as i64)),
            })
            .collect()
    }

    fn categories() -> Vec<CategoryRecord> {
        vec![
            CategoryRecord {
                id: "poems".to_string(),
                name: "கவிதை".to_string(),
                description: None,
            },
            CategoryRecord {
                id: "stories".to_string(),
                name: "கதை".to_string(),
                description: None,
            },
        ]
    }

    fn loaded(records: Vec<PostRecord>, viewport: Viewport) -> ListingController {
        let mut controller = ListingController::new(ListingOptions::default(), viewport);
        let ticket = controller.begin_posts_load();
        assert_eq!(
            controller.complete_posts_load(ticket, Ok(records)),
            LoadOutcome::Applied
        );
        let ticket = controller.begin_categories_load();
        controller.complete_categories_load(ticket, Ok(categories()));
        controller
    }

    #[test]
    fn forty_five_posts_make_three_wide_pages() {
        let mut controller = loaded(posts(45, "poems"), Viewport::Wide);
        assert_eq!(controller.total_pages(), 3);

        controller.jump_to(5);
        let view = controller.view();
        assert_eq!(view.page, 3);
        assert_eq!(view.cards.len(), 5);
        assert!(!view.has_next);
    }

    #[test]
    fn empty_collection_renders_no_articles() {
        let controller = loaded(Vec::new(), Viewport::Wide);
        let view = controller.view();

        assert_eq!(view.total_pages, 1);
        assert!(view.cards.is_empty());
        assert_eq!(view.empty, Some(EmptyState::NoArticles));
    }

    #[test]
    fn unknown_category_renders_category_empty_state() {
        let mut controller = loaded(posts(3, "poems"), Viewport::Wide);
        controller.set_category(Some("essays"));
        let view = controller.view();

        assert!(view.cards.is_empty());
        assert_eq!(view.empty, Some(EmptyState::NoArticlesInCategory));
        assert!(view.error.is_none());
    }

    #[test]
    fn filter_change_resets_to_first_page() {
        let mut records = posts(30, "poems");
        records.extend(posts(30, "stories"));
        let mut controller = loaded(records, Viewport::Narrow);

        controller.jump_to(4);
        assert_eq!(controller.page(), 4);

        controller.set_category(Some("stories"));
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.total_pages(), 4);

        controller.jump_to(3);
        controller.set_category(Some("all"));
        assert_eq!(controller.page(), 1);
    }

    #[test]
    fn unverified_posts_never_appear() {
        let mut records = posts(4, "poems");
        records[1].verified = false;
        records[3].verified = false;
        let controller = loaded(records, Viewport::Wide);
        let view = controller.view();

        assert_eq!(view.total_items, 2);
        assert!(view.cards.iter().all(|card| card.id != "poems-1"));
    }

    #[test]
    fn cards_are_newest_first_with_labels() {
        let mut records = posts(2, "poems");
        records.push(PostRecord {
            category_id: "ghost".to_string(),
            ..posts(3, "poems").remove(2)
        });
        let controller = loaded(records, Viewport::Wide);
        let view = controller.view();

        assert_eq!(view.cards[0].id, "poems-2");
        assert_eq!(view.cards[0].category_label, "Unknown Category");
        assert_eq!(view.cards[1].category_label, "கவிதை");
        assert!(view.cards[1].excerpt.ends_with("..."));
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut controller = ListingController::new(ListingOptions::default(), Viewport::Wide);
        let older = controller.begin_posts_load();
        let newer = controller.begin_posts_load();

        assert_eq!(
            controller.complete_posts_load(newer, Ok(posts(2, "poems"))),
            LoadOutcome::Applied
        );
        assert_eq!(
            controller.complete_posts_load(older, Ok(posts(40, "stories"))),
            LoadOutcome::Stale
        );
        assert_eq!(controller.view().total_items, 2);
    }

    #[test]
    fn failed_reload_keeps_previous_data_and_shows_banner() {
        let mut controller = loaded(posts(5, "poems"), Viewport::Wide);
        let ticket = controller.begin_posts_load();
        let outcome = controller.complete_posts_load(
            ticket,
            Err(RepoError::Transport("connection refused".to_string())),
        );

        assert_eq!(outcome, LoadOutcome::Failed);
        let view = controller.view();
        assert_eq!(view.total_items, 5);
        assert!(view.error.as_deref().unwrap_or_default().contains("connection refused"));

        controller.dismiss_error();
        assert!(controller.view().error.is_none());
    }

    #[test]
    fn failed_first_load_shows_banner_without_empty_state() {
        let mut controller = ListingController::new(ListingOptions::default(), Viewport::Wide);
        let ticket = controller.begin_posts_load();
        controller.complete_posts_load(ticket, Err(RepoError::Transport("offline".to_string())));
        let view = controller.view();

        assert!(view.cards.is_empty());
        assert!(view.empty.is_none());
        assert_eq!(
            view.error.as_deref(),
            Some("Failed to load blogs: transport error: offline")
        );
    }

    #[test]
    fn failed_reload_after_empty_load_keeps_empty_state() {
        let mut controller = loaded(Vec::new(), Viewport::Wide);
        let ticket = controller.begin_posts_load();
        controller.complete_posts_load(ticket, Err(RepoError::Transport("offline".to_string())));
        let view = controller.view();

        assert_eq!(view.empty, Some(EmptyState::NoArticles));
        assert!(view.error.is_some());
    }

    #[test]
    fn reload_resets_filter_to_all() {
        let mut controller = loaded(posts(5, "poems"), Viewport::Wide);
        controller.set_category(Some("poems"));

        let ticket = controller.begin_posts_load();
        controller.complete_posts_load(ticket, Ok(posts(6, "stories")));
        assert_eq!(controller.selection(), &CategorySelection::All);
        assert_eq!(controller.view().total_items, 6);
    }

    #[test]
    fn viewport_change_reclamps_page() {
        let mut controller = loaded(posts(45, "poems"), Viewport::Narrow);
        controller.last();
        assert_eq!(controller.page(), 6);

        controller.set_viewport(Viewport::Wide);
        assert_eq!(controller.page(), 3);
        assert_eq!(controller.view().page_size, 20);
    }

    #[test]
    fn window_follows_viewport() {
        let mut controller = loaded(posts(80, "poems"), Viewport::Narrow);
        controller.jump_to(5);
        assert_eq!(controller.view().window, vec![Page(4), Page(5)]);

        controller.set_viewport(Viewport::Wide);
        assert_eq!(controller.page(), 4);
        assert_eq!(
            controller.view().window,
            vec![Page(1), Page(2), Page(3), Page(4)]
        );
    }

    #[test]
    fn navigation_emits_scroll_events() {
        let mut controller = loaded(posts(45, "poems"), Viewport::Wide);
        assert_eq!(
            controller.next(),
            Some(NavigationEvent::ScrollToTop { page: 2 })
        );
        assert_eq!(controller.first(), Some(NavigationEvent::ScrollToTop { page: 1 }));
        assert_eq!(controller.previous(), None);
        let view = controller.view();
        assert_eq!(view.window, vec![Page(1), Page(2), Page(3)]);
        assert!(!view.window.contains(&Ellipsis));
    }

    #[test]
    fn loading_state_suppresses_empty_message() {
        let mut controller = ListingController::new(ListingOptions::default(), Viewport::Wide);
        let _ticket = controller.begin_posts_load();
        let view = controller.view();

        assert!(view.loading_posts);
        assert!(view.empty.is_none());
    }
}
