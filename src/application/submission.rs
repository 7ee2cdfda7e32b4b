//! The "add blog" wizard and the write path behind it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::repos::{BlogSource, BlogWriteRepo, CreatePostParams, RepoError};
use crate::domain::entities::{CategoryRecord, PostRecord};
use crate::domain::slug::{self, SlugAsyncError, SlugError};

const FALLBACK_SLUG_PREFIX: &str = "post";
const FALLBACK_SLUG_ID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    #[default]
    Title,
    Category,
    Content,
    Image,
}

impl FormStep {
    pub fn number(self) -> u8 {
        match self {
            FormStep::Title => 1,
            FormStep::Category => 2,
            FormStep::Content => 3,
            FormStep::Image => 4,
        }
    }

    fn following(self) -> Self {
        match self {
            FormStep::Title => FormStep::Category,
            FormStep::Category => FormStep::Content,
            FormStep::Content | FormStep::Image => FormStep::Image,
        }
    }

    fn preceding(self) -> Self {
        match self {
            FormStep::Title | FormStep::Category => FormStep::Title,
            FormStep::Content => FormStep::Category,
            FormStep::Image => FormStep::Content,
        }
    }
}

/// A required field left blank. `Display` is English; [`FormError::user_message`] is Tamil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("a title is required")]
    MissingTitle,
    #[error("a category must be selected")]
    MissingCategory,
    #[error("content is required")]
    MissingContent,
}

impl FormError {
    pub fn user_message(self) -> &'static str {
        match self {
            FormError::MissingTitle => "தலைப்பு தேவை!",
            FormError::MissingCategory => "வகை தேர்ந்தெடுக்கவும்!",
            FormError::MissingContent => "உள்ளடக்கம் தேவை!",
        }
    }
}

/// Draft state of a new post as it moves through the wizard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(skip)]
    step: FormStep,
    #[serde(skip)]
    default_category: Option<String>,
}

impl BlogForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    /// Remember the first category as the default and select it when nothing is chosen yet.
    pub fn categories_loaded(&mut self, categories: &[CategoryRecord]) {
        let Some(first) = categories.first() else {
            return;
        };
        self.default_category = Some(first.id.clone());
        if selected(&self.category_id).is_none() {
            self.category_id = Some(first.id.clone());
        }
    }

    /// Advance one step when the current step is filled in.
    pub fn next_step(&mut self) -> Result<FormStep, FormError> {
        match self.step {
            FormStep::Title if self.title.trim().is_empty() => {
                return Err(FormError::MissingTitle);
            }
            FormStep::Category if selected(&self.category_id).is_none() => {
                return Err(FormError::MissingCategory);
            }
            _ => {}
        }
        self.step = self.step.following();
        Ok(self.step)
    }

    pub fn previous_step(&mut self) -> FormStep {
        self.step = self.step.preceding();
        self.step
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::MissingTitle);
        }
        if selected(&self.category_id).is_none() {
            return Err(FormError::MissingCategory);
        }
        if self.content.trim().is_empty() {
            return Err(FormError::MissingContent);
        }
        Ok(())
    }

    /// Clear the draft and return to the first step, keeping the default category.
    pub fn reset(&mut self) {
        self.title.clear();
        self.content.clear();
        self.image_url = None;
        self.category_id = self.default_category.clone();
        self.step = FormStep::Title;
    }
}

fn selected(category: &Option<String>) -> Option<&str> {
    category
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for SubmissionError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        match err {
            SlugAsyncError::Slug(inner) => Self::Slug(inner),
            SlugAsyncError::Predicate(inner) => Self::Repo(inner),
        }
    }
}

#[derive(Clone)]
pub struct SubmissionService {
    source: Arc<dyn BlogSource>,
    writer: Arc<dyn BlogWriteRepo>,
}

impl SubmissionService {
    pub fn new(source: Arc<dyn BlogSource>, writer: Arc<dyn BlogWriteRepo>) -> Self {
        Self { source, writer }
    }

    /// Persist the draft as an unverified post and reset the form on success.
    #[instrument(skip(self, form), fields(title = %form.title.trim()))]
    pub async fn submit(&self, form: &mut BlogForm) -> Result<PostRecord, SubmissionError> {
        form.validate()?;

        let category_id = selected(&form.category_id)
            .map(str::to_string)
            .ok_or(FormError::MissingCategory)?;
        let title = form.title.trim().to_string();
        let slug = self.unique_slug(&title).await?;

        let params = CreatePostParams {
            slug,
            title,
            body: form.content.trim().to_string(),
            category_id,
            image_url: form
                .image_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            verified: false,
        };

        let record = self.writer.create_post(params).await?;
        info!(
            target = "sithai::submission",
            id = %record.id,
            slug = %record.slug,
            "post submitted for review"
        );
        form.reset();
        Ok(record)
    }

    async fn unique_slug(&self, title: &str) -> Result<String, SubmissionError> {
        let base = match slug::derive_slug(title) {
            Ok(base) => base,
            Err(SlugError::Unrepresentable { .. }) => {
                let fallback = fallback_slug();
                warn!(
                    target = "sithai::submission",
                    %fallback,
                    "title has no slug-safe characters"
                );
                fallback
            }
            Err(err) => return Err(err.into()),
        };

        let source = &self.source;
        let slug = slug::generate_unique_slug_async(&base, |candidate| {
            let candidate = candidate.to_string();
            async move {
                source
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await?;
        Ok(slug)
    }
}

fn fallback_slug() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{FALLBACK_SLUG_PREFIX}-{}", &id[..FALLBACK_SLUG_ID_LEN])
}
