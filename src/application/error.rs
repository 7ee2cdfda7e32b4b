use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    application::{
        detail::DetailError,
        repos::RepoError,
        submission::SubmissionError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
};

pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const SOURCE_UNAVAILABLE: &str = "source_unavailable";
    pub const SOURCE_REJECTED: &str = "source_rejected";
    pub const INTERNAL: &str = "internal_error";
}

/// Diagnostic chain attached to error responses for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<&'static str>,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    code: &'static str,
    public_message: String,
    user_message: Option<&'static str>,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        code: &'static str,
        public_message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code,
            public_message: public_message.into(),
            user_message: None,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        code: &'static str,
        public_message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            code,
            public_message: public_message.into(),
            user_message: None,
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn with_user_message(mut self, message: &'static str) -> Self {
        self.user_message = Some(message);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorMessage {
                code: self.code,
                message: self.public_message,
                user_message: self.user_message,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<RepoError> for HttpError {
    fn from(error: RepoError) -> Self {
        const SOURCE: &str = "infra::http::repo_error_to_http_error";
        match &error {
            RepoError::NotFound => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                "Resource not found",
                &error,
            ),
            RepoError::Rejected(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                codes::SOURCE_REJECTED,
                "Data source rejected the request",
                &error,
            ),
            RepoError::Transport(_) | RepoError::Decode(_) => HttpError::from_error(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                codes::SOURCE_UNAVAILABLE,
                "Data source unavailable",
                &error,
            ),
            RepoError::Persistence(_) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "Internal server error",
                &error,
            ),
        }
    }
}

impl From<DetailError> for HttpError {
    fn from(error: DetailError) -> Self {
        match error {
            DetailError::NotFound => HttpError::new(
                "infra::http::detail_error_to_http_error",
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                "Blog post not found",
                "No verified post matches the requested slug",
            ),
            DetailError::Repo(err) => err.into(),
        }
    }
}

impl From<SubmissionError> for HttpError {
    fn from(error: SubmissionError) -> Self {
        const SOURCE: &str = "infra::http::submission_error_to_http_error";
        match error {
            SubmissionError::Invalid(err) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                err.to_string(),
                &err,
            )
            .with_user_message(err.user_message()),
            SubmissionError::Slug(err) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Title cannot be turned into a slug",
                &err,
            ),
            SubmissionError::Repo(err) => err.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Infra(InfraError::Source { .. }) | AppError::Repo(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Infra(_) | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound) => {
                "Resource not found"
            }
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                "Request could not be processed"
            }
            AppError::Infra(InfraError::Source { .. }) | AppError::Repo(_) => {
                "Service temporarily unavailable"
            }
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl From<DetailError> for AppError {
    fn from(error: DetailError) -> Self {
        match error {
            DetailError::NotFound => AppError::Domain(DomainError::not_found("post")),
            DetailError::Repo(err) => AppError::Repo(err),
        }
    }
}

impl From<SubmissionError> for AppError {
    fn from(error: SubmissionError) -> Self {
        match error {
            SubmissionError::Invalid(err) => AppError::Domain(DomainError::validation(format!(
                "{err} ({})",
                err.user_message()
            ))),
            SubmissionError::Slug(err) => AppError::validation(err.to_string()),
            SubmissionError::Repo(err) => AppError::Repo(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let body = ErrorBody {
            error: ErrorMessage {
                code: codes::INTERNAL,
                message: self.presentation_message().to_string(),
                user_message: None,
            },
        };
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
