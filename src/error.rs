//! Error types for content acquisition and page rendering.
//!
//! Errors reaching the HTTP layer become HTML error pages tagged with an
//! [`ErrorPage`] extension, which the server swaps for the localized site
//! page. The JSON endpoints wrap errors in [`ApiError`] instead.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;

use crate::content::MapError;
use crate::helpers::html_escape;

/// Translation key group of the error page shown for a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage(pub &'static str);

/// Blog error type
#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    /// No document with the requested identifier exists.
    #[error("post not found: {0}")]
    NotFound(String),

    /// The content API could not be reached or its body could not be read.
    #[error("content request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The content API answered with a non-success status.
    #[error("content API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// A pagination cursor that does not belong to the content source.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// A preview link without a usable token.
    #[error("invalid preview request: {0}")]
    InvalidPreview(String),

    /// A "load more" was requested while another one is still running.
    #[error("a page load is already in progress")]
    LoadInProgress,

    /// A document lacks a required field or has malformed data.
    #[error(transparent)]
    Mapping(#[from] MapError),

    /// The content source is not usable with the current configuration.
    #[error("content source misconfigured: {0}")]
    Config(String),

    /// Internal error (rendering, filesystem, etc.).
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BlogError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCursor(_) | Self::InvalidPreview(_) => StatusCode::BAD_REQUEST,
            Self::LoadInProgress => StatusCode::CONFLICT,
            Self::Transport(_) | Self::Api { .. } => StatusCode::BAD_GATEWAY,
            Self::Mapping(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Api { .. } | Self::LoadInProgress)
    }

    /// Error page this error is shown with
    pub fn page(&self) -> ErrorPage {
        ErrorPage(match self.status() {
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::CONFLICT => "conflict",
            StatusCode::BAD_GATEWAY => "unavailable",
            _ => "internal",
        })
    }

    fn public_message(&self) -> String {
        match self {
            Self::NotFound(id) => format!("The post \"{id}\" does not exist."),
            Self::InvalidCursor(_) => "The requested page cursor is not valid.".to_string(),
            Self::InvalidPreview(_) => "The preview link is not valid.".to_string(),
            Self::LoadInProgress => "Another page is still loading.".to_string(),
            Self::Transport(_) | Self::Api { .. } => {
                "The content service is temporarily unavailable. Please try again.".to_string()
            }
            Self::Mapping(_) | Self::Config(_) | Self::Internal(_) => {
                "An internal error occurred. Please try again later.".to_string()
            }
        }
    }

    pub(crate) fn log(&self) {
        match self {
            Self::NotFound(_)
            | Self::InvalidCursor(_)
            | Self::InvalidPreview(_)
            | Self::LoadInProgress => {
                tracing::debug!(error = %self, "request failed");
            }
            Self::Transport(_) | Self::Api { .. } => {
                tracing::warn!(error = %self, "content source error");
            }
            _ => tracing::error!(error = %self, "internal server error"),
        }
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let title = match status {
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::CONFLICT => "Conflict",
            StatusCode::BAD_GATEWAY => "Service Unavailable",
            _ => "Internal Error",
        };

        let page = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="robots" content="noindex">
<title>{title}</title>
</head>
<body>
<main class="error-page">
<h1>{title}</h1>
<p>{message}</p>
<a href="/">Back to home</a>
</main>
</body>
</html>
"#,
            title = title,
            message = html_escape(&self.public_message()),
        );

        let mut response = (status, Html(page)).into_response();
        response.extensions_mut().insert(self.page());
        response
    }
}

/// JSON flavored error for the `/api` routes
#[derive(Debug)]
pub struct ApiError(pub BlogError);

impl From<BlogError> for ApiError {
    fn from(err: BlogError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.log();
        let body = serde_json::json!({
            "error": self.0.public_message(),
            "retryable": self.0.is_transient(),
        });
        (self.0.status(), Json(body)).into_response()
    }
}
