//! Storefront error type.
//!
//! Validation problems never show up here; the wizard keeps those and the
//! step templates render them. [`AppError`] covers what is left: requests
//! for things that don't exist, and server-side failures, which are
//! reported to Sentry before the response goes out.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::checkout::validation::UnknownField;

/// Errors returned by route handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Loading or saving the session failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The session was saved but has no id to key follow-up work on.
    #[error("Session has no id after saving")]
    MissingSessionId,

    /// A request named a checkout field that doesn't exist.
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) | Self::MissingSessionId => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnknownField(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Request failed");
            return (status, "Something went wrong. Please try again.").into_response();
        }

        tracing::debug!(error = %self, "Rejected request");
        (status, self.to_string()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Record a checkout milestone as a Sentry breadcrumb.
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Entered payment step", Some(&[("product_id", "1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let data = data
        .unwrap_or_default()
        .iter()
        .map(|&(key, value)| (key.to_owned(), serde_json::Value::from(value)))
        .collect();

    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        data,
        ..Default::default()
    });
}
