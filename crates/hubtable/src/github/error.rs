//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::graphql::GraphQlError;
use crate::http::HttpError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitHub API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("GraphQL error: {}", join_messages(.0))]
    GraphQl(Vec<GraphQlError>),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl GitHubError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Rate limits, transport failures and 5xx responses are worth another
    /// attempt; everything else fails the call immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Http(HttpError::Transport(_)) => true,
            Self::Status { status, .. } => (500..600).contains(status),
            Self::Http(HttpError::NoMockResponse { .. })
            | Self::AuthRequired
            | Self::NotFound(_)
            | Self::GraphQl(_)
            | Self::Decode(_) => false,
        }
    }
}

/// First line of an error's display form, for log lines.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}
