//! GitHub API client.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitHub API operations
//! - [`client`] - REST and GraphQL calls, retries and pacing
//! - [`graphql`] - GraphQL envelope and connection types
//! - [`types`] - REST payloads shared by several tables
//! - [`token`] - Token kind detection

mod client;
mod error;
pub mod graphql;
mod token;
mod types;

pub use client::{
    ClientOptions, DEFAULT_API_URL, GitHubClient, RestPage, next_page_link,
};
pub use error::{GitHubError, short_error_message};
pub use graphql::{Connection, GraphQlError, PageInfo, TotalCount};
pub use token::TokenKind;
pub use types::{GitHubRateLimitResponse, RateLimitResource, SearchResponse};
