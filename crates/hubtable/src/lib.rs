//! Hubtable - GitHub resources as queryable tables.
//!
//! Each table lists parent items from the GitHub REST or GraphQL API and
//! hydrates them into rows of typed columns. Scans are column-pruned: the
//! requested columns decide which optional GraphQL sub-selections are
//! fetched at all.
//!
//! # Example
//!
//! ```ignore
//! use hubtable::github::{ClientOptions, GitHubClient};
//! use hubtable::table::{QueryContext, Row};
//!
//! let client = GitHubClient::new(&token, ClientOptions::default())?;
//! let table = hubtable::tables::find("github_issue")?;
//!
//! let ctx = QueryContext::new()
//!     .with_columns(["number", "title", "author_login"])
//!     .with_eq("repository_full_name", "rust-lang/rust")
//!     .with_limit(Some(20));
//!
//! let mut rows: Vec<Row> = Vec::new();
//! table.scan(&client, &ctx, &mut rows).await?;
//! ```

pub mod github;
pub mod http;
pub mod rate_limit;
pub mod retry;
pub mod table;
pub mod tables;

pub use github::{ClientOptions, GitHubClient, GitHubError};
pub use table::{QueryContext, Row, Table, TableError, Value};
