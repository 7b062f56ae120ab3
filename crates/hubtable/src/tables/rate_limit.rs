//! `github_rate_limit`: the caller's quota, one row per API resource.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::github::{GitHubClient, GitHubRateLimitResponse};
use crate::table::{
    ColumnDescriptor as Column, ColumnType, ItemSink, Page, PageToken, PaginationSummary,
    QueryContext, TableDescriptor, TableError, paginate,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitRow {
    pub resource: String,
    pub limit: usize,
    pub used: usize,
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

fn list_rate_limits<'a>(
    client: &'a GitHubClient,
    _ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<RateLimitRow> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        // /rate_limit does not count against the quota it reports.
        paginate(sink, 1, PageToken::first_page(), |_, _| async move {
            let response: GitHubRateLimitResponse = client.get_json(&["rate_limit"]).await?;
            let rows = response
                .resources
                .into_iter()
                .map(|(resource, quota)| RateLimitRow {
                    reset_at: quota.reset_at(),
                    resource,
                    limit: quota.limit,
                    used: quota.used,
                    remaining: quota.remaining,
                })
                .collect();
            Ok::<_, TableError>(Page::last(rows))
        })
        .await
    }
    .boxed()
}

pub fn rate_limit_table() -> TableDescriptor<RateLimitRow> {
    use ColumnType::*;

    TableDescriptor {
        name: "github_rate_limit",
        description: "Rate limit of the authenticated credential, per API resource.",
        list: list_rate_limits,
        list_keys: &[],
        get: None,
        columns: vec![
            Column::field("resource", String, "/resource", "The API resource the quota applies to (core, search, graphql, ...)."),
            Column::field("limit", Int, "/limit", "Number of requests allowed per window."),
            Column::field("used", Int, "/used", "Number of requests used in the current window."),
            Column::field("remaining", Int, "/remaining", "Number of requests remaining in the current window."),
            Column::field("reset_at", Timestamp, "/reset_at", "Time at which the current window resets."),
        ],
    }
}
