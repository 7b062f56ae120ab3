//! Repository tables.
//!
//! Four tables share one parent item type, [`RepoItem`], because a
//! repository reaches us in three shapes: a GraphQL `Repository` node, a
//! REST search hit, or a GraphQL team-repository edge that carries the
//! team's permission next to the node. Every hydrator below matches all
//! three shapes explicitly.
//!
//! The GraphQL selections that cost extra or need scopes the token may not
//! have sit behind `@include(if: $flag)` and are bound from the requested
//! columns through [`REPOSITORY_FLAGS`].

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use octocrab::models::Repository as RestRepository;
use serde::{Deserialize, Serialize};

use super::{GRAPHQL_PAGE_SIZE, Login, Named, REST_PAGE_SIZE, page_variables, split_full_name};
use crate::github::{Connection, GitHubClient, GitHubError, SearchResponse, TokenKind, TotalCount};
use crate::table::{
    ColumnDescriptor as Column, ColumnFlag, ColumnType, GetConfig, HydrateError, IncludeFlags,
    ItemSink, KeyColumn, Page, PageToken, PaginationSummary, QueryContext, TableDescriptor,
    TableError, Value, include_flags, paginate,
};

/// Which include flag serves which columns.
pub const REPOSITORY_FLAGS: &[ColumnFlag] = &[
    ColumnFlag::new(
        "includeViewerPermissions",
        &["your_permission", "can_administer", "can_update_topics"],
    ),
    ColumnFlag::new("includeViewerSubscription", &["subscription", "can_subscribe"]),
    ColumnFlag::new("includeViewerHasStarred", &["has_starred"]),
    ColumnFlag::new(
        "includeViewerPossibleCommitEmails",
        &["possible_commit_emails"],
    ),
    ColumnFlag::new("includeLicense", &["license_spdx_id", "license_name"]),
    ColumnFlag::new("includeTopics", &["topics"]),
    ColumnFlag::new("includeOpenIssues", &["open_issues_total_count"]),
    ColumnFlag::new("includeWatchers", &["watchers_total_count"]),
];

macro_rules! repository_flag_params {
    () => {
        "$includeViewerPermissions: Boolean!, $includeViewerSubscription: Boolean!, \
         $includeViewerHasStarred: Boolean!, $includeViewerPossibleCommitEmails: Boolean!, \
         $includeLicense: Boolean!, $includeTopics: Boolean!, $includeOpenIssues: Boolean!, \
         $includeWatchers: Boolean!"
    };
}

macro_rules! repository_fields {
    () => {
        r#"
      id: databaseId
      nodeId: id
      name
      nameWithOwner
      owner { login }
      description
      url
      homepageUrl
      createdAt
      updatedAt
      pushedAt
      isPrivate
      isArchived
      isFork
      isTemplate
      visibility
      stargazerCount
      forkCount
      diskUsage
      primaryLanguage { name }
      defaultBranchRef { name }
      viewerPermission @include(if: $includeViewerPermissions)
      viewerCanAdminister @include(if: $includeViewerPermissions)
      viewerCanUpdateTopics @include(if: $includeViewerPermissions)
      viewerSubscription @include(if: $includeViewerSubscription)
      viewerCanSubscribe @include(if: $includeViewerSubscription)
      viewerHasStarred @include(if: $includeViewerHasStarred)
      viewerPossibleCommitEmails @include(if: $includeViewerPossibleCommitEmails)
      licenseInfo @include(if: $includeLicense) { spdxId name }
      repositoryTopics(first: 50) @include(if: $includeTopics) { nodes { topic { name } } }
      openIssues: issues(states: OPEN) @include(if: $includeOpenIssues) { totalCount }
      watchers @include(if: $includeWatchers) { totalCount }
"#
    };
}

const REPOSITORY_QUERY: &str = concat!(
    "query Repository($owner: String!, $name: String!, ",
    repository_flag_params!(),
    ") {\n  repository(owner: $owner, name: $name) {",
    repository_fields!(),
    "  }\n}\n"
);

const MY_REPOSITORY_QUERY: &str = concat!(
    "query MyRepositories($pageSize: Int!, $cursor: String, ",
    repository_flag_params!(),
    ") {\n  viewer {\n    repositories(first: $pageSize, after: $cursor, \
     affiliations: [OWNER, COLLABORATOR, ORGANIZATION_MEMBER], \
     ownerAffiliations: [OWNER, COLLABORATOR, ORGANIZATION_MEMBER]) {\n",
    "      totalCount\n      pageInfo { hasNextPage endCursor }\n      nodes {",
    repository_fields!(),
    "      }\n    }\n  }\n}\n"
);

const TEAM_REPOSITORY_QUERY: &str = concat!(
    "query TeamRepositories($organization: String!, $slug: String!, $pageSize: Int!, $cursor: String, ",
    repository_flag_params!(),
    ") {\n  organization(login: $organization) {\n    team(slug: $slug) {\n",
    "      repositories(first: $pageSize, after: $cursor) {\n",
    "        totalCount\n        pageInfo { hasNextPage endCursor }\n",
    "        edges {\n          permission\n          node {",
    repository_fields!(),
    "          }\n        }\n      }\n    }\n  }\n}\n"
);

/// A GraphQL `Repository` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub id: Option<i64>,
    pub node_id: String,
    pub name: String,
    pub name_with_owner: String,
    pub owner: Login,
    pub description: Option<String>,
    pub url: String,
    pub homepage_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub is_private: bool,
    pub is_archived: bool,
    pub is_fork: bool,
    pub is_template: bool,
    pub visibility: Option<String>,
    pub stargazer_count: i64,
    pub fork_count: i64,
    pub disk_usage: Option<i64>,
    pub primary_language: Option<Named>,
    pub default_branch_ref: Option<Named>,
    pub viewer_permission: Option<String>,
    pub viewer_can_administer: Option<bool>,
    pub viewer_can_update_topics: Option<bool>,
    pub viewer_subscription: Option<String>,
    pub viewer_can_subscribe: Option<bool>,
    pub viewer_has_starred: Option<bool>,
    pub viewer_possible_commit_emails: Option<Vec<String>>,
    pub license_info: Option<LicenseInfo>,
    pub repository_topics: Option<Connection<TopicNode>>,
    pub open_issues: Option<TotalCount>,
    pub watchers: Option<TotalCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub spdx_id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicNode {
    pub topic: Named,
}

/// A REST search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRepositoryItem {
    #[serde(flatten)]
    pub repository: RestRepository,
    pub score: Option<f64>,
    /// The search string that produced this hit.
    #[serde(skip_deserializing, default)]
    pub query: String,
}

/// A team-repository edge: the repository plus the team's access to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRepositoryEdge {
    pub permission: String,
    pub node: RepositoryNode,
    #[serde(skip_deserializing, default)]
    pub organization: String,
    #[serde(skip_deserializing, default)]
    pub slug: String,
}

/// Every shape a repository row can be hydrated from.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RepoItem {
    Repository(Box<RepositoryNode>),
    SearchResult(Box<SearchRepositoryItem>),
    TeamRepository(Box<TeamRepositoryEdge>),
}

impl RepoItem {
    /// Shape name plus identity, for error messages.
    pub fn describe(&self) -> String {
        match self {
            RepoItem::Repository(node) => format!("Repository({})", node.name_with_owner),
            RepoItem::SearchResult(hit) => format!(
                "SearchResult({})",
                hit.repository
                    .full_name
                    .as_deref()
                    .unwrap_or(&hit.repository.name)
            ),
            RepoItem::TeamRepository(edge) => {
                format!("TeamRepository({})", edge.node.name_with_owner)
            }
        }
    }
}

/// Evaluate `$graphql` with `$node` bound to the GraphQL node of a
/// `Repository` or `TeamRepository` item, or `$rest` with `$repo` bound to
/// the REST repository of a `SearchResult`.
macro_rules! by_shape {
    ($item:expr, $node:ident => $graphql:expr, $repo:ident => $rest:expr $(,)?) => {
        match $item {
            RepoItem::Repository($node) => $graphql,
            RepoItem::TeamRepository(edge) => {
                let $node = &edge.node;
                $graphql
            }
            RepoItem::SearchResult(hit) => {
                let $repo = &hit.repository;
                $rest
            }
        }
    };
}

/// Viewer-scoped columns exist only on GraphQL nodes; a search hit is
/// rejected.
macro_rules! graphql_only {
    ($item:expr, $column:literal, $node:ident => $graphql:expr $(,)?) => {
        match $item {
            RepoItem::Repository($node) => Ok($graphql),
            RepoItem::TeamRepository(edge) => {
                let $node = &edge.node;
                Ok($graphql)
            }
            RepoItem::SearchResult(_) => Err(HydrateError::unexpected_shape(
                $column,
                "Repository or TeamRepository",
                $item.describe(),
            )),
        }
    };
}

fn hydrate_id(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.id.into(),
        repo => Value::Int(repo.id.0 as i64),
    ))
}

fn hydrate_node_id(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.node_id.as_str().into(),
        repo => repo.node_id.as_ref().into(),
    ))
}

fn hydrate_name(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.name.as_str().into(),
        repo => repo.name.as_str().into(),
    ))
}

fn hydrate_full_name(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.name_with_owner.as_str().into(),
        repo => match (&repo.full_name, &repo.owner) {
            (Some(full_name), _) => full_name.as_str().into(),
            (None, Some(owner)) => format!("{}/{}", owner.login, repo.name).into(),
            (None, None) => Value::Null,
        },
    ))
}

fn hydrate_owner_login(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.owner.login.as_str().into(),
        repo => repo.owner.as_ref().map(|o| o.login.as_str()).into(),
    ))
}

fn hydrate_description(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.description.as_ref().into(),
        repo => repo.description.as_ref().into(),
    ))
}

fn hydrate_url(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.url.as_str().into(),
        repo => repo.html_url.as_ref().map(|u| u.to_string()).into(),
    ))
}

fn hydrate_homepage_url(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.homepage_url.as_ref().into(),
        repo => repo.homepage.as_ref().into(),
    ))
}

fn hydrate_created_at(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item, node => node.created_at.into(), repo => repo.created_at.into()))
}

fn hydrate_updated_at(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item, node => node.updated_at.into(), repo => repo.updated_at.into()))
}

fn hydrate_pushed_at(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item, node => node.pushed_at.into(), repo => repo.pushed_at.into()))
}

fn hydrate_is_private(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item, node => node.is_private.into(), repo => repo.private.into()))
}

fn hydrate_is_archived(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item, node => node.is_archived.into(), repo => repo.archived.into()))
}

fn hydrate_is_fork(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item, node => node.is_fork.into(), repo => repo.fork.into()))
}

fn hydrate_is_template(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item, node => node.is_template.into(), repo => repo.is_template.into()))
}

fn hydrate_visibility(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.visibility.as_ref().into(),
        repo => repo
            .private
            .map(|private| if private { "PRIVATE" } else { "PUBLIC" })
            .into(),
    ))
}

fn hydrate_stargazer_count(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.stargazer_count.into(),
        repo => repo.stargazers_count.into(),
    ))
}

fn hydrate_fork_count(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item, node => node.fork_count.into(), repo => repo.forks_count.into()))
}

fn hydrate_disk_usage(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item, node => node.disk_usage.into(), repo => repo.size.into()))
}

fn hydrate_primary_language(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.primary_language.as_ref().map(|l| l.name.as_str()).into(),
        repo => repo.language.as_ref().and_then(|l| l.as_str()).into(),
    ))
}

fn hydrate_default_branch(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.default_branch_ref.as_ref().map(|b| b.name.as_str()).into(),
        repo => repo.default_branch.as_ref().into(),
    ))
}

fn hydrate_license_spdx_id(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node
            .license_info
            .as_ref()
            .and_then(|l| l.spdx_id.as_ref())
            .into(),
        repo => repo.license.as_ref().map(|l| l.spdx_id.as_str()).into(),
    ))
}

fn hydrate_license_name(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.license_info.as_ref().map(|l| l.name.as_str()).into(),
        repo => repo.license.as_ref().map(|l| l.name.as_str()).into(),
    ))
}

fn hydrate_topics(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node
            .repository_topics
            .as_ref()
            .map(|topics| {
                topics
                    .items
                    .iter()
                    .map(|t| serde_json::Value::from(t.topic.name.as_str()))
                    .collect::<Vec<_>>()
            })
            .map(serde_json::Value::Array)
            .into(),
        repo => repo
            .topics
            .as_ref()
            .map(|topics| serde_json::Value::from(topics.clone()))
            .into(),
    ))
}

fn hydrate_open_issues_total_count(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.open_issues.map(|c| c.total_count).into(),
        repo => repo.open_issues_count.into(),
    ))
}

fn hydrate_watchers_total_count(item: &RepoItem) -> Result<Value, HydrateError> {
    Ok(by_shape!(item,
        node => node.watchers.map(|c| c.total_count).into(),
        repo => repo.watchers_count.into(),
    ))
}

fn hydrate_your_permission(item: &RepoItem) -> Result<Value, HydrateError> {
    graphql_only!(item, "your_permission", node => node.viewer_permission.as_ref().into())
}

fn hydrate_can_administer(item: &RepoItem) -> Result<Value, HydrateError> {
    graphql_only!(item, "can_administer", node => node.viewer_can_administer.into())
}

fn hydrate_can_update_topics(item: &RepoItem) -> Result<Value, HydrateError> {
    graphql_only!(item, "can_update_topics", node => node.viewer_can_update_topics.into())
}

fn hydrate_subscription(item: &RepoItem) -> Result<Value, HydrateError> {
    graphql_only!(item, "subscription", node => node.viewer_subscription.as_ref().into())
}

fn hydrate_can_subscribe(item: &RepoItem) -> Result<Value, HydrateError> {
    graphql_only!(item, "can_subscribe", node => node.viewer_can_subscribe.into())
}

fn hydrate_has_starred(item: &RepoItem) -> Result<Value, HydrateError> {
    graphql_only!(item, "has_starred", node => node.viewer_has_starred.into())
}

fn hydrate_possible_commit_emails(item: &RepoItem) -> Result<Value, HydrateError> {
    graphql_only!(item, "possible_commit_emails", node => node
        .viewer_possible_commit_emails
        .as_ref()
        .map(|emails| serde_json::Value::from(emails.clone()))
        .into())
}

fn hydrate_permission(item: &RepoItem) -> Result<Value, HydrateError> {
    match item {
        RepoItem::TeamRepository(edge) => Ok(edge.permission.as_str().into()),
        RepoItem::Repository(_) | RepoItem::SearchResult(_) => Err(
            HydrateError::unexpected_shape("permission", "TeamRepository", item.describe()),
        ),
    }
}

fn hydrate_organization(item: &RepoItem) -> Result<Value, HydrateError> {
    match item {
        RepoItem::TeamRepository(edge) => Ok(edge.organization.as_str().into()),
        RepoItem::Repository(_) | RepoItem::SearchResult(_) => Err(
            HydrateError::unexpected_shape("organization", "TeamRepository", item.describe()),
        ),
    }
}

fn hydrate_slug(item: &RepoItem) -> Result<Value, HydrateError> {
    match item {
        RepoItem::TeamRepository(edge) => Ok(edge.slug.as_str().into()),
        RepoItem::Repository(_) | RepoItem::SearchResult(_) => Err(
            HydrateError::unexpected_shape("slug", "TeamRepository", item.describe()),
        ),
    }
}

fn hydrate_score(item: &RepoItem) -> Result<Value, HydrateError> {
    match item {
        RepoItem::SearchResult(hit) => Ok(hit.score.map(serde_json::Value::from).into()),
        RepoItem::Repository(_) | RepoItem::TeamRepository(_) => Err(
            HydrateError::unexpected_shape("score", "SearchResult", item.describe()),
        ),
    }
}

fn hydrate_query(item: &RepoItem) -> Result<Value, HydrateError> {
    match item {
        RepoItem::SearchResult(hit) => Ok(hit.query.as_str().into()),
        RepoItem::Repository(_) | RepoItem::TeamRepository(_) => Err(
            HydrateError::unexpected_shape("query", "SearchResult", item.describe()),
        ),
    }
}

/// Columns every repository shape can fill.
fn common_columns() -> Vec<Column<RepoItem>> {
    use ColumnType::*;

    vec![
        Column::hydrate("id", Int, hydrate_id, "The numeric ID of the repository."),
        Column::hydrate("node_id", String, hydrate_node_id, "The GraphQL node ID of the repository."),
        Column::hydrate("name", String, hydrate_name, "The name of the repository."),
        Column::hydrate("full_name", String, hydrate_full_name, "The full name of the repository, including the owner and repo name."),
        Column::hydrate("owner_login", String, hydrate_owner_login, "Login of the repository owner."),
        Column::hydrate("description", String, hydrate_description, "The description of the repository."),
        Column::hydrate("url", String, hydrate_url, "The URL of the repository."),
        Column::hydrate("homepage_url", String, hydrate_homepage_url, "The URL of the repository's homepage."),
        Column::hydrate("created_at", Timestamp, hydrate_created_at, "Timestamp when the repository was created."),
        Column::hydrate("updated_at", Timestamp, hydrate_updated_at, "Timestamp when the repository was last updated."),
        Column::hydrate("pushed_at", Timestamp, hydrate_pushed_at, "Timestamp when the repository was last pushed to."),
        Column::hydrate("is_private", Bool, hydrate_is_private, "If true, the repository is private."),
        Column::hydrate("is_archived", Bool, hydrate_is_archived, "If true, the repository is archived."),
        Column::hydrate("is_fork", Bool, hydrate_is_fork, "If true, the repository is a fork."),
        Column::hydrate("is_template", Bool, hydrate_is_template, "If true, the repository is a template."),
        Column::hydrate("visibility", String, hydrate_visibility, "Visibility of the repository."),
        Column::hydrate("stargazer_count", Int, hydrate_stargazer_count, "Number of stargazers."),
        Column::hydrate("fork_count", Int, hydrate_fork_count, "Number of forks."),
        Column::hydrate("disk_usage", Int, hydrate_disk_usage, "Disk usage in kilobytes."),
        Column::hydrate("primary_language", String, hydrate_primary_language, "The primary language of the repository."),
        Column::hydrate("default_branch", String, hydrate_default_branch, "Name of the default branch."),
        Column::hydrate("license_spdx_id", String, hydrate_license_spdx_id, "SPDX identifier of the license."),
        Column::hydrate("license_name", String, hydrate_license_name, "Name of the license."),
        Column::hydrate("topics", Json, hydrate_topics, "Topics attached to the repository."),
        Column::hydrate("open_issues_total_count", Int, hydrate_open_issues_total_count, "Number of open issues."),
        Column::hydrate("watchers_total_count", Int, hydrate_watchers_total_count, "Number of watchers."),
    ]
}

/// Columns that need a viewer and therefore a GraphQL node.
fn viewer_columns() -> Vec<Column<RepoItem>> {
    use ColumnType::*;

    vec![
        Column::hydrate("your_permission", String, hydrate_your_permission, "Your permission level for the repository."),
        Column::hydrate("can_administer", Bool, hydrate_can_administer, "If true, you can administer this repository."),
        Column::hydrate("can_update_topics", Bool, hydrate_can_update_topics, "If true, you can update topics on this repository."),
        Column::hydrate("subscription", String, hydrate_subscription, "Your watch/subscription status for this repository."),
        Column::hydrate("can_subscribe", Bool, hydrate_can_subscribe, "If true, you can subscribe to this repository."),
        Column::hydrate("has_starred", Bool, hydrate_has_starred, "If true, you have starred this repository."),
        Column::hydrate("possible_commit_emails", Json, hydrate_possible_commit_emails, "Emails you may author commits with in this repository."),
    ]
}

/// Include flags for one list call, after credential overrides.
fn repository_include_flags(client: &GitHubClient, ctx: &QueryContext) -> IncludeFlags {
    let mut flags = include_flags(REPOSITORY_FLAGS, ctx);
    apply_credential_overrides(&mut flags, client.token_kind());
    flags
}

/// The one place a flag ignores the requested columns.
///
/// A GitHub App installation token (`ghs_`) acts as the app, not as a
/// user, and GitHub answers `viewerPossibleCommitEmails` for it with a
/// field error that fails the whole page. The sub-selection is dropped for
/// those tokens and `possible_commit_emails` comes back null. The prefix is
/// GitHub's current convention and may change; only this flag is affected.
pub fn apply_credential_overrides(flags: &mut IncludeFlags, token_kind: TokenKind) {
    if !token_kind.has_viewer() && flags.get("includeViewerPossibleCommitEmails") {
        tracing::debug!(
            ?token_kind,
            "token has no viewer, not requesting possible commit emails"
        );
        flags.force_off("includeViewerPossibleCommitEmails");
    }
}

#[derive(Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryNode>,
}

async fn fetch_repository(
    client: &GitHubClient,
    ctx: &QueryContext,
    flags: &IncludeFlags,
) -> Result<RepositoryNode, TableError> {
    let full_name = ctx.require_eq("github_repository", "full_name")?;
    let (owner, name) = split_full_name("full_name", full_name)?;

    let mut variables = serde_json::Map::new();
    variables.insert("owner".into(), owner.into());
    variables.insert("name".into(), name.into());
    flags.write_variables(&mut variables);

    let data: RepositoryData = client.graphql(REPOSITORY_QUERY, &variables).await?;
    data.repository
        .ok_or_else(|| GitHubError::not_found(full_name).into())
}

fn list_repository<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<RepoItem> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        let flags = repository_include_flags(client, ctx);
        paginate(sink, 1, PageToken::first_cursor(), |_, _| {
            let flags = &flags;
            async move {
                let node = fetch_repository(client, ctx, flags).await?;
                Ok::<_, TableError>(Page::last(vec![RepoItem::Repository(Box::new(node))]))
            }
        })
        .await
    }
    .boxed()
}

fn get_repository<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
) -> BoxFuture<'a, Result<Option<RepoItem>, TableError>> {
    async move {
        let flags = repository_include_flags(client, ctx);
        let node = fetch_repository(client, ctx, &flags).await?;
        Ok(Some(RepoItem::Repository(Box::new(node))))
    }
    .boxed()
}

#[derive(Deserialize)]
struct ViewerRepositoriesData {
    viewer: ViewerRepositories,
}

#[derive(Deserialize)]
struct ViewerRepositories {
    repositories: Connection<RepositoryNode>,
}

fn list_my_repositories<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<RepoItem> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        let flags = repository_include_flags(client, ctx);
        paginate(sink, GRAPHQL_PAGE_SIZE, PageToken::first_cursor(), |page_size, token| {
            let mut variables = page_variables(page_size, &token);
            flags.write_variables(&mut variables);
            async move {
                let data: ViewerRepositoriesData =
                    client.graphql(MY_REPOSITORY_QUERY, &variables).await?;
                let repositories = data.viewer.repositories;
                Ok::<_, TableError>(Page::new(
                    repositories
                        .items
                        .into_iter()
                        .map(|node| RepoItem::Repository(Box::new(node)))
                        .collect(),
                    repositories.page_info.next_token(),
                ))
            }
        })
        .await
    }
    .boxed()
}

#[derive(Deserialize)]
struct TeamRepositoriesData {
    organization: Option<TeamOrganization>,
}

#[derive(Deserialize)]
struct TeamOrganization {
    team: Option<TeamRepositories>,
}

#[derive(Deserialize)]
struct TeamRepositories {
    repositories: Connection<TeamRepositoryEdge>,
}

fn list_team_repositories<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<RepoItem> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        let organization = ctx.require_eq("github_team_repository", "organization")?;
        let slug = ctx.require_eq("github_team_repository", "slug")?;
        let flags = repository_include_flags(client, ctx);

        paginate(sink, GRAPHQL_PAGE_SIZE, PageToken::first_cursor(), |page_size, token| {
            let mut variables = page_variables(page_size, &token);
            variables.insert("organization".into(), organization.into());
            variables.insert("slug".into(), slug.into());
            flags.write_variables(&mut variables);
            async move {
                let data: TeamRepositoriesData =
                    client.graphql(TEAM_REPOSITORY_QUERY, &variables).await?;
                let repositories = data
                    .organization
                    .and_then(|org| org.team)
                    .ok_or_else(|| GitHubError::not_found(format!("team {organization}/{slug}")))?
                    .repositories;

                Ok::<_, TableError>(Page::new(
                    repositories
                        .items
                        .into_iter()
                        .map(|mut edge| {
                            edge.organization = organization.to_string();
                            edge.slug = slug.to_string();
                            RepoItem::TeamRepository(Box::new(edge))
                        })
                        .collect(),
                    repositories.page_info.next_token(),
                ))
            }
        })
        .await
    }
    .boxed()
}

fn list_search_repositories<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<RepoItem> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        let query = ctx.require_eq("github_search_repository", "query")?;

        paginate(sink, REST_PAGE_SIZE, PageToken::first_page(), |per_page, token| async move {
            let page = client
                .get_page::<SearchResponse<SearchRepositoryItem>>(
                    &["search", "repositories"],
                    &[("q", query)],
                    token.page_number(),
                    per_page,
                )
                .await?;
            let next = page.next_token();
            if page.data.incomplete_results {
                tracing::debug!(query, "search results are incomplete");
            }

            Ok::<_, TableError>(Page::new(
                page.data
                    .items
                    .into_iter()
                    .map(|mut hit| {
                        hit.query = query.to_string();
                        RepoItem::SearchResult(Box::new(hit))
                    })
                    .collect(),
                next,
            ))
        })
        .await
    }
    .boxed()
}

const FULL_NAME_KEY: &[KeyColumn] = &[KeyColumn::required("full_name")];
const TEAM_KEYS: &[KeyColumn] = &[KeyColumn::required("organization"), KeyColumn::required("slug")];
const SEARCH_KEYS: &[KeyColumn] = &[KeyColumn::required("query")];

pub fn repository_table() -> TableDescriptor<RepoItem> {
    let mut columns = common_columns();
    columns.extend(viewer_columns());

    TableDescriptor {
        name: "github_repository",
        description: "GitHub repositories contain all of your project's files and each file's revision history.",
        list: list_repository,
        list_keys: FULL_NAME_KEY,
        get: Some(GetConfig::new(FULL_NAME_KEY, get_repository)),
        columns,
    }
}

pub fn my_repository_table() -> TableDescriptor<RepoItem> {
    let mut columns = common_columns();
    columns.extend(viewer_columns());

    TableDescriptor {
        name: "github_my_repository",
        description: "Repositories that you own, collaborate on, or reach through organization membership.",
        list: list_my_repositories,
        list_keys: &[],
        get: None,
        columns,
    }
}

pub fn team_repository_table() -> TableDescriptor<RepoItem> {
    use ColumnType::String;

    let mut columns = vec![
        Column::hydrate("organization", String, hydrate_organization, "The organization the team belongs to."),
        Column::hydrate("slug", String, hydrate_slug, "The team slug name."),
        Column::hydrate("permission", String, hydrate_permission, "The permission level the team has on the repository."),
    ];
    columns.extend(common_columns());
    columns.extend(viewer_columns());

    TableDescriptor {
        name: "github_team_repository",
        description: "GitHub repositories accessible to teams you belong to.",
        list: list_team_repositories,
        list_keys: TEAM_KEYS,
        get: None,
        columns,
    }
}

pub fn search_repository_table() -> TableDescriptor<RepoItem> {
    use ColumnType::{Json, String};

    let mut columns = vec![
        Column::hydrate("query", String, hydrate_query, "The search string, in GitHub search syntax."),
        Column::hydrate("score", Json, hydrate_score, "Relevance score of the hit."),
    ];
    columns.extend(common_columns());

    TableDescriptor {
        name: "github_search_repository",
        description: "Find repositories via various criteria.",
        list: list_search_repositories,
        list_keys: SEARCH_KEYS,
        get: None,
        columns,
    }
}
