//! `github_issue`: issues of one repository.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use super::{GRAPHQL_PAGE_SIZE, Login, Named, page_variables, split_full_name};
use crate::github::{Connection, GitHubClient, GitHubError, TotalCount};
use crate::table::{
    ColumnDescriptor as Column, ColumnFlag, ColumnType, GetConfig, HydrateError, IncludeFlags,
    ItemSink, KeyColumn, Page, PageToken, PaginationSummary, QueryContext, TableDescriptor,
    TableError, Transform, Value, include_flags, paginate,
};

const TABLE: &str = "github_issue";

pub const ISSUE_FLAGS: &[ColumnFlag] = &[
    ColumnFlag::new("includeIssueAuthor", &["author_login"]),
    ColumnFlag::new("includeIssueAssignees", &["assignees_total_count", "assignee_logins"]),
    ColumnFlag::new("includeIssueLabels", &["labels_total_count", "labels"]),
    ColumnFlag::new("includeIssueComments", &["comments_total_count"]),
    ColumnFlag::new("includeIssueBody", &["body"]),
    ColumnFlag::new(
        "includeIssueViewer",
        &["user_can_update", "user_can_react", "user_did_author"],
    ),
];

macro_rules! issue_flag_params {
    () => {
        "$includeIssueAuthor: Boolean!, $includeIssueAssignees: Boolean!, \
         $includeIssueLabels: Boolean!, $includeIssueComments: Boolean!, \
         $includeIssueBody: Boolean!, $includeIssueViewer: Boolean!"
    };
}

macro_rules! issue_fields {
    () => {
        r#"
      id: databaseId
      nodeId: id
      number
      title
      state
      stateReason
      url
      createdAt
      updatedAt
      closedAt
      locked
      author @include(if: $includeIssueAuthor) { login }
      assignees(first: 30) @include(if: $includeIssueAssignees) { totalCount nodes { login } }
      labels(first: 100) @include(if: $includeIssueLabels) { totalCount nodes { name } }
      comments @include(if: $includeIssueComments) { totalCount }
      body @include(if: $includeIssueBody)
      viewerCanUpdate @include(if: $includeIssueViewer)
      viewerCanReact @include(if: $includeIssueViewer)
      viewerDidAuthor @include(if: $includeIssueViewer)
"#
    };
}

const ISSUES_QUERY: &str = concat!(
    "query Issues($owner: String!, $name: String!, $pageSize: Int!, $cursor: String, $states: [IssueState!], ",
    issue_flag_params!(),
    ") {\n  repository(owner: $owner, name: $name) {\n",
    "    issues(first: $pageSize, after: $cursor, states: $states, orderBy: {field: CREATED_AT, direction: DESC}) {\n",
    "      totalCount\n      pageInfo { hasNextPage endCursor }\n      nodes {",
    issue_fields!(),
    "      }\n    }\n  }\n}\n"
);

const ISSUE_QUERY: &str = concat!(
    "query Issue($owner: String!, $name: String!, $number: Int!, ",
    issue_flag_params!(),
    ") {\n  repository(owner: $owner, name: $name) {\n    issue(number: $number) {",
    issue_fields!(),
    "    }\n  }\n}\n"
);

/// A GraphQL `Issue` node, tagged with the repository it was listed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(skip_deserializing, default)]
    pub repository_full_name: String,
    pub id: Option<i64>,
    pub node_id: String,
    pub number: i64,
    pub title: String,
    pub state: String,
    pub state_reason: Option<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub locked: bool,
    pub author: Option<Login>,
    pub assignees: Option<Connection<Login>>,
    pub labels: Option<Connection<Named>>,
    pub comments: Option<TotalCount>,
    pub body: Option<String>,
    pub viewer_can_update: Option<bool>,
    pub viewer_can_react: Option<bool>,
    pub viewer_did_author: Option<bool>,
}

fn hydrate_assignee_logins(issue: &Issue) -> Result<Value, HydrateError> {
    Ok(issue
        .assignees
        .as_ref()
        .map(|assignees| {
            Json::Array(
                assignees
                    .items
                    .iter()
                    .map(|a| Json::from(a.login.as_str()))
                    .collect(),
            )
        })
        .into())
}

fn hydrate_labels(issue: &Issue) -> Result<Value, HydrateError> {
    Ok(issue
        .labels
        .as_ref()
        .map(|labels| {
            Json::Array(
                labels
                    .items
                    .iter()
                    .map(|l| Json::from(l.name.as_str()))
                    .collect(),
            )
        })
        .into())
}

/// `state` qualifier values accepted by the `states` argument.
fn parse_state(value: &str) -> Result<&'static str, TableError> {
    match value.to_ascii_uppercase().as_str() {
        "OPEN" => Ok("OPEN"),
        "CLOSED" => Ok("CLOSED"),
        _ => Err(TableError::invalid_qualifier(
            "state",
            format!("expected OPEN or CLOSED, got {value:?}"),
        )),
    }
}

fn repository_variables<'c>(
    ctx: &'c QueryContext,
    flags: &IncludeFlags,
) -> Result<(&'c str, Map<String, Json>), TableError> {
    let full_name = ctx.require_eq(TABLE, "repository_full_name")?;
    let (owner, name) = split_full_name("repository_full_name", full_name)?;

    let mut variables = Map::new();
    variables.insert("owner".into(), owner.into());
    variables.insert("name".into(), name.into());
    flags.write_variables(&mut variables);
    Ok((full_name, variables))
}

#[derive(Deserialize)]
struct IssuesData {
    repository: Option<RepositoryIssues>,
}

#[derive(Deserialize)]
struct RepositoryIssues {
    issues: Connection<Issue>,
}

fn list_issues<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<Issue> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        let flags = include_flags(ISSUE_FLAGS, ctx);
        let (full_name, mut base) = repository_variables(ctx, &flags)?;
        let states = match ctx.quals().equals("state") {
            Some(state) => Json::from(vec![parse_state(state)?]),
            None => Json::Null,
        };
        base.insert("states".into(), states);

        paginate(sink, GRAPHQL_PAGE_SIZE, PageToken::first_cursor(), |page_size, token| {
            let mut variables = base.clone();
            variables.extend(page_variables(page_size, &token));
            async move {
                let data: IssuesData = client.graphql(ISSUES_QUERY, &variables).await?;
                let issues = data
                    .repository
                    .ok_or_else(|| GitHubError::not_found(full_name))?
                    .issues;

                Ok::<_, TableError>(Page::new(
                    issues
                        .items
                        .into_iter()
                        .map(|mut issue| {
                            issue.repository_full_name = full_name.to_string();
                            issue
                        })
                        .collect(),
                    issues.page_info.next_token(),
                ))
            }
        })
        .await
    }
    .boxed()
}

#[derive(Deserialize)]
struct IssueData {
    repository: Option<RepositoryIssue>,
}

#[derive(Deserialize)]
struct RepositoryIssue {
    issue: Option<Issue>,
}

fn get_issue<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
) -> BoxFuture<'a, Result<Option<Issue>, TableError>> {
    async move {
        let flags = include_flags(ISSUE_FLAGS, ctx);
        let (full_name, mut variables) = repository_variables(ctx, &flags)?;
        let number = ctx.require_eq(TABLE, "number")?;
        let number: i64 = number.parse().map_err(|_| {
            TableError::invalid_qualifier("number", format!("expected an integer, got {number:?}"))
        })?;
        variables.insert("number".into(), number.into());

        let data: IssueData = client.graphql(ISSUE_QUERY, &variables).await?;
        let repository = data
            .repository
            .ok_or_else(|| GitHubError::not_found(full_name))?;

        Ok(repository.issue.map(|mut issue| {
            issue.repository_full_name = full_name.to_string();
            issue
        }))
    }
    .boxed()
}

const LIST_KEYS: &[KeyColumn] = &[
    KeyColumn::required("repository_full_name"),
    KeyColumn::optional("state"),
];

const GET_KEYS: &[KeyColumn] = &[
    KeyColumn::required("repository_full_name"),
    KeyColumn::required("number"),
];

pub fn issue_table() -> TableDescriptor<Issue> {
    use ColumnType::*;

    TableDescriptor {
        name: TABLE,
        description: "GitHub Issues are used to track ideas, enhancements, tasks, or bugs for work on GitHub.",
        list: list_issues,
        list_keys: LIST_KEYS,
        get: Some(GetConfig::new(GET_KEYS, get_issue)),
        columns: vec![
            Column::field("repository_full_name", String, "/repositoryFullName", "The full name of the repository (login/repo-name)."),
            Column::field("number", Int, "/number", "The issue number."),
            Column::field("id", Int, "/id", "The ID of the issue."),
            Column::field("node_id", String, "/nodeId", "The node ID of the issue."),
            Column::field("title", String, "/title", "The title of the issue."),
            Column::field("state", String, "/state", "The state of the issue (OPEN or CLOSED)."),
            Column::field("state_reason", String, "/stateReason", "The reason for the issue state."),
            Column::field("url", String, "/url", "URL for the issue."),
            Column::field("created_at", Timestamp, "/createdAt", "Timestamp when the issue was created."),
            Column::field("updated_at", Timestamp, "/updatedAt", "Timestamp when the issue was last updated."),
            Column::field("closed_at", Timestamp, "/closedAt", "Timestamp when the issue was closed."),
            Column::field("locked", Bool, "/locked", "If true, the issue is locked."),
            Column::field("author_login", String, "/author/login", "The login of the issue author."),
            Column::field("assignees_total_count", Int, "/assignees/totalCount", "Count of assignees on the issue."),
            Column::hydrate("assignee_logins", Json, hydrate_assignee_logins, "Logins of the users assigned to the issue.")
                .transform(Transform::NullIfEmpty),
            Column::field("labels_total_count", Int, "/labels/totalCount", "Count of labels on the issue."),
            Column::hydrate("labels", Json, hydrate_labels, "Names of the labels attached to the issue."),
            Column::field("comments_total_count", Int, "/comments/totalCount", "Count of comments on the issue."),
            Column::field("body", String, "/body", "The contents of the issue.")
                .transform(Transform::NullIfEmpty),
            Column::field("user_can_update", Bool, "/viewerCanUpdate", "If true, you can update this issue."),
            Column::field("user_can_react", Bool, "/viewerCanReact", "If true, you can react to this issue."),
            Column::field("user_did_author", Bool, "/viewerDidAuthor", "If true, you authored this issue."),
        ],
    }
}
