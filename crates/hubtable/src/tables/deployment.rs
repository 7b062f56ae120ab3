//! `github_repository_deployment`: deployments of one repository.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::{GRAPHQL_PAGE_SIZE, Login, page_variables, split_full_name};
use crate::github::{Connection, GitHubClient, GitHubError};
use crate::table::{
    ColumnDescriptor as Column, ColumnFlag, ColumnType, HydrateError, ItemSink, KeyColumn, Page,
    PageToken, PaginationSummary, QueryContext, TableDescriptor, TableError, Value, include_flags,
    paginate,
};

const TABLE: &str = "github_repository_deployment";

pub const DEPLOYMENT_FLAGS: &[ColumnFlag] = &[
    ColumnFlag::new("includeDeploymentCreator", &["creator_login"]),
    ColumnFlag::new(
        "includeDeploymentLatestStatus",
        &[
            "latest_status_state",
            "latest_status_description",
            "latest_status_log_url",
            "latest_status_environment_url",
            "latest_status_created_at",
        ],
    ),
];

const DEPLOYMENTS_QUERY: &str = r#"query Deployments($owner: String!, $name: String!, $pageSize: Int!, $cursor: String, $includeDeploymentCreator: Boolean!, $includeDeploymentLatestStatus: Boolean!) {
  repository(owner: $owner, name: $name) {
    deployments(first: $pageSize, after: $cursor, orderBy: {field: CREATED_AT, direction: DESC}) {
      totalCount
      pageInfo { hasNextPage endCursor }
      nodes {
        id: databaseId
        nodeId: id
        commitOid
        environment
        originalEnvironment
        description
        task
        state
        payload
        createdAt
        updatedAt
        creator @include(if: $includeDeploymentCreator) { login }
        latestStatus @include(if: $includeDeploymentLatestStatus) {
          state
          description
          logUrl
          environmentUrl
          createdAt
        }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    #[serde(skip_deserializing, default)]
    pub repository_full_name: String,
    pub id: Option<i64>,
    pub node_id: String,
    pub commit_oid: Option<String>,
    pub environment: Option<String>,
    pub original_environment: Option<String>,
    pub description: Option<String>,
    pub task: Option<String>,
    pub state: Option<String>,
    pub payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator: Option<Login>,
    pub latest_status: Option<DeploymentStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    pub state: String,
    pub description: Option<String>,
    pub log_url: Option<String>,
    pub environment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `payload` is a JSON document GitHub hands back as a string.
fn hydrate_payload(deployment: &Deployment) -> Result<Value, HydrateError> {
    let Some(payload) = deployment.payload.as_deref() else {
        return Ok(Value::Null);
    };
    Ok(match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(json) => json.into(),
        Err(_) => Value::Json(serde_json::Value::String(payload.to_string())),
    })
}

#[derive(Deserialize)]
struct DeploymentsData {
    repository: Option<RepositoryDeployments>,
}

#[derive(Deserialize)]
struct RepositoryDeployments {
    deployments: Connection<Deployment>,
}

fn list_deployments<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<Deployment> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        let full_name = ctx.require_eq(TABLE, "repository_full_name")?;
        let (owner, name) = split_full_name("repository_full_name", full_name)?;
        let flags = include_flags(DEPLOYMENT_FLAGS, ctx);

        let mut base = Map::new();
        base.insert("owner".into(), owner.into());
        base.insert("name".into(), name.into());
        flags.write_variables(&mut base);

        paginate(sink, GRAPHQL_PAGE_SIZE, PageToken::first_cursor(), |page_size, token| {
            let mut variables = base.clone();
            variables.extend(page_variables(page_size, &token));
            async move {
                let data: DeploymentsData = client.graphql(DEPLOYMENTS_QUERY, &variables).await?;
                let deployments = data
                    .repository
                    .ok_or_else(|| GitHubError::not_found(full_name))?
                    .deployments;

                Ok::<_, TableError>(Page::new(
                    deployments
                        .items
                        .into_iter()
                        .map(|mut deployment| {
                            deployment.repository_full_name = full_name.to_string();
                            deployment
                        })
                        .collect(),
                    deployments.page_info.next_token(),
                ))
            }
        })
        .await
    }
    .boxed()
}

const LIST_KEYS: &[KeyColumn] = &[KeyColumn::required("repository_full_name")];

pub fn deployment_table() -> TableDescriptor<Deployment> {
    use ColumnType::*;

    TableDescriptor {
        name: TABLE,
        description: "GitHub Deployments are requests to deploy a specific ref (branch, SHA, tag).",
        list: list_deployments,
        list_keys: LIST_KEYS,
        get: None,
        columns: vec![
            Column::field("repository_full_name", String, "/repositoryFullName", "The full name of the repository (login/repo-name)."),
            Column::field("id", Int, "/id", "The ID of the deployment."),
            Column::field("node_id", String, "/nodeId", "The node ID of the deployment."),
            Column::field("sha", String, "/commitOid", "SHA of the commit the deployment is using."),
            Column::field("environment", String, "/environment", "The name of the environment to which the deployment was made."),
            Column::field("original_environment", String, "/originalEnvironment", "The original environment to which this deployment was made."),
            Column::field("description", String, "/description", "The description of the deployment."),
            Column::field("task", String, "/task", "The task of the deployment."),
            Column::field("state", String, "/state", "The current state of the deployment."),
            Column::hydrate("payload", Json, hydrate_payload, "Extra information that a deployment system might need."),
            Column::field("created_at", Timestamp, "/createdAt", "Timestamp when the deployment was created."),
            Column::field("updated_at", Timestamp, "/updatedAt", "Timestamp when the deployment was last updated."),
            Column::field("creator_login", String, "/creator/login", "The login of the actor who triggered the deployment."),
            Column::field("latest_status_state", String, "/latestStatus/state", "State of the latest deployment status."),
            Column::field("latest_status_description", String, "/latestStatus/description", "Description of the latest deployment status."),
            Column::field("latest_status_log_url", String, "/latestStatus/logUrl", "Log URL of the latest deployment status."),
            Column::field("latest_status_environment_url", String, "/latestStatus/environmentUrl", "Environment URL of the latest deployment status."),
            Column::field("latest_status_created_at", Timestamp, "/latestStatus/createdAt", "Timestamp of the latest deployment status."),
        ],
    }
}
