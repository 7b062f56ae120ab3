//! `github_stargazer`: users who starred a repository, with the time they
//! did so. The star time lives on the connection edge, not the user node.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::{GRAPHQL_PAGE_SIZE, page_variables, split_full_name};
use crate::github::{Connection, GitHubClient, GitHubError};
use crate::table::{
    ColumnDescriptor as Column, ColumnType, ItemSink, KeyColumn, Page, PageToken,
    PaginationSummary, QueryContext, TableDescriptor, TableError, Transform, paginate,
};

const TABLE: &str = "github_stargazer";

const STARGAZERS_QUERY: &str = r#"query Stargazers($owner: String!, $name: String!, $pageSize: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    stargazers(first: $pageSize, after: $cursor, orderBy: {field: STARRED_AT, direction: ASC}) {
      totalCount
      pageInfo { hasNextPage endCursor }
      edges {
        starredAt
        node {
          id: databaseId
          nodeId: id
          login
          name
          company
          url
        }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StargazerEdge {
    #[serde(skip_deserializing, default)]
    pub repository_full_name: String,
    pub starred_at: DateTime<Utc>,
    pub node: Stargazer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stargazer {
    pub id: Option<i64>,
    pub node_id: String,
    pub login: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub url: String,
}

#[derive(Deserialize)]
struct StargazersData {
    repository: Option<RepositoryStargazers>,
}

#[derive(Deserialize)]
struct RepositoryStargazers {
    stargazers: Connection<StargazerEdge>,
}

fn list_stargazers<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<StargazerEdge> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        let full_name = ctx.require_eq(TABLE, "repository_full_name")?;
        let (owner, name) = split_full_name("repository_full_name", full_name)?;

        paginate(sink, GRAPHQL_PAGE_SIZE, PageToken::first_cursor(), |page_size, token| {
            let mut variables = Map::new();
            variables.insert("owner".into(), owner.into());
            variables.insert("name".into(), name.into());
            variables.extend(page_variables(page_size, &token));
            async move {
                let data: StargazersData = client.graphql(STARGAZERS_QUERY, &variables).await?;
                let stargazers = data
                    .repository
                    .ok_or_else(|| GitHubError::not_found(full_name))?
                    .stargazers;

                Ok::<_, TableError>(Page::new(
                    stargazers
                        .items
                        .into_iter()
                        .map(|mut edge| {
                            edge.repository_full_name = full_name.to_string();
                            edge
                        })
                        .collect(),
                    stargazers.page_info.next_token(),
                ))
            }
        })
        .await
    }
    .boxed()
}

const LIST_KEYS: &[KeyColumn] = &[KeyColumn::required("repository_full_name")];

pub fn stargazer_table() -> TableDescriptor<StargazerEdge> {
    use ColumnType::*;

    TableDescriptor {
        name: TABLE,
        description: "Stargazers are users who have starred the repository.",
        list: list_stargazers,
        list_keys: LIST_KEYS,
        get: None,
        columns: vec![
            Column::field("repository_full_name", String, "/repositoryFullName", "Full name of the repository that contains the stargazer."),
            Column::field("starred_at", Timestamp, "/starredAt", "Time when the stargazer was created."),
            Column::field("user_login", String, "/node/login", "The login name of the user."),
            Column::field("user_id", Int, "/node/id", "The ID of the user."),
            Column::field("user_node_id", String, "/node/nodeId", "The node ID of the user."),
            Column::field("user_name", String, "/node/name", "The name of the user.")
                .transform(Transform::NullIfEmpty),
            Column::field("user_company", String, "/node/company", "The company of the user.")
                .transform(Transform::NullIfEmpty),
            Column::field("user_url", String, "/node/url", "The URL of the user's GitHub profile."),
        ],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::MockTransport;
    use crate::table::{Row, Table, Value};
    use crate::tables::test_support::{client, push_graphql, variables};

    fn edge(login: &str, starred_at: &str) -> serde_json::Value {
        json!({
            "starredAt": starred_at,
            "node": {
                "id": 583231,
                "nodeId": "MDQ6VXNlcjU4MzIzMQ==",
                "login": login,
                "name": "",
                "company": "@github",
                "url": format!("https://github.com/{login}")
            }
        })
    }

    #[tokio::test]
    async fn test_stargazers_carry_star_time_and_user() {
        let mock = MockTransport::new();
        push_graphql(
            &mock,
            json!({"repository": {"stargazers": {
                "totalCount": 2,
                "pageInfo": {"hasNextPage": true, "endCursor": "s1"},
                "edges": [edge("octocat", "2021-03-04T05:06:07Z")]
            }}}),
        );
        push_graphql(
            &mock,
            json!({"repository": {"stargazers": {
                "totalCount": 2,
                "pageInfo": {"hasNextPage": false, "endCursor": "s2"},
                "edges": [edge("hubot", "2022-01-01T00:00:00Z")]
            }}}),
        );

        let ctx = QueryContext::new().with_eq("repository_full_name", "turbot/steampipe");
        let mut rows: Vec<Row> = Vec::new();
        let summary = stargazer_table()
            .scan(&client(&mock), &ctx, &mut rows)
            .await
            .unwrap();

        assert_eq!(summary.pages, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("user_login"), Some(&Value::from("octocat")));
        assert_eq!(rows[1].get("user_login"), Some(&Value::from("hubot")));
        assert_eq!(
            rows[0].get("starred_at").map(Value::to_display_string),
            Some("2021-03-04T05:06:07Z".to_string())
        );
        assert_eq!(rows[0].get("user_name"), Some(&Value::Null));
        assert_eq!(rows[0].get("user_id"), Some(&Value::Int(583231)));
        assert_eq!(rows[0].get("repository_full_name"), Some(&Value::from("turbot/steampipe")));

        assert_eq!(variables(&mock, 0)["name"], "steampipe");
        assert_eq!(variables(&mock, 1)["cursor"], "s1");
    }

    #[tokio::test]
    async fn test_missing_repository_is_not_found() {
        let mock = MockTransport::new();
        push_graphql(&mock, json!({"repository": null}));

        let ctx = QueryContext::new().with_eq("repository_full_name", "turbot/gone");
        let mut rows: Vec<Row> = Vec::new();
        let err = stargazer_table()
            .scan(&client(&mock), &ctx, &mut rows)
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::GitHub(GitHubError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stargazers_have_no_get() {
        let mock = MockTransport::new();
        let ctx = QueryContext::new().with_eq("repository_full_name", "turbot/steampipe");
        let err = stargazer_table().get(&client(&mock), &ctx).await.unwrap_err();
        assert!(matches!(err, TableError::GetNotSupported("github_stargazer")));
    }
}
