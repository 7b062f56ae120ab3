//! `github_organization_member`: members of an organization.
//!
//! Role and two-factor status sit on the membership edge and are only
//! visible to organization owners, so both are behind include flags.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::{GRAPHQL_PAGE_SIZE, page_variables};
use crate::github::{Connection, GitHubClient, GitHubError};
use crate::table::{
    ColumnDescriptor as Column, ColumnFlag, ColumnType, ItemSink, KeyColumn, Page, PageToken,
    PaginationSummary, QueryContext, TableDescriptor, TableError, Transform, include_flags,
    paginate,
};

const TABLE: &str = "github_organization_member";

pub const MEMBER_FLAGS: &[ColumnFlag] = &[
    ColumnFlag::new("includeMemberRole", &["role"]),
    ColumnFlag::new("includeMemberTwoFactor", &["has_two_factor_enabled"]),
];

const MEMBERS_QUERY: &str = r#"query OrganizationMembers($organization: String!, $pageSize: Int!, $cursor: String, $includeMemberRole: Boolean!, $includeMemberTwoFactor: Boolean!) {
  organization(login: $organization) {
    membersWithRole(first: $pageSize, after: $cursor) {
      totalCount
      pageInfo { hasNextPage endCursor }
      edges {
        role @include(if: $includeMemberRole)
        hasTwoFactorEnabled @include(if: $includeMemberTwoFactor)
        node {
          id: databaseId
          nodeId: id
          login
          name
          company
          location
          email
          url
          createdAt
        }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberEdge {
    #[serde(skip_deserializing, default)]
    pub organization: String,
    pub role: Option<String>,
    pub has_two_factor_enabled: Option<bool>,
    pub node: Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Option<i64>,
    pub node_id: String,
    pub login: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct MembersData {
    organization: Option<OrganizationMembers>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationMembers {
    members_with_role: Connection<MemberEdge>,
}

fn list_members<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<MemberEdge> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        let organization = ctx.require_eq(TABLE, "organization")?;
        let flags = include_flags(MEMBER_FLAGS, ctx);

        paginate(sink, GRAPHQL_PAGE_SIZE, PageToken::first_cursor(), |page_size, token| {
            let mut variables = Map::new();
            variables.insert("organization".into(), organization.into());
            variables.extend(page_variables(page_size, &token));
            flags.write_variables(&mut variables);
            async move {
                let data: MembersData = client.graphql(MEMBERS_QUERY, &variables).await?;
                let members = data
                    .organization
                    .ok_or_else(|| GitHubError::not_found(format!("organization {organization}")))?
                    .members_with_role;

                Ok::<_, TableError>(Page::new(
                    members
                        .items
                        .into_iter()
                        .map(|mut edge| {
                            edge.organization = organization.to_string();
                            edge
                        })
                        .collect(),
                    members.page_info.next_token(),
                ))
            }
        })
        .await
    }
    .boxed()
}

const LIST_KEYS: &[KeyColumn] = &[KeyColumn::required("organization")];

pub fn organization_member_table() -> TableDescriptor<MemberEdge> {
    use ColumnType::*;

    TableDescriptor {
        name: TABLE,
        description: "GitHub members for a given organization.",
        list: list_members,
        list_keys: LIST_KEYS,
        get: None,
        columns: vec![
            Column::field("organization", String, "/organization", "The organization the member is associated with."),
            Column::field("role", String, "/role", "The role this user has in the organization (ADMIN or MEMBER)."),
            Column::field("has_two_factor_enabled", Bool, "/hasTwoFactorEnabled", "Whether the user has two-factor authentication enabled. Visible to organization owners only."),
            Column::field("login", String, "/node/login", "The login name of the user."),
            Column::field("id", Int, "/node/id", "The ID of the user."),
            Column::field("node_id", String, "/node/nodeId", "The node ID of the user."),
            Column::field("name", String, "/node/name", "The name of the user.")
                .transform(Transform::NullIfEmpty),
            Column::field("company", String, "/node/company", "The company of the user.")
                .transform(Transform::NullIfEmpty),
            Column::field("location", String, "/node/location", "The location of the user.")
                .transform(Transform::NullIfEmpty),
            Column::field("email", String, "/node/email", "The public email of the user.")
                .transform(Transform::NullIfEmpty),
            Column::field("url", String, "/node/url", "The URL of the user's GitHub profile."),
            Column::field("created_at", Timestamp, "/node/createdAt", "Timestamp when the user was created."),
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

    fn member(login: &str, role: Option<&str>) -> serde_json::Value {
        let mut edge = json!({
            "node": {
                "id": 1,
                "nodeId": format!("U_{login}"),
                "login": login,
                "name": null,
                "company": null,
                "location": "Earth",
                "email": "",
                "url": format!("https://github.com/{login}"),
                "createdAt": "2015-01-01T00:00:00Z"
            }
        });
        if let Some(role) = role {
            edge["role"] = json!(role);
        }
        edge
    }

    #[tokio::test]
    async fn test_login_only_scan_skips_owner_fields() {
        let mock = MockTransport::new();
        push_graphql(
            &mock,
            json!({"organization": {"membersWithRole": {
                "totalCount": 2,
                "pageInfo": {"hasNextPage": false, "endCursor": null},
                "edges": [member("alice", None), member("bob", None)]
            }}}),
        );

        let ctx = QueryContext::new()
            .with_columns(["login", "email"])
            .with_eq("organization", "turbot");
        let mut rows: Vec<Row> = Vec::new();
        organization_member_table()
            .scan(&client(&mock), &ctx, &mut rows)
            .await
            .unwrap();

        let vars = variables(&mock, 0);
        assert_eq!(vars["organization"], "turbot");
        assert_eq!(vars["includeMemberRole"], false);
        assert_eq!(vars["includeMemberTwoFactor"], false);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("login"), Some(&Value::from("bob")));
        assert_eq!(rows[0].get("email"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_role_comes_from_the_edge() {
        let mock = MockTransport::new();
        push_graphql(
            &mock,
            json!({"organization": {"membersWithRole": {
                "pageInfo": {"hasNextPage": false, "endCursor": null},
                "edges": [member("alice", Some("ADMIN"))]
            }}}),
        );

        let ctx = QueryContext::new()
            .with_columns(["organization", "login", "role"])
            .with_eq("organization", "turbot");
        let mut rows: Vec<Row> = Vec::new();
        organization_member_table()
            .scan(&client(&mock), &ctx, &mut rows)
            .await
            .unwrap();

        assert_eq!(variables(&mock, 0)["includeMemberRole"], true);
        assert_eq!(
            serde_json::to_value(&rows[0]).unwrap(),
            json!({"organization": "turbot", "role": "ADMIN", "login": "alice"})
        );
    }

    #[tokio::test]
    async fn test_unknown_organization_is_not_found() {
        let mock = MockTransport::new();
        push_graphql(&mock, json!({"organization": null}));

        let ctx = QueryContext::new().with_eq("organization", "nobody-here");
        let mut rows: Vec<Row> = Vec::new();
        let err = organization_member_table()
            .scan(&client(&mock), &ctx, &mut rows)
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::GitHub(GitHubError::NotFound(_))));
    }
}
