//! GraphQL envelope types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::table::PageToken;

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: &'a Map<String, Json>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    /// GitHub's error classification, e.g. `NOT_FOUND`, `FORBIDDEN`,
    /// `RATE_LIMITED`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub path: Vec<Json>,
}

impl GraphQlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            path: Vec::new(),
        }
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// The token for the following page, or `None` when this was the last.
    ///
    /// A page that claims a successor but carries no `endCursor` ends the
    /// listing: an absent cursor would request the first page again.
    pub fn next_token(&self) -> Option<PageToken> {
        if !self.has_next_page {
            return None;
        }
        match &self.end_cursor {
            Some(cursor) => Some(PageToken::Cursor(Some(cursor.clone()))),
            None => {
                tracing::warn!("hasNextPage is set without an endCursor, ending pagination");
                None
            }
        }
    }
}

/// A paginated connection. Accepts either `nodes` or `edges` as the item
/// list, so edge types carrying their own fields (team permission, starred
/// time) share the same wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default)]
    pub total_count: Option<i64>,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(rename = "nodes", alias = "edges", default = "Vec::new")]
    pub items: Vec<T>,
}

/// Connections fetched only for their size, e.g. `openIssues: issues { totalCount }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: i64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_connection_accepts_nodes_or_edges() {
        let nodes: Connection<Json> = serde_json::from_value(json!({
            "totalCount": 2,
            "pageInfo": {"hasNextPage": true, "endCursor": "Y3Vyc29y"},
            "nodes": [{"a": 1}, {"a": 2}]
        }))
        .unwrap();
        assert_eq!(nodes.items.len(), 2);
        assert_eq!(nodes.total_count, Some(2));
        assert_eq!(
            nodes.page_info.next_token(),
            Some(PageToken::Cursor(Some("Y3Vyc29y".into())))
        );

        let edges: Connection<Json> = serde_json::from_value(json!({
            "pageInfo": {"hasNextPage": false, "endCursor": null},
            "edges": [{"permission": "ADMIN"}]
        }))
        .unwrap();
        assert_eq!(edges.items.len(), 1);
        assert_eq!(edges.page_info.next_token(), None);
    }

    #[test]
    fn test_next_page_without_cursor_ends_listing() {
        let info: PageInfo =
            serde_json::from_value(json!({"hasNextPage": true, "endCursor": null})).unwrap();
        assert_eq!(info.next_token(), None);

        let info: PageInfo =
            serde_json::from_value(json!({"hasNextPage": true, "endCursor": "c9"})).unwrap();
        assert_eq!(info.next_token(), Some(PageToken::Cursor(Some("c9".into()))));
    }

    #[test]
    fn test_graphql_error_kind() {
        let err: GraphQlError = serde_json::from_value(json!({
            "type": "NOT_FOUND",
            "path": ["repository"],
            "message": "Could not resolve to a Repository with the name 'octo/missing'."
        }))
        .unwrap();
        assert!(err.is_kind("NOT_FOUND"));
        assert_eq!(err.path, vec![json!("repository")]);
    }
}
