//! GitHub tables.
//!
//! Every table is a [`TableDescriptor`](crate::table::TableDescriptor) over
//! its own parent item type. [`all`] lists them for the CLI and [`find`]
//! resolves one by name.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::table::{PageToken, Table, TableError};

pub mod deployment;
pub mod issue;
pub mod organization_member;
pub mod package;
pub mod rate_limit;
pub mod repository;
pub mod stargazer;

/// GraphQL connections are requested 100 nodes at a time, the API maximum.
pub const GRAPHQL_PAGE_SIZE: u32 = 100;

/// REST list endpoints are requested 100 items at a time, the API maximum.
pub const REST_PAGE_SIZE: u32 = 100;

/// Every table, in display order.
pub fn all() -> Vec<Arc<dyn Table>> {
    vec![
        Arc::new(repository::repository_table()),
        Arc::new(repository::my_repository_table()),
        Arc::new(repository::team_repository_table()),
        Arc::new(repository::search_repository_table()),
        Arc::new(issue::issue_table()),
        Arc::new(stargazer::stargazer_table()),
        Arc::new(package::package_table()),
        Arc::new(deployment::deployment_table()),
        Arc::new(organization_member::organization_member_table()),
        Arc::new(rate_limit::rate_limit_table()),
    ]
}

pub fn find(name: &str) -> Result<Arc<dyn Table>, TableError> {
    all()
        .into_iter()
        .find(|table| table.name() == name)
        .ok_or_else(|| TableError::UnknownTable(name.to_string()))
}

/// `{ login }` selections: users, organizations, actors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    pub login: String,
}

/// `{ name }` selections: languages, branches, refs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    pub name: String,
}

/// Variables every paginated GraphQL query takes.
pub(crate) fn page_variables(page_size: u32, token: &PageToken) -> Map<String, Json> {
    let mut variables = Map::new();
    variables.insert("pageSize".to_string(), Json::from(page_size));
    variables.insert(
        "cursor".to_string(),
        token
            .cursor()
            .map_or(Json::Null, |cursor| Json::String(cursor.to_string())),
    );
    variables
}

/// Split an `owner/name` qualifier.
pub(crate) fn split_full_name<'v>(
    column: &str,
    value: &'v str,
) -> Result<(&'v str, &'v str), TableError> {
    match value.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(TableError::invalid_qualifier(
            column,
            format!("expected owner/name, got {value:?}"),
        )),
    }
}
