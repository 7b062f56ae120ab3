//! `github_package`: packages published by an organization.
//!
//! REST only. The packages API has no "all types" listing, so the
//! `package_type` qualifier picks one registry and defaults to `container`.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{Login, REST_PAGE_SIZE};
use crate::github::GitHubClient;
use crate::table::{
    ColumnDescriptor as Column, ColumnType, GetConfig, ItemSink, KeyColumn, Page, PageToken,
    PaginationSummary, QueryContext, TableDescriptor, TableError, paginate,
};

const TABLE: &str = "github_package";

const PACKAGE_TYPES: &[&str] = &["npm", "maven", "rubygems", "docker", "nuget", "container"];

const DEFAULT_PACKAGE_TYPE: &str = "container";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    #[serde(skip_deserializing, default)]
    pub organization: String,
    pub id: i64,
    pub name: String,
    pub package_type: String,
    pub owner: Option<Login>,
    pub version_count: Option<i64>,
    pub visibility: Option<String>,
    pub url: Option<String>,
    pub html_url: Option<String>,
    pub repository: Option<PackageRepository>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRepository {
    pub full_name: String,
}

fn package_type(ctx: &QueryContext) -> Result<&str, TableError> {
    let value = ctx.quals().equals("package_type").unwrap_or(DEFAULT_PACKAGE_TYPE);
    if PACKAGE_TYPES.contains(&value) {
        Ok(value)
    } else {
        Err(TableError::invalid_qualifier(
            "package_type",
            format!("expected one of {}, got {value:?}", PACKAGE_TYPES.join(", ")),
        ))
    }
}

fn list_packages<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
    sink: &'a mut (dyn ItemSink<Package> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>> {
    async move {
        let organization = ctx.require_eq(TABLE, "organization")?;
        let package_type = package_type(ctx)?;

        paginate(sink, REST_PAGE_SIZE, PageToken::first_page(), |per_page, token| async move {
            let page = client
                .get_page::<Vec<Package>>(
                    &["orgs", organization, "packages"],
                    &[("package_type", package_type)],
                    token.page_number(),
                    per_page,
                )
                .await?;
            let next = page.next_token();

            Ok::<_, TableError>(Page::new(
                page.data
                    .into_iter()
                    .map(|mut package| {
                        package.organization = organization.to_string();
                        package
                    })
                    .collect(),
                next,
            ))
        })
        .await
    }
    .boxed()
}

fn get_package<'a>(
    client: &'a GitHubClient,
    ctx: &'a QueryContext,
) -> BoxFuture<'a, Result<Option<Package>, TableError>> {
    async move {
        let organization = ctx.require_eq(TABLE, "organization")?;
        let package_type = package_type(ctx)?;
        let name = ctx.require_eq(TABLE, "name")?;

        let mut package: Package = client
            .get_json(&["orgs", organization, "packages", package_type, name])
            .await?;
        package.organization = organization.to_string();
        Ok(Some(package))
    }
    .boxed()
}

const LIST_KEYS: &[KeyColumn] = &[
    KeyColumn::required("organization"),
    KeyColumn::optional("package_type"),
];

const GET_KEYS: &[KeyColumn] = &[
    KeyColumn::required("organization"),
    KeyColumn::required("package_type"),
    KeyColumn::required("name"),
];

pub fn package_table() -> TableDescriptor<Package> {
    use ColumnType::*;

    TableDescriptor {
        name: TABLE,
        description: "GitHub packages published by an organization.",
        list: list_packages,
        list_keys: LIST_KEYS,
        get: Some(GetConfig::new(GET_KEYS, get_package)),
        columns: vec![
            Column::field("organization", String, "/organization", "The organization that owns the package."),
            Column::field("id", Int, "/id", "Unique identifier for the package."),
            Column::field("name", String, "/name", "The name of the package."),
            Column::field("package_type", String, "/package_type", "The type of the package (e.g., container, npm, maven)."),
            Column::field("owner_login", String, "/owner/login", "Login of the package owner."),
            Column::field("version_count", Int, "/version_count", "The number of versions of the package."),
            Column::field("visibility", String, "/visibility", "The visibility of the package (public or private)."),
            Column::field("url", String, "/url", "The API URL of the package."),
            Column::field("html_url", String, "/html_url", "The URL of the package on GitHub."),
            Column::field("repository_full_name", String, "/repository/full_name", "The repository the package is linked to."),
            Column::field("created_at", Timestamp, "/created_at", "Timestamp when the package was created."),
            Column::field("updated_at", Timestamp, "/updated_at", "Timestamp when the package was last updated."),
        ],
    }
}
