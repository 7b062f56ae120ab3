//! Table descriptors and the scan/get entry points.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;

use super::column::{ColumnDescriptor, ColumnInfo, Extract};
use super::context::{Operator, QueryContext};
use super::error::{HydrateError, TableError};
use super::paginate::PaginationSummary;
use super::sink::{ItemSink, RowSink};
use super::value::Row;
use crate::github::{GitHubClient, GitHubError};

/// Streams every parent item of a list call into the sink.
pub type ListFn<I> = for<'a> fn(
    &'a GitHubClient,
    &'a QueryContext,
    &'a mut (dyn ItemSink<I> + 'a),
) -> BoxFuture<'a, Result<PaginationSummary, TableError>>;

/// Fetches the single item identified by the get key columns.
pub type GetFn<I> =
    for<'a> fn(&'a GitHubClient, &'a QueryContext) -> BoxFuture<'a, Result<Option<I>, TableError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    Optional,
}

/// A key column a list or get call reads from the qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyColumn {
    pub name: &'static str,
    pub requirement: Requirement,
}

impl KeyColumn {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            requirement: Requirement::Required,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            requirement: Requirement::Optional,
        }
    }
}

pub struct GetConfig<I> {
    pub keys: &'static [KeyColumn],
    pub fetch: GetFn<I>,
    /// Errors matching this predicate turn a get into "no row".
    pub ignore: fn(&GitHubError) -> bool,
}

impl<I> GetConfig<I> {
    pub fn new(keys: &'static [KeyColumn], fetch: GetFn<I>) -> Self {
        Self {
            keys,
            fetch,
            ignore: GitHubError::is_not_found,
        }
    }

    #[must_use]
    pub fn ignore(mut self, ignore: fn(&GitHubError) -> bool) -> Self {
        self.ignore = ignore;
        self
    }
}

pub struct TableDescriptor<I> {
    pub name: &'static str,
    pub description: &'static str,
    pub list: ListFn<I>,
    pub list_keys: &'static [KeyColumn],
    pub get: Option<GetConfig<I>>,
    pub columns: Vec<ColumnDescriptor<I>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Requests issued by the list call.
    pub pages: u32,
    /// Rows delivered to the sink.
    pub rows: u64,
}

/// A queryable table, independent of its parent item type.
#[async_trait]
pub trait Table: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn columns(&self) -> Vec<ColumnInfo>;

    fn list_keys(&self) -> &'static [KeyColumn];

    /// Key columns of the get operation, or `None` if the table has none.
    fn get_keys(&self) -> Option<&'static [KeyColumn]>;

    /// Stream the table's rows into `rows`, honoring the context's columns,
    /// limit and cancel flag.
    async fn scan(
        &self,
        client: &GitHubClient,
        ctx: &QueryContext,
        rows: &mut dyn RowSink,
    ) -> Result<ScanSummary, TableError>;

    /// Fetch a single row by its get key columns.
    async fn get(&self, client: &GitHubClient, ctx: &QueryContext)
    -> Result<Option<Row>, TableError>;
}

impl<I> TableDescriptor<I> {
    /// The descriptors for the requested columns, in declaration order.
    fn requested_columns(&self, ctx: &QueryContext) -> Result<Vec<&ColumnDescriptor<I>>, TableError> {
        if let Some(unknown) = ctx
            .columns()
            .iter()
            .find(|name| !self.columns.iter().any(|c| c.name == name.as_str()))
        {
            return Err(TableError::UnknownColumn {
                table: self.name,
                column: unknown.clone(),
            });
        }

        Ok(self
            .columns
            .iter()
            .filter(|c| ctx.is_requested(c.name))
            .collect())
    }

    /// Every qualifier must be an equality on one of `keys`, and every
    /// required key must be qualified. Nothing filters rows after the fetch,
    /// so any other qualifier would be silently dropped.
    fn check_keys(&self, keys: &[KeyColumn], ctx: &QueryContext) -> Result<(), TableError> {
        for qual in ctx.quals().iter() {
            if !keys.iter().any(|key| key.name == qual.column) {
                let names = keys.iter().map(|key| key.name).collect::<Vec<_>>();
                let message = if names.is_empty() {
                    format!("{} takes no qualifiers", self.name)
                } else {
                    format!("{} can only be qualified on {}", self.name, names.join(", "))
                };
                return Err(TableError::invalid_qualifier(&qual.column, message));
            }
            if qual.op != Operator::Eq {
                return Err(TableError::invalid_qualifier(
                    &qual.column,
                    format!("only = is supported, got {}", qual.op.as_str()),
                ));
            }
        }

        keys.iter()
            .filter(|key| key.requirement == Requirement::Required)
            .try_for_each(|key| ctx.require_eq(self.name, key.name).map(|_| ()))
    }
}

/// Hydrate one parent item into a row holding `columns`.
///
/// The item is serialized to JSON only when a field-extracted column needs it.
pub fn build_row<I: Serialize>(columns: &[&ColumnDescriptor<I>], item: &I) -> Result<Row, HydrateError> {
    let needs_json = columns
        .iter()
        .any(|c| matches!(c.extract, Extract::Field(_)));
    let serialized = if needs_json {
        Some(serde_json::to_value(item).map_err(|e| HydrateError::Serialize(e.to_string()))?)
    } else {
        None
    };

    let mut row = Row::new();
    for column in columns {
        row.insert(column.name, column.extract(item, serialized.as_ref())?);
    }
    Ok(row)
}

/// Adapts a [`RowSink`] into the item sink a list call writes to.
struct HydratingSink<'s, I> {
    columns: Vec<&'s ColumnDescriptor<I>>,
    rows: &'s mut dyn RowSink,
    ctx: &'s QueryContext,
    emitted: u64,
    closed: bool,
}

#[async_trait]
impl<I> ItemSink<I> for HydratingSink<'_, I>
where
    I: Serialize + Send + Sync,
{
    async fn emit(&mut self, item: I) -> Result<(), TableError> {
        if self.rows_remaining() == Some(0) {
            return Ok(());
        }

        let row = build_row(&self.columns, &item)?;
        if self.rows.send_row(row).await.is_err() {
            tracing::debug!("row consumer closed, stopping scan");
            self.closed = true;
            return Ok(());
        }
        self.emitted += 1;
        Ok(())
    }

    fn rows_remaining(&self) -> Option<u64> {
        if self.closed || self.ctx.cancel_flag().is_cancelled() {
            return Some(0);
        }
        self.ctx
            .limit()
            .map(|limit| limit.saturating_sub(self.emitted))
    }
}

#[async_trait]
impl<I> Table for TableDescriptor<I>
where
    I: Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn columns(&self) -> Vec<ColumnInfo> {
        self.columns.iter().map(ColumnDescriptor::info).collect()
    }

    fn list_keys(&self) -> &'static [KeyColumn] {
        self.list_keys
    }

    fn get_keys(&self) -> Option<&'static [KeyColumn]> {
        self.get.as_ref().map(|get| get.keys)
    }

    async fn scan(
        &self,
        client: &GitHubClient,
        ctx: &QueryContext,
        rows: &mut dyn RowSink,
    ) -> Result<ScanSummary, TableError> {
        self.check_keys(self.list_keys, ctx)?;
        let columns = self.requested_columns(ctx)?;

        let mut sink = HydratingSink {
            columns,
            rows,
            ctx,
            emitted: 0,
            closed: false,
        };

        tracing::debug!(table = self.name, limit = ?ctx.limit(), "starting scan");
        let pages = (self.list)(client, ctx, &mut sink).await?;

        let summary = ScanSummary {
            pages: pages.pages,
            rows: sink.emitted,
        };
        tracing::debug!(
            table = self.name,
            pages = summary.pages,
            rows = summary.rows,
            "scan finished"
        );
        Ok(summary)
    }

    async fn get(
        &self,
        client: &GitHubClient,
        ctx: &QueryContext,
    ) -> Result<Option<Row>, TableError> {
        let get = self.get.as_ref().ok_or(TableError::GetNotSupported(self.name))?;
        self.check_keys(get.keys, ctx)?;
        let columns = self.requested_columns(ctx)?;

        let item = match (get.fetch)(client, ctx).await {
            Ok(item) => item,
            Err(TableError::GitHub(e)) if (get.ignore)(&e) => {
                tracing::warn!(table = self.name, error = %e, "get returned no row");
                None
            }
            Err(e) => return Err(e),
        };

        item.map(|item| build_row(&columns, &item).map_err(TableError::from))
            .transpose()
    }
}
