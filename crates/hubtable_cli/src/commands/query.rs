//! `query` and `get`: run a table against the API and print its rows.

use std::time::Instant;

use hubtable::table::{CancelFlag, QueryContext, Table};
use hubtable::{Row, TableError};
use tokio::sync::mpsc;

use crate::QueryOptions;
use crate::commands::shared::build_client;
use crate::config::Config;
use crate::output::{OutputFormat, render_rows};
use crate::shutdown::setup_shutdown_handler;

/// Rows buffered between the scan and the printer in streaming mode.
const ROW_CHANNEL_CAPACITY: usize = 256;

fn build_context(opts: &QueryOptions, limit: Option<u64>, cancel: CancelFlag) -> QueryContext {
    opts.quals.iter().cloned().fold(
        QueryContext::new()
            .with_columns(opts.columns.iter().cloned())
            .with_limit(limit)
            .with_cancel(cancel),
        QueryContext::with_qual,
    )
}

/// Output headers: the requested columns in table order.
fn headers(table: &dyn Table, ctx: &QueryContext) -> Vec<&'static str> {
    table
        .columns()
        .into_iter()
        .map(|column| column.name)
        .filter(|name| ctx.is_requested(name))
        .collect()
}

fn print_rows(
    headers: &[&str],
    rows: &[Row],
    format: OutputFormat,
) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Table => println!("{}", render_rows(headers, rows)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Jsonl => {
            for row in rows {
                println!("{}", serde_json::to_string(row)?);
            }
        }
    }
    Ok(())
}

/// Handle the `query` command.
pub(crate) async fn handle_query(
    table_name: &str,
    opts: QueryOptions,
    limit: Option<u64>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = hubtable::tables::find(table_name)?;
    let client = build_client(config, opts.no_rate_limit)?;

    let cancel = CancelFlag::new();
    setup_shutdown_handler(cancel.clone());

    let limit = limit.or(config.query.default_limit);
    let ctx = build_context(&opts, limit, cancel.clone());
    let started = Instant::now();

    let summary = if opts.output == OutputFormat::Jsonl {
        let (tx, mut rx) = mpsc::channel::<Row>(ROW_CHANNEL_CAPACITY);
        let scan = async {
            let mut tx = tx;
            table.scan(&client, &ctx, &mut tx).await
        };
        let printer = async {
            while let Some(row) = rx.recv().await {
                println!("{}", serde_json::to_string(&row)?);
            }
            Ok::<_, serde_json::Error>(())
        };
        let (summary, printed) = tokio::join!(scan, printer);
        printed?;
        summary?
    } else {
        let mut rows: Vec<Row> = Vec::new();
        let summary = table.scan(&client, &ctx, &mut rows).await?;
        print_rows(&headers(table.as_ref(), &ctx), &rows, opts.output)?;
        summary
    };

    if cancel.is_cancelled() {
        tracing::warn!(rows = summary.rows, "Scan of {} cancelled", table.name());
    }
    tracing::info!(
        table = table.name(),
        rows = summary.rows,
        requests = summary.pages,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Scan complete"
    );
    Ok(())
}

/// Handle the `get` command.
pub(crate) async fn handle_get(
    table_name: &str,
    opts: QueryOptions,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = hubtable::tables::find(table_name)?;
    if table.get_keys().is_none() {
        return Err(TableError::GetNotSupported(table.name()).into());
    }
    let client = build_client(config, opts.no_rate_limit)?;
    let ctx = build_context(&opts, None, CancelFlag::new());

    match table.get(&client, &ctx).await? {
        Some(row) => print_rows(&headers(table.as_ref(), &ctx), &[row], opts.output)?,
        None => {
            let keys = ctx
                .quals()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            tracing::info!("No {} row for {}", table.name(), keys);
            if opts.output == OutputFormat::Json {
                println!("null");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(columns: &[&str], quals: &[&str]) -> QueryOptions {
        QueryOptions {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            quals: quals.iter().map(|q| q.parse().unwrap()).collect(),
            output: OutputFormat::Table,
            no_rate_limit: true,
        }
    }

    #[test]
    fn context_carries_columns_quals_and_limit() {
        let opts = options(&["title", "number"], &["repository_full_name=rust-lang/rust", "state=open"]);
        let ctx = build_context(&opts, Some(20), CancelFlag::new());

        assert!(ctx.is_requested("title"));
        assert!(!ctx.is_requested("body"));
        assert_eq!(ctx.limit(), Some(20));
        assert_eq!(ctx.quals().equals("repository_full_name"), Some("rust-lang/rust"));
        assert_eq!(ctx.quals().equals("state"), Some("open"));
    }

    #[test]
    fn headers_follow_table_order() {
        let table = hubtable::tables::find("github_issue").unwrap();
        let opts = options(&["title", "number"], &[]);
        let ctx = build_context(&opts, None, CancelFlag::new());

        let headers = headers(table.as_ref(), &ctx);
        assert_eq!(headers, vec!["number", "title"]);
    }

    #[test]
    fn headers_default_to_every_column() {
        let table = hubtable::tables::find("github_rate_limit").unwrap();
        let ctx = build_context(&options(&[], &[]), None, CancelFlag::new());

        assert_eq!(headers(table.as_ref(), &ctx).len(), table.columns().len());
    }

    #[test]
    fn cancel_flag_is_shared_with_context() {
        let cancel = CancelFlag::new();
        let ctx = build_context(&options(&[], &[]), None, cancel.clone());
        cancel.cancel();
        assert!(ctx.cancel_flag().is_cancelled());
    }
}
