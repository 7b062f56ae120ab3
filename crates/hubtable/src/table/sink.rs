//! Row and item sinks.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::error::TableError;
use super::value::Row;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("row sink closed")]
pub struct SinkClosed;

/// Receives hydrated rows from a scan.
#[async_trait]
pub trait RowSink: Send {
    async fn send_row(&mut self, row: Row) -> Result<(), SinkClosed>;
}

#[async_trait]
impl RowSink for Vec<Row> {
    async fn send_row(&mut self, row: Row) -> Result<(), SinkClosed> {
        self.push(row);
        Ok(())
    }
}

#[async_trait]
impl RowSink for mpsc::Sender<Row> {
    async fn send_row(&mut self, row: Row) -> Result<(), SinkClosed> {
        self.send(row).await.map_err(|_| SinkClosed)
    }
}

/// Receives parent items from a list operation.
///
/// The pagination driver calls [`ItemSink::emit`] once per item and checks
/// [`ItemSink::rows_remaining`] after every emission and after every page.
#[async_trait]
pub trait ItemSink<T: Send>: Send {
    async fn emit(&mut self, item: T) -> Result<(), TableError>;

    /// Rows the caller still wants. `None` means unbounded, `Some(0)` means
    /// stop now (limit reached, cancelled, or the consumer went away).
    fn rows_remaining(&self) -> Option<u64>;
}

/// Collects items in memory, honoring an optional limit.
#[derive(Debug)]
pub struct CollectSink<T> {
    pub items: Vec<T>,
    limit: Option<u64>,
}

impl<T> CollectSink<T> {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            items: Vec::new(),
            limit,
        }
    }
}

#[async_trait]
impl<T: Send> ItemSink<T> for CollectSink<T> {
    async fn emit(&mut self, item: T) -> Result<(), TableError> {
        self.items.push(item);
        Ok(())
    }

    fn rows_remaining(&self) -> Option<u64> {
        self.limit
            .map(|limit| limit.saturating_sub(self.items.len() as u64))
    }
}
