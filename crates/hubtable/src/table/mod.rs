//! The table core shared by every GitHub table.
//!
//! - [`value`] - Cell values and rows
//! - [`column`] - Column descriptors, extraction rules and transforms
//! - [`context`] - Requested columns, limit, qualifiers and cancellation
//! - [`include`] - Requested columns to GraphQL include flags
//! - [`paginate`] - The cursor/page pagination driver
//! - [`sink`] - Row and item sinks
//! - [`descriptor`] - Table descriptors and the [`Table`] trait

pub mod column;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod include;
pub mod paginate;
pub mod sink;
pub mod value;

pub use column::{ColumnDescriptor, ColumnInfo, ColumnType, Extract, Hydrator, Transform};
pub use context::{CancelFlag, Operator, Qual, Qualifiers, QueryContext};
pub use descriptor::{
    GetConfig, GetFn, KeyColumn, ListFn, Requirement, ScanSummary, Table, TableDescriptor,
    build_row,
};
pub use error::{HydrateError, TableError};
pub use include::{ColumnFlag, IncludeFlags, include_flags};
pub use paginate::{Page, PageToken, PaginationSummary, page_size, paginate};
pub use sink::{CollectSink, ItemSink, RowSink, SinkClosed};
pub use value::{Row, Value};
