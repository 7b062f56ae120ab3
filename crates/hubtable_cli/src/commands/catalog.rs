//! `tables` and `columns`: describe what can be queried.

use hubtable::table::{KeyColumn, Requirement, Table};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{OutputFormat, print_records};

#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct TableSummary {
    #[tabled(rename = "Table")]
    pub name: &'static str,
    #[tabled(rename = "Required Qualifiers")]
    pub list_keys: String,
    #[tabled(rename = "Get Keys")]
    pub get_keys: String,
    #[tabled(rename = "Description")]
    pub description: &'static str,
}

impl TableSummary {
    fn from_table(table: &dyn Table) -> Self {
        Self {
            name: table.name(),
            list_keys: describe_keys(table.list_keys()),
            get_keys: table.get_keys().map(describe_keys).unwrap_or_default(),
            description: table.description(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct ColumnSummary {
    #[tabled(rename = "Column")]
    pub name: &'static str,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub column_type: &'static str,
    #[tabled(rename = "Description")]
    pub description: &'static str,
}

/// `a, b, [c]`: optional keys in brackets.
fn describe_keys(keys: &[KeyColumn]) -> String {
    keys.iter()
        .map(|key| match key.requirement {
            Requirement::Required => key.name.to_string(),
            Requirement::Optional => format!("[{}]", key.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn handle_tables(output: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let items = hubtable::tables::all()
        .iter()
        .map(|table| TableSummary::from_table(table.as_ref()))
        .collect();
    print_records::<TableSummary>(items, output)?;
    Ok(())
}

pub(crate) fn handle_columns(
    table: &str,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = hubtable::tables::find(table)?;
    let items = table
        .columns()
        .into_iter()
        .map(|column| ColumnSummary {
            name: column.name,
            column_type: column.column_type.as_str(),
            description: column.description,
        })
        .collect();
    print_records::<ColumnSummary>(items, output)?;
    Ok(())
}
