//! Row rendering.

use clap::ValueEnum;
use hubtable::Row;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as a JSON array
    Json,
    /// One JSON object per line, printed as rows arrive
    Jsonl,
}

/// Render rows as a rounded table with `headers` as the first line.
pub(crate) fn render_rows(headers: &[&str], rows: &[Row]) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(headers.iter().map(|column| {
            row.get(column)
                .map(|value| value.to_display_string())
                .unwrap_or_default()
        }));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Print a list of serializable records as a table or JSON.
pub(crate) fn print_records<T: Serialize + tabled::Tabled>(
    items: Vec<T>,
    format: OutputFormat,
) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Table => {
            let mut table = tabled::Table::new(items);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Jsonl => {
            for item in &items {
                println!("{}", serde_json::to_string(item)?);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use hubtable::Value;

    use super::*;

    #[test]
    fn output_format_default_is_table() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn render_rows_uses_display_strings_and_blank_nulls() {
        let mut row = Row::new();
        row.insert("number", Value::Int(7));
        row.insert("title", Value::from("Fix it"));
        row.insert("closed_at", Value::Null);

        let rendered = render_rows(&["number", "title", "closed_at"], &[row]);
        assert!(rendered.contains("number"));
        assert!(rendered.contains("Fix it"));
        assert!(rendered.contains('7'));
        assert!(rendered.starts_with('╭'));
    }
}
