use anyhow::Result;
use clap::ValueEnum;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use immoscope_core::tabular::{column_names, display_value, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn print_rows(
    title: &str,
    rows: &[Row],
    format: OutputFormat,
    limit: Option<usize>,
) -> Result<()> {
    let shown = &rows[..limit.unwrap_or(rows.len()).min(rows.len())];

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(shown)?);
        }
        OutputFormat::Table => {
            println!("{title}");
            if shown.is_empty() {
                println!("(no rows)");
                return Ok(());
            }

            let columns = column_names(shown);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(columns.clone());
            for row in shown {
                table.add_row(
                    columns
                        .iter()
                        .map(|column| row.get(column).map(display_value).unwrap_or_default())
                        .collect::<Vec<_>>(),
                );
            }
            println!("{table}");
            if shown.len() < rows.len() {
                println!("... {} more rows", rows.len() - shown.len());
            }
        }
    }
    Ok(())
}

pub fn print_list(title: &str, values: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(values)?),
        OutputFormat::Table => println!("{title}: {}", values.join(", ")),
    }
    Ok(())
}
