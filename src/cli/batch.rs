use super::ui;
use crate::core::{ConversionOutcome, Converter};
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads an array of records from a JSON or YAML file (chosen by extension).
pub fn load_entities(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let value: Value = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML input: {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON input: {}", path.display()))?
    };

    match value {
        Value::Array(entities) => {
            debug!("Loaded {} records from {}", entities.len(), path.display());
            Ok(entities)
        }
        _ => bail!("Expected an array of records in {}", path.display()),
    }
}

/// Writes converted records as pretty JSON to `output`, or stdout when absent.
pub fn write_entities(entities: &[Value], output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(entities)?;
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write output file: {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

/// Summarises a batch outcome: the message plus a table of failed records.
pub fn display_outcome<E>(outcome: &ConversionOutcome<E>) -> String {
    let style_type = if outcome.success {
        ui::StyleType::TotalValue
    } else {
        ui::StyleType::Error
    };
    let mut output = ui::style_text(&outcome.message, style_type);

    if !outcome.failures.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Record"), ui::header_cell("Reason")]);
        for failure in &outcome.failures {
            table.add_row(vec![
                Cell::new(&failure.entity_id),
                ui::error_cell(&failure.reason),
            ]);
        }
        output.push_str("\n\n");
        output.push_str(&table.to_string());
    }
    output
}

/// Converts the records in `input` and writes them out, returning the summary.
pub async fn run_batch(
    converter: &Converter,
    input: &Path,
    from: &str,
    to: &str,
    fields: &[String],
    output: Option<&Path>,
) -> Result<String> {
    let entities = load_entities(input)?;
    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();

    let outcome = converter.convert_batch(&entities, from, to, &fields).await;
    write_entities(&outcome.converted_entities, output)?;

    Ok(display_outcome(&outcome))
}
