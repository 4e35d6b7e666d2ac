use std::io::Write;

use anyhow::Result;
use comfy_table::{presets::NOTHING, Attribute, Cell, ContentArrangement, Table};
use enum_dispatch::enum_dispatch;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::checks::Message;
use crate::report::{Document, DocumentEntry};

/// JSON form of a table cell. Integers stay integers; anything that is not a number, string or
/// boolean is written as its display text.
fn cell_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => json!(b),
        AnyValue::String(s) => json!(s),
        AnyValue::StringOwned(s) => json!(s.to_string()),
        other if other.dtype().is_float() => other.extract::<f64>().map_or(Value::Null, |v| json!(v)),
        other if other.dtype().is_signed_integer() => {
            other.extract::<i64>().map_or(Value::Null, |v| json!(v))
        }
        other if other.dtype().is_unsigned_integer() => {
            other.extract::<u64>().map_or(Value::Null, |v| json!(v))
        }
        other => json!(other.to_string()),
    }
}

/// Text of a table cell; strings are shown without quotes and nulls as blanks.
fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => format!("{other}"),
    }
}

fn table_to_json(df: &DataFrame) -> Result<Value> {
    let mut rows = vec![];
    for idx in 0..df.height() {
        let mut row = serde_json::Map::new();
        for col in df.get_columns() {
            row.insert(col.name().to_string(), cell_to_json(&col.get(idx)?));
        }
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}

/// Renders a [`Document`]. Implementors only write to a sink; `format` collects the same
/// output into a string.
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, document: &Document) -> Result<()>;

    fn format(&self, document: &Document) -> Result<String> {
        let mut rendered: Vec<u8> = Vec::new();
        self.save(&mut rendered, document)?;
        Ok(String::from_utf8(rendered)?)
    }
}

/// Every supported report format
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    Text(TextFormatter),
    Json(JsonFormatter),
}

/// Plain text report. Tables are truncated to `max_rows` unless `verbose` is set.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TextFormatter {
    pub verbose: bool,
    pub max_rows: usize,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            verbose: false,
            max_rows: 10,
        }
    }
}

impl TextFormatter {
    fn write_table(&self, writer: &mut impl Write, df: &DataFrame) -> Result<()> {
        let shown = if self.verbose {
            df.clone()
        } else {
            df.head(Some(self.max_rows))
        };
        let mut table = Table::new();
        table
            .load_preset(NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(
                shown
                    .get_column_names()
                    .into_iter()
                    .map(|name| Cell::new(name).add_attribute(Attribute::Bold)),
            )
            .set_style(comfy_table::TableComponent::HeaderLines, '─')
            .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─');
        for idx in 0..shown.height() {
            let row = shown
                .get_columns()
                .iter()
                .map(|s| s.get(idx).map(|v| cell_text(&v)))
                .collect::<PolarsResult<Vec<String>>>()?;
            table.add_row(row);
        }
        writeln!(writer, "{table}")?;
        if shown.height() < df.height() {
            writeln!(writer, "    ... {} more rows", df.height() - shown.height())?;
        }
        Ok(())
    }

    fn write_payload(&self, writer: &mut impl Write, payload: &Message) -> Result<()> {
        match payload {
            Message::Empty => {}
            Message::Text(text) => writeln!(writer, "    {text}")?,
            Message::TextList(items) => {
                for item in items {
                    writeln!(writer, "    - {item}")?;
                }
            }
            Message::Table(df) => self.write_table(writer, df)?,
            Message::TableList(tables) => {
                for df in tables {
                    self.write_table(writer, df)?;
                }
            }
            Message::FigureList(figures) => {
                for figure in figures {
                    let labels: Vec<&str> =
                        figure.series.iter().map(|s| s.label.as_str()).collect();
                    writeln!(
                        writer,
                        "    Figure: {} ({} against {}); series: {}",
                        figure.title,
                        figure.y_label,
                        figure.x_label,
                        labels.join(", ")
                    )?;
                }
            }
        }
        Ok(())
    }

    fn write_entry(&self, writer: &mut impl Write, entry: &DocumentEntry) -> Result<()> {
        match &entry.status {
            Some(status) => write!(writer, "[{status}] {}", entry.name)?,
            None => write!(writer, "{}", entry.name)?,
        }
        if entry.description.is_empty() {
            writeln!(writer)?;
        } else {
            writeln!(writer, ": {}", entry.description)?;
        }
        self.write_payload(writer, &entry.payload)
    }
}

impl OutputGenerator for TextFormatter {
    fn save(&self, writer: &mut impl Write, document: &Document) -> Result<()> {
        writeln!(writer, "{}", document.title)?;
        if !document.description.is_empty() {
            writeln!(writer, "{}", document.description)?;
        }
        if !document.files.is_empty() {
            writeln!(writer, "\nFiles Used:")?;
            for file in &document.files {
                writeln!(writer, "  - {file}")?;
            }
        }
        if let Some(verdict) = &document.verdict {
            writeln!(writer, "\n{verdict}")?;
        }
        for section in &document.sections {
            writeln!(writer, "\n== {} ==", section.heading)?;
            if section.entries.is_empty() {
                writeln!(writer, "(none)")?;
            }
            for entry in &section.entries {
                self.write_entry(writer, entry)?;
            }
        }
        Ok(())
    }
}

/// Structured JSON report
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct JsonFormatter {
    pub pretty: bool,
}

fn payload_to_json(payload: &Message) -> Result<Value> {
    let value = match payload {
        Message::Empty => Value::Null,
        Message::Text(text) => json!(text),
        Message::TextList(items) => json!(items),
        Message::Table(df) => table_to_json(df)?,
        Message::TableList(tables) => Value::Array(
            tables
                .iter()
                .map(table_to_json)
                .collect::<Result<Vec<Value>>>()?,
        ),
        Message::FigureList(figures) => serde_json::to_value(figures)?,
    };
    Ok(json!({ "type": payload.as_ref(), "value": value }))
}

impl OutputGenerator for JsonFormatter {
    fn save(&self, writer: &mut impl Write, document: &Document) -> Result<()> {
        let mut sections = vec![];
        for section in &document.sections {
            let entries = section
                .entries
                .iter()
                .map(|entry| {
                    Ok(json!({
                        "name": entry.name,
                        "description": entry.description,
                        "status": entry.status,
                        "payload": payload_to_json(&entry.payload)?,
                    }))
                })
                .collect::<Result<Vec<Value>>>()?;
            sections.push(json!({ "heading": section.heading, "entries": entries }));
        }
        let value = json!({
            "title": document.title,
            "description": document.description,
            "files": document.files,
            "verdict": document.verdict,
            "sections": sections,
        });
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &value)?;
        } else {
            serde_json::to_writer(&mut *writer, &value)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}
