//! Purpose: Shared serializers for introspected config entries.
//! Exports: `ENTRY_FIELDS`, `parse_fields`, `entry_json`, `value_text`, `render_csv`,
//! `render_yaml`, `render_dotenv`, `php_truthy`.
//! Role: Keep `list`/`get`/`is-true` output shapes consistent across formats.
//! Invariants: Field order in every format follows the `--fields` order.
//! Invariants: Entry order is the introspector's order (variables, constants, includes).

use wpconf::api::{ConfigEntry, EntryKind, Error, ErrorKind};
use serde_json::{Map, Value, json};

pub(crate) const ENTRY_FIELDS: [&str; 3] = ["name", "value", "type"];

pub(crate) fn parse_fields(input: Option<&str>) -> Result<Vec<String>, Error> {
    let Some(input) = input else {
        return Ok(ENTRY_FIELDS.iter().map(|field| field.to_string()).collect());
    };
    let mut fields = Vec::new();
    for field in input.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if !ENTRY_FIELDS.contains(&field) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown field '{field}'"))
                .with_hint("Valid fields are: name, value, type."));
        }
        fields.push(field.to_string());
    }
    if fields.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--fields must name at least one field")
            .with_hint("Valid fields are: name, value, type."));
    }
    Ok(fields)
}

fn field_value(entry: &ConfigEntry, field: &str) -> Value {
    match field {
        "name" => json!(entry.name),
        "type" => json!(entry.kind.as_str()),
        _ => entry.value.clone(),
    }
}

pub(crate) fn entry_json(entry: &ConfigEntry, fields: &[String]) -> Value {
    let mut map = Map::new();
    for field in fields {
        map.insert(field.clone(), field_value(entry, field));
    }
    Value::Object(map)
}

/// Display form of a value: strings verbatim, everything else as JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn table_rows(entries: &[ConfigEntry], fields: &[String]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            fields
                .iter()
                .map(|field| value_text(&field_value(entry, field)))
                .collect()
        })
        .collect()
}

pub(crate) fn render_csv(entries: &[ConfigEntry], fields: &[String]) -> String {
    let mut lines = vec![
        fields
            .iter()
            .map(|field| csv_cell(field))
            .collect::<Vec<_>>()
            .join(","),
    ];
    for row in table_rows(entries, fields) {
        lines.push(row.iter().map(|cell| csv_cell(cell)).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub(crate) fn render_yaml(value: &Value) -> Result<String, Error> {
    serde_yaml::to_string(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode yaml")
            .with_source(err)
    })
}

/// `NAME="value"` lines for constants and variables; includes are skipped.
pub(crate) fn render_dotenv(entries: &[ConfigEntry]) -> String {
    entries
        .iter()
        .filter(|entry| entry.kind != EntryKind::Includes)
        .map(|entry| {
            let text = value_text(&entry.value)
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n");
            format!("{}=\"{text}\"", entry.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truthiness of a snapshot value under PHP's loose rules.
pub(crate) fn php_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !(text.is_empty() || text == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
