//! Rendering helpers: YAML/JSON documents, aligned tables and ages.

use crate::error::CliError;
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use tabwriter::TabWriter;

/// Placeholder for an unset value
pub const EMPTY: &str = "<empty>";
/// Placeholder for a missing reference
pub const NONE: &str = "<none>";
/// Placeholder for an unknown age
pub const UNKNOWN: &str = "<unknown>";

/// Output formats accepted by `--output`
pub const OUTPUT_FORMATS: &[&str] = &["json", "yaml", "yml"];

/// Padding between table columns
const TABLE_PADDING: usize = 3;

/// Metadata fields owned by the API server.
const SERVER_METADATA: &[&str] = &["creationTimestamp", "generation", "managedFields", "resourceVersion", "uid"];

/// Output format selected by `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tab indented JSON
    Json,
    /// YAML document
    Yaml,
}

impl OutputFormat {
    /// Parse an already validated `--output` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Render a value in this format.
    pub fn render(self, value: &Value) -> Result<String, CliError> {
        match self {
            Self::Json => json_document(value),
            Self::Yaml => yaml_document(value),
        }
    }
}

/// Recursively order object keys.
pub fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// Serialize a resource with sorted keys.
pub fn to_sorted_value<T: Serialize>(resource: &T) -> Result<Value, CliError> {
    Ok(sorted(serde_json::to_value(resource)?))
}

/// Serialize a resource without status and server managed metadata.
pub fn clean_resource<T: Serialize>(resource: &T) -> Result<Value, CliError> {
    let mut value = to_sorted_value(resource)?;
    if let Value::Object(root) = &mut value {
        root.remove("status");
        if let Some(Value::Object(metadata)) = root.get_mut("metadata") {
            for field in SERVER_METADATA {
                metadata.remove(*field);
            }
        }
    }
    Ok(value)
}

/// YAML document prefixed with `---`.
pub fn yaml_document(value: &Value) -> Result<String, CliError> {
    Ok(format!("---\n{}", serde_yaml::to_string(value)?))
}

/// Tab indented JSON followed by a newline.
pub fn json_document(value: &Value) -> Result<String, CliError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| CliError::Render(e.to_string()))
}

/// Align rows of cells into columns.
///
/// Every row is prefixed with `indent`; the last cell of a row is not padded.
pub fn table<R, C>(indent: &str, rows: R) -> Result<String, CliError>
where
    R: IntoIterator<Item = Vec<C>>,
    C: AsRef<str>,
{
    let mut tw = TabWriter::new(Vec::new()).minwidth(0).padding(TABLE_PADDING);
    for row in rows {
        let cells: Vec<&str> = row.iter().map(AsRef::as_ref).collect();
        writeln!(tw, "{indent}{}", cells.join("\t"))?;
    }
    let buf = tw.into_inner().map_err(|e| CliError::Render(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| CliError::Render(e.to_string()))
}

/// Convert an API timestamp into a chrono time.
pub fn timestamp(time: &Time) -> Option<DateTime<Utc>> {
    match serde_json::to_value(time).ok()? {
        Value::String(s) => DateTime::parse_from_rfc3339(&s).ok().map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

/// Age of `time` relative to now, `<unknown>` when unset.
pub fn age(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => human_duration(Utc::now().signed_duration_since(time)),
        None => UNKNOWN.to_string(),
    }
}

/// Compact human readable duration, e.g. `45s`, `5m30s`, `3h`, `2d4h`, `3y`.
pub fn human_duration(duration: chrono::TimeDelta) -> String {
    let seconds = duration.num_seconds();
    if seconds < -1 {
        return "<invalid>".to_string();
    }
    if seconds < 0 {
        return "0s".to_string();
    }
    if seconds < 60 * 2 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 10 {
        let s = seconds % 60;
        return if s == 0 { format!("{minutes}m") } else { format!("{minutes}m{s}s") };
    }
    if minutes < 60 * 3 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    if hours < 8 {
        let m = minutes % 60;
        return if m == 0 { format!("{hours}h") } else { format!("{hours}h{m}m") };
    }
    if hours < 48 {
        return format!("{hours}h");
    }
    if hours < 24 * 8 {
        let (d, h) = (hours / 24, hours % 24);
        return if h == 0 { format!("{d}d") } else { format!("{d}d{h}h") };
    }
    if hours < 24 * 365 * 2 {
        return format!("{}d", hours / 24);
    }
    let years = hours / 24 / 365;
    if hours < 24 * 365 * 8 {
        let d = (hours / 24) % 365;
        return if d == 0 { format!("{years}y") } else { format!("{years}y{d}d") };
    }
    format!("{years}y")
}
