//! Tool-discovery transcripts.
//!
//! The discovery operation reports tools as human-readable lines:
//!
//! ```text
//! • read_file
//!   Description: Read a file from disk
//!   Parameters: {
//!     "type": "object"
//!   }
//! ```
//!
//! [`render`] produces that text from structured records. [`ToolReportParser`]
//! recovers records from text captured elsewhere, as a small line state
//! machine: `Idle` → `InRecord` → `InParameters` (while a multi-line JSON
//! object is still unbalanced).

use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Marker that starts a tool entry.
///
/// Transcripts produced on some systems show a mis-decoded bullet, so the
/// marker is configurable (see `Settings::bullet_marker`).
pub const DEFAULT_BULLET_MARKER: &str = "\u{2022} ";

const DESCRIPTION_PREFIX: &str = "Description:";
const PARAMETERS_PREFIX: &str = "Parameters:";
const PARSE_FAILURE: &str = "Failed to parse parameters";

/// One discovered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: ToolParameters,
}

impl ToolRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: ToolParameters::Unparsed,
        }
    }
}

/// Parameter schema, or an explicit marker that none could be parsed.
///
/// A record whose transcript has no `Parameters:` line is `Unparsed`, the
/// same as one whose parameter text is empty or invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolParameters {
    Schema(Value),
    Unparsed,
}

impl ToolParameters {
    pub fn schema(&self) -> Option<&Value> {
        match self {
            ToolParameters::Schema(value) => Some(value),
            ToolParameters::Unparsed => None,
        }
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(self, ToolParameters::Unparsed)
    }
}

impl Serialize for ToolParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolParameters::Schema(value) => value.serialize(serializer),
            ToolParameters::Unparsed => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", PARSE_FAILURE)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ToolParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.as_object().is_some_and(|obj| {
            obj.len() == 1 && obj.get("error").and_then(Value::as_str) == Some(PARSE_FAILURE)
        }) {
            return Ok(ToolParameters::Unparsed);
        }
        if value.is_null() {
            return Err(D::Error::custom("parameters must not be null"));
        }
        Ok(ToolParameters::Schema(value))
    }
}

/// Render records in the transcript format, one string per status line.
///
/// Each entry is preceded by an empty line; parameters are pretty-printed and
/// may span several lines within one status line.
pub fn render(records: &[ToolRecord], marker: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for record in records {
        lines.push(format!("\n{marker}{}", record.name));
        if !record.description.is_empty() {
            lines.push(format!("  {DESCRIPTION_PREFIX} {}", record.description));
        }
        if let Some(schema) = record.parameters.schema() {
            let pretty = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
            lines.push(format!("  {PARAMETERS_PREFIX} {pretty}"));
        }
    }
    lines
}

#[derive(Debug)]
enum State {
    Idle,
    InRecord(ToolRecord),
    InParameters { record: ToolRecord, buffer: String },
}

/// Best-effort parser for discovery transcripts.
#[derive(Debug, Clone)]
pub struct ToolReportParser {
    marker: String,
}

impl Default for ToolReportParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolReportParser {
    pub fn new() -> Self {
        Self::with_marker(DEFAULT_BULLET_MARKER)
    }

    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn parse(&self, transcript: &str) -> Vec<ToolRecord> {
        let mut records = Vec::new();
        let mut state = State::Idle;

        for line in transcript.lines() {
            state = self.step(state, line, &mut records);
        }

        match state {
            State::Idle => {}
            State::InRecord(record) => records.push(record),
            State::InParameters { record, buffer } => {
                debug!(tool = %record.name, text = %buffer, "Parameters never balanced");
                records.push(record);
            }
        }
        records
    }

    fn step(&self, state: State, line: &str, records: &mut Vec<ToolRecord>) -> State {
        if let Some(name) = self.bullet_name(line) {
            match state {
                State::Idle => {}
                State::InRecord(record) => records.push(record),
                State::InParameters { record, buffer } => {
                    debug!(tool = %record.name, text = %buffer, "Parameters interrupted by next entry");
                    records.push(record);
                }
            }
            return State::InRecord(ToolRecord::new(name));
        }

        match state {
            State::Idle => State::Idle,
            State::InRecord(mut record) => {
                let trimmed = line.trim();
                if let Some(rest) = trimmed.strip_prefix(DESCRIPTION_PREFIX) {
                    record.description = rest.trim().to_string();
                    State::InRecord(record)
                } else if let Some(rest) = trimmed.strip_prefix(PARAMETERS_PREFIX) {
                    let text = rest.trim();
                    match serde_json::from_str::<Value>(text) {
                        Ok(value) => {
                            record.parameters = ToolParameters::Schema(value);
                            State::InRecord(record)
                        }
                        Err(_) if text.starts_with('{') => State::InParameters {
                            record,
                            buffer: text.to_string(),
                        },
                        Err(_) => {
                            debug!(tool = %record.name, text, "Failed to parse parameters");
                            record.parameters = ToolParameters::Unparsed;
                            State::InRecord(record)
                        }
                    }
                } else {
                    State::InRecord(record)
                }
            }
            State::InParameters {
                mut record,
                mut buffer,
            } => {
                buffer.push(' ');
                buffer.push_str(line.trim());
                match serde_json::from_str::<Value>(&buffer) {
                    Ok(value) => {
                        record.parameters = ToolParameters::Schema(value);
                        State::InRecord(record)
                    }
                    Err(_) => State::InParameters { record, buffer },
                }
            }
        }
    }

    fn bullet_name<'a>(&self, line: &'a str) -> Option<&'a str> {
        line.trim_start()
            .strip_prefix(self.marker.as_str())
            .map(str::trim)
    }
}
