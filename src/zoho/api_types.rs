//! Serde-deserializable types matching Zoho Creator API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on what the router serves.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{AccessType, Field, Form, Record, Report};

// ============================================================================
// Form metadata
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiForm {
  pub link_name: String,
  pub display_name: String,
  pub access_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiFormsResponse {
  pub forms: Vec<ApiForm>,
}

#[derive(Debug, Deserialize)]
pub struct ApiField {
  pub api_name: String,
  pub display_name: String,
  #[serde(rename = "type")]
  pub field_type: String,
  pub max_length: Option<u64>,
  #[serde(default)]
  pub required: bool,
  pub lookup: Option<Value>,
  pub choices: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiFieldsResponse {
  pub fields: Vec<ApiField>,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiReport {
  pub link_name: String,
  pub display_name: String,
  #[serde(rename = "type")]
  pub report_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiReportsResponse {
  pub reports: Vec<ApiReport>,
}

// ============================================================================
// Records - kept as raw objects, the field set varies per form
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiRecordsResponse {
  pub records: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiRecordResponse {
  pub record: Map<String, Value>,
}

/// Failure turning a well-formed JSON body into a domain record.
#[derive(Error, Debug)]
pub enum RecordParseError {
  #[error("record is missing '{0}'")]
  MissingField(&'static str),

  #[error("record field '{field}' has invalid timestamp '{value}': {source}")]
  InvalidTimestamp {
    field: &'static str,
    value: String,
    source: chrono::ParseError,
  },
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiField> for Field {
  fn from(f: ApiField) -> Self {
    Field {
      api_name: f.api_name,
      display_name: f.display_name,
      field_type: f.field_type,
      max_length: f.max_length,
      required: f.required,
      lookup: f.lookup,
      choices: f.choices,
    }
  }
}

impl ApiForm {
  pub fn into_form(self, fields: Vec<ApiField>) -> Form {
    Form {
      access_type: AccessType::from_upstream(self.access_type.as_deref()),
      link_name: self.link_name,
      display_name: self.display_name,
      fields: fields.into_iter().map(Field::from).collect(),
      last_modified: Utc::now(),
    }
  }
}

impl From<ApiReport> for Report {
  fn from(r: ApiReport) -> Self {
    Report {
      link_name: r.link_name,
      display_name: r.display_name,
      report_type: r.report_type,
    }
  }
}

/// Build a record from a raw upstream object.
///
/// The id is read from `ID` unless `id_override` is given. `data` is the whole
/// raw object unless `data_override` is given.
pub fn into_record(
  form_link_name: &str,
  raw: Map<String, Value>,
  id_override: Option<&str>,
  data_override: Option<Map<String, Value>>,
) -> Result<Record, RecordParseError> {
  let id = match id_override {
    Some(id) => id.to_string(),
    None => extract_id(raw.get("ID")).ok_or(RecordParseError::MissingField("ID"))?,
  };
  let created_time = timestamp_field(&raw, "Created_Time")?;
  let modified_time = timestamp_field(&raw, "Modified_Time")?;

  Ok(Record {
    id,
    form_link_name: form_link_name.to_string(),
    created_time,
    modified_time,
    data: data_override.unwrap_or(raw),
  })
}

// ============================================================================
// Helpers
// ============================================================================

/// Zoho ids are usually strings but some endpoints return them as numbers.
fn extract_id(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn timestamp_field(
  raw: &Map<String, Value>,
  field: &'static str,
) -> Result<DateTime<Utc>, RecordParseError> {
  let value = raw
    .get(field)
    .and_then(Value::as_str)
    .ok_or(RecordParseError::MissingField(field))?;

  parse_timestamp(value).map_err(|source| RecordParseError::InvalidTimestamp {
    field,
    value: value.to_string(),
    source,
  })
}

/// Parse an ISO-8601 timestamp, rewriting a trailing `Z` marker to an explicit
/// `+00:00` offset first.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
  let normalized = match value.strip_suffix('Z') {
    Some(prefix) => format!("{}+00:00", prefix),
    None => value.to_string(),
  };
  DateTime::parse_from_rfc3339(&normalized).map(|dt| dt.with_timezone(&Utc))
}
