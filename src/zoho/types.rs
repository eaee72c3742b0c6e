use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Who may use a form: read-only, write-only or both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
  #[default]
  Read,
  Write,
  All,
}

impl AccessType {
  /// Lenient parse of the upstream value; anything unrecognised is read-only.
  pub fn from_upstream(value: Option<&str>) -> Self {
    match value.map(str::to_ascii_lowercase).as_deref() {
      Some("write") => AccessType::Write,
      Some("all") => AccessType::All,
      _ => AccessType::Read,
    }
  }
}

/// A typed attribute definition within a form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
  pub api_name: String,
  pub display_name: String,
  pub field_type: String,
  pub max_length: Option<u64>,
  pub required: bool,
  pub lookup: Option<Value>,
  pub choices: Option<Vec<String>>,
}

/// Form definition with its ordered fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
  pub link_name: String,
  pub display_name: String,
  pub fields: Vec<Field>,
  pub access_type: AccessType,
  pub last_modified: DateTime<Utc>,
}

/// Named view over the records of a form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
  pub link_name: String,
  pub display_name: String,
  pub report_type: Option<String>,
}

/// One row of data entered against a form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
  pub id: String,
  pub form_link_name: String,
  pub created_time: DateTime<Utc>,
  pub modified_time: DateTime<Utc>,
  /// Field api_name -> value. Field sets vary per form, so this stays untyped.
  pub data: Map<String, Value>,
}
