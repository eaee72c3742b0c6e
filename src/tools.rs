//! Write operations exposed as tools, and their dispatch.

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::zoho::client::ZohoClient;

pub const CREATE_RECORD: &str = "create-record";

#[derive(Debug, Clone)]
pub struct Tool {
  pub name: &'static str,
  pub description: &'static str,
}

/// All available tools
pub const TOOLS: &[Tool] = &[Tool {
  name: CREATE_RECORD,
  description: "Create a new record in a Zoho Creator form",
}];

/// Tool listing with JSON input schemas
pub fn tool_definitions() -> Vec<Value> {
  TOOLS
    .iter()
    .map(|tool| {
      json!({
        "name": tool.name,
        "description": tool.description,
        "inputSchema": input_schema(tool.name),
      })
    })
    .collect()
}

fn input_schema(name: &str) -> Value {
  match name {
    CREATE_RECORD => json!({
      "type": "object",
      "properties": {
        "form_name": {
          "type": "string",
          "description": "Link name of the form"
        },
        "data": {
          "type": "object",
          "description": "Field api_name to value"
        }
      },
      "required": ["form_name", "data"]
    }),
    _ => json!({"type": "object"}),
  }
}

/// Run the named tool. Failures are logged here and returned unchanged.
pub async fn dispatch(client: &ZohoClient, name: &str, arguments: &Value) -> Result<Value> {
  let result = match name {
    CREATE_RECORD => create_record(client, arguments).await,
    other => Err(Error::UnknownTool(other.to_string())),
  };

  if let Err(e) = &result {
    tracing::error!(tool = name, error = %e, "tool call failed");
  }
  result
}

async fn create_record(client: &ZohoClient, arguments: &Value) -> Result<Value> {
  let form_name = arguments
    .get("form_name")
    .and_then(Value::as_str)
    .ok_or_else(|| Error::invalid_arguments(CREATE_RECORD, "'form_name' must be a string"))?;
  let data: Map<String, Value> = arguments
    .get("data")
    .and_then(Value::as_object)
    .cloned()
    .ok_or_else(|| Error::invalid_arguments(CREATE_RECORD, "'data' must be an object"))?;

  let record = client.create_record(form_name, data).await?;
  tracing::info!(form = form_name, record_id = %record.id, "created record");

  Ok(json!({
    "message": "Record created successfully",
    "record_id": record.id,
    "created_time": record.created_time.to_rfc3339(),
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::zoho::auth::StaticToken;
  use crate::zoho::client::build_http_client;
  use httpmock::prelude::*;
  use std::sync::Arc;
  use std::time::Duration;
  use url::Url;

  fn client(server: &MockServer) -> ZohoClient {
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    let base = Url::parse(&server.base_url()).unwrap();
    ZohoClient::new(http, base, Arc::new(StaticToken::new("t")), 300).unwrap()
  }

  #[test]
  fn test_tool_definitions() {
    let tools = tool_definitions();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "create-record");
    assert_eq!(tools[0]["inputSchema"]["required"][0], "form_name");
  }

  #[tokio::test]
  async fn test_create_record_tool() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
      when
        .method(POST)
        .path("/forms/test_form/records")
        .json_body(json!({"data": {"test_field": "new_value"}}));
      then.status(200).json_body(json!({
        "record": {
          "ID": "123",
          "Created_Time": "2024-01-01T00:00:00Z",
          "Modified_Time": "2024-01-01T00:00:00Z"
        }
      }));
    });

    let result = dispatch(
      &client(&server),
      "create-record",
      &json!({"form_name": "test_form", "data": {"test_field": "new_value"}}),
    )
    .await
    .unwrap();

    assert_eq!(mock.calls(), 1);
    assert_eq!(result["record_id"], "123");
    assert_eq!(result["message"], "Record created successfully");
    assert_eq!(result["created_time"], "2024-01-01T00:00:00+00:00");
  }

  #[tokio::test]
  async fn test_unknown_tool() {
    let server = MockServer::start();
    let err = dispatch(&client(&server), "delete-record", &json!({}))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::UnknownTool(name) if name == "delete-record"));
  }

  #[tokio::test]
  async fn test_missing_arguments() {
    let server = MockServer::start();
    let client = client(&server);

    let err = dispatch(&client, "create-record", &json!({"data": {}}))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::InvalidArguments { .. }));

    let err = dispatch(&client, "create-record", &json!({"form_name": "f", "data": "x"}))
      .await
      .unwrap_err();
    assert!(err.to_string().contains("'data' must be an object"));
  }
}
