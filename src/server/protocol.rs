//! JSON-RPC message types for the Model Context Protocol, server side.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Error;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const JSONRPC_VERSION: &str = "2.0";

/// Request ID (can be string or number)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
  String(String),
  Number(i64),
}

/// Incoming request. A missing id makes it a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
  pub jsonrpc: String,
  pub id: Option<RequestId>,
  pub method: String,
  #[serde(default)]
  pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
  pub jsonrpc: &'static str,
  /// Null when the request could not be parsed far enough to read its id
  pub id: Option<RequestId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<RpcError>,
}

impl Response {
  pub fn success(id: Option<RequestId>, result: Value) -> Self {
    Self {
      jsonrpc: JSONRPC_VERSION,
      id,
      result: Some(result),
      error: None,
    }
  }

  pub fn error(id: Option<RequestId>, error: RpcError) -> Self {
    Self {
      jsonrpc: JSONRPC_VERSION,
      id,
      result: None,
      error: Some(error),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
  pub code: i32,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
}

impl RpcError {
  pub const PARSE_ERROR: i32 = -32700;
  pub const INVALID_REQUEST: i32 = -32600;
  pub const METHOD_NOT_FOUND: i32 = -32601;
  pub const INVALID_PARAMS: i32 = -32602;
  pub const INTERNAL_ERROR: i32 = -32603;
  /// MCP-specific: resource does not exist
  pub const RESOURCE_NOT_FOUND: i32 = -32002;

  pub fn new(code: i32, message: impl Into<String>) -> Self {
    Self {
      code,
      message: message.into(),
      data: None,
    }
  }

  pub fn method_not_found(method: &str) -> Self {
    Self::new(Self::METHOD_NOT_FOUND, format!("Method not found: {}", method))
  }

  pub fn invalid_params(message: impl Into<String>) -> Self {
    Self::new(Self::INVALID_PARAMS, message)
  }
}

impl From<&Error> for RpcError {
  fn from(err: &Error) -> Self {
    let code = match err {
      Error::NotFound { .. } => Self::RESOURCE_NOT_FOUND,
      Error::Upstream { .. } => Self::INTERNAL_ERROR,
      Error::UnsupportedScheme(_)
      | Error::EmptyPath
      | Error::MissingLinkName(_)
      | Error::UnknownResourceType(_)
      | Error::UnknownTool(_)
      | Error::InvalidArguments { .. } => Self::INVALID_PARAMS,
    };

    let mut data = json!({ "kind": err.kind() });
    if let Error::Upstream {
      endpoint, status, ..
    } = err
    {
      data["endpoint"] = json!(endpoint);
      data["status"] = json!(status);
    }

    Self {
      code,
      message: err.to_string(),
      data: Some(data),
    }
  }
}

/// MCP method names
pub mod methods {
  pub const INITIALIZE: &str = "initialize";
  pub const PING: &str = "ping";
  pub const RESOURCES_LIST: &str = "resources/list";
  pub const RESOURCES_READ: &str = "resources/read";
  pub const TOOLS_LIST: &str = "tools/list";
  pub const TOOLS_CALL: &str = "tools/call";
}
