//! Error taxonomy for resource reads, tool calls and upstream access.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  #[error("unsupported URI scheme: '{0}'")]
  UnsupportedScheme(String),

  #[error("empty resource path")]
  EmptyPath,

  #[error("missing link name for resource type: {0}")]
  MissingLinkName(String),

  #[error("{kind} not found: {link_name}")]
  NotFound {
    kind: &'static str,
    link_name: String,
  },

  #[error("unknown resource type: {0}")]
  UnknownResourceType(String),

  #[error("unknown tool: {0}")]
  UnknownTool(String),

  #[error("invalid arguments for {tool}: {reason}")]
  InvalidArguments { tool: String, reason: String },

  /// Non-success status, transport failure or malformed body from Zoho.
  /// `status` is absent when no response was received.
  #[error("upstream request to {endpoint} failed{}: {message}", status.map(|s| format!(" with status {}", s)).unwrap_or_default())]
  Upstream {
    endpoint: String,
    status: Option<u16>,
    message: String,
  },
}

impl Error {
  pub fn not_found(kind: &'static str, link_name: impl Into<String>) -> Self {
    Self::NotFound {
      kind,
      link_name: link_name.into(),
    }
  }

  pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::InvalidArguments {
      tool: tool.into(),
      reason: reason.into(),
    }
  }

  pub fn upstream(endpoint: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
    Self::Upstream {
      endpoint: endpoint.into(),
      status,
      message: message.into(),
    }
  }

  /// Stable snake_case name of the variant, reported to protocol clients.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::UnsupportedScheme(_) => "unsupported_scheme",
      Self::EmptyPath => "empty_path",
      Self::MissingLinkName(_) => "missing_link_name",
      Self::NotFound { .. } => "not_found",
      Self::UnknownResourceType(_) => "unknown_resource_type",
      Self::UnknownTool(_) => "unknown_tool",
      Self::InvalidArguments { .. } => "invalid_arguments",
      Self::Upstream { .. } => "upstream_error",
    }
  }

  /// Whether the failure came from the address or arguments the caller sent,
  /// as opposed to the upstream service.
  pub fn is_caller_error(&self) -> bool {
    !matches!(self, Self::Upstream { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_upstream_message_includes_status_and_endpoint() {
    let err = Error::upstream("https://example.test/forms", Some(503), "service unavailable");
    let msg = err.to_string();
    assert!(msg.contains("https://example.test/forms"));
    assert!(msg.contains("status 503"));
    assert!(!err.is_caller_error());
  }

  #[test]
  fn test_upstream_message_without_status() {
    let err = Error::upstream("https://example.test/forms", None, "timed out");
    assert_eq!(
      err.to_string(),
      "upstream request to https://example.test/forms failed: timed out"
    );
  }

  #[test]
  fn test_not_found_is_caller_error() {
    let err = Error::not_found("form", "orders");
    assert_eq!(err.to_string(), "form not found: orders");
    assert!(err.is_caller_error());
  }
}
