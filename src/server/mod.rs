//! Newline-delimited JSON-RPC server over a byte stream (stdio in production).
//!
//! Requests are handled one at a time: each handler runs to completion before
//! the next line is read.

pub mod protocol;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;

use crate::app::App;
use crate::router;
use crate::tools;

use protocol::{methods, Request, Response, RpcError, JSONRPC_VERSION, MCP_PROTOCOL_VERSION};

/// Serve requests from `reader` until EOF, writing one response per line.
pub async fn serve<R, W>(app: &App, mut reader: R, mut writer: W) -> std::io::Result<()>
where
  R: AsyncBufRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let mut buf = Vec::new();

  loop {
    buf.clear();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
      break;
    }

    let response = match std::str::from_utf8(&buf) {
      Ok(line) if line.trim().is_empty() => continue,
      Ok(line) => handle_line(app, line.trim_end_matches(['\r', '\n'])).await,
      Err(e) => {
        tracing::warn!(error = %e, "message is not valid UTF-8");
        Some(Response::error(
          None,
          RpcError::new(RpcError::PARSE_ERROR, format!("Parse error: {}", e)),
        ))
      }
    };
    let Some(response) = response else {
      continue;
    };

    let json = serde_json::to_string(&response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
  }

  tracing::info!("input closed, stopping server");
  Ok(())
}

/// Handle one raw message. Returns `None` for notifications.
async fn handle_line(app: &App, line: &str) -> Option<Response> {
  let request: Request = match serde_json::from_str(line) {
    Ok(request) => request,
    Err(e) => {
      tracing::warn!(error = %e, "unparseable message");
      return Some(Response::error(
        None,
        RpcError::new(RpcError::PARSE_ERROR, format!("Parse error: {}", e)),
      ));
    }
  };

  if request.jsonrpc != JSONRPC_VERSION {
    return Some(Response::error(
      request.id,
      RpcError::new(RpcError::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
    ));
  }

  let Some(id) = request.id else {
    tracing::debug!(method = %request.method, "notification");
    return None;
  };

  let span = tracing::info_span!("request", method = %request.method);
  let params = request.params.unwrap_or(Value::Null);
  let response = match handle_method(app, &request.method, &params)
    .instrument(span)
    .await
  {
    Ok(result) => Response::success(Some(id), result),
    Err(error) => Response::error(Some(id), error),
  };
  Some(response)
}

async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, RpcError> {
  match method {
    methods::INITIALIZE => Ok(json!({
      "protocolVersion": MCP_PROTOCOL_VERSION,
      "capabilities": {
        "resources": {},
        "tools": {}
      },
      "serverInfo": {
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
      }
    })),

    methods::PING => Ok(json!({})),

    methods::RESOURCES_LIST => {
      let resources = router::list_resources(app.client())
        .await
        .map_err(|e| RpcError::from(&e))?;
      Ok(json!({ "resources": resources }))
    }

    methods::RESOURCES_READ => {
      let uri = params
        .get("uri")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("missing 'uri'"))?;
      let contents = router::read_resource(app.client(), uri)
        .await
        .map_err(|e| RpcError::from(&e))?;
      Ok(json!({ "contents": [contents] }))
    }

    methods::TOOLS_LIST => Ok(json!({ "tools": tools::tool_definitions() })),

    methods::TOOLS_CALL => {
      let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("missing 'name'"))?;
      let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

      let result = tools::dispatch(app.client(), name, &arguments)
        .await
        .map_err(|e| RpcError::from(&e))?;
      let text = serde_json::to_string_pretty(&result)
        .map_err(|e| RpcError::new(RpcError::INTERNAL_ERROR, e.to_string()))?;
      Ok(json!({
        "content": [{ "type": "text", "text": text }]
      }))
    }

    other => Err(RpcError::method_not_found(other)),
  }
}
