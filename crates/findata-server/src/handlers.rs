//! Request handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use findata_core::config::Settings;
use findata_core::envelope::{ErrorCode, ToolResponse};
use findata_core::request::Arguments;
use findata_core::tools::{catalog, ToolDefinition};
use findata_mcp::ToolDispatcher;

/// Application state.
pub struct AppState {
    /// Shared tool dispatcher (store, limiter, caller context)
    pub dispatcher: Arc<ToolDispatcher>,
    /// Effective settings
    pub settings: Settings,
    /// Pre-rendered OpenAPI document
    pub openapi: Value,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    transport: String,
}

/// Health check handler.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.settings.server_version.clone(),
        transport: "rest".to_string(),
    })
}

/// Tool catalog response.
#[derive(Serialize)]
pub struct ToolsList {
    tools: Vec<ToolDefinition>,
    count: usize,
}

/// List every tool with its input schema.
pub async fn list_tools() -> Json<ToolsList> {
    let tools = catalog();
    Json(ToolsList {
        count: tools.len(),
        tools,
    })
}

/// HTTP status for an envelope.
pub fn status_for(code: Option<ErrorCode>) -> StatusCode {
    match code {
        None => StatusCode::OK,
        Some(ErrorCode::InvalidInput | ErrorCode::InvalidJson) => StatusCode::BAD_REQUEST,
        Some(ErrorCode::UnknownTool | ErrorCode::TickerNotFound | ErrorCode::NotFound) => {
            StatusCode::NOT_FOUND
        }
        Some(ErrorCode::RateLimitExceeded) => StatusCode::TOO_MANY_REQUESTS,
        Some(ErrorCode::ExecutionError) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn envelope_response(response: &ToolResponse, retry_after: Option<u64>) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(seconds) = retry_after {
        headers.insert(RETRY_AFTER, HeaderValue::from(seconds));
    }
    (status_for(response.error_code()), headers, Json(response)).into_response()
}

/// Parse a request body into tool arguments. An empty body means no arguments.
fn parse_arguments(tool: &str, body: &[u8], started: Instant) -> Result<Option<Arguments>, ToolResponse> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(Value::Null) => Ok(None),
        Ok(_) => Err(ToolResponse::failure(
            tool,
            ErrorCode::InvalidInput,
            "Request body must be a JSON object",
            Some("Send the tool arguments as a JSON object.".to_string()),
            started,
        )),
        Err(e) => Err(ToolResponse::failure(
            tool,
            ErrorCode::InvalidJson,
            format!("Request body is not valid JSON: {e}"),
            Some("Send the tool arguments as a JSON object.".to_string()),
            started,
        )),
    }
}

/// Execute a tool.
///
/// Domain failures keep their envelope with a matching status; internal
/// failures become a 500 `EXECUTION_ERROR` envelope.
pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let args = match parse_arguments(&name, &body, started) {
        Ok(args) => args,
        Err(response) => return envelope_response(&response, None),
    };

    match state.dispatcher.call(&name, args).await {
        Ok(dispatched) => envelope_response(&dispatched.response, dispatched.retry_after_seconds),
        Err(err) => {
            tracing::error!(tool = %name, error = %err, "Tool execution failed");
            let response = ToolResponse::from_error(&name, &err, started);
            envelope_response(&response, None)
        }
    }
}

/// OpenAPI document.
pub async fn openapi(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.openapi.clone())
}

/// Swagger UI page.
pub async fn swagger_ui(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <title>{name} - Swagger UI</title>
  <meta charset="utf-8"/>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css"/>
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({{ url: "/openapi.json", dom_id: "#swagger-ui" }});
  </script>
</body>
</html>"##,
        name = state.settings.server_name
    ))
}

/// ReDoc page.
pub async fn redoc(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <title>{name} - ReDoc</title>
  <meta charset="utf-8"/>
</head>
<body>
  <redoc spec-url="/openapi.json"></redoc>
  <script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>
</body>
</html>"##,
        name = state.settings.server_name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(None), StatusCode::OK);
        assert_eq!(status_for(Some(ErrorCode::InvalidJson)), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(Some(ErrorCode::NotFound)), StatusCode::NOT_FOUND);
        assert_eq!(status_for(Some(ErrorCode::UnknownTool)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(Some(ErrorCode::RateLimitExceeded)),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(Some(ErrorCode::ExecutionError)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_parse_arguments() {
        let now = Instant::now();
        assert_eq!(parse_arguments("t", b"", now), Ok(None));
        assert_eq!(parse_arguments("t", b"  \n", now), Ok(None));
        assert_eq!(parse_arguments("t", b"null", now), Ok(None));
        let args = parse_arguments("t", br#"{"ticker": "ALPH"}"#, now).unwrap().unwrap();
        assert_eq!(args["ticker"], "ALPH");

        let err = parse_arguments("t", b"{not json", now).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::InvalidJson));
        let err = parse_arguments("t", b"[1, 2]", now).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::InvalidInput));
    }
}
