//! Integration tests for the findata REST endpoints.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use findata_core::config::Settings;
use findata_core::rate_limit::RateLimiter;
use findata_mcp::ToolDispatcher;
use findata_server::Server;
use findata_store::{Database, UserContext};

/// Create a test app over the sample database.
fn create_test_app(settings: Settings) -> Router {
    let db = Database::sample().expect("Failed to create sample database");
    create_test_app_with_db(settings, db)
}

fn create_test_app_with_db(settings: Settings, db: Database) -> Router {
    let dispatcher = ToolDispatcher::with_limiter(
        db,
        Arc::new(RateLimiter::default()),
        settings.rate_limit(),
        UserContext::admin(),
    );
    Server::new(settings, Arc::new(dispatcher)).router()
}

fn default_app() -> Router {
    create_test_app(Settings::default())
}

fn post_tool(name: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/tools/{name}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// HEALTH, CATALOG AND DOCS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let response = default_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["transport"], "rest");
}

#[tokio::test]
async fn test_list_tools() {
    let response = default_app().oneshot(get("/tools")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["count"], 8);
    let names: Vec<&str> = json["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"get_stock_price_history"));
    assert!(json["tools"][0]["inputSchema"].is_object());
}

#[tokio::test]
async fn test_openapi_document() {
    let response = default_app().oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["openapi"], "3.0.3");
    assert!(json["paths"]["/tools/search_companies"]["post"].is_object());
    assert!(json["components"]["schemas"]["ToolResponse"].is_object());
    assert_eq!(
        json["components"]["securitySchemes"]["ApiKeyAuth"]["name"],
        "X-API-Key"
    );
}

#[tokio::test]
async fn test_docs_pages() {
    for (uri, marker) in [("/docs", "swagger-ui"), ("/redoc", "<redoc")] {
        let response = default_app().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains(marker), "{uri}");
        assert!(html.contains("/openapi.json"), "{uri}");
    }
}

// =============================================================================
// TOOL EXECUTION
// =============================================================================

#[tokio::test]
async fn test_call_tool_success() {
    let response = default_app()
        .oneshot(post_tool("get_company_profile", r#"{"ticker": "alph"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["tool"], "get_company_profile");
    assert_eq!(json["ok"], true);
    assert!(json["error"].is_null());
    assert_eq!(json["data"]["ticker"], "ALPH");
    assert_eq!(json["meta"]["row_count"], 1);
    assert!(json["meta"]["execution_ms"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_compare_market_cap_winner() {
    let body = json!({"tickers": ["ALPH", "BETA"], "metric": "market_cap"}).to_string();
    let response = default_app()
        .oneshot(post_tool("compare_companies", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["winner"], "ALPH");
    assert_eq!(json["data"]["comparison"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_pages_with_cursor() {
    let app = default_app();
    let mut cursor = Value::Null;
    let mut tickers = Vec::new();
    loop {
        let mut body = json!({"query": "a", "limit": 1});
        if !cursor.is_null() {
            body["cursor"] = cursor.clone();
        }
        let response = app
            .clone()
            .oneshot(post_tool("search_companies", &body.to_string()))
            .await
            .unwrap();
        let json = body_json(response).await;
        tickers.push(json["data"]["results"][0]["ticker"].as_str().unwrap().to_string());
        cursor = json["data"]["next_cursor"].clone();
        if cursor.is_null() {
            assert_eq!(json["data"]["has_more"], false);
            break;
        }
    }
    assert_eq!(tickers, vec!["ALPH", "BETA", "GAMA"]);
}

#[tokio::test]
async fn test_unknown_tool_is_404() {
    let response = default_app()
        .oneshot(post_tool("delete_everything", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["error_code"], "UNKNOWN_TOOL");
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn test_invalid_json_is_400() {
    let response = default_app()
        .oneshot(post_tool("get_company_profile", "{\"ticker\": "))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["error_code"], "INVALID_JSON");
}

#[tokio::test]
async fn test_invalid_input_is_400() {
    let response = default_app()
        .oneshot(post_tool("search_companies", r#"{"query": "   "}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["error_code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_unknown_ticker_is_404_with_hint() {
    let response = default_app()
        .oneshot(post_tool("get_analyst_ratings", r#"{"ticker": "NOPE"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"]["error_code"], "TICKER_NOT_FOUND");
    assert!(json["error"]["hint"]
        .as_str()
        .unwrap()
        .contains("search_companies"));
}

#[tokio::test]
async fn test_rate_limit_is_429_with_retry_after() {
    let settings = Settings {
        rate_limit_default: 1,
        ..Settings::default()
    };
    let app = create_test_app(settings);
    let request = || post_tool("get_sector_overview", "");

    let first = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = second.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let json = body_json(second).await;
    assert_eq!(json["error"]["error_code"], "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn test_rate_limit_disabled() {
    let settings = Settings {
        rate_limit_enabled: false,
        rate_limit_default: 1,
        ..Settings::default()
    };
    let app = create_test_app(settings);
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post_tool("get_sector_overview", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_storage_failure_is_500() {
    let db = Database::sample().unwrap();
    db.with_conn(|conn| {
        conn.execute_batch("DROP TABLE analyst_ratings")?;
        Ok(())
    })
    .unwrap();
    let app = create_test_app_with_db(Settings::default(), db);

    let response = app
        .oneshot(post_tool("get_analyst_ratings", r#"{"ticker": "ALPH"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["tool"], "get_analyst_ratings");
    assert_eq!(json["error"]["error_code"], "EXECUTION_ERROR");
    assert!(json["data"].is_null());
}

// =============================================================================
// BINDING
// =============================================================================

#[tokio::test]
async fn test_bind_resolves_host_name() {
    let settings = Settings {
        host: "localhost".to_string(),
        port: 0,
        ..Settings::default()
    };
    let dispatcher = ToolDispatcher::with_limiter(
        Database::sample().unwrap(),
        Arc::new(RateLimiter::default()),
        settings.rate_limit(),
        UserContext::admin(),
    );
    let listener = Server::new(settings, Arc::new(dispatcher)).bind().await.unwrap();
    assert!(listener.local_addr().unwrap().ip().is_loopback());
}

// =============================================================================
// SECURITY HEADERS
// =============================================================================

#[tokio::test]
async fn test_security_headers_present() {
    let response = default_app().oneshot(get("/health")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers["strict-transport-security"]
        .to_str()
        .unwrap()
        .starts_with("max-age=31536000"));
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("frame-ancestors 'none'"));
    assert!(headers.contains_key("referrer-policy"));
    assert!(headers.contains_key("permissions-policy"));
    assert_eq!(headers["x-request-id"].to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn test_security_headers_disabled_keeps_request_id() {
    let settings = Settings {
        enable_security_headers: false,
        ..Settings::default()
    };
    let response = create_test_app(settings).oneshot(get("/health")).await.unwrap();
    let headers = response.headers();
    assert!(!headers.contains_key("x-frame-options"));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_ids_are_unique() {
    let app = default_app();
    let a = app.clone().oneshot(get("/health")).await.unwrap();
    let b = app.oneshot(get("/health")).await.unwrap();
    assert_ne!(a.headers()["x-request-id"], b.headers()["x-request-id"]);
}
