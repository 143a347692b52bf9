//! OpenAPI 3.0 document generated from the tool catalog.

use serde_json::{json, Map, Value};

use findata_core::config::Settings;
use findata_core::tools::{catalog, ToolDefinition};

/// OpenAPI version emitted.
pub const OPENAPI_VERSION: &str = "3.0.3";

/// Build the full document.
pub fn document(settings: &Settings, server_url: &str) -> Value {
    json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "title": format!("{} API", settings.server_name),
            "description": "Financial Data MCP Server API. Exposes the MCP tools over plain HTTP \
                            for development and debugging; every tool returns the same envelope \
                            as over MCP.",
            "version": settings.server_version,
            "license": {"name": "MIT", "url": "https://opensource.org/licenses/MIT"},
        },
        "servers": [{"url": server_url, "description": "Configured server"}],
        "paths": paths(),
        "components": components(settings),
        "tags": [
            {"name": "Health", "description": "Health check endpoints"},
            {"name": "Tools", "description": "MCP tool execution endpoints"},
            {"name": "Streaming", "description": "MCP streamable HTTP transport (findata-mcp-server --http)"},
        ],
    })
}

fn json_response(description: &str, schema: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {"schema": {"$ref": format!("#/components/schemas/{schema}")}}
        }
    })
}

fn paths() -> Value {
    let mut paths = Map::new();
    paths.insert(
        "/health".to_string(),
        json!({
            "get": {
                "tags": ["Health"],
                "summary": "Health check",
                "description": "Check if the server is running and healthy.",
                "operationId": "healthCheck",
                "responses": {"200": json_response("Server is healthy", "HealthResponse")},
            }
        }),
    );
    paths.insert(
        "/tools".to_string(),
        json!({
            "get": {
                "tags": ["Tools"],
                "summary": "List all available tools",
                "description": "Get a list of all MCP tools with their schemas.",
                "operationId": "listTools",
                "responses": {"200": json_response("List of tools", "ToolsList")},
            }
        }),
    );
    for tool in catalog() {
        paths.insert(format!("/tools/{}", tool.name), tool_path(&tool));
    }
    Value::Object(paths)
}

fn tool_path(tool: &ToolDefinition) -> Value {
    let summary = tool
        .description
        .split('.')
        .next()
        .map(str::trim)
        .unwrap_or(tool.name);
    json!({
        "post": {
            "tags": ["Tools"],
            "summary": summary,
            "description": tool.description,
            "operationId": tool.name,
            "requestBody": {
                "required": true,
                "description": format!("Parameters for {}", tool.name),
                "content": {
                    "application/json": {
                        "schema": tool.input_schema,
                        "example": example_request(&tool.input_schema),
                    }
                }
            },
            "responses": {
                "200": json_response("Tool executed successfully", "ToolResponse"),
                "400": json_response("Invalid request parameters or body", "ErrorResponse"),
                "404": json_response("Unknown tool, ticker or resource", "ErrorResponse"),
                "429": json_response("Rate limit exceeded", "ErrorResponse"),
                "500": json_response("Internal server error", "ErrorResponse"),
            }
        }
    })
}

/// Example body built from a tool's input schema.
///
/// Optional fields with a default are left out.
pub fn example_request(schema: &Value) -> Value {
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let mut example = Map::new();
    let Some(properties) = schema["properties"].as_object() else {
        return Value::Object(example);
    };

    for (name, prop) in properties {
        if prop.get("default").is_some() && !required.contains(&name.as_str()) {
            continue;
        }
        let value = match prop["type"].as_str().unwrap_or("string") {
            "string" => {
                if let Some(first) = prop["enum"].as_array().and_then(|e| e.first()) {
                    first.clone()
                } else {
                    match name.as_str() {
                        "ticker" => json!("AAPL"),
                        "query" => json!("Apple"),
                        "sector" => json!("Technology"),
                        "country" => json!("US"),
                        "cursor" => continue,
                        n if n.contains("date") => json!("2024-01-02"),
                        n => json!(format!("example_{n}")),
                    }
                }
            }
            "integer" if name == "year" => json!(2024),
            "integer" => json!(1),
            "number" => match name.as_str() {
                "min_market_cap" => json!(1_000_000_000_u64),
                n if n.starts_with("max_") => continue,
                _ => json!(100.0),
            },
            "array" => match name.as_str() {
                "tickers" => json!(["AAPL", "MSFT"]),
                _ => json!([]),
            },
            "boolean" => json!(true),
            _ => continue,
        };
        example.insert(name.clone(), value);
    }
    Value::Object(example)
}

fn components(settings: &Settings) -> Value {
    let meta = json!({
        "type": "object",
        "properties": {
            "execution_ms": {"type": "number"},
            "row_count": {"type": "integer", "nullable": true},
        }
    });
    json!({
        "schemas": {
            "HealthResponse": {
                "type": "object",
                "properties": {
                    "status": {"type": "string", "example": "ok"},
                    "version": {"type": "string", "example": settings.server_version},
                    "transport": {"type": "string", "example": "rest"},
                },
                "required": ["status"],
            },
            "ToolsList": {
                "type": "object",
                "properties": {
                    "tools": {"type": "array", "items": {"$ref": "#/components/schemas/ToolDefinition"}},
                    "count": {"type": "integer"},
                },
            },
            "ToolDefinition": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "description": {"type": "string"},
                    "inputSchema": {"type": "object"},
                },
            },
            "ToolResponse": {
                "type": "object",
                "properties": {
                    "tool": {"type": "string", "description": "Name of the tool that was executed"},
                    "ok": {"type": "boolean", "description": "Whether the execution was successful"},
                    "data": {"type": "object", "nullable": true, "description": "Response data (varies by tool)"},
                    "error": {
                        "type": "object",
                        "nullable": true,
                        "properties": {"error_code": {"type": "string"}},
                    },
                    "meta": meta,
                },
                "required": ["tool", "ok", "data", "error", "meta"],
            },
            "ErrorResponse": {
                "type": "object",
                "properties": {
                    "tool": {"type": "string"},
                    "ok": {"type": "boolean", "example": false},
                    "data": {"type": "object", "nullable": true},
                    "error": {
                        "type": "object",
                        "properties": {
                            "error_code": {
                                "type": "string",
                                "enum": [
                                    "INVALID_INPUT", "TICKER_NOT_FOUND", "NOT_FOUND",
                                    "RATE_LIMIT_EXCEEDED", "UNKNOWN_TOOL", "EXECUTION_ERROR",
                                    "INVALID_JSON"
                                ],
                            },
                            "message": {"type": "string"},
                            "hint": {"type": "string", "nullable": true},
                        },
                    },
                    "meta": meta,
                },
            },
        },
        "securitySchemes": {
            "ApiKeyAuth": {
                "type": "apiKey",
                "in": "header",
                "name": "X-API-Key",
                "description": "API key for authentication",
            },
            "BearerAuth": {
                "type": "http",
                "scheme": "bearer",
                "bearerFormat": "JWT",
                "description": "JWT token for authentication",
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use findata_core::tools::ToolName;

    #[test]
    fn test_document_shape() {
        let doc = document(&Settings::default(), "http://localhost:8000");
        assert_eq!(doc["openapi"], "3.0.3");
        assert_eq!(doc["info"]["title"], "financial-data-mcp API");
        let paths = doc["paths"].as_object().unwrap();
        assert_eq!(paths.len(), 2 + ToolName::ALL.len());
        assert!(paths["/tools/compare_companies"]["post"]["responses"]["429"].is_object());
        assert!(doc["components"]["securitySchemes"]["BearerAuth"].is_object());
        let tags: Vec<_> = doc["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["Health", "Tools", "Streaming"]);
    }

    #[test]
    fn test_example_request_fills_required_fields() {
        let example = example_request(&ToolName::GetStockPriceHistory.input_schema());
        assert_eq!(example["ticker"], "AAPL");
        assert_eq!(example["start_date"], "2024-01-02");
        assert!(example.get("limit").is_none());
        assert!(example.get("cursor").is_none());

        let example = example_request(&ToolName::CompareCompanies.input_schema());
        assert_eq!(example["tickers"].as_array().unwrap().len(), 2);
        assert_eq!(example["metric"], "revenue");
    }
}
