//! Tool catalog: names, descriptions, input schemas and request budgets.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::RateLimitConfig;
use crate::rate_limit::RateLimitPolicy;

/// The query tools the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SearchCompanies,
    GetCompanyProfile,
    GetFinancialReport,
    CompareCompanies,
    GetStockPriceHistory,
    GetAnalystRatings,
    ScreenStocks,
    GetSectorOverview,
}

impl ToolName {
    /// Every tool, in catalog order.
    pub const ALL: [ToolName; 8] = [
        ToolName::SearchCompanies,
        ToolName::GetCompanyProfile,
        ToolName::GetFinancialReport,
        ToolName::CompareCompanies,
        ToolName::GetStockPriceHistory,
        ToolName::GetAnalystRatings,
        ToolName::ScreenStocks,
        ToolName::GetSectorOverview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchCompanies => "search_companies",
            Self::GetCompanyProfile => "get_company_profile",
            Self::GetFinancialReport => "get_financial_report",
            Self::CompareCompanies => "compare_companies",
            Self::GetStockPriceHistory => "get_stock_price_history",
            Self::GetAnalystRatings => "get_analyst_ratings",
            Self::ScreenStocks => "screen_stocks",
            Self::GetSectorOverview => "get_sector_overview",
        }
    }

    /// Tools that scan many rows and get the tighter budget.
    pub fn is_heavy(&self) -> bool {
        matches!(self, Self::CompareCompanies | Self::ScreenStocks)
    }

    /// Request budget for this tool.
    pub fn rate_limit(&self, config: &RateLimitConfig) -> RateLimitPolicy {
        let max_requests = if self.is_heavy() {
            config.heavy
        } else {
            config.default
        };
        RateLimitPolicy::new(max_requests, config.window_seconds)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SearchCompanies => {
                "Search for companies by name or ticker. Returns matching companies with \
                 ticker, name, sector and market_cap, paginated by cursor."
            }
            Self::GetCompanyProfile => {
                "Get full company profile including market_cap, employees, CEO and description."
            }
            Self::GetFinancialReport => {
                "Get a financial report for a company. With a year (and optional quarter) \
                 returns that period's report; otherwise per-year revenue, net_income, \
                 margins and CAGR over the last N years."
            }
            Self::CompareCompanies => {
                "Compare multiple companies on a single financial metric. Returns a \
                 comparison table, the winner and a short explanation."
            }
            Self::GetStockPriceHistory => {
                "Get daily OHLC prices, simple returns, total return and max drawdown for \
                 a date range, paginated by cursor."
            }
            Self::GetAnalystRatings => {
                "Get analyst consensus: rating counts, average price target and the most \
                 recent ratings."
            }
            Self::ScreenStocks => {
                "Screen companies by sector, country, market cap range and employee count, \
                 largest first."
            }
            Self::GetSectorOverview => {
                "Get sector aggregates: company counts and market caps for every sector, or \
                 details and top companies for one sector."
            }
        }
    }

    /// Arguments that must be present.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::SearchCompanies => &["query"],
            Self::GetCompanyProfile | Self::GetFinancialReport | Self::GetAnalystRatings => {
                &["ticker"]
            }
            Self::CompareCompanies => &["tickers", "metric"],
            Self::GetStockPriceHistory => &["ticker", "start_date", "end_date"],
            Self::ScreenStocks | Self::GetSectorOverview => &[],
        }
    }

    /// JSON Schema of the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let ticker = json!({"type": "string", "description": "Company ticker symbol"});
        match self {
            Self::SearchCompanies => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search term (name or ticker substring)"},
                    "limit": {"type": "integer", "description": "Max results to return", "default": 10, "minimum": 1, "maximum": 50},
                    "cursor": {"type": "string", "description": "Cursor from a previous page"}
                },
                "required": ["query"]
            }),
            Self::GetCompanyProfile => json!({
                "type": "object",
                "properties": {"ticker": ticker},
                "required": ["ticker"]
            }),
            Self::GetFinancialReport => json!({
                "type": "object",
                "properties": {
                    "ticker": ticker,
                    "year": {"type": "integer", "description": "Fiscal year of a single report"},
                    "quarter": {"type": "integer", "description": "Quarter (1-4), requires year", "minimum": 1, "maximum": 4},
                    "years": {"type": "integer", "description": "Number of years of history when no year is given", "default": 3, "minimum": 1, "maximum": 20}
                },
                "required": ["ticker"]
            }),
            Self::CompareCompanies => json!({
                "type": "object",
                "properties": {
                    "tickers": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of ticker symbols (2 to 10)",
                        "minItems": 2,
                        "maxItems": 10
                    },
                    "metric": {
                        "type": "string",
                        "enum": CompareMetric::NAMES,
                        "description": "Metric to compare"
                    },
                    "year": {"type": "integer", "description": "Optional specific year to compare (defaults to latest)"}
                },
                "required": ["tickers", "metric"]
            }),
            Self::GetStockPriceHistory => json!({
                "type": "object",
                "properties": {
                    "ticker": ticker,
                    "start_date": {"type": "string", "format": "date", "description": "Start date (YYYY-MM-DD)"},
                    "end_date": {"type": "string", "format": "date", "description": "End date (YYYY-MM-DD)"},
                    "limit": {"type": "integer", "description": "Max rows per page", "default": 100, "minimum": 1, "maximum": 500},
                    "cursor": {"type": "string", "description": "Cursor from a previous page"}
                },
                "required": ["ticker", "start_date", "end_date"]
            }),
            Self::GetAnalystRatings => json!({
                "type": "object",
                "properties": {
                    "ticker": ticker,
                    "limit": {"type": "integer", "description": "Number of recent ratings", "default": 5, "minimum": 1, "maximum": 50}
                },
                "required": ["ticker"]
            }),
            Self::ScreenStocks => json!({
                "type": "object",
                "properties": {
                    "sector": {"type": "string", "description": "Sector name (case-insensitive)"},
                    "country": {"type": "string", "description": "Country code"},
                    "min_market_cap": {"type": "number", "description": "Minimum market cap"},
                    "max_market_cap": {"type": "number", "description": "Maximum market cap"},
                    "min_employees": {"type": "integer", "description": "Minimum employee count"},
                    "limit": {"type": "integer", "description": "Max results", "default": 20, "minimum": 1, "maximum": 100}
                }
            }),
            Self::GetSectorOverview => json!({
                "type": "object",
                "properties": {
                    "sector": {"type": "string", "description": "Sector to detail; omit for all sectors"}
                }
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Tool '{s}' is not registered"))
    }
}

/// Catalog entry as listed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The full catalog.
pub fn catalog() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}

/// Names of every registered tool.
pub fn tool_names() -> Vec<&'static str> {
    ToolName::ALL.iter().map(ToolName::as_str).collect()
}

/// Metrics `compare_companies` can rank on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMetric {
    Revenue,
    NetIncome,
    MarketCap,
    OperatingMargin,
    NetMargin,
}

impl CompareMetric {
    pub const NAMES: [&'static str; 5] = [
        "revenue",
        "net_income",
        "market_cap",
        "operating_margin",
        "net_margin",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::NetIncome => "net_income",
            Self::MarketCap => "market_cap",
            Self::OperatingMargin => "operating_margin",
            Self::NetMargin => "net_margin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "revenue" => Some(Self::Revenue),
            "net_income" => Some(Self::NetIncome),
            "market_cap" => Some(Self::MarketCap),
            "operating_margin" => Some(Self::OperatingMargin),
            "net_margin" => Some(Self::NetMargin),
            _ => None,
        }
    }
}

impl fmt::Display for CompareMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
