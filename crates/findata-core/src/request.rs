//! Typed tool requests.
//!
//! The argument bag of a tool call is parsed into a [`ToolRequest`] before any
//! I/O happens. Checks run in a fixed order and stop at the first failure:
//! required fields are present and non-blank, then types and formats, then
//! cross-field constraints.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{FindataError, FindataResult};
use crate::tools::{CompareMetric, ToolName};

/// Raw tool arguments.
pub type Arguments = Map<String, Value>;

/// Hard page-size cap for company search.
pub const SEARCH_MAX_LIMIT: usize = 50;
/// Hard page-size cap for price history.
pub const PRICE_HISTORY_MAX_LIMIT: usize = 500;
pub const RATINGS_MAX_LIMIT: usize = 50;
pub const SCREEN_MAX_LIMIT: usize = 100;
pub const SUMMARY_MAX_YEARS: usize = 20;
pub const COMPARE_MIN_TICKERS: usize = 2;
pub const COMPARE_MAX_TICKERS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchCompaniesArgs {
    pub query: String,
    pub limit: usize,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinancialReportArgs {
    pub ticker: String,
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub years: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareArgs {
    pub tickers: Vec<String>,
    pub metric: CompareMetric,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistoryArgs {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub limit: usize,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalystRatingsArgs {
    pub ticker: String,
    pub limit: usize,
}

/// Screening filters, echoed back with the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenCriteria {
    pub sector: Option<String>,
    pub country: Option<String>,
    pub min_market_cap: Option<f64>,
    pub max_market_cap: Option<f64>,
    pub min_employees: Option<i64>,
    pub limit: usize,
}

/// A validated tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    SearchCompanies(SearchCompaniesArgs),
    GetCompanyProfile { ticker: String },
    GetFinancialReport(FinancialReportArgs),
    CompareCompanies(CompareArgs),
    GetStockPriceHistory(PriceHistoryArgs),
    GetAnalystRatings(AnalystRatingsArgs),
    ScreenStocks(ScreenCriteria),
    GetSectorOverview { sector: Option<String> },
}

impl ToolRequest {
    /// Validate `args` for `tool`.
    pub fn parse(tool: ToolName, args: &Arguments) -> FindataResult<Self> {
        check_present(tool, args)?;
        match tool {
            ToolName::SearchCompanies => {
                let query = required_str(args, "query")?;
                let limit = capped_limit(args, "limit", 10, SEARCH_MAX_LIMIT)?;
                let cursor = optional_str(args, "cursor")?;
                Ok(Self::SearchCompanies(SearchCompaniesArgs {
                    query: query.trim().to_string(),
                    limit,
                    cursor,
                }))
            }
            ToolName::GetCompanyProfile => Ok(Self::GetCompanyProfile {
                ticker: required_ticker(args, "ticker")?,
            }),
            ToolName::GetFinancialReport => {
                let ticker = required_ticker(args, "ticker")?;
                let year = optional_int(args, "year")?.map(to_year).transpose()?;
                let quarter = match optional_int(args, "quarter")? {
                    Some(q) if !(1..=4).contains(&q) => {
                        return Err(FindataError::invalid_input("quarter must be between 1 and 4"))
                    }
                    Some(q) => Some(q as u8),
                    None => None,
                };
                if quarter.is_some() && year.is_none() {
                    return Err(FindataError::invalid_input("quarter requires year"));
                }
                let years = capped_limit(args, "years", 3, SUMMARY_MAX_YEARS)?;
                Ok(Self::GetFinancialReport(FinancialReportArgs {
                    ticker,
                    year,
                    quarter,
                    years,
                }))
            }
            ToolName::CompareCompanies => {
                let tickers = match args.get("tickers") {
                    None | Some(Value::Null) => {
                        return Err(FindataError::invalid_input(
                            "Provide at least 2 tickers",
                        ))
                    }
                    Some(v) => v,
                };
                let metric = required_str(args, "metric")?;

                let tickers = ticker_list(tickers)?;
                let metric = CompareMetric::parse(metric.trim()).ok_or_else(|| {
                    FindataError::invalid_input(format!(
                        "metric must be one of {}",
                        CompareMetric::NAMES.join(", ")
                    ))
                })?;
                let year = optional_int(args, "year")?.map(to_year).transpose()?;
                Ok(Self::CompareCompanies(CompareArgs {
                    tickers,
                    metric,
                    year,
                }))
            }
            ToolName::GetStockPriceHistory => {
                let ticker = required_ticker(args, "ticker")?;
                let start = required_str(args, "start_date")?;
                let end = required_str(args, "end_date")?;

                let start_date = parse_date(&start)?;
                let end_date = parse_date(&end)?;
                if start_date > end_date {
                    return Err(FindataError::invalid_input(
                        "start_date must not be after end_date",
                    ));
                }
                let limit = capped_limit(args, "limit", 100, PRICE_HISTORY_MAX_LIMIT)?;
                let cursor = optional_str(args, "cursor")?;
                Ok(Self::GetStockPriceHistory(PriceHistoryArgs {
                    ticker,
                    start_date,
                    end_date,
                    limit,
                    cursor,
                }))
            }
            ToolName::GetAnalystRatings => {
                let ticker = required_ticker(args, "ticker")?;
                let limit = capped_limit(args, "limit", 5, RATINGS_MAX_LIMIT)?;
                Ok(Self::GetAnalystRatings(AnalystRatingsArgs { ticker, limit }))
            }
            ToolName::ScreenStocks => {
                let sector = non_blank(optional_str(args, "sector")?);
                let country = non_blank(optional_str(args, "country")?);
                let min_market_cap = optional_number(args, "min_market_cap")?;
                let max_market_cap = optional_number(args, "max_market_cap")?;
                let min_employees = optional_int(args, "min_employees")?;
                if let (Some(min), Some(max)) = (min_market_cap, max_market_cap) {
                    if min > max {
                        return Err(FindataError::invalid_input(
                            "min_market_cap must not exceed max_market_cap",
                        ));
                    }
                }
                let limit = capped_limit(args, "limit", 20, SCREEN_MAX_LIMIT)?;
                Ok(Self::ScreenStocks(ScreenCriteria {
                    sector,
                    country: country.map(|c| c.to_uppercase()),
                    min_market_cap,
                    max_market_cap,
                    min_employees,
                    limit,
                }))
            }
            ToolName::GetSectorOverview => Ok(Self::GetSectorOverview {
                sector: non_blank(optional_str(args, "sector")?),
            }),
        }
    }

    #[cfg(test)]
    fn tool(&self) -> ToolName {
        match self {
            Self::SearchCompanies(_) => ToolName::SearchCompanies,
            Self::GetCompanyProfile { .. } => ToolName::GetCompanyProfile,
            Self::GetFinancialReport(_) => ToolName::GetFinancialReport,
            Self::CompareCompanies(_) => ToolName::CompareCompanies,
            Self::GetStockPriceHistory(_) => ToolName::GetStockPriceHistory,
            Self::GetAnalystRatings(_) => ToolName::GetAnalystRatings,
            Self::ScreenStocks(_) => ToolName::ScreenStocks,
            Self::GetSectorOverview { .. } => ToolName::GetSectorOverview,
        }
    }
}

/// Every required field is present and not blank, before any type check.
fn check_present(tool: ToolName, args: &Arguments) -> FindataResult<()> {
    for &field in tool.required_fields() {
        let missing = match args.get(field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if missing {
            return Err(match field {
                "tickers" => FindataError::invalid_input("Provide at least 2 tickers"),
                _ => FindataError::invalid_input(format!("{field} is required")),
            });
        }
    }
    Ok(())
}

fn required_str(args: &Arguments, field: &str) -> FindataResult<String> {
    match args.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(FindataError::invalid_input(
            format!("{field} must be a non-empty string"),
        )),
        Some(_) => Err(FindataError::invalid_input(format!(
            "{field} must be a string"
        ))),
    }
}

fn required_ticker(args: &Arguments, field: &str) -> FindataResult<String> {
    required_str(args, field).map(|t| normalize_ticker(&t))
}

fn optional_str(args: &Arguments, field: &str) -> FindataResult<Option<String>> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(FindataError::invalid_input(format!(
            "{field} must be a string"
        ))),
    }
}

fn optional_int(args: &Arguments, field: &str) -> FindataResult<Option<i64>> {
    let invalid = || FindataError::invalid_input(format!("{field} must be an integer"));
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok(Some(i)),
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                _ => Err(invalid()),
            },
        },
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn optional_number(args: &Arguments, field: &str) -> FindataResult<Option<f64>> {
    let invalid = || FindataError::invalid_input(format!("{field} must be a number"));
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Page sizes below 1 are rejected; values above `max` are capped.
fn capped_limit(args: &Arguments, field: &str, default: usize, max: usize) -> FindataResult<usize> {
    match optional_int(args, field)? {
        None => Ok(default),
        Some(n) if n < 1 => Err(FindataError::invalid_input(format!(
            "{field} must be at least 1"
        ))),
        Some(n) => Ok((n as u64).min(max as u64) as usize),
    }
}

fn to_year(y: i64) -> FindataResult<i32> {
    if (1800..=2200).contains(&y) {
        Ok(y as i32)
    } else {
        Err(FindataError::invalid_input(format!("year {y} is out of range")))
    }
}

fn ticker_list(value: &Value) -> FindataResult<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| FindataError::invalid_input("tickers must be an array of strings"))?;
    if items.len() < COMPARE_MIN_TICKERS {
        return Err(FindataError::invalid_input("Provide at least 2 tickers"));
    }
    if items.len() > COMPARE_MAX_TICKERS {
        return Err(FindataError::invalid_input(format!(
            "Provide at most {COMPARE_MAX_TICKERS} tickers"
        )));
    }
    items
        .iter()
        .map(|item| match item.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(normalize_ticker(s)),
            _ => Err(FindataError::invalid_input(
                "tickers must be non-empty strings",
            )),
        })
        .collect()
}

fn parse_date(s: &str) -> FindataResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| FindataError::invalid_input("Dates must be YYYY-MM-DD"))
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Canonical ticker form: trimmed, upper-case.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}
