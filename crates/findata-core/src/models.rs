//! Query results returned in the `data` field of the envelope.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::request::ScreenCriteria;

/// Lightweight company row returned by search and screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyBrief {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub market_cap: Option<f64>,
    pub country: String,
}

/// Full company profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub market_cap: Option<f64>,
    pub employees: Option<i64>,
    pub description: Option<String>,
    pub ceo: Option<String>,
    pub founded_year: Option<i32>,
    pub country: String,
    pub currency: String,
}

/// A page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<CompanyBrief>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// How a [`FinancialReport`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// A stored annual row.
    Annual,
    /// A stored quarterly row.
    Quarterly,
    /// Summed from a year's quarterly rows.
    AggregatedQuarters,
}

/// Financial statement figures for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub ticker: String,
    pub period_year: i32,
    pub period_quarter: Option<u8>,
    pub kind: ReportKind,
    pub revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub eps: Option<f64>,
    pub assets: Option<f64>,
    pub liabilities: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub gross_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub report_date: Option<NaiveDate>,
}

/// One year of a multi-year summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearFinancials {
    pub year: i32,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub eps: Option<f64>,
    pub gross_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

/// Multi-year financial summary with growth rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub ticker: String,
    pub years_covered: usize,
    /// Ascending by year.
    pub data: Vec<YearFinancials>,
    pub revenue_cagr: Option<f64>,
    pub net_income_cagr: Option<f64>,
}

/// Single day of OHLC data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPriceRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    /// Return from the previous trading day in the requested range.
    pub daily_return: Option<f64>,
}

/// A page of price history with statistics over the whole range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPriceHistory {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub prices: Vec<StockPriceRow>,
    pub total_return_pct: Option<f64>,
    pub max_drawdown_pct: Option<f64>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Single analyst rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystRatingRow {
    pub firm_name: String,
    pub rating: String,
    pub previous_rating: Option<String>,
    pub price_target: Option<f64>,
    pub rating_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingCount {
    pub rating: String,
    pub count: usize,
}

/// Aggregated analyst consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystConsensus {
    pub ticker: String,
    pub total_ratings: usize,
    /// Most frequent first.
    pub rating_counts: Vec<RatingCount>,
    pub average_price_target: Option<f64>,
    /// Newest first.
    pub recent_ratings: Vec<AnalystRatingRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub ticker: String,
    pub metric: String,
    pub value: Option<f64>,
}

/// Result of `compare_companies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub comparison: Vec<ComparisonEntry>,
    pub winner: Option<String>,
    pub explanation: String,
}

impl Comparison {
    /// Rank entries: the winner is the largest non-null value, first one on ties.
    pub fn rank(metric: &str, comparison: Vec<ComparisonEntry>) -> Self {
        let winner = comparison
            .iter()
            .filter_map(|e| e.value.map(|v| (e, v)))
            .fold(None::<(&ComparisonEntry, f64)>, |best, (e, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((e, v)),
            })
            .map(|(e, _)| e.ticker.clone());

        let explanation = match &winner {
            Some(w) => {
                let tickers: Vec<&str> = comparison.iter().map(|e| e.ticker.as_str()).collect();
                format!("{} leads on {} among {}.", w, metric, tickers.join(", "))
            }
            None => "Insufficient data to determine winner.".to_string(),
        };

        Self {
            comparison,
            winner,
            explanation,
        }
    }
}

/// Result of `screen_stocks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenResults {
    pub results: Vec<CompanyBrief>,
    pub criteria: ScreenCriteria,
}

/// Aggregates for one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSummary {
    pub sector: String,
    pub company_count: usize,
    pub total_market_cap: f64,
    pub average_market_cap: Option<f64>,
}

/// All sectors, by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorList {
    pub sectors: Vec<SectorSummary>,
}

/// One sector in detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorDetail {
    pub sector: String,
    pub company_count: usize,
    pub total_market_cap: f64,
    pub average_market_cap: Option<f64>,
    /// Average of each company's latest net margin.
    pub average_net_margin: Option<f64>,
    /// Largest by market cap.
    pub top_companies: Vec<CompanyBrief>,
}
