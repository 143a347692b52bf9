//! Cross-company comparison on one metric.

use findata_core::models::{Comparison, ComparisonEntry, FinancialReport};
use findata_core::request::CompareArgs;
use findata_core::tools::CompareMetric;
use rusqlite::Connection;

use crate::access::UserContext;
use crate::companies::get_profile;
use crate::error::StoreResult;
use crate::financials::yearly_reports;

fn metric_value(report: &FinancialReport, metric: CompareMetric) -> Option<f64> {
    match metric {
        CompareMetric::Revenue => report.revenue,
        CompareMetric::NetIncome => report.net_income,
        CompareMetric::OperatingMargin => report.operating_margin,
        CompareMetric::NetMargin => report.net_margin,
        CompareMetric::MarketCap => None,
    }
}

/// Compare companies; the first unknown ticker fails the whole call.
///
/// `market_cap` comes from the profile. Other metrics come from the requested
/// year, or the latest year with data when the year is absent or missing.
pub fn compare(conn: &Connection, ctx: &UserContext, args: &CompareArgs) -> StoreResult<Comparison> {
    let mut entries = Vec::with_capacity(args.tickers.len());
    for ticker in &args.tickers {
        let profile = get_profile(conn, ctx, ticker)?;
        let value = match args.metric {
            CompareMetric::MarketCap => profile.market_cap,
            metric => {
                let years = yearly_reports(conn, &profile.id, &profile.ticker)?;
                let chosen = args
                    .year
                    .and_then(|y| years.iter().find(|r| r.period_year == y))
                    .or_else(|| years.last());
                chosen.and_then(|r| metric_value(r, metric))
            }
        };
        entries.push(ComparisonEntry {
            ticker: profile.ticker,
            metric: args.metric.as_str().to_string(),
            value,
        });
    }
    Ok(Comparison::rank(args.metric.as_str(), entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use approx::assert_relative_eq;
    use findata_core::FindataError;

    fn args(tickers: &[&str], metric: CompareMetric, year: Option<i32>) -> CompareArgs {
        CompareArgs {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            metric,
            year,
        }
    }

    #[test]
    fn test_market_cap_winner() {
        let db = Database::sample().unwrap();
        let c = db
            .with_conn(|conn| {
                compare(conn, &UserContext::admin(), &args(&["ALPH", "BETA"], CompareMetric::MarketCap, None))
            })
            .unwrap();
        assert_eq!(c.winner.as_deref(), Some("ALPH"));
        assert_relative_eq!(c.comparison[0].value.unwrap(), 500e9);
        assert_relative_eq!(c.comparison[1].value.unwrap(), 120e9);
    }

    #[test]
    fn test_revenue_latest_year() {
        let db = Database::sample().unwrap();
        let c = db
            .with_conn(|conn| {
                compare(conn, &UserContext::admin(), &args(&["BETA", "ALPH"], CompareMetric::Revenue, None))
            })
            .unwrap();
        assert_relative_eq!(c.comparison[0].value.unwrap(), 80e9);
        assert_relative_eq!(c.comparison[1].value.unwrap(), 218e9);
        assert_eq!(c.winner.as_deref(), Some("ALPH"));
    }

    #[test]
    fn test_missing_year_falls_back_to_latest() {
        let db = Database::sample().unwrap();
        let c = db
            .with_conn(|conn| {
                compare(conn, &UserContext::admin(), &args(&["ALPH", "BETA"], CompareMetric::NetIncome, Some(2023)))
            })
            .unwrap();
        // ALPH has 2023; BETA only has 2024
        assert_relative_eq!(c.comparison[0].value.unwrap(), 40e9);
        assert_relative_eq!(c.comparison[1].value.unwrap(), 16e9);
    }

    #[test]
    fn test_unknown_ticker_fails() {
        let db = Database::sample().unwrap();
        let err: FindataError = db
            .with_conn(|conn| {
                compare(conn, &UserContext::admin(), &args(&["ALPH", "ZZZZ"], CompareMetric::Revenue, None))
            })
            .unwrap_err()
            .into();
        assert_eq!(err, FindataError::ticker_not_found("ZZZZ"));
    }
}
