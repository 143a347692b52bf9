//! Financial statement queries.
//!
//! A year is represented by its annual row when one exists, otherwise by the
//! aggregate of its quarterly rows: flows (revenue, income, EPS, cash flow)
//! are summed, balance-sheet figures come from the latest quarter and margins
//! are recomputed from the summed flows.

use std::collections::BTreeMap;

use findata_core::metrics::{cagr, round_to};
use findata_core::models::{FinancialReport, FinancialSummary, ReportKind, YearFinancials};
use findata_core::request::FinancialReportArgs;
use findata_core::FindataError;
use rusqlite::{params, Connection, Row};

use crate::access::UserContext;
use crate::companies::resolve_id;
use crate::error::StoreResult;

/// What `get_financial_report` returns.
#[derive(Debug, Clone, PartialEq)]
pub enum FinancialReportResult {
    /// A single period.
    Report(FinancialReport),
    /// A multi-year summary.
    Summary(FinancialSummary),
}

fn report_from_row(ticker: &str, row: &Row<'_>) -> rusqlite::Result<FinancialReport> {
    let quarter: Option<u8> = row.get(1)?;
    Ok(FinancialReport {
        ticker: ticker.to_string(),
        period_year: row.get(0)?,
        period_quarter: quarter,
        kind: if quarter.is_some() {
            ReportKind::Quarterly
        } else {
            ReportKind::Annual
        },
        revenue: row.get(2)?,
        gross_profit: row.get(3)?,
        operating_income: row.get(4)?,
        net_income: row.get(5)?,
        eps: row.get(6)?,
        assets: row.get(7)?,
        liabilities: row.get(8)?,
        operating_margin: row.get(9)?,
        net_margin: row.get(10)?,
        gross_margin: row.get(11)?,
        debt_to_equity: row.get(12)?,
        free_cash_flow: row.get(13)?,
        report_date: row.get(14)?,
    })
}

/// Every stored row of a company, ordered by year then quarter (annual first).
fn load_rows(conn: &Connection, company_id: &str, ticker: &str) -> StoreResult<Vec<FinancialReport>> {
    let mut stmt = conn.prepare(
        "SELECT period_year, period_quarter, revenue, gross_profit, operating_income,
                net_income, eps, assets, liabilities, operating_margin, net_margin,
                gross_margin, debt_to_equity, free_cash_flow, report_date
         FROM financials
         WHERE company_id = ?1
         ORDER BY period_year ASC, period_quarter IS NOT NULL, period_quarter ASC",
    )?;
    let rows = stmt
        .query_map(params![company_id], |row| report_from_row(ticker, row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn sum(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

fn ratio_or_mean(
    numerator: Option<f64>,
    revenue: Option<f64>,
    fallback: impl Iterator<Item = Option<f64>>,
) -> Option<f64> {
    match (numerator, revenue) {
        (Some(n), Some(r)) if r > 0.0 => Some(round_to(n / r, 6)),
        _ => mean(fallback).map(|m| round_to(m, 6)),
    }
}

/// Combine a year's quarterly rows into one report.
fn aggregate_quarters(ticker: &str, year: i32, quarters: &[FinancialReport]) -> FinancialReport {
    let revenue = sum(quarters.iter().map(|q| q.revenue));
    let gross_profit = sum(quarters.iter().map(|q| q.gross_profit));
    let operating_income = sum(quarters.iter().map(|q| q.operating_income));
    let net_income = sum(quarters.iter().map(|q| q.net_income));
    let latest = quarters.last();

    FinancialReport {
        ticker: ticker.to_string(),
        period_year: year,
        period_quarter: None,
        kind: ReportKind::AggregatedQuarters,
        revenue,
        gross_profit,
        operating_income,
        net_income,
        eps: sum(quarters.iter().map(|q| q.eps)).map(|e| round_to(e, 4)),
        assets: latest.and_then(|q| q.assets),
        liabilities: latest.and_then(|q| q.liabilities),
        operating_margin: ratio_or_mean(
            operating_income,
            revenue,
            quarters.iter().map(|q| q.operating_margin),
        ),
        net_margin: ratio_or_mean(net_income, revenue, quarters.iter().map(|q| q.net_margin)),
        gross_margin: ratio_or_mean(
            gross_profit,
            revenue,
            quarters.iter().map(|q| q.gross_margin),
        ),
        debt_to_equity: latest.and_then(|q| q.debt_to_equity),
        free_cash_flow: sum(quarters.iter().map(|q| q.free_cash_flow)),
        report_date: quarters.iter().filter_map(|q| q.report_date).max(),
    }
}

/// One report per year with data, ascending.
pub(crate) fn yearly_reports(
    conn: &Connection,
    company_id: &str,
    ticker: &str,
) -> StoreResult<Vec<FinancialReport>> {
    let mut by_year: BTreeMap<i32, Vec<FinancialReport>> = BTreeMap::new();
    for row in load_rows(conn, company_id, ticker)? {
        by_year.entry(row.period_year).or_default().push(row);
    }

    Ok(by_year
        .into_iter()
        .filter_map(|(year, rows)| {
            if let Some(annual) = rows.iter().find(|r| r.period_quarter.is_none()) {
                return Some(annual.clone());
            }
            let quarters: Vec<FinancialReport> = rows
                .into_iter()
                .filter(|r| r.period_quarter.is_some())
                .collect();
            (!quarters.is_empty()).then(|| aggregate_quarters(ticker, year, &quarters))
        })
        .collect())
}

fn year_financials(r: &FinancialReport) -> YearFinancials {
    YearFinancials {
        year: r.period_year,
        revenue: r.revenue,
        net_income: r.net_income,
        operating_margin: r.operating_margin,
        net_margin: r.net_margin,
        eps: r.eps,
        gross_margin: r.gross_margin,
        debt_to_equity: r.debt_to_equity,
        free_cash_flow: r.free_cash_flow,
    }
}

fn growth(first: Option<f64>, last: Option<f64>, years: i64) -> Option<f64> {
    match (first, last) {
        (Some(f), Some(l)) => cagr(f, l, years).map(|g| round_to(g, 6)),
        _ => None,
    }
}

/// The last `years` years of a company, ascending, with revenue and net income CAGR.
pub fn summary(
    conn: &Connection,
    ctx: &UserContext,
    ticker: &str,
    years: usize,
) -> StoreResult<FinancialSummary> {
    let ticker = ticker.trim().to_uppercase();
    let company_id = resolve_id(conn, ctx, &ticker)?;
    let reports = yearly_reports(conn, &company_id, &ticker)?;

    let skip = reports.len().saturating_sub(years);
    let data: Vec<YearFinancials> = reports[skip..].iter().map(year_financials).collect();

    let (revenue_cagr, net_income_cagr) = match (data.first(), data.last()) {
        (Some(first), Some(last)) if last.year > first.year => {
            let span = i64::from(last.year - first.year);
            (
                growth(first.revenue, last.revenue, span),
                growth(first.net_income, last.net_income, span),
            )
        }
        _ => (None, None),
    };

    Ok(FinancialSummary {
        ticker,
        years_covered: data.len(),
        data,
        revenue_cagr,
        net_income_cagr,
    })
}

/// A single period's report.
pub fn report(
    conn: &Connection,
    ctx: &UserContext,
    ticker: &str,
    year: i32,
    quarter: Option<u8>,
) -> StoreResult<FinancialReport> {
    let ticker = ticker.trim().to_uppercase();
    let company_id = resolve_id(conn, ctx, &ticker)?;
    let rows: Vec<FinancialReport> = load_rows(conn, &company_id, &ticker)?
        .into_iter()
        .filter(|r| r.period_year == year)
        .collect();

    let found = match quarter {
        Some(q) => rows.into_iter().find(|r| r.period_quarter == Some(q)),
        None => match rows.iter().find(|r| r.period_quarter.is_none()) {
            Some(annual) => Some(annual.clone()),
            None if rows.is_empty() => None,
            None => Some(aggregate_quarters(&ticker, year, &rows)),
        },
    };

    found.ok_or_else(|| {
        let period = match quarter {
            Some(q) => format!("Q{q} {year}"),
            None => year.to_string(),
        };
        FindataError::not_found(format!("No financial report for '{ticker}' in {period}")).into()
    })
}

/// Entry point for `get_financial_report`.
pub fn get_financial_report(
    conn: &Connection,
    ctx: &UserContext,
    args: &FinancialReportArgs,
) -> StoreResult<FinancialReportResult> {
    match args.year {
        Some(year) => report(conn, ctx, &args.ticker, year, args.quarter)
            .map(FinancialReportResult::Report),
        None => summary(conn, ctx, &args.ticker, args.years).map(FinancialReportResult::Summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use approx::assert_relative_eq;

    fn admin() -> UserContext {
        UserContext::admin()
    }

    #[test]
    fn test_summary_aggregates_quarters() {
        let db = Database::sample().unwrap();
        let s = db.with_conn(|c| summary(c, &admin(), "alph", 3)).unwrap();
        assert_eq!(s.ticker, "ALPH");
        assert_eq!(s.years_covered, 2);
        assert_eq!(s.data[0].year, 2023);
        assert_eq!(s.data[1].year, 2024);
        assert_relative_eq!(s.data[0].revenue.unwrap(), 200e9);
        assert_relative_eq!(s.data[1].revenue.unwrap(), 218e9);
        assert_relative_eq!(s.data[1].net_income.unwrap(), 44e9);
        assert_relative_eq!(s.revenue_cagr.unwrap(), 0.09, epsilon = 1e-6);
        assert_relative_eq!(s.net_income_cagr.unwrap(), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_summary_prefers_annual_rows() {
        let db = Database::sample().unwrap();
        let s = db.with_conn(|c| summary(c, &admin(), "GAMA", 3)).unwrap();
        assert_eq!(s.years_covered, 3);
        assert_relative_eq!(s.revenue_cagr.unwrap(), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_summary_limits_years() {
        let db = Database::sample().unwrap();
        let s = db.with_conn(|c| summary(c, &admin(), "GAMA", 1)).unwrap();
        assert_eq!(s.years_covered, 1);
        assert_eq!(s.data[0].year, 2024);
        assert!(s.revenue_cagr.is_none());
    }

    #[test]
    fn test_summary_without_financials() {
        let db = Database::sample().unwrap();
        // BETA has a single year
        let s = db.with_conn(|c| summary(c, &admin(), "BETA", 3)).unwrap();
        assert_eq!(s.years_covered, 1);
        assert!(s.net_income_cagr.is_none());
    }

    #[test]
    fn test_report_aggregated_year() {
        let db = Database::sample().unwrap();
        let r = db
            .with_conn(|c| report(c, &admin(), "ALPH", 2024, None))
            .unwrap();
        assert_eq!(r.kind, ReportKind::AggregatedQuarters);
        assert_relative_eq!(r.revenue.unwrap(), 218e9);
        assert_relative_eq!(r.eps.unwrap(), 22.0);
        assert_relative_eq!(r.assets.unwrap(), 200e9);
        assert_relative_eq!(r.net_margin.unwrap(), round_to(44.0 / 218.0, 6));
        assert_eq!(r.report_date.unwrap().to_string(), "2024-12-15");
    }

    #[test]
    fn test_report_single_quarter() {
        let db = Database::sample().unwrap();
        let r = db
            .with_conn(|c| report(c, &admin(), "ALPH", 2023, Some(3)))
            .unwrap();
        assert_eq!(r.kind, ReportKind::Quarterly);
        assert_eq!(r.period_quarter, Some(3));
        assert_relative_eq!(r.revenue.unwrap(), 52e9);
    }

    #[test]
    fn test_report_annual_row() {
        let db = Database::sample().unwrap();
        let r = db
            .with_conn(|c| report(c, &admin(), "GAMA", 2023, None))
            .unwrap();
        assert_eq!(r.kind, ReportKind::Annual);
        assert_relative_eq!(r.revenue.unwrap(), 33e9, epsilon = 1.0);
    }

    #[test]
    fn test_report_missing_period() {
        let db = Database::sample().unwrap();
        let err: FindataError = db
            .with_conn(|c| report(c, &admin(), "ALPH", 2019, None))
            .unwrap_err()
            .into();
        assert!(matches!(err, FindataError::NotFound { .. }));

        let err: FindataError = db
            .with_conn(|c| report(c, &admin(), "GAMA", 2023, Some(2)))
            .unwrap_err()
            .into();
        assert!(err.user_message().contains("Q2 2023"));
    }

    #[test]
    fn test_unknown_ticker_before_period() {
        let db = Database::sample().unwrap();
        let err: FindataError = db
            .with_conn(|c| report(c, &admin(), "ZZZZ", 2019, None))
            .unwrap_err()
            .into();
        assert!(matches!(err, FindataError::TickerNotFound { .. }));
    }
}
