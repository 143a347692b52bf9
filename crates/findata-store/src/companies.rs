//! Company queries: lookup, name search and screening.

use findata_core::cursor::{self, SCOPE_COMPANIES};
use findata_core::models::{CompanyBrief, CompanyProfile, ScreenResults, SearchResults};
use findata_core::request::{ScreenCriteria, SearchCompaniesArgs};
use findata_core::FindataError;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

use crate::access::UserContext;
use crate::error::StoreResult;

const BRIEF_COLUMNS: &str = "c.ticker, c.name, c.sector, c.industry, c.market_cap, c.country";

pub(crate) fn brief_from_row(row: &Row<'_>) -> rusqlite::Result<CompanyBrief> {
    Ok(CompanyBrief {
        ticker: row.get(0)?,
        name: row.get(1)?,
        sector: row.get(2)?,
        industry: row.get(3)?,
        market_cap: row.get(4)?,
        country: row.get(5)?,
    })
}

/// Look up a visible company by ticker, case-insensitively.
pub fn find_profile(
    conn: &Connection,
    ctx: &UserContext,
    ticker: &str,
) -> StoreResult<Option<CompanyProfile>> {
    let sql = format!(
        "SELECT c.id, c.ticker, c.name, c.sector, c.industry, c.market_cap, c.employees,
                c.description, c.ceo, c.founded_year, c.country, c.currency
         FROM companies c
         WHERE UPPER(c.ticker) = ? AND {}",
        ctx.company_filter("c")
    );
    let mut params = vec![Value::Text(ticker.trim().to_uppercase())];
    params.extend(ctx.filter_params());

    let profile = conn
        .query_row(&sql, params_from_iter(params), |row| {
            Ok(CompanyProfile {
                id: row.get(0)?,
                ticker: row.get(1)?,
                name: row.get(2)?,
                sector: row.get(3)?,
                industry: row.get(4)?,
                market_cap: row.get(5)?,
                employees: row.get(6)?,
                description: row.get(7)?,
                ceo: row.get(8)?,
                founded_year: row.get(9)?,
                country: row.get(10)?,
                currency: row.get(11)?,
            })
        })
        .optional()?;
    Ok(profile)
}

/// Profile of a visible company, or `TICKER_NOT_FOUND`.
pub fn get_profile(conn: &Connection, ctx: &UserContext, ticker: &str) -> StoreResult<CompanyProfile> {
    find_profile(conn, ctx, ticker)?.ok_or_else(|| FindataError::ticker_not_found(ticker).into())
}

/// Id of a visible company, or `TICKER_NOT_FOUND`.
pub fn resolve_id(conn: &Connection, ctx: &UserContext, ticker: &str) -> StoreResult<String> {
    let sql = format!(
        "SELECT c.id FROM companies c WHERE UPPER(c.ticker) = ? AND {}",
        ctx.company_filter("c")
    );
    let mut params = vec![Value::Text(ticker.trim().to_uppercase())];
    params.extend(ctx.filter_params());

    conn.query_row(&sql, params_from_iter(params), |row| row.get(0))
        .optional()?
        .ok_or_else(|| FindataError::ticker_not_found(ticker).into())
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .to_uppercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Case-insensitive substring search on ticker or name, ordered by ticker.
pub fn search(
    conn: &Connection,
    ctx: &UserContext,
    args: &SearchCompaniesArgs,
) -> StoreResult<SearchResults> {
    let after = cursor::decode(args.cursor.as_deref(), SCOPE_COMPANIES);

    let pattern = like_pattern(&args.query);
    let mut sql = format!(
        "SELECT {BRIEF_COLUMNS} FROM companies c
         WHERE (UPPER(c.ticker) LIKE ? ESCAPE '\\' OR UPPER(c.name) LIKE ? ESCAPE '\\')
           AND {}",
        ctx.company_filter("c")
    );
    let mut params = vec![Value::Text(pattern.clone()), Value::Text(pattern)];
    params.extend(ctx.filter_params());
    if let Some(after) = after {
        sql.push_str(" AND c.ticker > ?");
        params.push(Value::Text(after));
    }
    sql.push_str(" ORDER BY c.ticker LIMIT ?");
    params.push(Value::Integer(args.limit as i64 + 1));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), brief_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let page = cursor::paginate(rows, args.limit, SCOPE_COMPANIES, |c| c.ticker.clone());
    Ok(SearchResults {
        results: page.items,
        next_cursor: page.next_cursor,
        has_more: page.has_more,
    })
}

/// Filter companies, largest market cap first.
pub fn screen(
    conn: &Connection,
    ctx: &UserContext,
    criteria: &ScreenCriteria,
) -> StoreResult<ScreenResults> {
    let mut sql = format!(
        "SELECT {BRIEF_COLUMNS} FROM companies c WHERE {}",
        ctx.company_filter("c")
    );
    let mut params = ctx.filter_params();

    if let Some(sector) = &criteria.sector {
        sql.push_str(" AND LOWER(c.sector) = LOWER(?)");
        params.push(Value::Text(sector.clone()));
    }
    if let Some(country) = &criteria.country {
        sql.push_str(" AND UPPER(c.country) = ?");
        params.push(Value::Text(country.to_uppercase()));
    }
    if let Some(min) = criteria.min_market_cap {
        sql.push_str(" AND c.market_cap >= ?");
        params.push(Value::Real(min));
    }
    if let Some(max) = criteria.max_market_cap {
        sql.push_str(" AND c.market_cap <= ?");
        params.push(Value::Real(max));
    }
    if let Some(min) = criteria.min_employees {
        sql.push_str(" AND c.employees >= ?");
        params.push(Value::Integer(min));
    }
    sql.push_str(" ORDER BY c.market_cap IS NULL, c.market_cap DESC, c.ticker ASC LIMIT ?");
    params.push(Value::Integer(criteria.limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let results = stmt
        .query_map(params_from_iter(params), brief_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ScreenResults {
        results,
        criteria: criteria.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::seed::{insert_company, insert_user, CompanySeed};

    fn search_args(query: &str, limit: usize, cursor: Option<String>) -> SearchCompaniesArgs {
        SearchCompaniesArgs {
            query: query.to_string(),
            limit,
            cursor,
        }
    }

    fn criteria() -> ScreenCriteria {
        ScreenCriteria {
            sector: None,
            country: None,
            min_market_cap: None,
            max_market_cap: None,
            min_employees: None,
            limit: 20,
        }
    }

    #[test]
    fn test_profile_case_insensitive() {
        let db = Database::sample().unwrap();
        let profile = db
            .with_conn(|c| get_profile(c, &UserContext::admin(), "alph"))
            .unwrap();
        assert_eq!(profile.ticker, "ALPH");
        assert_eq!(profile.name, "Alpha Corp");
        assert_eq!(profile.employees, Some(50_000));
        assert_eq!(profile.currency, "USD");
    }

    #[test]
    fn test_unknown_ticker() {
        let db = Database::sample().unwrap();
        let err = db
            .with_conn(|c| get_profile(c, &UserContext::admin(), "ZZZZ"))
            .unwrap_err();
        let err: FindataError = err.into();
        assert_eq!(err, FindataError::ticker_not_found("ZZZZ"));
    }

    #[test]
    fn test_search_by_name_and_ticker() {
        let db = Database::sample().unwrap();
        let ctx = UserContext::admin();
        let by_name = db
            .with_conn(|c| search(c, &ctx, &search_args("alpha", 10, None)))
            .unwrap();
        assert_eq!(by_name.results.len(), 1);
        assert_eq!(by_name.results[0].ticker, "ALPH");

        let by_ticker = db
            .with_conn(|c| search(c, &ctx, &search_args("gam", 10, None)))
            .unwrap();
        assert_eq!(by_ticker.results[0].ticker, "GAMA");
        assert!(!by_ticker.has_more);
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let db = Database::sample().unwrap();
        let res = db
            .with_conn(|c| search(c, &UserContext::admin(), &search_args("%", 10, None)))
            .unwrap();
        assert!(res.results.is_empty());
    }

    #[test]
    fn test_search_cursor_chain() {
        let db = Database::sample().unwrap();
        let ctx = UserContext::admin();
        let mut cursor = None;
        let mut seen = Vec::new();
        loop {
            // "a" matches all three names
            let page = db
                .with_conn(|c| search(c, &ctx, &search_args("a", 1, cursor.clone())))
                .unwrap();
            seen.extend(page.results.into_iter().map(|r| r.ticker));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["ALPH", "BETA", "GAMA"]);
    }

    #[test]
    fn test_search_malformed_cursor_restarts() {
        let db = Database::sample().unwrap();
        let res = db
            .with_conn(|c| {
                search(
                    c,
                    &UserContext::admin(),
                    &search_args("a", 10, Some("garbage".to_string())),
                )
            })
            .unwrap();
        assert_eq!(res.results.len(), 3);
    }

    #[test]
    fn test_screen_orders_by_market_cap() {
        let db = Database::sample().unwrap();
        let res = db
            .with_conn(|c| screen(c, &UserContext::admin(), &criteria()))
            .unwrap();
        let tickers: Vec<_> = res.results.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["ALPH", "BETA", "GAMA"]);
    }

    #[test]
    fn test_screen_filters() {
        let db = Database::sample().unwrap();
        let ctx = UserContext::admin();

        let mut c = criteria();
        c.sector = Some("technology".to_string());
        let res = db.with_conn(|conn| screen(conn, &ctx, &c)).unwrap();
        assert_eq!(res.results.len(), 1);

        let mut c = criteria();
        c.country = Some("UK".to_string());
        let res = db.with_conn(|conn| screen(conn, &ctx, &c)).unwrap();
        assert_eq!(res.results[0].ticker, "GAMA");

        let mut c = criteria();
        c.min_market_cap = Some(100e9);
        c.min_employees = Some(20_000);
        let res = db.with_conn(|conn| screen(conn, &ctx, &c)).unwrap();
        assert_eq!(res.results.len(), 1);
        assert_eq!(res.results[0].ticker, "ALPH");
    }

    #[test]
    fn test_private_company_visibility() {
        let db = Database::sample().unwrap();
        db.with_conn(|c| {
            insert_user(c, "u1", "owner@example.com", "user")?;
            let mut private = CompanySeed::new("PRIV", "Private Holdings", "Finance", "Holding");
            private.user_id = Some("u1".to_string());
            insert_company(c, &private)
        })
        .unwrap();

        let anon = db.with_conn(|c| find_profile(c, &UserContext::anonymous(), "PRIV"));
        assert!(anon.unwrap().is_none());

        let other = db.with_conn(|c| find_profile(c, &UserContext::user("u2"), "PRIV"));
        assert!(other.unwrap().is_none());

        let owner = db.with_conn(|c| find_profile(c, &UserContext::user("u1"), "PRIV"));
        assert!(owner.unwrap().is_some());

        let admin = db.with_conn(|c| resolve_id(c, &UserContext::admin(), "priv"));
        assert!(admin.is_ok());

        let found = db
            .with_conn(|c| search(c, &UserContext::anonymous(), &search_args("priv", 10, None)))
            .unwrap();
        assert!(found.results.is_empty());
    }
}
