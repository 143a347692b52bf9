//! Stock price history.

use chrono::NaiveDate;
use findata_core::cursor::{self, SCOPE_PRICES};
use findata_core::metrics::{max_drawdown, round_to, simple_return, total_return};
use findata_core::models::{StockPriceHistory, StockPriceRow};
use findata_core::request::PriceHistoryArgs;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use crate::access::UserContext;
use crate::companies::resolve_id;
use crate::error::StoreResult;

/// One page of prices in `[start_date, end_date]`.
///
/// Total return and max drawdown cover the whole range, not just the page.
/// The first row of a later page gets its daily return from the last close
/// before it in the range, so returns read the same however the range is paged.
pub fn price_history(
    conn: &Connection,
    ctx: &UserContext,
    args: &PriceHistoryArgs,
) -> StoreResult<StockPriceHistory> {
    let ticker = args.ticker.trim().to_uppercase();
    let company_id = resolve_id(conn, ctx, &ticker)?;

    let closes = range_closes(conn, &company_id, args.start_date, args.end_date)?;
    let series: Vec<f64> = closes.iter().map(|(_, c)| *c).collect();

    let after = cursor::decode(args.cursor.as_deref(), SCOPE_PRICES).and_then(|k| {
        NaiveDate::parse_from_str(&k, "%Y-%m-%d")
            .map_err(|e| tracing::debug!("Ignoring price cursor '{}': {}", k, e))
            .ok()
    });

    let mut sql = String::from(
        "SELECT date, open, high, low, close, volume FROM stock_prices
         WHERE company_id = ? AND date >= ? AND date <= ?",
    );
    let mut params: Vec<Value> = vec![
        Value::Text(company_id),
        Value::Text(args.start_date.to_string()),
        Value::Text(args.end_date.to_string()),
    ];
    if let Some(after) = after {
        sql.push_str(" AND date > ?");
        params.push(Value::Text(after.to_string()));
    }
    sql.push_str(" ORDER BY date ASC LIMIT ?");
    params.push(Value::Integer(args.limit as i64 + 1));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| {
            Ok(StockPriceRow {
                date: row.get(0)?,
                open: row.get(1)?,
                high: row.get(2)?,
                low: row.get(3)?,
                close: row.get(4)?,
                volume: row.get(5)?,
                daily_return: None,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let page = cursor::paginate(rows, args.limit, SCOPE_PRICES, |r| r.date.to_string());

    let prices = page
        .items
        .into_iter()
        .map(|mut row| {
            let idx = closes.partition_point(|(d, _)| *d < row.date);
            row.daily_return = idx
                .checked_sub(1)
                .and_then(|prev| simple_return(closes[prev].1, row.close))
                .map(|r| round_to(r, 8));
            row
        })
        .collect();

    Ok(StockPriceHistory {
        ticker,
        start_date: args.start_date,
        end_date: args.end_date,
        prices,
        total_return_pct: total_return(&series).map(|r| round_to(r, 6)),
        max_drawdown_pct: max_drawdown(&series).map(|d| round_to(d, 6)),
        next_cursor: page.next_cursor,
        has_more: page.has_more,
    })
}

/// `(date, close)` for every row in the range, ascending.
fn range_closes(
    conn: &Connection,
    company_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> StoreResult<Vec<(NaiveDate, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT date, close FROM stock_prices
         WHERE company_id = ?1 AND date >= ?2 AND date <= ?3
         ORDER BY date ASC",
    )?;
    let rows = stmt
        .query_map(params![company_id, start, end], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
