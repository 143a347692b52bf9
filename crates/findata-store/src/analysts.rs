//! Analyst rating consensus.

use findata_core::metrics::round_to;
use findata_core::models::{AnalystConsensus, AnalystRatingRow, RatingCount};
use findata_core::request::AnalystRatingsArgs;
use rusqlite::{params, Connection};

use crate::access::UserContext;
use crate::companies::resolve_id;
use crate::error::StoreResult;

/// Rating distribution, average price target and the most recent ratings.
pub fn consensus(
    conn: &Connection,
    ctx: &UserContext,
    args: &AnalystRatingsArgs,
) -> StoreResult<AnalystConsensus> {
    let ticker = args.ticker.trim().to_uppercase();
    let company_id = resolve_id(conn, ctx, &ticker)?;

    let mut stmt = conn.prepare(
        "SELECT rating, COUNT(*) FROM analyst_ratings
         WHERE company_id = ?1
         GROUP BY rating
         ORDER BY COUNT(*) DESC, rating ASC",
    )?;
    let rating_counts = stmt
        .query_map(params![company_id], |row| {
            Ok(RatingCount {
                rating: row.get(0)?,
                count: row.get::<_, i64>(1)? as usize,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    let total_ratings = rating_counts.iter().map(|r| r.count).sum();

    let average_price_target: Option<f64> = conn.query_row(
        "SELECT AVG(price_target) FROM analyst_ratings WHERE company_id = ?1",
        params![company_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT firm_name, rating, previous_rating, price_target, rating_date, notes
         FROM analyst_ratings
         WHERE company_id = ?1
         ORDER BY rating_date DESC, firm_name ASC
         LIMIT ?2",
    )?;
    let recent_ratings = stmt
        .query_map(params![company_id, args.limit as i64], |row| {
            Ok(AnalystRatingRow {
                firm_name: row.get(0)?,
                rating: row.get(1)?,
                previous_rating: row.get(2)?,
                price_target: row.get(3)?,
                rating_date: row.get(4)?,
                notes: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalystConsensus {
        ticker,
        total_ratings,
        rating_counts,
        average_price_target: average_price_target.map(|p| round_to(p, 2)),
        recent_ratings,
    })
}
