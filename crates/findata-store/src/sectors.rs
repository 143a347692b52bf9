//! Sector aggregation.

use findata_core::metrics::round_to;
use findata_core::models::{SectorDetail, SectorList, SectorSummary};
use findata_core::FindataError;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::access::UserContext;
use crate::companies::brief_from_row;
use crate::error::StoreResult;

/// Companies listed in a sector detail.
pub const TOP_COMPANIES: usize = 5;

/// What `get_sector_overview` returns.
#[derive(Debug, Clone, PartialEq)]
pub enum SectorOverview {
    All(SectorList),
    One(SectorDetail),
}

impl SectorOverview {
    /// Rows reported in the envelope: sectors listed, or companies in the sector.
    pub fn row_count(&self) -> usize {
        match self {
            Self::All(list) => list.sectors.len(),
            Self::One(detail) => detail.company_count,
        }
    }
}

/// Counts and market caps per sector, by sector name.
pub fn all_sectors(conn: &Connection, ctx: &UserContext) -> StoreResult<SectorList> {
    let sql = format!(
        "SELECT c.sector, COUNT(*), COALESCE(SUM(c.market_cap), 0), AVG(c.market_cap)
         FROM companies c
         WHERE {}
         GROUP BY c.sector
         ORDER BY c.sector ASC",
        ctx.company_filter("c")
    );
    let mut stmt = conn.prepare(&sql)?;
    let sectors = stmt
        .query_map(params_from_iter(ctx.filter_params()), |row| {
            Ok(SectorSummary {
                sector: row.get(0)?,
                company_count: row.get::<_, i64>(1)? as usize,
                total_market_cap: row.get(2)?,
                average_market_cap: row.get::<_, Option<f64>>(3)?.map(|v| round_to(v, 2)),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SectorList { sectors })
}

/// Detail for one sector, matched case-insensitively.
pub fn sector_detail(conn: &Connection, ctx: &UserContext, sector: &str) -> StoreResult<SectorDetail> {
    let filter = ctx.company_filter("c");
    let mut base_params = vec![Value::Text(sector.trim().to_string())];
    base_params.extend(ctx.filter_params());

    let summary_sql = format!(
        "SELECT MIN(c.sector), COUNT(*), COALESCE(SUM(c.market_cap), 0), AVG(c.market_cap)
         FROM companies c
         WHERE LOWER(c.sector) = LOWER(?) AND {filter}"
    );
    let (name, count, total, average): (Option<String>, i64, f64, Option<f64>) = conn.query_row(
        &summary_sql,
        params_from_iter(base_params.clone()),
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;
    let name = match name {
        Some(name) if count > 0 => name,
        _ => {
            return Err(
                FindataError::not_found(format!("No companies found in sector '{}'", sector.trim()))
                    .into(),
            )
        }
    };

    // Each company's most recent fiscal year of rows.
    let margin_sql = format!(
        "SELECT AVG(f.net_margin)
         FROM financials f
         JOIN companies c ON c.id = f.company_id
         WHERE LOWER(c.sector) = LOWER(?) AND {filter}
           AND f.net_margin IS NOT NULL
           AND f.period_year = (SELECT MAX(f2.period_year) FROM financials f2
                                WHERE f2.company_id = f.company_id)"
    );
    let average_net_margin: Option<f64> =
        conn.query_row(&margin_sql, params_from_iter(base_params.clone()), |row| row.get(0))?;

    let top_sql = format!(
        "SELECT c.ticker, c.name, c.sector, c.industry, c.market_cap, c.country
         FROM companies c
         WHERE LOWER(c.sector) = LOWER(?) AND {filter}
         ORDER BY c.market_cap IS NULL, c.market_cap DESC, c.ticker ASC
         LIMIT {TOP_COMPANIES}"
    );
    let mut stmt = conn.prepare(&top_sql)?;
    let top_companies = stmt
        .query_map(params_from_iter(base_params), brief_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SectorDetail {
        sector: name,
        company_count: count as usize,
        total_market_cap: total,
        average_market_cap: average.map(|v| round_to(v, 2)),
        average_net_margin: average_net_margin.map(|v| round_to(v, 6)),
        top_companies,
    })
}

/// Entry point for `get_sector_overview`.
pub fn overview(
    conn: &Connection,
    ctx: &UserContext,
    sector: Option<&str>,
) -> StoreResult<SectorOverview> {
    match sector {
        Some(sector) => sector_detail(conn, ctx, sector).map(SectorOverview::One),
        None => all_sectors(conn, ctx).map(SectorOverview::All),
    }
}
