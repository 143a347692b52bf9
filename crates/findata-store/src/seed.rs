//! Sample data.
//!
//! `sample` is a small fixed fixture (three companies) that the tests rely on.
//! `generated` builds a larger random universe from a fixed RNG seed, so it is
//! also reproducible.

use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

/// Which data set to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedMode {
    Sample,
    Generated,
}

impl FromStr for SeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sample" => Ok(Self::Sample),
            "generated" => Ok(Self::Generated),
            other => Err(format!("unknown seed mode '{other}' (expected sample or generated)")),
        }
    }
}

/// Row counts inserted by a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub companies: usize,
    pub financials: usize,
    pub prices: usize,
    pub ratings: usize,
}

/// A company row to insert.
#[derive(Debug, Clone)]
pub struct CompanySeed {
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
    pub user_id: Option<String>,
}

impl CompanySeed {
    /// A public US company with the given identity and defaults elsewhere.
    pub fn new(ticker: &str, name: &str, sector: &str, industry: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ticker: ticker.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
            industry: industry.to_string(),
            market_cap: None,
            employees: None,
            description: None,
            ceo: None,
            founded_year: None,
            country: "US".to_string(),
            currency: "USD".to_string(),
            user_id: None,
        }
    }
}

/// A financials row to insert.
#[derive(Debug, Clone, Default)]
pub struct FinancialSeed {
    pub period_year: i32,
    pub period_quarter: Option<u8>,
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

pub fn insert_user(conn: &Connection, id: &str, email: &str, role: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO users (id, email, role) VALUES (?1, ?2, ?3)",
        params![id, email, role],
    )?;
    Ok(())
}

pub fn insert_company(conn: &Connection, c: &CompanySeed) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO companies (id, ticker, name, sector, industry, market_cap, employees,
                                description, ceo, founded_year, country, currency, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            c.id,
            c.ticker,
            c.name,
            c.sector,
            c.industry,
            c.market_cap,
            c.employees,
            c.description,
            c.ceo,
            c.founded_year,
            c.country,
            c.currency,
            c.user_id,
        ],
    )?;
    Ok(())
}

pub fn insert_financial(conn: &Connection, company_id: &str, f: &FinancialSeed) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO financials (id, company_id, period_year, period_quarter, revenue,
                                 gross_profit, operating_income, net_income, eps, assets,
                                 liabilities, operating_margin, net_margin, gross_margin,
                                 debt_to_equity, free_cash_flow, report_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            Uuid::new_v4().to_string(),
            company_id,
            f.period_year,
            f.period_quarter,
            f.revenue,
            f.gross_profit,
            f.operating_income,
            f.net_income,
            f.eps,
            f.assets,
            f.liabilities,
            f.operating_margin,
            f.net_margin,
            f.gross_margin,
            f.debt_to_equity,
            f.free_cash_flow,
            f.report_date,
        ],
    )?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn insert_price(
    conn: &Connection,
    company_id: &str,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO stock_prices (id, company_id, date, open, high, low, close, volume)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            Uuid::new_v4().to_string(),
            company_id,
            date,
            open,
            high,
            low,
            close,
            volume
        ],
    )?;
    Ok(())
}

pub fn insert_rating(
    conn: &Connection,
    company_id: &str,
    firm_name: &str,
    rating: &str,
    price_target: Option<f64>,
    rating_date: NaiveDate,
    notes: Option<&str>,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO analyst_ratings (id, company_id, firm_name, rating, price_target,
                                      rating_date, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            Uuid::new_v4().to_string(),
            company_id,
            firm_name,
            rating,
            price_target,
            rating_date,
            notes
        ],
    )?;
    Ok(())
}

fn ymd(y: i32, m: u32, d: u32) -> StoreResult<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| StoreError::seed(format!("bad date {y}-{m}-{d}")))
}

fn is_weekday(d: NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

pub const ALPH_ID: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";
pub const BETA_ID: &str = "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb";
pub const GAMA_ID: &str = "cccccccc-cccc-cccc-cccc-cccccccccccc";

/// Load the three-company fixture.
///
/// - `ALPH` Alpha Corp: Technology, quarterly financials for 2023 and 2024,
///   weekday prices for 2024-03-01..=2024-03-30, five analyst ratings.
/// - `BETA` Beta Industries: Healthcare, quarterly financials for 2024.
/// - `GAMA` Gamma Finance: Finance (UK), annual financials for 2022..=2024.
pub fn seed_sample(conn: &Connection) -> StoreResult<SeedSummary> {
    let tx = conn.unchecked_transaction()?;
    let mut summary = SeedSummary::default();

    let mut alpha = CompanySeed::new("ALPH", "Alpha Corp", "Technology", "Software");
    alpha.id = ALPH_ID.to_string();
    alpha.market_cap = Some(500_000_000_000.0);
    alpha.employees = Some(50_000);
    alpha.description = Some("A leading technology company.".to_string());
    alpha.ceo = Some("Ada Alvarez".to_string());
    alpha.founded_year = Some(1998);

    let mut beta = CompanySeed::new("BETA", "Beta Industries", "Healthcare", "Biotech");
    beta.id = BETA_ID.to_string();
    beta.market_cap = Some(120_000_000_000.0);
    beta.employees = Some(12_000);
    beta.description = Some("A healthcare company.".to_string());

    let mut gamma = CompanySeed::new("GAMA", "Gamma Finance", "Finance", "Banking");
    gamma.id = GAMA_ID.to_string();
    gamma.market_cap = Some(80_000_000_000.0);
    gamma.employees = Some(30_000);
    gamma.description = Some("A global bank.".to_string());
    gamma.country = "UK".to_string();
    gamma.currency = "GBP".to_string();

    for company in [&alpha, &beta, &gamma] {
        insert_company(&tx, company)?;
        summary.companies += 1;
    }

    // ALPH quarters: revenue varies by quarter, net income steps up in 2024.
    const ALPH_REVENUE: [[f64; 4]; 2] = [
        [48_000_000_000.0, 50_000_000_000.0, 52_000_000_000.0, 50_000_000_000.0],
        [52_000_000_000.0, 54_000_000_000.0, 55_000_000_000.0, 57_000_000_000.0],
    ];
    for (i, year) in [2023, 2024].into_iter().enumerate() {
        for q in 1..=4u8 {
            let revenue = ALPH_REVENUE[i][usize::from(q) - 1];
            let net_income = 10_000_000_000.0 + (year - 2023) as f64 * 1_000_000_000.0;
            insert_financial(
                &tx,
                ALPH_ID,
                &FinancialSeed {
                    period_year: year,
                    period_quarter: Some(q),
                    revenue: Some(revenue),
                    gross_profit: Some(25_000_000_000.0),
                    operating_income: Some(15_000_000_000.0),
                    net_income: Some(net_income),
                    eps: Some(5.0 + (year - 2023) as f64 * 0.5),
                    assets: Some(200_000_000_000.0),
                    liabilities: Some(80_000_000_000.0),
                    operating_margin: Some(0.30),
                    net_margin: Some(0.20),
                    report_date: Some(ymd(year, u32::from(q) * 3, 15)?),
                    ..FinancialSeed::default()
                },
            )?;
            summary.financials += 1;
        }
    }

    for q in 1..=4u8 {
        insert_financial(
            &tx,
            BETA_ID,
            &FinancialSeed {
                period_year: 2024,
                period_quarter: Some(q),
                revenue: Some(20_000_000_000.0),
                gross_profit: Some(12_000_000_000.0),
                operating_income: Some(6_000_000_000.0),
                net_income: Some(4_000_000_000.0),
                eps: Some(3.0),
                assets: Some(100_000_000_000.0),
                liabilities: Some(40_000_000_000.0),
                operating_margin: Some(0.30),
                net_margin: Some(0.20),
                report_date: Some(ymd(2024, u32::from(q) * 3, 15)?),
                ..FinancialSeed::default()
            },
        )?;
        summary.financials += 1;
    }

    // GAMA annual rows, revenue growing 10% a year.
    for (i, year) in [2022, 2023, 2024].into_iter().enumerate() {
        let revenue = 30_000_000_000.0 * 1.1_f64.powi(i as i32);
        let net_income = 6_000_000_000.0 * 1.05_f64.powi(i as i32);
        insert_financial(
            &tx,
            GAMA_ID,
            &FinancialSeed {
                period_year: year,
                period_quarter: None,
                revenue: Some(revenue),
                net_income: Some(net_income),
                eps: Some(2.0 + i as f64 * 0.1),
                assets: Some(900_000_000_000.0),
                liabilities: Some(820_000_000_000.0),
                operating_margin: Some(0.28),
                net_margin: Some(net_income / revenue),
                debt_to_equity: Some(10.25),
                report_date: Some(ymd(year, 12, 31)?),
                ..FinancialSeed::default()
            },
        )?;
        summary.financials += 1;
    }

    // ALPH weekday prices, a fixed-seed walk of at most 2% a day.
    let mut rng = StdRng::seed_from_u64(2024);
    let start = ymd(2024, 3, 1)?;
    let mut price = 150.0_f64;
    for offset in 0..30 {
        let date = start + Duration::days(offset);
        if !is_weekday(date) {
            continue;
        }
        let change = price * rng.gen_range(-0.02..0.02);
        let close = round4(price + change);
        insert_price(
            &tx,
            ALPH_ID,
            date,
            round4(price),
            round4(price.max(close) + 1.0),
            round4(price.min(close) - 1.0),
            close,
            rng.gen_range(1_000_000..10_000_000),
        )?;
        summary.prices += 1;
        price = close;
    }

    let firms = ["Goldman Sachs", "Morgan Stanley", "JP Morgan", "Barclays", "Citi"];
    let ratings = ["Strong Buy", "Buy", "Hold", "Buy", "Strong Buy"];
    for (j, (firm, rating)) in firms.iter().zip(ratings).enumerate() {
        let note = format!("Note from {firm}");
        insert_rating(
            &tx,
            ALPH_ID,
            firm,
            rating,
            Some(160.0 + j as f64 * 5.0),
            ymd(2024, 6, 1 + j as u32)?,
            (j % 2 == 0).then_some(note.as_str()),
        )?;
        summary.ratings += 1;
    }

    tx.commit()?;
    Ok(summary)
}

const GENERATED_UNIVERSE: [(&str, &str, &str, &str); 10] = [
    ("AAPL", "Apple Inc.", "Technology", "Consumer Electronics"),
    ("MSFT", "Microsoft Corporation", "Technology", "Software"),
    ("NVDA", "NVIDIA Corporation", "Technology", "Semiconductors"),
    ("JPM", "JPMorgan Chase & Co.", "Finance", "Banking"),
    ("GS", "Goldman Sachs Group", "Finance", "Investment Banking"),
    ("JNJ", "Johnson & Johnson", "Healthcare", "Pharmaceuticals"),
    ("PFE", "Pfizer Inc.", "Healthcare", "Pharmaceuticals"),
    ("XOM", "Exxon Mobil Corporation", "Energy", "Oil & Gas"),
    ("WMT", "Walmart Inc.", "Consumer", "Retail"),
    ("KO", "The Coca-Cola Company", "Consumer", "Beverages"),
];

const RATING_LABELS: [&str; 5] = ["Strong Buy", "Buy", "Hold", "Sell", "Strong Sell"];
const RATING_FIRMS: [&str; 8] = [
    "Goldman Sachs",
    "Morgan Stanley",
    "JP Morgan",
    "Barclays",
    "Citi",
    "UBS",
    "Deutsche Bank",
    "BofA Securities",
];

/// Load a ten-company universe drawn from a fixed RNG seed.
///
/// Each company gets annual and quarterly financials for 2021..=2024, weekday
/// prices for 2024 and three to eight analyst ratings.
pub fn seed_generated(conn: &Connection, rng_seed: u64) -> StoreResult<SeedSummary> {
    let tx = conn.unchecked_transaction()?;
    let mut rng = StdRng::seed_from_u64(rng_seed);
    let mut summary = SeedSummary::default();

    for (ticker, name, sector, industry) in GENERATED_UNIVERSE {
        let mut company = CompanySeed::new(ticker, name, sector, industry);
        company.market_cap = Some((rng.gen_range(50.0..3_000.0_f64) * 1e9).round());
        company.employees = Some(rng.gen_range(5_000..400_000));
        company.founded_year = Some(rng.gen_range(1850..2000));
        company.description = Some(format!("{name} operates in {industry}."));
        insert_company(&tx, &company)?;
        summary.companies += 1;

        let mut revenue = rng.gen_range(20.0..300.0_f64) * 1e9;
        for year in 2021..=2024 {
            revenue *= 1.0 + rng.gen_range(-0.05..0.15);
            let gross_margin = rng.gen_range(0.25..0.70);
            let operating_margin = gross_margin * rng.gen_range(0.3..0.7);
            let net_margin = operating_margin * rng.gen_range(0.6..0.85);
            let assets = revenue * rng.gen_range(1.0..3.0);
            let liabilities = assets * rng.gen_range(0.3..0.8);
            let equity = assets - liabilities;
            let shares = rng.gen_range(1.0..15.0) * 1e9;

            let annual = FinancialSeed {
                period_year: year,
                period_quarter: None,
                revenue: Some(revenue.round()),
                gross_profit: Some((revenue * gross_margin).round()),
                operating_income: Some((revenue * operating_margin).round()),
                net_income: Some((revenue * net_margin).round()),
                eps: Some(round4(revenue * net_margin / shares)),
                assets: Some(assets.round()),
                liabilities: Some(liabilities.round()),
                operating_margin: Some(round4(operating_margin)),
                net_margin: Some(round4(net_margin)),
                gross_margin: Some(round4(gross_margin)),
                debt_to_equity: Some(round4(liabilities / equity)),
                free_cash_flow: Some((revenue * net_margin * rng.gen_range(0.7..1.2)).round()),
                report_date: Some(ymd(year, 12, 31)?),
            };
            insert_financial(&tx, &company.id, &annual)?;
            summary.financials += 1;

            for q in 1..=4u8 {
                let quarter_revenue = revenue / 4.0;
                let quarterly = FinancialSeed {
                    period_quarter: Some(q),
                    revenue: Some(quarter_revenue.round()),
                    gross_profit: Some((quarter_revenue * gross_margin).round()),
                    operating_income: Some((quarter_revenue * operating_margin).round()),
                    net_income: Some((quarter_revenue * net_margin).round()),
                    eps: Some(round4(quarter_revenue * net_margin / shares)),
                    free_cash_flow: annual.free_cash_flow.map(|f| (f / 4.0).round()),
                    report_date: Some(ymd(year, u32::from(q) * 3, 28)?),
                    ..annual.clone()
                };
                insert_financial(&tx, &company.id, &quarterly)?;
                summary.financials += 1;
            }
        }

        let mut price = rng.gen_range(20.0..600.0_f64);
        let mut date = ymd(2024, 1, 1)?;
        let end = ymd(2024, 12, 31)?;
        while date <= end {
            if is_weekday(date) {
                let open = price;
                let close = (open * (1.0 + rng.gen_range(-0.03..0.03))).max(1.0);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.015));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.015));
                insert_price(
                    &tx,
                    &company.id,
                    date,
                    round4(open),
                    round4(high),
                    round4(low),
                    round4(close),
                    rng.gen_range(500_000..50_000_000),
                )?;
                summary.prices += 1;
                price = close;
            }
            date += Duration::days(1);
        }

        let n_ratings = rng.gen_range(3..=8);
        for _ in 0..n_ratings {
            let firm = RATING_FIRMS[rng.gen_range(0..RATING_FIRMS.len())];
            let rating = RATING_LABELS[rng.gen_range(0..RATING_LABELS.len())];
            let target = round4(price * rng.gen_range(0.8..1.4));
            let day = ymd(2024, 1, 1)? + Duration::days(rng.gen_range(0..365));
            insert_rating(&tx, &company.id, firm, rating, Some(target), day, None)?;
            summary.ratings += 1;
        }
    }

    tx.commit()?;
    Ok(summary)
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

impl Database {
    /// Seed an empty database. Returns `None` when companies already exist.
    pub fn seed_if_empty(&self, mode: SeedMode) -> StoreResult<Option<SeedSummary>> {
        if self.company_count()? > 0 {
            tracing::info!("Database already populated; skipping {:?} seed", mode);
            return Ok(None);
        }
        let summary = self.with_conn(|conn| match mode {
            SeedMode::Sample => seed_sample(conn),
            SeedMode::Generated => seed_generated(conn, 42),
        })?;
        tracing::info!(
            "Seeded {} companies, {} financials, {} prices, {} ratings",
            summary.companies,
            summary.financials,
            summary.prices,
            summary.ratings
        );
        Ok(Some(summary))
    }

    /// Migrated in-memory database loaded with the sample fixture.
    pub fn sample() -> StoreResult<Self> {
        let db = Self::open_migrated(crate::db::MEMORY_PATH)?;
        db.with_conn(seed_sample)?;
        Ok(db)
    }
}
