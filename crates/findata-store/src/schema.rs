//! Versioned schema migrations.

use rusqlite::{params, Connection};

use crate::error::{StoreError, StoreResult};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_core_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL DEFAULT 'user',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY,
    ticker TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    sector TEXT NOT NULL,
    industry TEXT NOT NULL,
    market_cap REAL,
    employees INTEGER,
    description TEXT,
    ceo TEXT,
    founded_year INTEGER,
    country TEXT NOT NULL DEFAULT 'US',
    currency TEXT NOT NULL DEFAULT 'USD',
    user_id TEXT REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS financials (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    period_year INTEGER NOT NULL,
    period_quarter INTEGER,
    revenue REAL,
    gross_profit REAL,
    operating_income REAL,
    net_income REAL,
    eps REAL,
    assets REAL,
    liabilities REAL,
    operating_margin REAL,
    net_margin REAL,
    gross_margin REAL,
    debt_to_equity REAL,
    free_cash_flow REAL,
    report_date TEXT
);

CREATE TABLE IF NOT EXISTS stock_prices (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume INTEGER NOT NULL,
    UNIQUE(company_id, date)
);

CREATE TABLE IF NOT EXISTS analyst_ratings (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    firm_name TEXT NOT NULL,
    rating TEXT NOT NULL,
    previous_rating TEXT,
    price_target REAL,
    rating_date TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS ix_users_email ON users(email);
CREATE INDEX IF NOT EXISTS ix_companies_ticker ON companies(ticker);
CREATE INDEX IF NOT EXISTS ix_companies_sector ON companies(sector);
CREATE INDEX IF NOT EXISTS ix_companies_market_cap ON companies(market_cap);
CREATE INDEX IF NOT EXISTS ix_companies_user_id ON companies(user_id);
CREATE INDEX IF NOT EXISTS ix_financials_company_id ON financials(company_id);
CREATE INDEX IF NOT EXISTS ix_financials_company_year_quarter
    ON financials(company_id, period_year, period_quarter);
CREATE INDEX IF NOT EXISTS ix_stock_prices_company_id ON stock_prices(company_id);
CREATE INDEX IF NOT EXISTS ix_stock_prices_date ON stock_prices(date);
CREATE INDEX IF NOT EXISTS ix_stock_prices_company_date ON stock_prices(company_id, date);
CREATE INDEX IF NOT EXISTS ix_analyst_ratings_company_id ON analyst_ratings(company_id);
CREATE INDEX IF NOT EXISTS ix_analyst_ratings_date ON analyst_ratings(rating_date);
"#,
    },
];

/// Apply pending migrations. Returns how many ran.
pub fn apply_migrations(conn: &Connection) -> StoreResult<usize> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
            params![migration.version],
            |row| row.get(0),
        )?;
        if count > 0 {
            continue;
        }

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| StoreError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;
        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            params![migration.version],
        )?;
        tx.commit()?;

        tracing::info!("Applied migration {}", migration.version);
        applied += 1;
    }

    Ok(applied)
}

/// Versions recorded in `schema_migrations`, oldest first.
pub fn applied_versions(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(versions)
}
