//! SQLite storage layer -- schema, connection pool, ledger queries.

pub mod schema;

use anyhow::Result;
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

use crate::extrato::Extrato;
use chrono::{DateTime, Utc};

/// Record a client payment in the ledger. Returns the row id.
pub fn record_payment(
    pool: &Pool,
    client: &str,
    amount_cents: i64,
    method: &str,
    paid_at: DateTime<Utc>,
) -> Result<i64> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO payments (client, amount_cents, method, paid_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![client, amount_cents, method, paid_at.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Record an artist commission in the ledger. Returns the row id.
pub fn record_commission(
    pool: &Pool,
    artist: &str,
    amount_cents: i64,
    session_ref: Option<&str>,
    earned_at: DateTime<Utc>,
) -> Result<i64> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO commissions (artist, amount_cents, session_ref, earned_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![artist, amount_cents, session_ref, earned_at.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Record a studio expense in the ledger. Returns the row id.
pub fn record_expense(
    pool: &Pool,
    category: &str,
    amount_cents: i64,
    description: Option<&str>,
    incurred_at: DateTime<Utc>,
) -> Result<i64> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO expenses (category, amount_cents, description, incurred_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![category, amount_cents, description, incurred_at.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Calendar-month window as a pair of date-string bounds, `[start, end)`.
/// Timestamps are stored RFC 3339, so lexicographic comparison against
/// `YYYY-MM-01` prefixes is sufficient.
pub fn month_window(month: u32, year: i32) -> (String, String) {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    (
        format!("{:04}-{:02}-01", year, month),
        format!("{:04}-{:02}-01", next_year, next_month),
    )
}

/// Total payment revenue inside the given calendar month.
pub fn sum_payments(pool: &Pool, month: u32, year: i32) -> Result<i64> {
    let conn = pool.get()?;
    let (start, end) = month_window(month, year);
    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payments
         WHERE paid_at >= ?1 AND paid_at < ?2",
        rusqlite::params![start, end],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Total artist commissions inside the given calendar month.
pub fn sum_commissions(pool: &Pool, month: u32, year: i32) -> Result<i64> {
    let conn = pool.get()?;
    let (start, end) = month_window(month, year);
    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM commissions
         WHERE earned_at >= ?1 AND earned_at < ?2",
        rusqlite::params![start, end],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Total expenses inside the given calendar month.
pub fn sum_expenses(pool: &Pool, month: u32, year: i32) -> Result<i64> {
    let conn = pool.get()?;
    let (start, end) = month_window(month, year);
    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses
         WHERE incurred_at >= ?1 AND incurred_at < ?2",
        rusqlite::params![start, end],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Save a generated statement, replacing any prior statement for the month.
pub fn save_extrato(pool: &Pool, e: &Extrato) -> Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO extratos (month, year, revenue_cents, commissions_cents, expenses_cents, net_cents, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(month, year) DO UPDATE SET
             revenue_cents = excluded.revenue_cents,
             commissions_cents = excluded.commissions_cents,
             expenses_cents = excluded.expenses_cents,
             net_cents = excluded.net_cents,
             generated_at = excluded.generated_at",
        rusqlite::params![
            e.month,
            e.year,
            e.revenue_cents,
            e.commissions_cents,
            e.expenses_cents,
            e.net_cents,
            e.generated_at.to_rfc3339()
        ],
    )?;
    Ok(())
}

fn map_extrato(row: &rusqlite::Row<'_>) -> rusqlite::Result<Extrato> {
    let generated_raw: String = row.get(6)?;
    let generated_at = DateTime::parse_from_rfc3339(&generated_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(Extrato {
        month: row.get(0)?,
        year: row.get(1)?,
        revenue_cents: row.get(2)?,
        commissions_cents: row.get(3)?,
        expenses_cents: row.get(4)?,
        net_cents: row.get(5)?,
        generated_at,
    })
}

const EXTRATO_COLUMNS: &str =
    "month, year, revenue_cents, commissions_cents, expenses_cents, net_cents, generated_at";

/// Look up the statement for a given month, if one has been generated.
pub fn find_extrato(pool: &Pool, month: u32, year: i32) -> Result<Option<Extrato>> {
    use rusqlite::OptionalExtension;

    let conn = pool.get()?;
    let sql = format!(
        "SELECT {EXTRATO_COLUMNS} FROM extratos WHERE month = ?1 AND year = ?2"
    );
    let found = conn
        .query_row(&sql, rusqlite::params![month, year], map_extrato)
        .optional()?;
    Ok(found)
}

/// The most recently covered statement (by calendar month, not generation time).
pub fn latest_extrato(pool: &Pool) -> Result<Option<Extrato>> {
    use rusqlite::OptionalExtension;

    let conn = pool.get()?;
    let sql = format!(
        "SELECT {EXTRATO_COLUMNS} FROM extratos ORDER BY year DESC, month DESC LIMIT 1"
    );
    let found = conn.query_row(&sql, [], map_extrato).optional()?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temp_pool() -> (tempfile::TempDir, Pool) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let pool = open_pool(path.to_str().unwrap()).unwrap();
        (dir, pool)
    }

    #[test]
    fn test_month_window_bounds() {
        assert_eq!(
            month_window(9, 2024),
            ("2024-09-01".to_string(), "2024-10-01".to_string())
        );
        // December rolls into January of the next year
        assert_eq!(
            month_window(12, 2024),
            ("2024-12-01".to_string(), "2025-01-01".to_string())
        );
    }

    #[test]
    fn test_sums_respect_month_window() {
        let (_dir, pool) = temp_pool();

        let inside = Utc.with_ymd_and_hms(2024, 9, 15, 10, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 8, 31, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();

        record_payment(&pool, "ana", 30_000, "pix", inside).unwrap();
        record_payment(&pool, "bruno", 20_000, "card", inside).unwrap();
        record_payment(&pool, "carla", 99_999, "cash", before).unwrap();
        record_payment(&pool, "diego", 11_111, "cash", after).unwrap();

        record_commission(&pool, "lia", 12_000, Some("sess-42"), inside).unwrap();
        record_expense(&pool, "supplies", 5_000, Some("ink"), inside).unwrap();

        assert_eq!(sum_payments(&pool, 9, 2024).unwrap(), 50_000);
        assert_eq!(sum_commissions(&pool, 9, 2024).unwrap(), 12_000);
        assert_eq!(sum_expenses(&pool, 9, 2024).unwrap(), 5_000);
        assert_eq!(sum_payments(&pool, 7, 2024).unwrap(), 0);
    }

    #[test]
    fn test_extrato_save_and_lookup() {
        let (_dir, pool) = temp_pool();

        let first = Extrato {
            month: 9,
            year: 2024,
            revenue_cents: 50_000,
            commissions_cents: 12_000,
            expenses_cents: 5_000,
            net_cents: 33_000,
            generated_at: Utc.with_ymd_and_hms(2024, 10, 2, 8, 0, 0).unwrap(),
        };
        save_extrato(&pool, &first).unwrap();

        let found = find_extrato(&pool, 9, 2024).unwrap().unwrap();
        assert_eq!(found.net_cents, 33_000);
        assert!(find_extrato(&pool, 8, 2024).unwrap().is_none());

        // Re-saving the same month replaces rather than duplicates
        let revised = Extrato {
            net_cents: 34_000,
            revenue_cents: 51_000,
            ..first
        };
        save_extrato(&pool, &revised).unwrap();
        let found = find_extrato(&pool, 9, 2024).unwrap().unwrap();
        assert_eq!(found.net_cents, 34_000);

        let latest = latest_extrato(&pool).unwrap().unwrap();
        assert_eq!((latest.month, latest.year), (9, 2024));
    }
}
