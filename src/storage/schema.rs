//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY,
            client TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            method TEXT NOT NULL DEFAULT 'cash',
            paid_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS commissions (
            id INTEGER PRIMARY KEY,
            artist TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            session_ref TEXT,
            earned_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY,
            category TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            description TEXT,
            incurred_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS extratos (
            id INTEGER PRIMARY KEY,
            month INTEGER NOT NULL,
            year INTEGER NOT NULL,
            revenue_cents INTEGER NOT NULL,
            commissions_cents INTEGER NOT NULL,
            expenses_cents INTEGER NOT NULL,
            net_cents INTEGER NOT NULL,
            generated_at TEXT NOT NULL,
            UNIQUE (month, year)
        );

        CREATE TABLE IF NOT EXISTS extrato_runs (
            id INTEGER PRIMARY KEY,
            month INTEGER NOT NULL,
            year INTEGER NOT NULL,
            status TEXT NOT NULL,
            message TEXT,
            recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- At most one success row per month; failure rows are unlimited.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_extrato_runs_success
            ON extrato_runs(month, year) WHERE status = 'success';

        CREATE INDEX IF NOT EXISTS idx_payments_paid ON payments(paid_at);
        CREATE INDEX IF NOT EXISTS idx_commissions_earned ON commissions(earned_at);
        CREATE INDEX IF NOT EXISTS idx_expenses_incurred ON expenses(incurred_at);
        CREATE INDEX IF NOT EXISTS idx_extrato_runs_month ON extrato_runs(year, month);",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        // Verify tables exist by querying them
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM extrato_runs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap(); // Should not error
    }

    #[test]
    fn test_second_success_row_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        conn.execute(
            "INSERT INTO extrato_runs (month, year, status, message) VALUES (9, 2024, 'success', NULL)",
            [],
        )
        .unwrap();

        let dup = conn.execute(
            "INSERT INTO extrato_runs (month, year, status, message) VALUES (9, 2024, 'success', NULL)",
            [],
        );
        assert!(dup.is_err());

        // Failures are not constrained
        for _ in 0..3 {
            conn.execute(
                "INSERT INTO extrato_runs (month, year, status, message) VALUES (9, 2024, 'failure', 'boom')",
                [],
            )
            .unwrap();
        }
    }
}
