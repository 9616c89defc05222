//! Persisted log of statement-generation attempts.
//!
//! One row per attempt, append-only. The guard reads it to decide whether a
//! month has already been covered; operators read it as an audit trail.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::Serialize;
use thiserror::Error;

use crate::storage::Pool;

/// Outcome of a single generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown run status: {0}")]
pub struct ParseRunStatusError(String);

impl FromStr for RunStatus {
    type Err = ParseRunStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(RunStatus::Success),
            "failure" => Ok(RunStatus::Failure),
            other => Err(ParseRunStatusError(other.to_string())),
        }
    }
}

/// A record of one generation attempt.
#[derive(Debug, Serialize)]
pub struct RunLogEntry {
    pub id: i64,
    pub month: u32,
    pub year: i32,
    pub status: RunStatus,
    pub message: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RunLogError {
    #[error("a success entry already exists for {month}/{year}")]
    AlreadyRecorded { month: u32, year: i32 },
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Append-only store for [`RunLogEntry`] rows, backed by the shared pool.
#[derive(Clone)]
pub struct RunLog {
    pool: Pool,
}

impl RunLog {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Persist one attempt. `recorded_at` is assigned here, at insert time.
    ///
    /// A second `success` row for the same month trips the partial unique
    /// index and surfaces as [`RunLogError::AlreadyRecorded`]; any other
    /// storage failure propagates to the caller.
    pub fn record(
        &self,
        month: u32,
        year: i32,
        status: RunStatus,
        message: Option<&str>,
    ) -> Result<(), RunLogError> {
        let conn = self.pool.get()?;
        let result = conn.execute(
            "INSERT INTO extrato_runs (month, year, status, message, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                month,
                year,
                status.to_string(),
                message,
                Utc::now().to_rfc3339()
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && status == RunStatus::Success =>
            {
                Err(RunLogError::AlreadyRecorded { month, year })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The success entry for a month, if any.
    pub fn find_success(&self, month: u32, year: i32) -> Result<Option<RunLogEntry>, RunLogError> {
        let conn = self.pool.get()?;
        let entry = conn
            .query_row(
                "SELECT id, month, year, status, message, recorded_at FROM extrato_runs
                 WHERE month = ?1 AND year = ?2 AND status = 'success'",
                rusqlite::params![month, year],
                map_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Most recent attempts first, for the audit surface.
    pub fn recent(&self, limit: usize) -> Result<Vec<RunLogEntry>, RunLogError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, month, year, status, message, recorded_at FROM extrato_runs
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![limit as i64], map_row)?;

        let mut entries = Vec::new();
        for r in rows {
            entries.push(r?);
        }
        Ok(entries)
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunLogEntry> {
    let status_raw: String = row.get(3)?;
    let status = status_raw.parse::<RunStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let recorded_raw: String = row.get(5)?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(RunLogEntry {
        id: row.get(0)?,
        month: row.get(1)?,
        year: row.get(2)?,
        status,
        message: row.get(4)?,
        recorded_at,
    })
}
