//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine never touches the store; callers persist finished runs.

use crate::{
    engine::SimParams,
    error::{SimError, SimResult},
    record::MonthlyRecord,
    rehydrate::ExtendParams,
    types::RunId,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMeta {
    pub run_id:                  RunId,
    pub scenario:                String,
    pub initial_population:      i64,
    pub new_customers_per_month: i64,
    pub months:                  i64,
    pub parent_run_id:           Option<RunId>,
    pub created_at:              String,
}

impl RunMeta {
    pub fn for_simulation(params: &SimParams) -> Self {
        Self {
            run_id:                  uuid::Uuid::new_v4().to_string(),
            scenario:                params.scenario.clone(),
            initial_population:      params.initial_population,
            new_customers_per_month: params.new_customers_per_month,
            months:                  params.months,
            parent_run_id:           None,
            created_at:              chrono::Utc::now().to_rfc3339(),
        }
    }

    /// `population` is the seed the extension actually started from.
    pub fn for_extension(parent: Option<&str>, params: &ExtendParams, population: i64) -> Self {
        Self {
            run_id:                  uuid::Uuid::new_v4().to_string(),
            scenario:                params.scenario.clone(),
            initial_population:      population,
            new_customers_per_month: params.new_customers_per_month,
            months:                  params.months,
            parent_run_id:           parent.map(str::to_string),
            created_at:              chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub struct RunStore {
    conn: Connection,
}

impl RunStore {
    /// Open (or create) the run database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, meta: &RunMeta) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (
                run_id, scenario, initial_population, new_customers_per_month,
                months, parent_run_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                meta.run_id,
                meta.scenario,
                meta.initial_population,
                meta.new_customers_per_month,
                meta.months,
                meta.parent_run_id,
                meta.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn run(&self, run_id: &str) -> SimResult<Option<RunMeta>> {
        let meta = self
            .conn
            .query_row(
                "SELECT run_id, scenario, initial_population, new_customers_per_month,
                        months, parent_run_id, created_at
                 FROM run WHERE run_id = ?1",
                params![run_id],
                row_to_meta,
            )
            .optional()?;
        Ok(meta)
    }

    /// All runs, oldest first.
    pub fn list_runs(&self) -> SimResult<Vec<RunMeta>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, scenario, initial_population, new_customers_per_month,
                    months, parent_run_id, created_at
             FROM run ORDER BY created_at ASC, rowid ASC",
        )?;
        let runs = stmt
            .query_map([], row_to_meta)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    // ── Monthly records ────────────────────────────────────────

    /// Persist a whole run in one transaction: all records or none.
    pub fn append_records(&mut self, run_id: &str, records: &[MonthlyRecord]) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO monthly_record (
                    run_id, month, total_customers, monthly_revenue, churn_rate, payload
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in records {
                stmt.execute(params![
                    run_id,
                    record.month as i64,
                    record.total_customers,
                    record.monthly_revenue,
                    record.churn_rate,
                    serde_json::to_string(record)?,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("store: saved {} records for run {run_id}", records.len());
        Ok(())
    }

    pub fn record_count(&self, run_id: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM monthly_record WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Stored records of a run as JSON objects, in month order. This is
    /// the shape the extension path consumes.
    pub fn records_for_run(&self, run_id: &str) -> SimResult<Vec<Value>> {
        if self.run(run_id)?.is_none() {
            return Err(SimError::RunNotFound { run_id: run_id.to_string() });
        }
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM monthly_record WHERE run_id = ?1 ORDER BY month ASC",
        )?;
        let payloads = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(SimError::from))
            .collect()
    }
}

fn row_to_meta(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunMeta> {
    Ok(RunMeta {
        run_id:                  row.get(0)?,
        scenario:                row.get(1)?,
        initial_population:      row.get(2)?,
        new_customers_per_month: row.get(3)?,
        months:                  row.get(4)?,
        parent_run_id:           row.get(5)?,
        created_at:              row.get(6)?,
    })
}
