//! SQLite warehouse for the star schema.
//!
//! RULE: Only the store module talks to the database.
//! Pipeline stages never execute SQL; the runner loads a finished
//! StarSchema through these methods.

use crate::{error::PipelineResult, star_schema::StarSchema};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

mod dimensions;
mod facts;

pub struct WarehouseStore {
    conn: Connection,
}

/// Row counts for one run, used by the runner's summary and by tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub dim_customer: i64,
    pub dim_plan: i64,
    pub dim_time: i64,
    pub fact_usage: i64,
    pub fact_revenue: i64,
}

impl WarehouseStore {
    /// Open (or create) the warehouse database at `path`.
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_star_schema.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(
        &self,
        run_id: &str,
        seed: u64,
        reporting_date: NaiveDate,
        version: &str,
    ) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, reporting_date, version) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed.to_string(), reporting_date.to_string(), version],
        )?;
        Ok(())
    }

    /// The seed recorded for `run_id`.
    pub fn run_seed(&self, run_id: &str) -> PipelineResult<u64> {
        let raw: String = self.conn.query_row(
            "SELECT seed FROM run WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        raw.parse::<u64>()
            .map_err(|e| anyhow::anyhow!("bad seed '{raw}' in warehouse: {e}").into())
    }

    /// Load every dimension and fact table for `run_id` in one transaction.
    /// Dimensions go first so the fact foreign keys resolve.
    pub fn load_star_schema(&self, run_id: &str, schema: &StarSchema) -> PipelineResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.insert_dim_plans(run_id, &schema.dim_plan)?;
        self.insert_dim_customers(run_id, &schema.dim_customer)?;
        self.insert_dim_time(run_id, &schema.dim_time)?;
        self.insert_fact_usage(run_id, &schema.fact_usage)?;
        self.insert_fact_revenue(run_id, &schema.fact_revenue)?;
        tx.commit()?;
        log::info!("store: loaded star schema for run {run_id}");
        Ok(())
    }

    pub fn row_counts(&self, run_id: &str) -> PipelineResult<RowCounts> {
        Ok(RowCounts {
            dim_customer: self.count_rows("dim_customer", run_id)?,
            dim_plan: self.count_rows("dim_plan", run_id)?,
            dim_time: self.count_rows("dim_time", run_id)?,
            fact_usage: self.count_rows("fact_usage", run_id)?,
            fact_revenue: self.count_rows("fact_revenue", run_id)?,
        })
    }

    fn count_rows(&self, table: &'static str, run_id: &str) -> PipelineResult<i64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE run_id = ?1"),
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_date(raw: &str) -> PipelineResult<NaiveDate> {
    raw.parse::<NaiveDate>()
        .map_err(|e| anyhow::anyhow!("bad date '{raw}' in warehouse: {e}").into())
}
