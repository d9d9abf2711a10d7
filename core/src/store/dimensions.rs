use super::WarehouseStore;
use crate::{
    error::PipelineResult,
    star_schema::{DimCustomer, DimPlan, DimTime},
};
use rusqlite::params;

impl WarehouseStore {
    // ── Dimensions ────────────────────────────────────────────────

    pub fn insert_dim_plans(&self, run_id: &str, plans: &[DimPlan]) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO dim_plan (run_id, plan_id, plan_name, monthly_fee)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for p in plans {
            stmt.execute(params![run_id, p.plan_id, p.plan_name, p.monthly_fee])?;
        }
        Ok(())
    }

    pub fn insert_dim_customers(
        &self,
        run_id: &str,
        customers: &[DimCustomer],
    ) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO dim_customer (
                run_id, customer_id, signup_date, plan_id, current_plan_id,
                cancel_date, upgrade_date, cac
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for c in customers {
            stmt.execute(params![
                run_id,
                c.customer_id,
                c.signup_date.to_string(),
                c.original_plan_id,
                c.current_plan_id,
                c.cancel_date.map(|d| d.to_string()),
                c.upgrade_date.map(|d| d.to_string()),
                c.cac,
            ])?;
        }
        Ok(())
    }

    pub fn insert_dim_time(&self, run_id: &str, days: &[DimTime]) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO dim_time (run_id, date, day, week, month, year)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for t in days {
            stmt.execute(params![
                run_id,
                t.date.to_string(),
                t.day,
                t.week,
                t.month,
                t.year
            ])?;
        }
        Ok(())
    }

    pub fn churned_customer_count(&self, run_id: &str) -> PipelineResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM dim_customer
             WHERE run_id = ?1 AND cancel_date IS NOT NULL",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
