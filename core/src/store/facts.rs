use super::{parse_date, WarehouseStore};
use crate::{
    error::PipelineResult,
    star_schema::{FactRevenue, FactUsage},
    types::CustomerId,
};
use chrono::NaiveDate;
use rusqlite::params;

impl WarehouseStore {
    // ── Facts ─────────────────────────────────────────────────────

    pub fn insert_fact_usage(&self, run_id: &str, events: &[FactUsage]) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO fact_usage (run_id, date, customer_id, feature, usage_count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for e in events {
            stmt.execute(params![
                run_id,
                e.date.to_string(),
                e.customer_id,
                e.feature,
                e.usage_count
            ])?;
        }
        Ok(())
    }

    pub fn insert_fact_revenue(
        &self,
        run_id: &str,
        records: &[FactRevenue],
    ) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO fact_revenue (run_id, date, customer_id, mrr, arr)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for r in records {
            stmt.execute(params![run_id, r.date.to_string(), r.customer_id, r.mrr, r.arr])?;
        }
        Ok(())
    }

    /// Re-derive a customer's monthly fee by joining dim_customer, dim_plan
    /// and fact_revenue. The upgraded plan applies from the first month
    /// whose start is on or after the first of the upgrade month.
    pub fn monthly_fee_sequence(
        &self,
        run_id: &str,
        customer_id: CustomerId,
    ) -> PipelineResult<Vec<(NaiveDate, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.date, p.monthly_fee
             FROM fact_revenue r
             JOIN dim_customer c
               ON c.run_id = r.run_id AND c.customer_id = r.customer_id
             JOIN dim_plan p
               ON p.run_id = r.run_id
              AND p.plan_id = CASE
                    WHEN c.upgrade_date IS NOT NULL
                     AND r.date >= substr(c.upgrade_date, 1, 8) || '01'
                    THEN c.current_plan_id
                    ELSE c.plan_id
                  END
             WHERE r.run_id = ?1 AND r.customer_id = ?2
             ORDER BY r.date ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, customer_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(date, fee)| parse_date(&date).map(|d| (d, fee)))
            .collect()
    }

    /// Distinct customers with usage on each day that has any, oldest first.
    pub fn daily_active_counts(&self, run_id: &str) -> PipelineResult<Vec<(NaiveDate, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, COUNT(DISTINCT customer_id)
             FROM fact_usage WHERE run_id = ?1
             GROUP BY date ORDER BY date ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(date, n)| parse_date(&date).map(|d| (d, n)))
            .collect()
    }
}
