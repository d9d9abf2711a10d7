//! Star schema projector.
//!
//! Pure reshape of the generated tables into dimensions (customer, plan,
//! time) and facts (usage, revenue) for BI consumption. The only derived
//! values are the calendar fields on dim_time.

use crate::{
    clock::iso_week,
    error::{PipelineError, PipelineResult},
    lifecycle::CustomerLifecycle,
    plan_catalog::{Plan, PlanCatalog},
    revenue::RevenueRecord,
    types::CustomerId,
    usage::UsageEvent,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// dim_customer carries the lifecycle columns unchanged.
pub type DimCustomer = CustomerLifecycle;
pub type DimPlan = Plan;
pub type FactUsage = UsageEvent;
pub type FactRevenue = RevenueRecord;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DimTime {
    pub date: NaiveDate,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
}

impl From<NaiveDate> for DimTime {
    fn from(date: NaiveDate) -> Self {
        Self {
            date,
            day: date.day(),
            week: iso_week(date),
            month: date.month(),
            year: date.year(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StarSchema {
    pub dim_customer: Vec<DimCustomer>,
    pub dim_plan: Vec<DimPlan>,
    pub dim_time: Vec<DimTime>,
    pub fact_usage: Vec<FactUsage>,
    pub fact_revenue: Vec<FactRevenue>,
}

impl StarSchema {
    pub fn project(
        customers: &[CustomerLifecycle],
        catalog: &PlanCatalog,
        usage_window: &[NaiveDate],
        usage: &[UsageEvent],
        revenue: &[RevenueRecord],
    ) -> Self {
        let schema = Self {
            dim_customer: customers.to_vec(),
            dim_plan: catalog.plans().to_vec(),
            dim_time: usage_window.iter().copied().map(DimTime::from).collect(),
            fact_usage: usage.to_vec(),
            fact_revenue: revenue.to_vec(),
        };
        log::info!(
            "star_schema: {} customers, {} plans, {} days, {} usage facts, {} revenue facts",
            schema.dim_customer.len(),
            schema.dim_plan.len(),
            schema.dim_time.len(),
            schema.fact_usage.len(),
            schema.fact_revenue.len()
        );
        schema
    }

    /// Rebuild a lookup catalog from dim_plan.
    pub fn plan_catalog(&self) -> PlanCatalog {
        PlanCatalog::new(self.dim_plan.clone())
    }

    pub fn customer(&self, customer_id: CustomerId) -> Option<&DimCustomer> {
        self.dim_customer.iter().find(|c| c.customer_id == customer_id)
    }

    /// Re-derive a customer's monthly fees by joining dim_customer and
    /// dim_plan over the months present in fact_revenue. The upgraded plan
    /// applies to every (year, month) at or after the upgrade's.
    pub fn derived_fee_sequence(
        &self,
        customer_id: CustomerId,
    ) -> PipelineResult<Vec<(NaiveDate, f64)>> {
        let customer = self.customer(customer_id).ok_or_else(|| {
            PipelineError::Other(anyhow::anyhow!("customer {customer_id} not in dim_customer"))
        })?;
        let upgrade_month = customer.upgrade_date.map(|u| (u.year(), u.month()));
        self.fact_revenue
            .iter()
            .filter(|r| r.customer_id == customer_id)
            .map(|r| -> PipelineResult<(NaiveDate, f64)> {
                let plan_id = match upgrade_month {
                    Some(m) if (r.date.year(), r.date.month()) >= m => customer.current_plan_id,
                    _ => customer.original_plan_id,
                };
                let plan = self
                    .dim_plan
                    .iter()
                    .find(|p| p.plan_id == plan_id)
                    .ok_or(PipelineError::PlanNotFound { plan_id })?;
                Ok((r.date, plan.monthly_fee))
            })
            .collect()
    }
}
