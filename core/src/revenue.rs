//! Revenue ledger builder.
//!
//! Expands each lifecycle into one row per active calendar month, from the
//! signup month through the cancellation month (or the reporting month for
//! customers who never churned), both inclusive.

use crate::{
    clock::{month_start, next_month_start, ReportingClock},
    error::PipelineResult,
    lifecycle::CustomerLifecycle,
    plan_catalog::PlanCatalog,
    types::CustomerId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueRecord {
    /// Always the first day of the billed month.
    pub date: NaiveDate,
    pub customer_id: CustomerId,
    pub mrr: f64,
    pub arr: f64,
}

impl RevenueRecord {
    pub fn new(date: NaiveDate, customer_id: CustomerId, mrr: f64) -> Self {
        Self {
            date,
            customer_id,
            mrr,
            arr: mrr * 12.0,
        }
    }
}

pub struct RevenueLedgerBuilder<'a> {
    catalog: &'a PlanCatalog,
    clock: ReportingClock,
}

impl<'a> RevenueLedgerBuilder<'a> {
    pub fn new(catalog: &'a PlanCatalog, clock: ReportingClock) -> Self {
        Self { catalog, clock }
    }

    pub fn build(&self, customers: &[CustomerLifecycle]) -> PipelineResult<Vec<RevenueRecord>> {
        let mut ledger = Vec::new();
        for customer in customers {
            ledger.extend(self.customer_months(customer)?);
        }
        log::info!(
            "revenue: built {} monthly records for {} customers",
            ledger.len(),
            customers.len()
        );
        Ok(ledger)
    }

    /// The ledger rows for a single customer, in month order.
    pub fn customer_months(&self, customer: &CustomerLifecycle) -> PipelineResult<Vec<RevenueRecord>> {
        let last_month = month_start(customer.cancel_date.unwrap_or(self.clock.reporting_date));
        let mut month = month_start(customer.signup_date);
        let mut rows = Vec::new();

        // Inclusive of the signup month even when the customer cancels in it.
        loop {
            let plan_id = customer.plan_for_month(month);
            let fee = self.catalog.monthly_fee(plan_id)?;
            rows.push(RevenueRecord::new(month, customer.customer_id, fee));

            match next_month_start(month) {
                Some(next) if next <= last_month => month = next,
                _ => break,
            }
        }
        Ok(rows)
    }
}
