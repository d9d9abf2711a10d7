//! Customer lifecycle generator.
//!
//! Produces one immutable record per customer: signup, original plan,
//! optional cancellation, optional upgrade, and acquisition cost.
//!
//! Churn and upgrade dates are drawn relative to signup and then dropped
//! if they have not happened yet by the reporting date. Realized rates
//! therefore sit slightly below the configured probabilities.

use crate::{
    clock::{month_start, ReportingClock},
    config::PipelineConfig,
    error::{PipelineError, PipelineResult},
    plan_catalog::PlanCatalog,
    rng::StageRng,
    types::{CustomerId, PlanId},
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerLifecycle {
    pub customer_id: CustomerId,
    pub signup_date: NaiveDate,
    #[serde(rename = "plan_id")]
    pub original_plan_id: PlanId,
    pub current_plan_id: PlanId,
    pub cancel_date: Option<NaiveDate>,
    pub upgrade_date: Option<NaiveDate>,
    pub cac: f64,
}

impl CustomerLifecycle {
    pub fn is_churned(&self) -> bool {
        self.cancel_date.is_some()
    }

    pub fn is_upgraded(&self) -> bool {
        self.upgrade_date.is_some()
    }

    /// Signed up on or before `date` and not cancelled on or before it.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.signup_date <= date && self.cancel_date.map_or(true, |c| c > date)
    }

    /// The plan billed for the month starting `month`. The upgrade takes
    /// effect from the first month on or after the month containing it.
    pub fn plan_for_month(&self, month: NaiveDate) -> PlanId {
        match self.upgrade_date {
            Some(u) if month >= month_start(u) => self.current_plan_id,
            _ => self.original_plan_id,
        }
    }
}

pub struct LifecycleGenerator<'a> {
    config: &'a PipelineConfig,
    catalog: &'a PlanCatalog,
    clock: ReportingClock,
}

impl<'a> LifecycleGenerator<'a> {
    pub fn new(config: &'a PipelineConfig, catalog: &'a PlanCatalog, clock: ReportingClock) -> Self {
        Self {
            config,
            catalog,
            clock,
        }
    }

    pub fn generate(&self, rng: &mut StageRng) -> PipelineResult<Vec<CustomerLifecycle>> {
        if self.catalog.is_empty() {
            return Err(PipelineError::config("plan catalog is empty"));
        }
        if self.config.signup_window_days == 0 {
            return Err(PipelineError::config("signup_window_days must be > 0"));
        }

        let n = self.config.customer_count;
        let mut customers = Vec::with_capacity(n as usize);
        for customer_id in 1..=n {
            customers.push(self.generate_one(customer_id, rng));
        }

        let churned = customers.iter().filter(|c| c.is_churned()).count();
        let upgraded = customers.iter().filter(|c| c.is_upgraded()).count();
        log::info!(
            "lifecycle: generated {} customers ({churned} churned, {upgraded} upgraded)",
            customers.len()
        );
        Ok(customers)
    }

    fn generate_one(&self, customer_id: CustomerId, rng: &mut StageRng) -> CustomerLifecycle {
        let now = self.clock.reporting_date;
        let window_start = self.clock.days_back(self.config.signup_window_days);
        let signup_date =
            window_start + Duration::days(rng.int_in(0, i64::from(self.config.signup_window_days)));

        let plans = self.catalog.plans();
        let original_plan_id = plans[rng.next_u64_below(plans.len() as u64) as usize].plan_id;

        let cancel_date = if rng.chance(self.config.churn_probability) {
            let offset = self.config.churn_offset_days;
            let drawn = signup_date + Duration::days(rng.int_in(offset.min, offset.max));
            (drawn <= now).then_some(drawn)
        } else {
            None
        };

        let mut current_plan_id = original_plan_id;
        let mut upgrade_date = None;
        if cancel_date.is_none() && rng.chance(self.config.upgrade_probability) {
            let offset = self.config.upgrade_offset_days;
            let drawn = signup_date + Duration::days(rng.int_in(offset.min, offset.max));
            if drawn < now {
                // Top-tier customers have nowhere to go; the upgrade is dropped.
                let higher = self.catalog.higher_than(original_plan_id);
                if !higher.is_empty() {
                    current_plan_id = higher[rng.next_u64_below(higher.len() as u64) as usize];
                    upgrade_date = Some(drawn);
                }
            }
        }

        let cac = rng.uniform(self.config.cac_range.min, self.config.cac_range.max);

        CustomerLifecycle {
            customer_id,
            signup_date,
            original_plan_id,
            current_plan_id,
            cancel_date,
            upgrade_date,
            cac,
        }
    }
}
