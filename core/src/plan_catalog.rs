//! Plan catalog: the fixed set of subscription tiers and their fees.
//!
//! Plan ids double as tier order: a higher plan_id is a higher tier.

use crate::{
    error::{PipelineError, PipelineResult},
    types::PlanId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub plan_id: PlanId,
    pub plan_name: String,
    pub monthly_fee: f64,
}

impl Plan {
    pub fn new(plan_id: PlanId, plan_name: &str, monthly_fee: f64) -> Self {
        Self {
            plan_id,
            plan_name: plan_name.into(),
            monthly_fee,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    /// Plans are kept sorted by id so tier comparisons and draws are stable.
    pub fn new(mut plans: Vec<Plan>) -> Self {
        plans.sort_by_key(|p| p.plan_id);
        Self { plans }
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn get(&self, plan_id: PlanId) -> PipelineResult<&Plan> {
        self.plans
            .iter()
            .find(|p| p.plan_id == plan_id)
            .ok_or(PipelineError::PlanNotFound { plan_id })
    }

    pub fn monthly_fee(&self, plan_id: PlanId) -> PipelineResult<f64> {
        Ok(self.get(plan_id)?.monthly_fee)
    }

    /// Plans strictly above `plan_id` in tier order.
    pub fn higher_than(&self, plan_id: PlanId) -> Vec<PlanId> {
        self.plans
            .iter()
            .map(|p| p.plan_id)
            .filter(|&id| id > plan_id)
            .collect()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new(crate::config::PipelineConfig::default().plans)
    }
}
