//! Usage event generator.
//!
//! Walks the trailing usage window one day at a time. Each customer active
//! on that day logs in with a fixed probability and touches 1..=max distinct
//! features, one row per feature.

use crate::{
    clock::ReportingClock,
    config::PipelineConfig,
    error::{PipelineError, PipelineResult},
    lifecycle::CustomerLifecycle,
    rng::StageRng,
    types::CustomerId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageEvent {
    pub date: NaiveDate,
    pub customer_id: CustomerId,
    pub feature: String,
    pub usage_count: u32,
}

pub struct UsageGenerator<'a> {
    config: &'a PipelineConfig,
    clock: ReportingClock,
}

impl<'a> UsageGenerator<'a> {
    pub fn new(config: &'a PipelineConfig, clock: ReportingClock) -> Self {
        Self { config, clock }
    }

    /// The days covered by the usage window, oldest first.
    pub fn window(&self) -> Vec<NaiveDate> {
        self.clock.trailing_days(self.config.usage_window_days)
    }

    pub fn generate(
        &self,
        customers: &[CustomerLifecycle],
        rng: &mut StageRng,
    ) -> PipelineResult<Vec<UsageEvent>> {
        let features = &self.config.features;
        let max_features = self.config.max_features_per_login;
        if features.is_empty() || max_features == 0 || max_features > features.len() {
            return Err(PipelineError::config(format!(
                "cannot draw 1..={max_features} features from a vocabulary of {}",
                features.len()
            )));
        }

        let mut events = Vec::new();
        for day in self.window() {
            for customer in customers.iter().filter(|c| c.is_active_on(day)) {
                if !rng.chance(self.config.login_probability) {
                    continue;
                }
                let k = rng.int_in(1, max_features as i64 + 1) as usize;
                for idx in rng.sample_distinct(features.len(), k) {
                    events.push(UsageEvent {
                        date: day,
                        customer_id: customer.customer_id,
                        feature: features[idx].clone(),
                        usage_count: 1,
                    });
                }
            }
        }

        log::info!(
            "usage: generated {} events over {} days",
            events.len(),
            self.config.usage_window_days
        );
        Ok(events)
    }
}
