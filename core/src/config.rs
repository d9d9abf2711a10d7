use crate::{
    error::{PipelineError, PipelineResult},
    plan_catalog::Plan,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Upper bound on every day count and offset, roughly a century.
pub const MAX_DAYS: i64 = 36_500;

/// Half-open day offset range `[min, max)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayRange {
    pub min: i64,
    pub max: i64,
}

/// Half-open currency range `[min, max)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

/// Everything that parameterises one pipeline run.
/// Missing JSON fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub seed: u64,
    pub customer_count: u32,
    pub signup_window_days: u32,
    pub usage_window_days: u32,

    // ── Lifecycle ──────────────────────────────────
    pub churn_probability: f64,
    pub churn_offset_days: DayRange,
    pub upgrade_probability: f64,
    pub upgrade_offset_days: DayRange,
    pub cac_range: AmountRange,

    // ── Usage ──────────────────────────────────────
    pub login_probability: f64,
    pub max_features_per_login: usize,
    pub features: Vec<String>,

    // ── Catalog ────────────────────────────────────
    pub plans: Vec<Plan>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            customer_count: 200,
            signup_window_days: 365,
            usage_window_days: 90,
            churn_probability: 0.10,
            churn_offset_days: DayRange { min: 30, max: 365 },
            upgrade_probability: 0.20,
            upgrade_offset_days: DayRange { min: 30, max: 300 },
            cac_range: AmountRange { min: 100.0, max: 500.0 },
            login_probability: 0.60,
            max_features_per_login: 3,
            features: [
                "analytics",
                "collaboration",
                "reporting",
                "notifications",
                "mobile",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            plans: vec![
                Plan::new(1, "Basic", 50.0),
                Plan::new(2, "Pro", 100.0),
                Plan::new(3, "Enterprise", 250.0),
            ],
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file and validate.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Smaller population for unit tests; every rate stays at its default.
    pub fn default_test() -> Self {
        Self {
            seed: 7,
            customer_count: 50,
            ..Self::default()
        }
    }

    /// Reject configurations that would make generation meaningless.
    /// A zero customer count is allowed: every KPI has a defined zero value.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.signup_window_days == 0 {
            return Err(PipelineError::config("signup_window_days must be > 0"));
        }
        if self.usage_window_days == 0 {
            return Err(PipelineError::config("usage_window_days must be > 0"));
        }
        for (name, days) in [
            ("signup_window_days", self.signup_window_days),
            ("usage_window_days", self.usage_window_days),
        ] {
            if i64::from(days) > MAX_DAYS {
                return Err(PipelineError::config(format!("{name}={days} exceeds {MAX_DAYS}")));
            }
        }

        for (name, p) in [
            ("churn_probability", self.churn_probability),
            ("upgrade_probability", self.upgrade_probability),
            ("login_probability", self.login_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(PipelineError::config(format!("{name}={p} outside [0, 1]")));
            }
        }

        for (name, r) in [
            ("churn_offset_days", self.churn_offset_days),
            ("upgrade_offset_days", self.upgrade_offset_days),
        ] {
            if r.min < 0 || r.min >= r.max || r.max > MAX_DAYS {
                return Err(PipelineError::config(format!(
                    "{name} [{}, {}) must be a non-empty range within [0, {MAX_DAYS}]",
                    r.min, r.max
                )));
            }
        }

        let cac = self.cac_range;
        if !(cac.min.is_finite() && cac.max.is_finite() && cac.min > 0.0 && cac.min < cac.max) {
            return Err(PipelineError::config(format!(
                "cac_range [{}, {}) must be finite, positive and non-empty",
                cac.min, cac.max
            )));
        }

        if self.plans.is_empty() {
            return Err(PipelineError::config("plan catalog is empty"));
        }
        let mut plan_ids = HashSet::new();
        for plan in &self.plans {
            if !plan_ids.insert(plan.plan_id) {
                return Err(PipelineError::config(format!(
                    "duplicate plan_id {}",
                    plan.plan_id
                )));
            }
            if !plan.monthly_fee.is_finite() || plan.monthly_fee < 0.0 {
                return Err(PipelineError::config(format!(
                    "plan {} fee {} must be finite and non-negative",
                    plan.plan_id, plan.monthly_fee
                )));
            }
        }

        if self.features.is_empty() {
            return Err(PipelineError::config("feature vocabulary is empty"));
        }
        let unique: HashSet<&str> = self.features.iter().map(String::as_str).collect();
        if unique.len() != self.features.len() {
            return Err(PipelineError::config("feature vocabulary has duplicates"));
        }
        if self.max_features_per_login == 0 || self.max_features_per_login > self.features.len() {
            return Err(PipelineError::config(format!(
                "max_features_per_login={} must be in 1..={}",
                self.max_features_per_login,
                self.features.len()
            )));
        }

        Ok(())
    }
}
