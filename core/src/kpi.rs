//! KPI engine: pure reductions over the star schema.
//!
//! Every aggregate is defined on empty input. Means over an empty series
//! and ratios with a zero denominator come out as 0.0, never NaN, so the
//! report always serializes to plain JSON numbers.

use crate::{
    clock::{month_key, ReportingClock},
    error::PipelineResult,
    star_schema::StarSchema,
    types::CustomerId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Days per bucket in the "months since upgrade" approximation.
pub const EXPANSION_BUCKET_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct KpiReport {
    pub churn_rate: f64,
    pub average_dau: f64,
    pub average_mau: f64,
    pub expansion_revenue: f64,
    pub ltv_cac_ratio: f64,
}

/// Month × feature matrix of summed usage_count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureAdoptionMatrix {
    /// Column order, sorted by feature name.
    pub features: Vec<String>,
    /// One row per `YYYY-MM`, oldest first.
    pub rows: Vec<FeatureAdoptionRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureAdoptionRow {
    pub month: String,
    pub counts: Vec<u64>,
}

impl FeatureAdoptionMatrix {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, month: &str, feature: &str) -> Option<u64> {
        let col = self.features.iter().position(|f| f == feature)?;
        let row = self.rows.iter().find(|r| r.month == month)?;
        Some(row.counts[col])
    }

    /// The most recent `n` months.
    pub fn tail(&self, n: usize) -> &[FeatureAdoptionRow] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }
}

pub struct KpiEngine<'a> {
    schema: &'a StarSchema,
    clock: ReportingClock,
}

impl<'a> KpiEngine<'a> {
    pub fn new(schema: &'a StarSchema, clock: ReportingClock) -> Self {
        Self { schema, clock }
    }

    pub fn compute(&self) -> PipelineResult<KpiReport> {
        if self.schema.dim_customer.is_empty() {
            log::warn!("kpi: no customers; every KPI reported as 0");
        }
        let report = KpiReport {
            churn_rate: self.churn_rate(),
            average_dau: self.average_dau(),
            average_mau: self.average_mau(),
            expansion_revenue: self.expansion_revenue()?,
            ltv_cac_ratio: self.ltv_cac_ratio(),
        };
        log::info!(
            "kpi: churn={:.4} dau={:.2} mau={:.2} expansion={:.2} ltv_cac={:.2}",
            report.churn_rate,
            report.average_dau,
            report.average_mau,
            report.expansion_revenue,
            report.ltv_cac_ratio
        );
        Ok(report)
    }

    /// Fraction of customers with a cancellation date.
    pub fn churn_rate(&self) -> f64 {
        let customers = &self.schema.dim_customer;
        let churned = customers.iter().filter(|c| c.is_churned()).count();
        ratio(churned as f64, customers.len() as f64)
    }

    /// Mean distinct active customers per day across the whole usage window.
    /// Days without events count as zero.
    pub fn average_dau(&self) -> f64 {
        let mut daily: HashMap<NaiveDate, HashSet<CustomerId>> = HashMap::new();
        for event in &self.schema.fact_usage {
            daily.entry(event.date).or_default().insert(event.customer_id);
        }
        let days = &self.schema.dim_time;
        let total: usize = days
            .iter()
            .map(|t| daily.get(&t.date).map_or(0, HashSet::len))
            .sum();
        ratio(total as f64, days.len() as f64)
    }

    /// Mean distinct active customers per calendar month that has usage.
    pub fn average_mau(&self) -> f64 {
        let mut monthly: HashMap<String, HashSet<CustomerId>> = HashMap::new();
        for event in &self.schema.fact_usage {
            monthly
                .entry(month_key(event.date))
                .or_default()
                .insert(event.customer_id);
        }
        let total: usize = monthly.values().map(HashSet::len).sum();
        ratio(total as f64, monthly.len() as f64)
    }

    /// Fee uplift times whole 30-day buckets elapsed since each upgrade.
    pub fn expansion_revenue(&self) -> PipelineResult<f64> {
        let catalog = self.schema.plan_catalog();
        let mut total = 0.0;
        for customer in &self.schema.dim_customer {
            let Some(upgrade_date) = customer.upgrade_date else {
                continue;
            };
            let old_fee = catalog.monthly_fee(customer.original_plan_id)?;
            let new_fee = catalog.monthly_fee(customer.current_plan_id)?;
            let buckets = self
                .clock
                .days_since(upgrade_date)
                .div_euclid(EXPANSION_BUCKET_DAYS)
                .max(0);
            total += (new_fee - old_fee) * buckets as f64;
        }
        Ok(total)
    }

    /// Mean lifetime MRR per billed customer over mean CAC.
    pub fn ltv_cac_ratio(&self) -> f64 {
        let mut per_customer: HashMap<CustomerId, f64> = HashMap::new();
        for record in &self.schema.fact_revenue {
            *per_customer.entry(record.customer_id).or_default() += record.mrr;
        }
        let ltv = ratio(per_customer.values().sum(), per_customer.len() as f64);

        let customers = &self.schema.dim_customer;
        let cac_total: f64 = customers.iter().map(|c| c.cac).sum();
        let average_cac = ratio(cac_total, customers.len() as f64);

        ratio(ltv, average_cac)
    }

    pub fn feature_adoption_trends(&self) -> FeatureAdoptionMatrix {
        let features: Vec<String> = self
            .schema
            .fact_usage
            .iter()
            .map(|e| e.feature.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut by_month: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for event in &self.schema.fact_usage {
            let counts = by_month
                .entry(month_key(event.date))
                .or_insert_with(|| vec![0; features.len()]);
            if let Ok(col) = features.binary_search(&event.feature) {
                counts[col] += u64::from(event.usage_count);
            }
        }

        FeatureAdoptionMatrix {
            features,
            rows: by_month
                .into_iter()
                .map(|(month, counts)| FeatureAdoptionRow { month, counts })
                .collect(),
        }
    }
}

/// Division that yields 0.0 instead of NaN or infinity.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
