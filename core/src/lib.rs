//! Synthetic SaaS subscription dataset generator and KPI pipeline.
//!
//! Generates customer lifecycles, usage events and a monthly revenue
//! ledger, reshapes them into a star schema, and reduces that schema to
//! churn, DAU/MAU, expansion revenue, LTV:CAC and feature adoption.

pub mod clock;
pub mod config;
pub mod error;
pub mod kpi;
pub mod lifecycle;
pub mod output;
pub mod pipeline;
pub mod plan_catalog;
pub mod revenue;
pub mod rng;
pub mod star_schema;
pub mod store;
pub mod types;
pub mod usage;
