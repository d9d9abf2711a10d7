//! Shared primitive types used across the entire pipeline.

/// A customer identity. Assigned 1..=N in generation order.
pub type CustomerId = u32;

/// A plan identity. Higher ids are higher tiers.
pub type PlanId = u32;
