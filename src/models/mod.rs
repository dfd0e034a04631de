//! Data models for the budget estimator
//!
//! - Budget: requests, seasons, estimates and strategy tags
//! - Place: venue candidates from the places index
//! - Rule: per-destination rate tables and seasonal multipliers

pub mod budget;
pub mod place;
pub mod rule;

// Re-export all public types for convenient access
pub use budget::{
    BudgetEstimate, BudgetRequest, CURRENCY, CostBreakdown, MAX_AMOUNT, Season, StrategyTag,
};
pub use place::{PlaceCandidate, PlaceCategory};
pub use rule::{BudgetRule, CategoryRate, RateTable, normalize_destination};
