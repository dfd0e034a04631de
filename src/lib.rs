//! `TravelBudget` - Trip budget estimation
//!
//! This library estimates the cost of a trip from a destination, party size,
//! trip length and season, preferring live place data and generated pricing
//! and falling back to administrator-maintained rate tables.

pub mod api;
pub mod budget;
pub mod config;
pub mod error;
pub mod generative;
pub mod models;
pub mod places;
pub mod store;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use budget::{BudgetEstimator, BudgetStrategy, RateCalculator};
pub use config::TravelBudgetConfig;
pub use error::TravelBudgetError;
pub use generative::{GeminiClient, ModelChain, TextGenerator};
pub use models::{BudgetEstimate, BudgetRequest, BudgetRule, CostBreakdown, Season, StrategyTag};
pub use places::{GooglePlacesClient, PlacesApi};
pub use store::{FjallRuleStore, MemoryRuleStore, RuleStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelBudgetError>;
