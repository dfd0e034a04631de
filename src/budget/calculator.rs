//! Deterministic rate calculator
//!
//! The guaranteed last step of the estimation cascade: no network, no
//! failure modes. Each category is
//! `round((per_person * party + per_day * days + per_person_per_day * party * days) * multiplier)`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::{
    BudgetEstimate, BudgetRequest, BudgetRule, CategoryRate, CostBreakdown, MAX_AMOUNT, RateTable,
    StrategyTag,
};
use crate::store::RuleStore;

/// Round half away from zero onto whole non-negative units, capped at
/// [`MAX_AMOUNT`]
fn round_amount(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round().min(MAX_AMOUNT as f64) as u64
    } else {
        0
    }
}

/// Pure estimate from a rule, or the built-in table when `rule` is `None`
#[must_use]
pub fn calculate(request: &BudgetRequest, rule: Option<&BudgetRule>) -> BudgetEstimate {
    let (rates, multiplier) = match rule {
        Some(rule) => (&rule.rates, rule.multiplier(request.season)),
        None => (&RateTable::DEFAULT, 1.0),
    };

    let amount = |rate: &CategoryRate| {
        round_amount(rate.base_cost(request.party_size, request.days) * multiplier)
    };

    let breakdown = CostBreakdown {
        accommodation: amount(&rates.accommodation),
        food: amount(&rates.food),
        transportation: amount(&rates.transportation),
        activities: amount(&rates.activities),
        miscellaneous: amount(&rates.miscellaneous),
    };

    let source = match rule {
        Some(rule) => format!("the rate table for {}", rule.destination),
        None => "default regional rates".to_string(),
    };
    let mut insights = format!(
        "Estimated from {source} for {} traveller(s) over {} day(s) in {}.",
        request.party_size, request.days, request.season
    );
    if multiplier != 1.0 {
        insights.push_str(&format!(
            " Prices include a {} seasonal adjustment of x{multiplier:.2}.",
            request.season
        ));
    }
    insights.push_str(" Live prices were unavailable; treat this as a baseline.");

    BudgetEstimate::new(request, breakdown, insights, StrategyTag::Deterministic)
}

/// Rule lookup plus [`calculate`]. A failing store degrades to the default
/// table instead of failing the request.
#[derive(Clone)]
pub struct RateCalculator {
    store: Arc<dyn RuleStore>,
}

impl RateCalculator {
    #[must_use]
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    pub async fn estimate(&self, request: &BudgetRequest) -> BudgetEstimate {
        let rule = match self.store.find_rule(&request.destination).await {
            Ok(rule) => rule,
            Err(e) => {
                warn!("Rule lookup failed, using default rates: {:#}", e);
                None
            }
        };
        match &rule {
            Some(rule) => debug!("Using rate rule for {}", rule.destination),
            None => debug!("No rate rule for {}, using defaults", request.destination),
        }
        calculate(request, rule.as_ref())
    }
}
