//! Rate rules used by the deterministic calculator

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TravelBudgetError;
use crate::models::Season;

/// Rate components for one cost category. Missing components are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRate {
    /// One-off cost per traveller
    pub per_person: f64,
    /// Flat cost per trip day
    pub per_day: f64,
    /// Cost per traveller per day
    pub per_person_per_day: f64,
}

impl CategoryRate {
    #[must_use]
    pub const fn new(per_person: f64, per_day: f64, per_person_per_day: f64) -> Self {
        Self {
            per_person,
            per_day,
            per_person_per_day,
        }
    }

    /// Unscaled cost of this category for a trip
    #[must_use]
    pub fn base_cost(&self, party_size: u32, days: u32) -> f64 {
        let party = f64::from(party_size);
        let days = f64::from(days);
        self.per_person * party + self.per_day * days + self.per_person_per_day * party * days
    }

    fn is_valid(&self) -> bool {
        [self.per_person, self.per_day, self.per_person_per_day]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Rates for all five categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTable {
    pub accommodation: CategoryRate,
    pub food: CategoryRate,
    pub transportation: CategoryRate,
    pub activities: CategoryRate,
    pub miscellaneous: CategoryRate,
}

impl RateTable {
    /// Built-in rates used when no rule matches a destination
    pub const DEFAULT: RateTable = RateTable {
        accommodation: CategoryRate::new(0.0, 0.0, 80.0),
        food: CategoryRate::new(0.0, 0.0, 30.0),
        transportation: CategoryRate::new(50.0, 20.0, 0.0),
        activities: CategoryRate::new(0.0, 0.0, 40.0),
        miscellaneous: CategoryRate::new(0.0, 0.0, 20.0),
    };

    fn categories(&self) -> [(&'static str, &CategoryRate); 5] {
        [
            ("accommodation", &self.accommodation),
            ("food", &self.food),
            ("transportation", &self.transportation),
            ("activities", &self.activities),
            ("miscellaneous", &self.miscellaneous),
        ]
    }
}

/// Administrator-maintained rates for a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRule {
    /// Destination name; matched case-insensitively
    pub destination: String,
    pub rates: RateTable,
    #[serde(default)]
    pub seasonal_multipliers: BTreeMap<Season, f64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BudgetRule {
    #[must_use]
    pub fn new(destination: impl Into<String>, rates: RateTable) -> Self {
        Self {
            destination: destination.into(),
            rates,
            seasonal_multipliers: BTreeMap::new(),
            updated_at: None,
        }
    }

    #[must_use]
    pub fn with_multiplier(mut self, season: Season, multiplier: f64) -> Self {
        self.seasonal_multipliers.insert(season, multiplier);
        self
    }

    /// Multiplier for a season, 1.0 when the rule defines none
    #[must_use]
    pub fn multiplier(&self, season: Season) -> f64 {
        self.seasonal_multipliers.get(&season).copied().unwrap_or(1.0)
    }

    /// Normalized store key
    #[must_use]
    pub fn key(&self) -> String {
        normalize_destination(&self.destination)
    }

    /// Reject rules that would produce negative or non-finite amounts
    pub fn validate(&self) -> crate::Result<()> {
        if self.key().is_empty() {
            return Err(TravelBudgetError::validation("rule destination cannot be empty"));
        }
        for (name, rate) in self.rates.categories() {
            if !rate.is_valid() {
                return Err(TravelBudgetError::validation(format!(
                    "rule '{}' has an invalid {name} rate",
                    self.destination
                )));
            }
        }
        for (season, multiplier) in &self.seasonal_multipliers {
            if !multiplier.is_finite() || *multiplier < 0.0 {
                return Err(TravelBudgetError::validation(format!(
                    "rule '{}' has an invalid {season} multiplier: {multiplier}",
                    self.destination
                )));
            }
        }
        Ok(())
    }
}

/// Lowercased, whitespace-collapsed destination used for matching
#[must_use]
pub fn normalize_destination(destination: &str) -> String {
    destination
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_cost_combines_components() {
        let rate = CategoryRate::new(50.0, 20.0, 0.0);
        assert_eq!(rate.base_cost(2, 3), 160.0);

        let rate = CategoryRate::new(0.0, 0.0, 80.0);
        assert_eq!(rate.base_cost(2, 3), 480.0);
    }

    #[test]
    fn test_multiplier_defaults_to_one() {
        let rule = BudgetRule::new("Skardu", RateTable::DEFAULT).with_multiplier(Season::Summer, 1.5);
        assert_eq!(rule.multiplier(Season::Summer), 1.5);
        assert_eq!(rule.multiplier(Season::Winter), 1.0);
    }

    #[test]
    fn test_validate_rejects_negative_values() {
        let mut rates = RateTable::DEFAULT;
        rates.food.per_day = -1.0;
        assert!(BudgetRule::new("Skardu", rates).validate().is_err());

        let rule = BudgetRule::new("Skardu", RateTable::DEFAULT).with_multiplier(Season::Winter, f64::NAN);
        assert!(rule.validate().is_err());

        assert!(BudgetRule::new("  ", RateTable::DEFAULT).validate().is_err());
        assert!(BudgetRule::new("Skardu", RateTable::DEFAULT).validate().is_ok());
    }

    #[test]
    fn test_rule_deserializes_with_missing_components() {
        let json = r#"{
            "destination": "Naran Kaghan",
            "rates": { "food": { "per_person_per_day": 25 } },
            "seasonal_multipliers": { "summer": 1.3, "fall": 0.9 }
        }"#;
        let rule: BudgetRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.rates.food.per_person_per_day, 25.0);
        assert_eq!(rule.rates.accommodation, CategoryRate::default());
        assert_eq!(rule.multiplier(Season::Autumn), 0.9);
        assert_eq!(rule.key(), "naran kaghan");
    }
}
