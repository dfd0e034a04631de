//! Budget request and estimate models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TravelBudgetError;
use crate::models::PlaceCandidate;

/// Currency every estimate is expressed in
pub const CURRENCY: &str = "USD";

/// Largest amount a single category may carry. Five of them still fit in a
/// `u64`, so totals cannot overflow.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000_000;

/// Trip-timing category used to scale costs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    #[serde(alias = "fall")]
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Spring,
        Season::Summer,
        Season::Autumn,
        Season::Winter,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = TravelBudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "autumn" | "fall" => Ok(Season::Autumn),
            "winter" => Ok(Season::Winter),
            other => Err(TravelBudgetError::validation(format!(
                "unknown season '{other}'. Must be one of: spring, summer, autumn, winter"
            ))),
        }
    }
}

/// A validated budget request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRequest {
    pub destination: String,
    pub party_size: u32,
    pub days: u32,
    pub season: Season,
}

impl BudgetRequest {
    /// Validate raw caller input.
    ///
    /// Party size and days arrive as signed integers so that zero and negative
    /// values can be rejected with a proper message rather than a parse error.
    pub fn new(
        destination: &str,
        party_size: i64,
        days: i64,
        season: &str,
    ) -> crate::Result<Self> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(TravelBudgetError::validation("destination cannot be empty"));
        }

        let party_size = positive(party_size, "party size")?;
        let days = positive(days, "trip length in days")?;
        let season = season.parse()?;

        Ok(Self {
            destination: destination.to_string(),
            party_size,
            days,
            season,
        })
    }
}

fn positive(value: i64, what: &str) -> crate::Result<u32> {
    if value <= 0 {
        return Err(TravelBudgetError::validation(format!(
            "{what} must be a positive integer, got {value}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| TravelBudgetError::validation(format!("{what} is too large: {value}")))
}

/// Five-category cost split, whole currency units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub accommodation: u64,
    pub food: u64,
    pub transportation: u64,
    pub activities: u64,
    pub miscellaneous: u64,
}

impl CostBreakdown {
    #[must_use]
    pub fn sum(&self) -> u64 {
        self.amounts()
            .into_iter()
            .fold(0, |total, amount| total.saturating_add(amount))
    }

    /// True when every category is within [`MAX_AMOUNT`]
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.amounts().iter().all(|amount| *amount <= MAX_AMOUNT)
    }

    fn amounts(&self) -> [u64; 5] {
        [
            self.accommodation,
            self.food,
            self.transportation,
            self.activities,
            self.miscellaneous,
        ]
    }
}

/// Which strategy produced an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTag {
    Hybrid,
    GenericAi,
    Deterministic,
}

impl StrategyTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyTag::Hybrid => "hybrid",
            StrategyTag::GenericAi => "generic_ai",
            StrategyTag::Deterministic => "deterministic",
        }
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost estimate returned to callers.
///
/// `total` is always the sum of the breakdown; build estimates through
/// [`BudgetEstimate::new`] to keep it that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEstimate {
    pub destination: String,
    pub party_size: u32,
    pub days: u32,
    pub season: Season,
    #[serde(flatten)]
    pub breakdown: CostBreakdown,
    pub total: u64,
    pub currency: String,
    pub insights: String,
    pub strategy: StrategyTag,
    pub used_place_data: bool,
    #[serde(default)]
    pub lodging: Vec<PlaceCandidate>,
    #[serde(default)]
    pub dining: Vec<PlaceCandidate>,
}

impl BudgetEstimate {
    #[must_use]
    pub fn new(
        request: &BudgetRequest,
        breakdown: CostBreakdown,
        insights: String,
        strategy: StrategyTag,
    ) -> Self {
        Self {
            destination: request.destination.clone(),
            party_size: request.party_size,
            days: request.days,
            season: request.season,
            total: breakdown.sum(),
            breakdown,
            currency: CURRENCY.to_string(),
            insights,
            strategy,
            used_place_data: false,
            lodging: Vec::new(),
            dining: Vec::new(),
        }
    }

    /// Attach the candidates that grounded this estimate
    #[must_use]
    pub fn with_places(mut self, lodging: Vec<PlaceCandidate>, dining: Vec<PlaceCandidate>) -> Self {
        self.used_place_data = !lodging.is_empty() || !dining.is_empty();
        self.lodging = lodging;
        self.dining = dining;
        self
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.breakdown.sum()
    }
}
