//! Budget estimation
//!
//! A fixed cascade of strategies, most specific first:
//! 1. hybrid: live lodging/dining data grounding a generated breakdown
//! 2. generic: a generated breakdown from trip parameters alone
//! 3. deterministic: administrator rate rules, or the built-in table
//!
//! Failures of the first two are logged and swallowed; the last one cannot
//! fail, so a valid request always produces an estimate.

pub mod calculator;
pub mod strategy;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, instrument, warn};

use crate::config::TravelBudgetConfig;
use crate::generative::{GeminiClient, ModelChain, TextGenerator};
use crate::models::{BudgetEstimate, BudgetRequest};
use crate::places::{GooglePlacesClient, PlacesApi, PlacesFetcher};
use crate::store::{FjallRuleStore, MemoryRuleStore, RuleStore};

pub use calculator::{RateCalculator, calculate};
pub use strategy::{BudgetStrategy, GenericAiStrategy, HybridStrategy};

/// Entry point of the library
pub struct BudgetEstimator {
    strategies: Vec<Box<dyn BudgetStrategy>>,
    fallback: RateCalculator,
}

impl BudgetEstimator {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn BudgetStrategy>>, fallback: RateCalculator) -> Self {
        Self {
            strategies,
            fallback,
        }
    }

    /// Standard cascade over the given collaborators
    #[must_use]
    pub fn from_parts(
        places: Arc<dyn PlacesApi>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn RuleStore>,
        config: &TravelBudgetConfig,
    ) -> Self {
        let chain = ModelChain::new(generator, config.generative.models.clone());
        let fetcher = PlacesFetcher::new(places, config.places.top_n, config.places.pool_size);

        let strategies: Vec<Box<dyn BudgetStrategy>> = vec![
            Box::new(HybridStrategy::new(
                fetcher,
                chain.clone(),
                config.generative.hybrid_timeout(),
            )),
            Box::new(GenericAiStrategy::new(
                chain,
                config.generative.generic_timeout(),
            )),
        ];

        Self::new(strategies, RateCalculator::new(store))
    }

    /// Google Places, Gemini and the configured rule store
    pub fn from_config(config: &TravelBudgetConfig) -> crate::Result<Self> {
        let places = GooglePlacesClient::new(&config.places)
            .map_err(|e| crate::TravelBudgetError::config(format!("{e:#}")))?;
        let generator = GeminiClient::new(&config.generative)
            .map_err(|e| crate::TravelBudgetError::config(format!("{e:#}")))?;
        let store = open_store(config)?;

        if !places.is_configured() {
            warn!("No places API key, hybrid estimates are disabled");
        }
        if !generator.is_configured() {
            warn!("No generative API key, only rate-table estimates are available");
        }

        Ok(Self::from_parts(
            Arc::new(places),
            Arc::new(generator),
            store,
            config,
        ))
    }

    /// Validate raw inputs, then estimate. Invalid input is the only error.
    pub async fn estimate_budget(
        &self,
        destination: &str,
        party_size: i64,
        days: i64,
        season: &str,
    ) -> crate::Result<BudgetEstimate> {
        let request = BudgetRequest::new(destination, party_size, days, season)?;
        Ok(self.estimate(&request).await)
    }

    /// Run the cascade for an already validated request
    #[instrument(name = "estimate_budget", skip(self), fields(destination = %request.destination, party_size = request.party_size, days = request.days, season = %request.season))]
    pub async fn estimate(&self, request: &BudgetRequest) -> BudgetEstimate {
        for strategy in &self.strategies {
            match strategy.attempt(request).await {
                Ok(Some(estimate)) if estimate.total > 0 => {
                    info!("Estimate produced by {} strategy", strategy.tag());
                    return estimate;
                }
                Ok(Some(_)) => warn!("{} strategy returned a zero total", strategy.tag()),
                Ok(None) => info!("{} strategy had no answer", strategy.tag()),
                Err(e) => warn!("{} strategy failed: {:#}", strategy.tag(), e),
            }
        }

        info!("Falling back to rate-table estimate");
        self.fallback.estimate(request).await
    }
}

/// Persistent store when a location is configured, otherwise an empty
/// in-memory one
pub fn open_store(config: &TravelBudgetConfig) -> crate::Result<Arc<dyn RuleStore>> {
    match &config.store.location {
        Some(location) => {
            let store = FjallRuleStore::open(location)
                .with_context(|| format!("Failed to open rule store at {location}"))
                .map_err(|e| crate::TravelBudgetError::store(format!("{e:#}")))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryRuleStore::new())),
    }
}
