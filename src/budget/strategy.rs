use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, instrument};

use crate::generative::{AiBudget, ModelChain, prompt};
use crate::models::{BudgetEstimate, BudgetRequest, PlaceCategory, StrategyTag};
use crate::places::PlacesFetcher;

/// One step of the estimation cascade.
///
/// `Ok(None)` is an ordinary miss; errors are treated the same way by the
/// estimator, so implementations may propagate freely.
#[async_trait]
pub trait BudgetStrategy: Send + Sync {
    fn tag(&self) -> StrategyTag;

    async fn attempt(&self, request: &BudgetRequest) -> Result<Option<BudgetEstimate>>;
}

fn insights_or_default(budget: &AiBudget, fallback: &str) -> String {
    if budget.insights.is_empty() {
        fallback.to_string()
    } else {
        budget.insights.clone()
    }
}

/// Places-grounded pricing: top lodging and dining, then generation
pub struct HybridStrategy {
    places: PlacesFetcher,
    chain: ModelChain,
    timeout: Duration,
}

impl HybridStrategy {
    #[must_use]
    pub fn new(places: PlacesFetcher, chain: ModelChain, timeout: Duration) -> Self {
        Self {
            places,
            chain,
            timeout,
        }
    }
}

#[async_trait]
impl BudgetStrategy for HybridStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::Hybrid
    }

    #[instrument(name = "hybrid_strategy", skip_all, fields(destination = %request.destination))]
    async fn attempt(&self, request: &BudgetRequest) -> Result<Option<BudgetEstimate>> {
        let (lodging, dining) = futures::join!(
            self.places
                .top_candidates(&request.destination, PlaceCategory::Lodging),
            self.places
                .top_candidates(&request.destination, PlaceCategory::Dining),
        );

        if lodging.is_empty() && dining.is_empty() {
            info!("No place data for {}, skipping hybrid pricing", request.destination);
            return Ok(None);
        }

        let prompt = prompt::hybrid_prompt(request, &lodging, &dining);
        let Some(budget) = self.chain.budget(&prompt, self.timeout).await else {
            return Ok(None);
        };

        let insights = insights_or_default(
            &budget,
            "Priced against top-rated local hotels and restaurants.",
        );
        let estimate = BudgetEstimate::new(request, budget.breakdown(), insights, self.tag())
            .with_places(lodging, dining);
        Ok(Some(estimate))
    }
}

/// Pricing from trip parameters alone
pub struct GenericAiStrategy {
    chain: ModelChain,
    timeout: Duration,
}

impl GenericAiStrategy {
    #[must_use]
    pub fn new(chain: ModelChain, timeout: Duration) -> Self {
        Self { chain, timeout }
    }
}

#[async_trait]
impl BudgetStrategy for GenericAiStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::GenericAi
    }

    #[instrument(name = "generic_ai_strategy", skip_all, fields(destination = %request.destination))]
    async fn attempt(&self, request: &BudgetRequest) -> Result<Option<BudgetEstimate>> {
        let prompt = prompt::generic_prompt(request);
        let Some(budget) = self.chain.budget(&prompt, self.timeout).await else {
            return Ok(None);
        };

        let insights = insights_or_default(&budget, "Estimated from typical prices for the destination.");
        Ok(Some(BudgetEstimate::new(
            request,
            budget.breakdown(),
            insights,
            self.tag(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generative::Generation;
    use crate::generative::testing::ScriptedGenerator;
    use crate::models::PlaceCandidate;
    use crate::places::{PlaceDetails, PlacesApi};
    use std::sync::Arc;

    struct StaticPlaces(Vec<PlaceCandidate>);

    #[async_trait]
    impl PlacesApi for StaticPlaces {
        fn is_configured(&self) -> bool {
            true
        }

        async fn search(
            &self,
            _query: &str,
            category: PlaceCategory,
            _location_hint: &str,
        ) -> Result<Vec<PlaceCandidate>> {
            Ok(self
                .0
                .iter()
                .filter(|c| c.category == category)
                .cloned()
                .collect())
        }

        async fn details(&self, _place_id: &str, _fields: &[&str]) -> Result<PlaceDetails> {
            Ok(PlaceDetails::default())
        }
    }

    fn place(name: &str, category: PlaceCategory) -> PlaceCandidate {
        PlaceCandidate {
            place_id: name.to_lowercase(),
            name: name.to_string(),
            rating: Some(4.5),
            price_tier: Some(2),
            category,
        }
    }

    fn request() -> BudgetRequest {
        BudgetRequest::new("Hunza Valley", 2, 3, "summer").unwrap()
    }

    fn chain(generator: Arc<ScriptedGenerator>) -> ModelChain {
        ModelChain::new(generator, vec!["m1".to_string()])
    }

    #[tokio::test]
    async fn test_hybrid_attaches_places() {
        let places = PlacesFetcher::new(
            Arc::new(StaticPlaces(vec![
                place("Serena Inn", PlaceCategory::Lodging),
                place("Cafe de Hunza", PlaceCategory::Dining),
            ])),
            3,
            6,
        );
        let generator = Arc::new(ScriptedGenerator::new([(
            "m1",
            Generation::ok(r#"{"accommodation": 600, "food": 200, "transportation": 150, "activities": 100, "miscellaneous": 50, "total": 1100, "insights": "Stay at Serena Inn."}"#),
        )]));
        let strategy = HybridStrategy::new(places, chain(generator), Duration::from_secs(1));

        let estimate = strategy.attempt(&request()).await.unwrap().unwrap();

        assert_eq!(estimate.strategy, StrategyTag::Hybrid);
        assert!(estimate.used_place_data);
        assert_eq!(estimate.lodging[0].name, "Serena Inn");
        assert_eq!(estimate.dining[0].name, "Cafe de Hunza");
        assert_eq!(estimate.total, 1100);
        assert_eq!(estimate.insights, "Stay at Serena Inn.");
    }

    #[tokio::test]
    async fn test_hybrid_without_places_skips_generation() {
        let places = PlacesFetcher::new(Arc::new(StaticPlaces(vec![])), 3, 6);
        let generator = Arc::new(ScriptedGenerator::new([(
            "m1",
            Generation::ok(r#"{"total": 1000}"#),
        )]));
        let strategy =
            HybridStrategy::new(places, chain(generator.clone()), Duration::from_secs(1));

        assert!(strategy.attempt(&request()).await.unwrap().is_none());
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_generic_normalizes_partial_breakdown() {
        let generator = Arc::new(ScriptedGenerator::new([(
            "m1",
            Generation::ok("```json\n{\"total\": 5000, \"accommodation\": 2000}\n```"),
        )]));
        let strategy = GenericAiStrategy::new(chain(generator), Duration::from_secs(1));

        let estimate = strategy.attempt(&request()).await.unwrap().unwrap();

        assert_eq!(estimate.strategy, StrategyTag::GenericAi);
        assert_eq!(estimate.breakdown.accommodation, 2000);
        assert_eq!(estimate.breakdown.food, 0);
        assert_eq!(estimate.breakdown.miscellaneous, 3000);
        assert_eq!(estimate.total, 5000);
        assert!(estimate.is_consistent());
        assert!(!estimate.used_place_data);
        assert!(!estimate.insights.is_empty());
    }

    #[tokio::test]
    async fn test_generic_miss_when_all_models_forbidden() {
        let generator = Arc::new(ScriptedGenerator::new([("m1", Generation::failed(403))]));
        let strategy = GenericAiStrategy::new(chain(generator), Duration::from_secs(1));
        assert!(strategy.attempt(&request()).await.unwrap().is_none());
    }
}
