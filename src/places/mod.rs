//! Places module
//!
//! Looks up top-rated lodging and dining for a destination:
//! - `PlacesApi`: search/details contract over a places index
//! - `GooglePlacesClient`: Google Places Text Search / Details implementation
//! - `PlacesFetcher`: best-effort search, price-tier backfill and ranking

pub mod google;

use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::models::{PlaceCandidate, PlaceCategory};

pub use google::GooglePlacesClient;

/// Upper bound on candidates considered for price-tier backfill
pub const MAX_POOL: usize = 6;

/// Fields requested when backfilling a candidate
pub const DETAIL_FIELDS: [&str; 2] = ["price_level", "rating"];

/// Subset of a place's details relevant to pricing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    pub price_tier: Option<u8>,
    pub rating: Option<f64>,
}

/// Search/details contract over a places index. Implementations must
/// tolerate absent fields in upstream responses.
#[async_trait]
pub trait PlacesApi: Send + Sync {
    /// False when the API cannot be used at all (e.g. no key)
    fn is_configured(&self) -> bool;

    async fn search(
        &self,
        query: &str,
        category: PlaceCategory,
        location_hint: &str,
    ) -> Result<Vec<PlaceCandidate>>;

    async fn details(&self, place_id: &str, fields: &[&str]) -> Result<PlaceDetails>;
}

/// Order by rating, highest first. Candidates without a rating sort last;
/// ties keep their original order.
pub fn rank_candidates(candidates: &mut [PlaceCandidate]) {
    candidates.sort_by(|a, b| match (a.rating, b.rating) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Best-effort fetcher of top-rated candidates
pub struct PlacesFetcher {
    api: Arc<dyn PlacesApi>,
    top_n: usize,
    pool_size: usize,
}

impl PlacesFetcher {
    #[must_use]
    pub fn new(api: Arc<dyn PlacesApi>, top_n: usize, pool_size: usize) -> Self {
        Self {
            api,
            top_n,
            pool_size,
        }
    }

    /// Number of candidates that go through backfill: at least `top_n`,
    /// otherwise capped at [`MAX_POOL`]
    #[must_use]
    pub fn pool_limit(&self) -> usize {
        self.top_n.max(self.pool_size.min(MAX_POOL))
    }

    /// Up to `top_n` candidates for `destination`, best rated first.
    ///
    /// Never fails: an unconfigured API, a failed search or no results all
    /// yield an empty list.
    #[instrument(skip(self), fields(top_n = self.top_n))]
    pub async fn top_candidates(
        &self,
        destination: &str,
        category: PlaceCategory,
    ) -> Vec<PlaceCandidate> {
        if !self.api.is_configured() {
            debug!("Places API not configured, skipping {} lookup", category.noun());
            return Vec::new();
        }

        let query = format!("{} in {}", category.noun(), destination);
        let mut candidates = match self.api.search(&query, category, destination).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Places search failed for '{}': {:#}", query, e);
                return Vec::new();
            }
        };

        if candidates.is_empty() {
            info!("No {} found for {}", category.noun(), destination);
            return candidates;
        }

        rank_candidates(&mut candidates);
        candidates.truncate(self.pool_limit());

        self.backfill_price_tiers(&mut candidates).await;

        rank_candidates(&mut candidates);
        candidates.truncate(self.top_n);

        info!(
            "Selected {} {} for {}",
            candidates.len(),
            category.noun(),
            destination
        );
        candidates
    }

    /// Sequential details lookups for candidates missing a price tier. A
    /// failed lookup leaves that candidate unchanged.
    async fn backfill_price_tiers(&self, candidates: &mut [PlaceCandidate]) {
        for candidate in candidates.iter_mut().filter(|c| c.price_tier.is_none()) {
            match self.api.details(&candidate.place_id, &DETAIL_FIELDS).await {
                Ok(details) => {
                    candidate.price_tier = details.price_tier;
                    if candidate.rating.is_none() {
                        candidate.rating = details.rating;
                    }
                }
                Err(e) => {
                    debug!(
                        "Details lookup failed for {} ({}): {:#}",
                        candidate.name, candidate.place_id, e
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn candidate(id: &str, rating: Option<f64>, price_tier: Option<u8>) -> PlaceCandidate {
        PlaceCandidate {
            place_id: id.to_string(),
            name: format!("Place {id}"),
            rating,
            price_tier,
            category: PlaceCategory::Lodging,
        }
    }

    struct FakePlaces {
        configured: bool,
        results: Result<Vec<PlaceCandidate>, String>,
        details: HashMap<String, PlaceDetails>,
        detail_calls: Mutex<Vec<String>>,
    }

    impl FakePlaces {
        fn with_results(results: Vec<PlaceCandidate>) -> Self {
            Self {
                configured: true,
                results: Ok(results),
                details: HashMap::new(),
                detail_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PlacesApi for FakePlaces {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn search(
            &self,
            _query: &str,
            _category: PlaceCategory,
            _location_hint: &str,
        ) -> Result<Vec<PlaceCandidate>> {
            self.results.clone().map_err(|e| anyhow!(e))
        }

        async fn details(&self, place_id: &str, _fields: &[&str]) -> Result<PlaceDetails> {
            self.detail_calls.lock().unwrap().push(place_id.to_string());
            self.details
                .get(place_id)
                .cloned()
                .ok_or_else(|| anyhow!("details unavailable"))
        }
    }

    #[test]
    fn test_rank_candidates_missing_rating_last() {
        let mut candidates = vec![
            candidate("a", Some(4.8), None),
            candidate("b", None, None),
            candidate("c", Some(3.1), None),
            candidate("d", Some(5.0), None),
        ];
        rank_candidates(&mut candidates);
        let ratings: Vec<Option<f64>> = candidates.iter().map(|c| c.rating).collect();
        assert_eq!(ratings, vec![Some(5.0), Some(4.8), Some(3.1), None]);
    }

    #[test]
    fn test_rank_candidates_is_stable_for_ties() {
        let mut candidates = vec![
            candidate("first", Some(4.0), None),
            candidate("second", Some(4.0), None),
        ];
        rank_candidates(&mut candidates);
        assert_eq!(candidates[0].place_id, "first");
    }

    #[test]
    fn test_pool_limit() {
        let api: Arc<dyn PlacesApi> = Arc::new(FakePlaces::with_results(vec![]));
        assert_eq!(PlacesFetcher::new(api.clone(), 3, 6).pool_limit(), 6);
        assert_eq!(PlacesFetcher::new(api.clone(), 3, 10).pool_limit(), 6);
        assert_eq!(PlacesFetcher::new(api.clone(), 3, 1).pool_limit(), 3);
        assert_eq!(PlacesFetcher::new(api, 8, 6).pool_limit(), 8);
    }

    #[tokio::test]
    async fn test_unconfigured_api_returns_empty() {
        let mut fake = FakePlaces::with_results(vec![candidate("a", Some(4.0), Some(2))]);
        fake.configured = false;
        let fetcher = PlacesFetcher::new(Arc::new(fake), 3, 6);
        assert!(fetcher.top_candidates("Hunza", PlaceCategory::Lodging).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_error_returns_empty() {
        let mut fake = FakePlaces::with_results(vec![]);
        fake.results = Err("REQUEST_DENIED".to_string());
        let fetcher = PlacesFetcher::new(Arc::new(fake), 3, 6);
        assert!(fetcher.top_candidates("Hunza", PlaceCategory::Dining).await.is_empty());
    }

    #[tokio::test]
    async fn test_backfill_and_top_n() {
        let results = (0..8)
            .map(|i| {
                let tier = if i % 2 == 0 { Some(2) } else { None };
                candidate(&format!("p{i}"), Some(3.0 + f64::from(i) * 0.2), tier)
            })
            .collect();
        let mut fake = FakePlaces::with_results(results);
        fake.details.insert(
            "p7".to_string(),
            PlaceDetails {
                price_tier: Some(4),
                rating: None,
            },
        );
        let fake = Arc::new(fake);
        let fetcher = PlacesFetcher::new(fake.clone(), 3, 6);

        let top = fetcher.top_candidates("Hunza", PlaceCategory::Lodging).await;

        assert_eq!(top.len(), 3);
        assert_eq!(top[0].place_id, "p7");
        assert_eq!(top[0].price_tier, Some(4));
        // p5 failed its lookup and keeps its missing tier
        assert_eq!(top[2].place_id, "p5");
        assert_eq!(top[2].price_tier, None);

        // only the six best rated are backfilled, and only those missing a tier
        let calls = fake.detail_calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["p7", "p5", "p3"]);
    }

    #[tokio::test]
    async fn test_backfill_fills_missing_rating() {
        let mut fake = FakePlaces::with_results(vec![candidate("x", None, None)]);
        fake.details.insert(
            "x".to_string(),
            PlaceDetails {
                price_tier: Some(1),
                rating: Some(4.1),
            },
        );
        let fetcher = PlacesFetcher::new(Arc::new(fake), 3, 6);
        let top = fetcher.top_candidates("Gilgit", PlaceCategory::Dining).await;
        assert_eq!(top[0].rating, Some(4.1));
        assert_eq!(top[0].price_tier, Some(1));
    }
}
