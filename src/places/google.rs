use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{PlaceDetails, PlacesApi};
use crate::config::PlacesConfig;
use crate::models::{PlaceCandidate, PlaceCategory};

/// Google Places (legacy web service) client
pub struct GooglePlacesClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

/// Text Search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    place_id: Option<String>,
    name: Option<String>,
    rating: Option<f64>,
    price_level: Option<i64>,
}

/// Place Details response
#[derive(Debug, Deserialize)]
struct DetailsResponse {
    result: Option<DetailsResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailsResult {
    rating: Option<f64>,
    price_level: Option<i64>,
}

impl GooglePlacesClient {
    /// Create a new client
    pub fn new(config: &PlacesConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("travelbudget/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Places API key is not configured"))
    }
}

impl SearchResult {
    fn into_candidate(self, category: PlaceCategory) -> Option<PlaceCandidate> {
        Some(PlaceCandidate {
            place_id: self.place_id?,
            name: self.name?,
            rating: self.rating.and_then(PlaceCandidate::sanitize_rating),
            price_tier: self.price_level.and_then(PlaceCandidate::tier_from_level),
            category,
        })
    }
}

#[async_trait]
impl PlacesApi for GooglePlacesClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        category: PlaceCategory,
        location_hint: &str,
    ) -> Result<Vec<PlaceCandidate>> {
        let query = if query.to_lowercase().contains(&location_hint.to_lowercase()) {
            query.to_string()
        } else {
            format!("{query} {location_hint}")
        };
        let url = format!(
            "{}/textsearch/json?query={}&type={}&key={}",
            self.base_url,
            urlencoding::encode(&query),
            category.search_type(),
            urlencoding::encode(self.key()?)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| "Places search request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Places search returned HTTP {status}"));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| "Failed to parse places search response")?;

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            other => {
                return Err(anyhow!(
                    "Places search status {other}: {}",
                    body.error_message.unwrap_or_default()
                ));
            }
        }

        let candidates: Vec<PlaceCandidate> = body
            .results
            .into_iter()
            .filter_map(|r| r.into_candidate(category))
            .collect();
        debug!("Places search returned {} candidates", candidates.len());
        Ok(candidates)
    }

    #[instrument(skip(self))]
    async fn details(&self, place_id: &str, fields: &[&str]) -> Result<PlaceDetails> {
        let url = format!(
            "{}/details/json?place_id={}&fields={}&key={}",
            self.base_url,
            urlencoding::encode(place_id),
            fields.join(","),
            urlencoding::encode(self.key()?)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| "Place details request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Place details returned HTTP {status}"));
        }

        let body: DetailsResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| "Failed to parse place details response")?;

        if body.status != "OK" {
            return Err(anyhow!(
                "Place details status {}: {}",
                body.status,
                body.error_message.unwrap_or_default()
            ));
        }

        let result = body.result.unwrap_or_default();
        Ok(PlaceDetails {
            price_tier: result.price_level.and_then(PlaceCandidate::tier_from_level),
            rating: result.rating.and_then(PlaceCandidate::sanitize_rating),
        })
    }
}
