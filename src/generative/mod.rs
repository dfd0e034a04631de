//! Generative-text module
//!
//! Turns trip parameters into a priced breakdown using an unreliable
//! upstream text service:
//! - `TextGenerator`: one request against one model identifier
//! - `ModelChain`: model identifiers as an ordered list of resolvers
//! - `parser`: fence stripping, JSON extraction and numeric coercion
//! - `prompt`: prompt construction for the generic and hybrid variants

pub mod gemini;
pub mod parser;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub use gemini::GeminiClient;
pub use parser::{AiBudget, parse_budget};

/// Outcome of one generation request. Non-200 statuses and missing text are
/// ordinary values here; only transport failures are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub status: u16,
    pub text: Option<String>,
}

impl Generation {
    #[must_use]
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            status: 200,
            text: Some(text.into()),
        }
    }

    #[must_use]
    pub fn failed(status: u16) -> Self {
        Self { status, text: None }
    }

    /// Text of a successful response, if any
    #[must_use]
    pub fn usable_text(&self) -> Option<&str> {
        if self.status != 200 {
            return None;
        }
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// False when no request should be attempted (e.g. no key)
    fn is_configured(&self) -> bool;

    async fn generate(&self, model_id: &str, prompt: &str, timeout: Duration)
    -> Result<Generation>;
}

/// Ordered list of model identifiers, each treated as a distinct resolver.
/// The first one producing an accepted value wins; the rest are not called.
#[derive(Clone)]
pub struct ModelChain {
    generator: Arc<dyn TextGenerator>,
    models: Vec<String>,
}

impl ModelChain {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, models: Vec<String>) -> Self {
        Self { generator, models }
    }

    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Try each model in order until `accept` turns a response into a value.
    /// Returns `None` when every model fails or the generator is unconfigured.
    pub async fn first_success<T, F>(&self, prompt: &str, timeout: Duration, accept: F) -> Option<T>
    where
        F: Fn(&str) -> Option<T> + Send + Sync,
        T: Send,
    {
        if !self.generator.is_configured() {
            debug!("Generative API not configured, skipping");
            return None;
        }

        for model in &self.models {
            let generation = match self.generator.generate(model, prompt, timeout).await {
                Ok(generation) => generation,
                Err(e) => {
                    warn!("Model {} request failed: {:#}", model, e);
                    continue;
                }
            };

            let Some(text) = generation.usable_text() else {
                warn!("Model {} returned status {} without usable text", model, generation.status);
                continue;
            };

            match accept(text) {
                Some(value) => {
                    info!("Model {} produced an accepted response", model);
                    return Some(value);
                }
                None => warn!("Model {} response could not be used", model),
            }
        }

        None
    }

    /// Priced breakdown for `prompt`, requiring a positive total
    pub async fn budget(&self, prompt: &str, timeout: Duration) -> Option<AiBudget> {
        self.first_success(prompt, timeout, |text| {
            parse_budget(text).filter(|budget| budget.total > 0)
        })
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;

    fn models() -> Vec<String> {
        vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let generator = Arc::new(ScriptedGenerator::new([
            ("m1", Generation::failed(404)),
            ("m2", Generation::ok(r#"{"total": 900, "food": 900}"#)),
            ("m3", Generation::ok(r#"{"total": 1}"#)),
        ]));
        let chain = ModelChain::new(generator.clone(), models());

        let budget = chain.budget("prompt", Duration::from_secs(1)).await.unwrap();

        assert_eq!(budget.total, 900);
        assert_eq!(generator.calls(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_unparsable_and_zero_totals_fall_through() {
        let generator = Arc::new(ScriptedGenerator::new([
            ("m1", Generation::ok("I cannot help with that.")),
            ("m2", Generation::ok(r#"{"food": 300}"#)),
            ("m3", Generation::ok(r#"{"total": "1,250"}"#)),
        ]));
        let chain = ModelChain::new(generator.clone(), models());

        let budget = chain.budget("prompt", Duration::from_secs(1)).await.unwrap();

        assert_eq!(budget.total, 1250);
        assert_eq!(generator.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_all_forbidden_is_a_miss() {
        let generator = Arc::new(ScriptedGenerator::new([
            ("m1", Generation::failed(403)),
            ("m2", Generation::failed(403)),
            ("m3", Generation::failed(403)),
        ]));
        let chain = ModelChain::new(generator.clone(), models());

        assert!(chain.budget("prompt", Duration::from_secs(1)).await.is_none());
        assert_eq!(generator.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_transport_errors_are_misses() {
        let generator = Arc::new(ScriptedGenerator::new([]));
        let chain = ModelChain::new(generator.clone(), models());
        assert!(chain.budget("prompt", Duration::from_secs(1)).await.is_none());
        assert_eq!(generator.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_unconfigured_generator_is_never_called() {
        let mut generator = ScriptedGenerator::new([("m1", Generation::ok(r#"{"total": 5}"#))]);
        generator.configured = false;
        let generator = Arc::new(generator);
        let chain = ModelChain::new(generator.clone(), models());

        assert!(chain.budget("prompt", Duration::from_secs(1)).await.is_none());
        assert!(generator.calls().is_empty());
    }

    #[test]
    fn test_usable_text() {
        assert_eq!(Generation::ok("{}").usable_text(), Some("{}"));
        assert_eq!(Generation::ok("  ").usable_text(), None);
        assert_eq!(Generation::failed(500).usable_text(), None);
        let odd = Generation {
            status: 403,
            text: Some("{\"total\": 3}".to_string()),
        };
        assert_eq!(odd.usable_text(), None);
    }
}
