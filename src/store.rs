//! Rate-rule store
//!
//! Administrator-maintained reference data read by the deterministic
//! calculator. Persistent rules live in a fjall keyspace; an in-memory store
//! serves unconfigured deployments and tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use fjall::Keyspace;
use tokio::sync::Mutex;
use tokio::task;

use crate::models::{BudgetRule, normalize_destination};

const RULE_PREFIX: &str = "rule:";
const INDEX_KEY: &str = "__index__";

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Best matching rule for a destination, see [`select_rule`]
    async fn find_rule(&self, destination: &str) -> Result<Option<BudgetRule>>;

    /// Insert or replace the rule for `rule.destination`
    async fn put_rule(&self, rule: BudgetRule) -> Result<()>;

    /// All rules ordered by normalized destination
    async fn list_rules(&self) -> Result<Vec<BudgetRule>>;
}

/// Case-insensitive destination matching.
///
/// An exact match wins; then the first rule (in key order) whose destination
/// contains the query; then the longest rule destination contained in the
/// query.
pub fn select_rule<I>(rules: I, destination: &str) -> Option<BudgetRule>
where
    I: IntoIterator<Item = BudgetRule>,
{
    let query = normalize_destination(destination);
    if query.is_empty() {
        return None;
    }

    let mut keyed: Vec<(String, BudgetRule)> = rules.into_iter().map(|r| (r.key(), r)).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(idx) = keyed.iter().position(|(key, _)| *key == query) {
        return Some(keyed.swap_remove(idx).1);
    }
    if let Some(idx) = keyed.iter().position(|(key, _)| key.contains(&query)) {
        return Some(keyed.swap_remove(idx).1);
    }

    let mut best: Option<usize> = None;
    for (idx, (key, _)) in keyed.iter().enumerate() {
        if !key.is_empty() && query.contains(key.as_str()) {
            // strictly longer only, so ties keep key order
            if best.is_none_or(|b| key.len() > keyed[b].0.len()) {
                best = Some(idx);
            }
        }
    }
    best.map(|idx| keyed.swap_remove(idx).1)
}

/// Persistent store over a fjall keyspace
pub struct FjallRuleStore {
    store: Keyspace,
    write_lock: Mutex<()>,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl FjallRuleStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("budget_rules", fjall::KeyspaceCreateOptions::default)?;
        Ok(Self {
            store: items,
            write_lock: Mutex::new(()),
        })
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || get_from_store(store, key)).await?
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    async fn index(&self) -> Result<Vec<String>> {
        match self.read(INDEX_KEY).await? {
            Some(bytes) => Ok(postcard::from_bytes(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    async fn rule(&self, key: &str) -> Result<Option<BudgetRule>> {
        match self.read(&format!("{RULE_PREFIX}{key}")).await? {
            Some(bytes) => Ok(Some(postcard::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RuleStore for FjallRuleStore {
    #[tracing::instrument(name = "find_rule", level = "debug", skip(self))]
    async fn find_rule(&self, destination: &str) -> Result<Option<BudgetRule>> {
        let query = normalize_destination(destination);
        if let Some(rule) = self.rule(&query).await? {
            tracing::debug!("Exact rule match");
            return Ok(Some(rule));
        }
        let rules = self.list_rules().await?;
        Ok(select_rule(rules, destination))
    }

    #[tracing::instrument(name = "put_rule", level = "debug", skip(self, rule), fields(destination = %rule.destination))]
    async fn put_rule(&self, rule: BudgetRule) -> Result<()> {
        rule.validate()?;
        let key = rule.key();
        let bytes = postcard::to_stdvec(&rule)?;

        let _guard = self.write_lock.lock().await;
        self.write(&format!("{RULE_PREFIX}{key}"), bytes).await?;

        let mut index = self.index().await?;
        if let Err(pos) = index.binary_search(&key) {
            index.insert(pos, key);
            self.write(INDEX_KEY, postcard::to_stdvec(&index)?).await?;
        }
        Ok(())
    }

    async fn list_rules(&self) -> Result<Vec<BudgetRule>> {
        let mut rules = Vec::new();
        for key in self.index().await? {
            match self.rule(&key).await? {
                Some(rule) => rules.push(rule),
                None => tracing::warn!("Rule index references missing key {}", key),
            }
        }
        Ok(rules)
    }
}

/// In-process store
#[derive(Default)]
pub struct MemoryRuleStore {
    rules: RwLock<BTreeMap<String, BudgetRule>>,
}

impl MemoryRuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `rules`; invalid rules are rejected
    pub fn with_rules(rules: impl IntoIterator<Item = BudgetRule>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for rule in rules {
            rule.validate()?;
            map.insert(rule.key(), rule);
        }
        Ok(Self {
            rules: RwLock::new(map),
        })
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn find_rule(&self, destination: &str) -> Result<Option<BudgetRule>> {
        let rules = self
            .rules
            .read()
            .map_err(|_| anyhow!("rule store lock poisoned"))?;
        Ok(select_rule(rules.values().cloned(), destination))
    }

    async fn put_rule(&self, rule: BudgetRule) -> Result<()> {
        rule.validate()?;
        self.rules
            .write()
            .map_err(|_| anyhow!("rule store lock poisoned"))?
            .insert(rule.key(), rule);
        Ok(())
    }

    async fn list_rules(&self) -> Result<Vec<BudgetRule>> {
        let rules = self
            .rules
            .read()
            .map_err(|_| anyhow!("rule store lock poisoned"))?;
        Ok(rules.values().cloned().collect())
    }
}
