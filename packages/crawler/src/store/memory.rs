//! In-memory pattern store for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreResult;
use crate::store::PatternStore;
use crate::types::pattern::SitePattern;

/// In-memory store keyed by domain.
///
/// Not suitable for production: patterns are lost on restart, which
/// forces re-learning every run.
pub struct MemoryPatternStore {
    patterns: RwLock<HashMap<String, SitePattern>>,
}

impl Default for MemoryPatternStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPatternStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            patterns: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.read().unwrap().len()
    }

    /// Drop all patterns.
    pub fn clear(&self) {
        self.patterns.write().unwrap().clear();
    }
}

#[async_trait]
impl PatternStore for MemoryPatternStore {
    async fn get(&self, domain: &str) -> StoreResult<Option<SitePattern>> {
        Ok(self.patterns.read().unwrap().get(domain).cloned())
    }

    async fn save(&self, pattern: &SitePattern) -> StoreResult<()> {
        self.patterns
            .write()
            .unwrap()
            .insert(pattern.domain.clone(), pattern.clone());
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<SitePattern>> {
        let mut patterns: Vec<_> = self.patterns.read().unwrap().values().cloned().collect();
        patterns.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(patterns)
    }

    async fn delete(&self, domain: &str) -> StoreResult<()> {
        self.patterns.write().unwrap().remove(domain);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pattern::{FieldSelector, JobField};

    fn pattern(domain: &str) -> SitePattern {
        SitePattern::new(domain, format!("https://{domain}/jobs?page={{page}}"))
            .with_card_selector("div.card")
            .with_selector(JobField::Title, FieldSelector::text("h2"))
            .with_confidence(0.6)
    }

    #[tokio::test]
    async fn test_pattern_crud() {
        let store = MemoryPatternStore::new();

        store.save(&pattern("a.example.com")).await.unwrap();
        assert_eq!(store.pattern_count(), 1);

        let loaded = store.get("a.example.com").await.unwrap().unwrap();
        assert_eq!(loaded.card_selector, "div.card");

        assert!(store.get("missing.example.com").await.unwrap().is_none());

        store.delete("a.example.com").await.unwrap();
        assert_eq!(store.pattern_count(), 0);

        // Deleting an absent domain is a no-op
        store.delete("a.example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_save_is_last_write_wins() {
        let store = MemoryPatternStore::new();

        store.save(&pattern("a.example.com")).await.unwrap();
        let updated = pattern("a.example.com").with_card_selector("li.job");
        store.save(&updated).await.unwrap();

        let loaded = store.get("a.example.com").await.unwrap().unwrap();
        assert_eq!(loaded.card_selector, "li.job");
        assert_eq!(store.pattern_count(), 1);
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_domain() {
        let store = MemoryPatternStore::new();
        store.save(&pattern("b.example.com")).await.unwrap();
        store.save(&pattern("a.example.com")).await.unwrap();

        let domains: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.domain)
            .collect();
        assert_eq!(domains, vec!["a.example.com", "b.example.com"]);
    }
}
