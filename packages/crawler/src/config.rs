//! Configuration for the crawler engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable knobs shared by the learner, site crawler and orchestrator.
///
/// The confidence threshold and relearn retry count are deliberately
/// configuration, not constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum learner confidence for a pattern to be persisted.
    pub confidence_threshold: f32,

    /// How many alternate probe strategies to try after the first
    /// low-confidence learning attempt.
    pub learn_retries: usize,

    /// How many cards the learner samples when inferring field locators.
    pub card_sample_size: usize,

    /// Safety bound on listing pages fetched in a single crawl.
    pub max_pages_per_crawl: usize,

    /// Result limit applied when the caller does not specify one.
    pub default_limit: usize,

    /// Per-render timeout in milliseconds.
    pub render_timeout_ms: u64,

    /// Wall-clock budget for a whole `crawl_all` invocation, in
    /// milliseconds. Sites still running at expiry are cancelled and
    /// reported, completed sites keep their results.
    pub crawl_budget_ms: u64,

    /// Maximum concurrent site crawls; also sizes the browser pool.
    pub max_concurrent_sites: usize,

    /// Visit detail pages to fill description/requirements. Off by
    /// default: it multiplies fetch count by the result count.
    pub fetch_details: bool,

    /// User agent sent by the HTTP renderer.
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            learn_retries: 1,
            card_sample_size: 5,
            max_pages_per_crawl: 20,
            default_limit: 50,
            render_timeout_ms: 30_000,
            crawl_budget_ms: 120_000,
            max_concurrent_sites: 4,
            fetch_details: false,
            user_agent: "JobCrawler/0.1".to_string(),
        }
    }
}

impl CrawlerConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum confidence for persisting a learned pattern.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the number of alternate probe strategies tried after a
    /// low-confidence attempt.
    pub fn with_learn_retries(mut self, retries: usize) -> Self {
        self.learn_retries = retries;
        self
    }

    /// Set how many cards the learner samples.
    pub fn with_card_sample_size(mut self, size: usize) -> Self {
        self.card_sample_size = size.max(1);
        self
    }

    /// Set the listing-page safety bound.
    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages_per_crawl = max.max(1);
        self
    }

    /// Set the per-render timeout.
    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the whole-aggregation wall-clock budget.
    pub fn with_crawl_budget(mut self, budget: Duration) -> Self {
        self.crawl_budget_ms = budget.as_millis() as u64;
        self
    }

    /// Set the concurrency ceiling (and browser pool size).
    pub fn with_max_concurrent_sites(mut self, max: usize) -> Self {
        self.max_concurrent_sites = max.max(1);
        self
    }

    /// Enable detail-page fetching.
    pub fn with_detail_fetching(mut self) -> Self {
        self.fetch_details = true;
        self
    }

    /// Set the HTTP user agent.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Per-render timeout as a `Duration`.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Aggregation budget as a `Duration`.
    pub fn crawl_budget(&self) -> Duration {
        Duration::from_millis(self.crawl_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = CrawlerConfig::default();
        assert!(config.confidence_threshold > 0.0 && config.confidence_threshold < 1.0);
        assert!(config.max_pages_per_crawl >= 1);
        assert!(config.max_concurrent_sites >= 1);
    }

    #[test]
    fn test_builder_clamps_zero() {
        let config = CrawlerConfig::new()
            .with_card_sample_size(0)
            .with_max_pages(0)
            .with_max_concurrent_sites(0);
        assert_eq!(config.card_sample_size, 1);
        assert_eq!(config.max_pages_per_crawl, 1);
        assert_eq!(config.max_concurrent_sites, 1);
    }
}
