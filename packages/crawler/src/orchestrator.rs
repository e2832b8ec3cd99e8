//! Cross-site aggregation.
//!
//! Fans one crawl task out per requested domain, isolates per-site
//! failures, enforces a wall-clock budget, and groups the merged results
//! into a company report.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::CrawlerConfig;
use crate::crawl::SiteCrawler;
use crate::error::CrawlError;
use crate::render::PageRenderer;
use crate::store::PatternStore;
use crate::types::params::{AggregateRequest, AggregateResponse, CrawlParams};
use crate::types::report::CrawlOutcome;

/// Runs concurrent site crawls and merges their results.
///
/// Sites share nothing but the pattern store read path; an error on one
/// domain lands in its own `per_site_errors` slot and never cancels or
/// affects siblings.
pub struct Aggregator<S: PatternStore, R: PageRenderer> {
    crawler: Arc<SiteCrawler<S, R>>,
    config: CrawlerConfig,
}

impl<S, R> Aggregator<S, R>
where
    S: PatternStore + 'static,
    R: PageRenderer + 'static,
{
    pub fn new(crawler: Arc<SiteCrawler<S, R>>) -> Self {
        let config = crawler.config().clone();
        Self { crawler, config }
    }

    pub fn crawler(&self) -> &Arc<SiteCrawler<S, R>> {
        &self.crawler
    }

    /// Serve an inbound aggregation request in the wire contract.
    ///
    /// An empty site list means "all configured sites": every domain
    /// with a stored pattern.
    pub async fn handle(&self, request: &AggregateRequest) -> AggregateResponse {
        let sites = if request.sites.is_empty() {
            match self.crawler.store().list().await {
                Ok(patterns) => patterns.into_iter().map(|p| p.domain).collect(),
                Err(error) => {
                    warn!(error = %error, "could not enumerate configured sites");
                    return AggregateResponse {
                        success: false,
                        jobs: Vec::new(),
                        count: 0,
                        crawled_at: chrono::Utc::now(),
                        errors: vec![format!("pattern store: {error}")],
                    };
                }
            }
        } else {
            request.sites.clone()
        };

        let outcome = self.crawl_all(&sites, &request.params).await;
        AggregateResponse::from_outcome(outcome)
    }

    /// Crawl every requested domain concurrently.
    ///
    /// Each site runs under the configured wall-clock budget; a site
    /// still running at expiry is cancelled and reported with a timeout
    /// cause while completed sites keep their results. Partial success
    /// is a valid outcome, not a failure of the whole operation.
    pub async fn crawl_all(&self, sites: &[String], params: &CrawlParams) -> CrawlOutcome {
        let crawl_id = Uuid::new_v4();
        let budget = self.config.crawl_budget();
        let budget_ms = self.config.crawl_budget_ms;

        let mut domains: Vec<String> = sites.to_vec();
        domains.sort();
        domains.dedup();

        info!(
            crawl_id = %crawl_id,
            sites = domains.len(),
            budget_ms,
            "aggregation starting"
        );

        let mut tasks = FuturesUnordered::new();
        for domain in domains {
            let crawler = Arc::clone(&self.crawler);
            let params = params.clone();
            tasks.push(async move {
                let result = match tokio::time::timeout(budget, crawler.crawl(&domain, &params))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(CrawlError::Timeout {
                        domain: domain.clone(),
                        budget_ms,
                    }),
                };
                (domain, result)
            });
        }

        let mut jobs = Vec::new();
        let mut per_site_errors = BTreeMap::new();
        let mut sites_succeeded = 0usize;

        // Merge in completion order; no cross-site ordering is promised
        while let Some((domain, result)) = tasks.next().await {
            match result {
                Ok(site_jobs) => {
                    info!(
                        crawl_id = %crawl_id,
                        domain = %domain,
                        jobs = site_jobs.len(),
                        "site crawl succeeded"
                    );
                    sites_succeeded += 1;
                    jobs.extend(site_jobs);
                }
                Err(error) => {
                    warn!(
                        crawl_id = %crawl_id,
                        domain = %domain,
                        error = %error,
                        "site crawl failed"
                    );
                    per_site_errors.insert(domain, error);
                }
            }
        }

        info!(
            crawl_id = %crawl_id,
            jobs = jobs.len(),
            succeeded = sites_succeeded,
            failed = per_site_errors.len(),
            "aggregation finished"
        );

        CrawlOutcome {
            crawl_id,
            jobs,
            per_site_errors,
            sites_succeeded,
            crawled_at: chrono::Utc::now(),
        }
    }
}
