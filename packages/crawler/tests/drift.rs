//! Layout-drift handling.
//!
//! A previously valid pattern that suddenly matches nothing must trigger
//! relearning and either recover or fail loudly. It must never silently
//! return an empty (or wrong) result set.

use std::sync::Arc;

use job_crawler::testing::{fixtures, MockRenderer};
use job_crawler::{
    CrawlError, CrawlParams, CrawlerConfig, MemoryPatternStore, PatternStore, SiteCrawler,
};

const DOMAIN: &str = "jobs.example.com";
const SEED: &str = "https://jobs.example.com/";
const PAGE_1: &str = "https://jobs.example.com/?keyword=&page=1";

fn crawler(renderer: Arc<MockRenderer>) -> SiteCrawler<MemoryPatternStore, MockRenderer> {
    SiteCrawler::new(
        Arc::new(MemoryPatternStore::new()),
        renderer,
        CrawlerConfig::default(),
    )
}

#[tokio::test]
async fn test_drift_relearns_and_recovers() {
    let renderer = Arc::new(
        MockRenderer::new()
            .with_page(SEED, fixtures::listing_page(10))
            .with_page(PAGE_1, fixtures::listing_page(10)),
    );
    let crawler = crawler(Arc::clone(&renderer));

    // Establish a pattern against the v1 markup
    let jobs = crawler.crawl(DOMAIN, &CrawlParams::new()).await.unwrap();
    assert_eq!(jobs.len(), 10);
    let v1 = crawler.store().get(DOMAIN).await.unwrap().unwrap();

    // The site redesigns: same jobs, different structure
    renderer.set_page(SEED, fixtures::shifted_listing_page(6));
    renderer.set_page(PAGE_1, fixtures::shifted_listing_page(6));

    let jobs = crawler.crawl(DOMAIN, &CrawlParams::new()).await.unwrap();
    assert_eq!(jobs.len(), 6, "recovered crawl must see the new markup");
    assert!(jobs.iter().all(|job| job.title.starts_with("Senior Rust")));

    let v2 = crawler.store().get(DOMAIN).await.unwrap().unwrap();
    assert_ne!(
        v1.card_selector, v2.card_selector,
        "relearning must produce a pattern for the new layout"
    );
}

#[tokio::test]
async fn test_unrecoverable_drift_fails_loudly() {
    let renderer = Arc::new(
        MockRenderer::new()
            .with_page(SEED, fixtures::listing_page(10))
            .with_page(PAGE_1, fixtures::listing_page(10)),
    );
    let crawler = crawler(Arc::clone(&renderer));

    crawler.crawl(DOMAIN, &CrawlParams::new()).await.unwrap();

    // The site now serves pages the learner cannot make sense of
    renderer.set_page(SEED, fixtures::empty_page());
    renderer.set_page(PAGE_1, fixtures::empty_page());

    let err = crawler.crawl(DOMAIN, &CrawlParams::new()).await.unwrap_err();
    assert!(
        matches!(err, CrawlError::DriftUnrecovered { .. }),
        "expected drift failure, got {err}"
    );

    // The stale pattern was dropped and nothing replaced it
    assert!(crawler.store().get(DOMAIN).await.unwrap().is_none());
}

#[tokio::test]
async fn test_fresh_pattern_with_empty_results_is_not_drift() {
    // The seed page has cards (learnable), but the first listing page
    // genuinely matches nothing
    let renderer = Arc::new(
        MockRenderer::new()
            .with_page(SEED, fixtures::listing_page(10))
            .with_page(PAGE_1, fixtures::empty_page()),
    );
    let crawler = crawler(Arc::clone(&renderer));

    let jobs = crawler.crawl(DOMAIN, &CrawlParams::new()).await.unwrap();
    assert!(jobs.is_empty());

    // The freshly learned pattern survives; no relearn loop
    assert!(crawler.store().get(DOMAIN).await.unwrap().is_some());
    assert_eq!(renderer.render_count(SEED), 1);
}

#[tokio::test]
async fn test_deep_page_exhaustion_is_end_of_results() {
    let page_2 = "https://jobs.example.com/?keyword=&page=2";
    let renderer = Arc::new(
        MockRenderer::new()
            .with_page(SEED, fixtures::listing_page(10))
            .with_page(PAGE_1, fixtures::listing_page(10))
            .with_page(page_2, fixtures::empty_page()),
    );
    let crawler = crawler(Arc::clone(&renderer));

    // Zero cards on page 2 ends pagination normally, no drift handling
    let jobs = crawler.crawl(DOMAIN, &CrawlParams::new()).await.unwrap();
    assert_eq!(jobs.len(), 10);
    assert!(crawler.store().get(DOMAIN).await.unwrap().is_some());
}
