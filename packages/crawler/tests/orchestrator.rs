//! Cross-site aggregation: isolation, budget, and reporting.

use std::sync::Arc;
use std::time::Duration;

use job_crawler::testing::{fixtures, MockRenderer, MockResponse};
use job_crawler::{
    AggregateRequest, AggregateResponse, Aggregator, CompanyReport, CrawlParams, CrawlerConfig,
    FieldSelector, JobField, MemoryPatternStore, PatternStore, SiteCrawler, SitePattern,
};

/// Hand-seeded pattern, as an operator would provision for a known site.
fn seeded_pattern(domain: &str) -> SitePattern {
    SitePattern::new(
        domain,
        format!("https://{domain}/jobs?keyword={{keyword}}&page={{page}}"),
    )
    .with_card_selector("div.job-card")
    .with_selector(JobField::Title, FieldSelector::text("h2.job-title > a"))
    .with_selector(JobField::Company, FieldSelector::text("span.company"))
    .with_selector(JobField::Location, FieldSelector::text("span.location"))
    .with_selector(
        JobField::Salary,
        FieldSelector::text("span.salary").with_transform(job_crawler::Transform::Salary),
    )
    .with_selector(
        JobField::Deadline,
        FieldSelector::text("span.deadline").with_transform(job_crawler::Transform::Date),
    )
    .with_selector(
        JobField::DetailLink,
        FieldSelector::attribute("h2.job-title > a", "href"),
    )
    .with_confidence(1.0)
}

fn page_1(domain: &str) -> String {
    format!("https://{domain}/jobs?keyword=&page=1")
}

async fn setup(
    renderer: Arc<MockRenderer>,
    domains: &[&str],
    config: CrawlerConfig,
) -> Aggregator<MemoryPatternStore, MockRenderer> {
    let store = Arc::new(MemoryPatternStore::new());
    for domain in domains {
        store.save(&seeded_pattern(domain)).await.unwrap();
    }
    Aggregator::new(Arc::new(SiteCrawler::new(store, renderer, config)))
}

#[tokio::test]
async fn test_failing_site_is_isolated() {
    let renderer = Arc::new(
        MockRenderer::new()
            .with_page(page_1("a.example"), fixtures::listing_page_from(0, 3))
            .with_timeout(page_1("b.example"))
            .with_page(page_1("c.example"), fixtures::listing_page_from(10, 2)),
    );
    let aggregator = setup(
        renderer,
        &["a.example", "b.example", "c.example"],
        CrawlerConfig::default(),
    )
    .await;

    let sites: Vec<String> = ["a.example", "b.example", "c.example"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let outcome = aggregator.crawl_all(&sites, &CrawlParams::new()).await;

    // A and C delivered despite B's failure
    assert_eq!(outcome.jobs.len(), 5);
    assert_eq!(outcome.sites_succeeded, 2);

    let b_error = outcome
        .per_site_errors
        .get("b.example")
        .expect("B must be reported");
    assert!(b_error.is_timeout(), "expected timeout kind, got {b_error}");
    assert!(!outcome.per_site_errors.contains_key("a.example"));
    assert!(!outcome.per_site_errors.contains_key("c.example"));
}

#[tokio::test]
async fn test_budget_expiry_returns_partial_results() {
    let renderer = Arc::new(
        MockRenderer::new()
            .with_page(page_1("a.example"), fixtures::listing_page_from(0, 3))
            .with_response(page_1("b.example"), MockResponse::Hang),
    );
    let config = CrawlerConfig::default().with_crawl_budget(Duration::from_millis(300));
    let aggregator = setup(renderer, &["a.example", "b.example"], config).await;

    let sites = vec!["a.example".to_string(), "b.example".to_string()];
    let outcome = aggregator.crawl_all(&sites, &CrawlParams::new()).await;

    // The hung site is cancelled and reported; the finished one returns
    assert_eq!(outcome.jobs.len(), 3);
    let b_error = outcome.per_site_errors.get("b.example").unwrap();
    assert!(b_error.is_timeout());
}

#[tokio::test]
async fn test_total_failure_is_distinguishable_from_no_matches() {
    let renderer = Arc::new(
        MockRenderer::new()
            .with_timeout(page_1("a.example"))
            .with_timeout(page_1("b.example")),
    );
    let aggregator = setup(
        renderer,
        &["a.example", "b.example"],
        CrawlerConfig::default(),
    )
    .await;

    let sites = vec!["a.example".to_string(), "b.example".to_string()];
    let outcome = aggregator.crawl_all(&sites, &CrawlParams::new()).await;

    assert!(outcome.all_failed());
    let response = AggregateResponse::from_outcome(outcome);
    assert!(!response.success);
    assert_eq!(response.count, 0);
    assert!(
        !response.errors.is_empty(),
        "callers must see why every site failed"
    );
}

#[tokio::test]
async fn test_partial_success_reports_success_with_errors() {
    let renderer = Arc::new(
        MockRenderer::new()
            .with_page(page_1("a.example"), fixtures::listing_page_from(0, 4))
            .with_timeout(page_1("b.example")),
    );
    let aggregator = setup(
        renderer,
        &["a.example", "b.example"],
        CrawlerConfig::default(),
    )
    .await;

    let sites = vec!["a.example".to_string(), "b.example".to_string()];
    let outcome = aggregator.crawl_all(&sites, &CrawlParams::new()).await;
    let response = AggregateResponse::from_outcome(outcome);

    assert!(response.success);
    assert_eq!(response.count, 4);
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].starts_with("b.example:"));
}

#[tokio::test]
async fn test_duplicate_site_entries_crawl_once() {
    let renderer = Arc::new(
        MockRenderer::new().with_page(page_1("a.example"), fixtures::listing_page_from(0, 2)),
    );
    let aggregator = setup(renderer, &["a.example"], CrawlerConfig::default()).await;

    let sites = vec!["a.example".to_string(), "a.example".to_string()];
    let outcome = aggregator.crawl_all(&sites, &CrawlParams::new()).await;

    assert_eq!(outcome.jobs.len(), 2);
    assert_eq!(outcome.sites_succeeded, 1);
}

#[tokio::test]
async fn test_empty_site_list_means_all_configured() {
    let renderer = Arc::new(
        MockRenderer::new()
            .with_page(page_1("a.example"), fixtures::listing_page_from(0, 2))
            .with_page(page_1("b.example"), fixtures::listing_page_from(5, 3)),
    );
    let aggregator = setup(
        renderer,
        &["a.example", "b.example"],
        CrawlerConfig::default(),
    )
    .await;

    let response = aggregator.handle(&AggregateRequest::default()).await;

    assert!(response.success);
    assert_eq!(response.count, 5);
    assert!(response.errors.is_empty());
}

#[tokio::test]
async fn test_company_report_groups_merged_jobs() {
    let renderer = Arc::new(
        MockRenderer::new()
            // Fixture companies cycle through a fixed list, so ids 1 and
            // 6 share a company across the two sites
            .with_page(page_1("a.example"), fixtures::listing_page_from(0, 5))
            .with_page(page_1("b.example"), fixtures::listing_page_from(5, 5)),
    );
    let aggregator = setup(
        renderer,
        &["a.example", "b.example"],
        CrawlerConfig::default(),
    )
    .await;

    let sites = vec!["a.example".to_string(), "b.example".to_string()];
    let outcome = aggregator.crawl_all(&sites, &CrawlParams::new()).await;
    assert_eq!(outcome.jobs.len(), 10);

    let report = CompanyReport::from_jobs(&outcome.jobs);
    assert_eq!(report.companies.len(), 5);
    for group in &report.companies {
        assert_eq!(group.job_count, 2, "{} appears on both sites", group.company);
        assert_eq!(group.job_ids.len(), 2);
    }

    // Deterministic: regrouping the same jobs yields the same report
    let again = CompanyReport::from_jobs(&outcome.jobs);
    let names: Vec<_> = report.companies.iter().map(|g| &g.company_id).collect();
    let names_again: Vec<_> = again.companies.iter().map(|g| &g.company_id).collect();
    assert_eq!(names, names_again);
}
