//! Adaptive Job-Listing Crawler
//!
//! A pattern-learning crawl engine: instead of one hand-written scraper
//! per job site, the engine probes an unknown site's listing markup,
//! learns a reusable extraction pattern, persists it, and crawls every
//! site through the same parameterized path.
//!
//! # Design
//!
//! - Patterns over scrapers: a [`SitePattern`] value drives extraction,
//!   so a new site needs a learned (or hand-seeded) pattern, not code
//! - Pattern storage is an injected [`PatternStore`], not an ambient
//!   cache; tests swap in [`MemoryPatternStore`]
//! - Browser automation is a pooled, scoped resource with guaranteed
//!   release on every exit path
//! - Per-site failures stay per-site: aggregation reports them in their
//!   own slots next to the merged results
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use job_crawler::{
//!     Aggregator, ChromeRenderer, CrawlParams, CrawlerConfig, SiteCrawler,
//!     SqlitePatternStore,
//! };
//!
//! let store = Arc::new(SqlitePatternStore::new("sqlite:patterns.db?mode=rwc").await?);
//! let renderer = Arc::new(ChromeRenderer::new(4));
//! let crawler = Arc::new(SiteCrawler::new(store, renderer, CrawlerConfig::default()));
//! let aggregator = Aggregator::new(crawler);
//!
//! let params = CrawlParams::new().with_keyword("rust").with_limit(50);
//! let outcome = aggregator
//!     .crawl_all(&["jobs.example.com".into(), "careers.example.org".into()], &params)
//!     .await;
//! ```
//!
//! # Modules
//!
//! - [`types`] - patterns, job records, request/response contracts
//! - [`store`] - pattern persistence (memory, SQLite)
//! - [`render`] - page acquisition (headless Chrome pool, HTTP)
//! - [`learn`] - pattern inference from listing markup
//! - [`crawl`] - per-site crawling with drift recovery
//! - [`orchestrator`] - concurrent cross-site aggregation
//! - [`testing`] - mock renderer and HTML fixtures

pub mod config;
pub mod crawl;
pub mod error;
pub mod learn;
pub mod orchestrator;
pub mod render;
pub mod store;
pub mod testing;
pub mod types;

// Re-export core types at crate root
pub use config::CrawlerConfig;
pub use error::{
    CrawlError, CrawlResult, FetchError, FetchResult, LearnError, LearnResult, StoreError,
    StoreResult,
};
pub use types::{
    job_id, AggregateRequest, AggregateResponse, Article, CompanyGroup, CompanyReport,
    CrawlOutcome, CrawlParams, ExperienceRange, FieldSelector, JobField, LearnRequest,
    PatternSummary, SalaryRange, ScrapedJob, SitePattern, Transform, WorkType,
};

// Re-export the component seams
pub use crawl::{Normalizer, SiteCrawler};
pub use learn::{default_heuristics, FieldHeuristic, PatternLearner, ProbeStrategy};
pub use orchestrator::Aggregator;
pub use render::{
    BrowserPool, ChromeRenderer, HttpRenderer, PageRenderer, RateLimitedRenderer, RenderRequest,
    RenderedPage, RendererExt,
};
pub use store::{MemoryPatternStore, PatternStore};

#[cfg(feature = "sqlite")]
pub use store::SqlitePatternStore;

// Re-export testing utilities
pub use testing::{MockRenderer, MockResponse};
