//! Site crawling.
//!
//! One crawler serves every site: it is parameterized by a stored (or
//! freshly learned) [`SitePattern`], so adding a site never adds code,
//! only a learned or hand-seeded pattern.

pub mod extract;
pub mod normalize;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::CrawlerConfig;
use crate::error::{CrawlError, CrawlResult};
use crate::learn::PatternLearner;
use crate::render::{PageRenderer, RenderRequest};
use crate::store::PatternStore;
use crate::types::job::ScrapedJob;
use crate::types::params::CrawlParams;
use crate::types::pattern::{PatternSummary, SitePattern};

pub use normalize::Normalizer;

use extract::{build_job, extract_page};

/// Crawls one domain per invocation using its stored pattern, learning
/// (and persisting) a pattern on first encounter, and relearning on
/// layout drift.
pub struct SiteCrawler<S: PatternStore, R: PageRenderer> {
    store: Arc<S>,
    renderer: Arc<R>,
    learner: PatternLearner<R>,
    config: CrawlerConfig,
    normalizer: Normalizer,
    learn_locks: DomainLocks,
}

impl<S: PatternStore, R: PageRenderer> SiteCrawler<S, R> {
    pub fn new(store: Arc<S>, renderer: Arc<R>, config: CrawlerConfig) -> Self {
        let learner = PatternLearner::new(Arc::clone(&renderer), config.clone());
        Self {
            store,
            renderer,
            learner,
            config,
            normalizer: Normalizer::new(),
            learn_locks: DomainLocks::default(),
        }
    }

    /// Replace the learner (e.g. to extend its heuristics).
    pub fn with_learner(mut self, learner: PatternLearner<R>) -> Self {
        self.learner = learner;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawl a domain: resolve its pattern, paginate the listing, and
    /// return normalized jobs.
    pub async fn crawl(&self, domain: &str, params: &CrawlParams) -> CrawlResult<Vec<ScrapedJob>> {
        let (pattern, fresh) = self.resolve_pattern(domain, params).await?;

        let run = self.paginate(&pattern, params).await?;

        if !run.first_page_empty {
            return Ok(run.jobs);
        }

        if fresh {
            // The pattern was just validated against this site; an empty
            // first page means the query matched nothing
            debug!(domain = %domain, "no results for freshly learned pattern");
            return Ok(Vec::new());
        }

        // Established pattern, zero cards on page 1: layout drift. Drop
        // the stale pattern, relearn once, retry the page once.
        warn!(domain = %domain, "zero cards from established pattern, relearning");
        self.store.delete(domain).await?;

        let seed = seed_url(domain, params);
        let relearned = match self.learn_site(&seed, Some(&pattern.site_name)).await {
            Ok(pattern) => pattern,
            Err(error) => {
                warn!(domain = %domain, error = %error, "relearning after drift failed");
                return Err(CrawlError::DriftUnrecovered {
                    domain: domain.to_string(),
                });
            }
        };

        let retry = self.paginate(&relearned, params).await?;
        if retry.first_page_empty {
            return Err(CrawlError::DriftUnrecovered {
                domain: domain.to_string(),
            });
        }
        Ok(retry.jobs)
    }

    /// Learn a pattern from a listing URL and persist it. This is the
    /// external learning trigger and the drift-recovery path.
    pub async fn learn_site(
        &self,
        url: &str,
        site_name: Option<&str>,
    ) -> CrawlResult<SitePattern> {
        let pattern = self.learner.learn(url, site_name).await?;
        self.store.save(&pattern).await?;
        Ok(pattern)
    }

    /// Stored pattern summaries, selector internals elided.
    pub async fn patterns(&self) -> CrawlResult<Vec<PatternSummary>> {
        let patterns = self.store.list().await?;
        Ok(patterns.iter().map(PatternSummary::from).collect())
    }

    /// Resolve the domain's pattern, learning on a miss. The learn path
    /// is serialized per domain so racing crawls cannot duplicate the
    /// work; the store is re-checked once the lock is held.
    async fn resolve_pattern(
        &self,
        domain: &str,
        params: &CrawlParams,
    ) -> CrawlResult<(SitePattern, bool)> {
        if let Some(pattern) = self.store.get(domain).await? {
            return Ok((pattern, false));
        }

        let lock = self.learn_locks.for_domain(domain);
        let _guard = lock.lock().await;

        if let Some(pattern) = self.store.get(domain).await? {
            return Ok((pattern, false));
        }

        info!(domain = %domain, "no stored pattern, learning");
        let pattern = self.learn_site(&seed_url(domain, params), None).await?;
        Ok((pattern, true))
    }

    /// Fetch listing pages in strictly ascending order, extracting one
    /// job candidate per card, until the limit, a zero-card page, or the
    /// page safety bound.
    async fn paginate(&self, pattern: &SitePattern, params: &CrawlParams) -> CrawlResult<CrawlRun> {
        let limit = params.limit.unwrap_or(self.config.default_limit);
        let mut run = CrawlRun::default();
        let mut anomalies = 0usize;

        'pages: for page_no in 1..=self.config.max_pages_per_crawl {
            let url = pattern.listing_url(params.keyword.as_deref(), page_no);
            let req = RenderRequest::new(&url).with_timeout(self.config.render_timeout());
            let page = self.renderer.render(&req).await?;

            let extracted = extract_page(&page.html, pattern);
            debug!(
                domain = %pattern.domain,
                page = page_no,
                cards = extracted.cards_found,
                "listing page extracted"
            );

            if extracted.cards_found == 0 {
                if page_no == 1 {
                    run.first_page_empty = true;
                }
                break;
            }

            for card in &extracted.cards {
                match build_job(
                    &pattern.site_name,
                    &page.final_url,
                    pattern,
                    card,
                    &self.normalizer,
                ) {
                    Ok(mut job) => {
                        if let Some(keyword) = &params.keyword {
                            job.keywords = vec![keyword.clone()];
                        }
                        if self.config.fetch_details {
                            self.fetch_detail(&mut job).await;
                        }
                        if params.accepts(&job) {
                            run.jobs.push(job);
                        }
                        if run.jobs.len() >= limit {
                            break 'pages;
                        }
                    }
                    Err(anomaly) => {
                        anomalies += 1;
                        warn!(
                            domain = %pattern.domain,
                            page = page_no,
                            anomaly = %anomaly,
                            "skipping card"
                        );
                    }
                }
            }
        }

        info!(
            domain = %pattern.domain,
            jobs = run.jobs.len(),
            anomalies,
            "crawl pagination finished"
        );
        Ok(run)
    }

    /// Best-effort detail-page enrichment. Failures are anomaly-level:
    /// logged, the summary record survives.
    async fn fetch_detail(&self, job: &mut ScrapedJob) {
        let req =
            RenderRequest::new(&job.source_url).with_timeout(self.config.render_timeout());
        let page = match self.renderer.render(&req).await {
            Ok(page) => page,
            Err(error) => {
                warn!(url = %job.source_url, error = %error, "detail fetch failed");
                return;
            }
        };

        let text = body_text(&page.html);
        if job.description.is_none() && !text.is_empty() {
            let truncated: String = text.chars().take(2000).collect();
            job.description = Some(truncated);
        }
        if job.requirements.is_empty() {
            job.requirements = list_items(&page.html);
        }
        if job.work_type.is_none() {
            job.work_type = self.normalizer.parse_work_type(&text);
        }
        if job.experience.is_none() {
            job.experience = self.normalizer.parse_experience(&text);
        }
    }
}

#[derive(Debug, Default)]
struct CrawlRun {
    jobs: Vec<ScrapedJob>,
    first_page_empty: bool,
}

fn seed_url(domain: &str, params: &CrawlParams) -> String {
    params
        .seed_url
        .clone()
        .unwrap_or_else(|| format!("https://{domain}/"))
}

/// Visible body text of a detail page, scripts and styles stripped.
fn body_text(html: &str) -> String {
    use scraper::{Html, Selector};

    let script = regex::Regex::new(r"(?s)<script[^>]*>.*?</script>")
        .expect("script pattern compiles");
    let style = regex::Regex::new(r"(?s)<style[^>]*>.*?</style>").expect("style pattern compiles");
    let without_script = script.replace_all(html, "");
    let stripped = style.replace_all(&without_script, "");

    let doc = Html::parse_document(&stripped);
    let body = Selector::parse("body").expect("body selector compiles");
    doc.select(&body)
        .next()
        .map(|el| {
            el.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Bullet-point items from a detail page, kept in document order.
fn list_items(html: &str) -> Vec<String> {
    use scraper::{Html, Selector};

    let doc = Html::parse_document(html);
    let li = Selector::parse("li").expect("li selector compiles");
    doc.select(&li)
        .map(|el| {
            el.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|item| (4..=200).contains(&item.chars().count()))
        .take(12)
        .collect()
}

/// Per-domain mutual exclusion for the miss → learn → persist sequence.
#[derive(Default)]
struct DomainLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DomainLocks {
    fn for_domain(&self, domain: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(
            locks
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}
