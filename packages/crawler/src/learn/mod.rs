//! Pattern learning.
//!
//! Given only a listing-page URL, infer a reusable [`SitePattern`]:
//! render the page, find the repeating card container, then score
//! candidate sub-elements per canonical field and keep the locators that
//! resolve consistently across a sample of cards.

pub mod cards;
pub mod fields;

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CrawlerConfig;
use crate::error::{LearnError, LearnResult};
use crate::render::{PageRenderer, RenderRequest, RenderedPage};
use crate::types::pattern::{FieldSelector, JobField, SitePattern, Transform};

pub use cards::ProbeStrategy;
pub use fields::{default_heuristics, FieldHeuristic, SignalPatterns, MIN_FIELD_SCORE};

use cards::detect_card_container;
use fields::{normalize_whitespace, score_field};

/// Learns extraction patterns from listing pages.
pub struct PatternLearner<R: PageRenderer> {
    renderer: Arc<R>,
    config: CrawlerConfig,
    heuristics: Vec<FieldHeuristic>,
    signals: SignalPatterns,
}

impl<R: PageRenderer> PatternLearner<R> {
    pub fn new(renderer: Arc<R>, config: CrawlerConfig) -> Self {
        Self {
            renderer,
            config,
            heuristics: default_heuristics(),
            signals: SignalPatterns::new(),
        }
    }

    /// Replace the field heuristic list.
    pub fn with_heuristics(mut self, heuristics: Vec<FieldHeuristic>) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Learn a pattern for the site behind `url`.
    ///
    /// A render failure is [`LearnError::Aborted`]; a page that loads but
    /// never crosses the confidence threshold is
    /// [`LearnError::LowConfidence`]. Nothing is persisted here; the
    /// caller decides that.
    pub async fn learn(&self, url: &str, site_name: Option<&str>) -> LearnResult<SitePattern> {
        let req = RenderRequest::new(url).with_timeout(self.config.render_timeout());
        let page = self
            .renderer
            .render(&req)
            .await
            .map_err(LearnError::from)?;

        let domain = host_of(&page.final_url).unwrap_or_else(|| url.to_string());
        info!(url = %url, domain = %domain, "learning site pattern");

        let mut best_confidence = 0.0f32;

        for strategy in ProbeStrategy::sequence(self.config.learn_retries) {
            let Some(layout) = self.probe(&page, *strategy) else {
                debug!(url = %url, strategy = ?strategy, "no repeating card structure");
                continue;
            };

            debug!(
                url = %url,
                strategy = ?strategy,
                card_selector = %layout.card_selector,
                confidence = layout.confidence,
                fields = layout.selectors.len(),
                "probe finished"
            );

            best_confidence = best_confidence.max(layout.confidence);

            if layout.confidence >= self.config.confidence_threshold
                && layout.selectors.contains_key(&JobField::Title)
            {
                let pattern = self.build_pattern(&page, &domain, site_name, layout);
                info!(
                    domain = %pattern.domain,
                    confidence = pattern.confidence,
                    card_selector = %pattern.card_selector,
                    "pattern learned"
                );
                return Ok(pattern);
            }
        }

        warn!(url = %url, confidence = best_confidence, "pattern learning failed");
        Err(LearnError::LowConfidence {
            url: url.to_string(),
            confidence: best_confidence,
            threshold: self.config.confidence_threshold,
        })
    }

    /// One probing pass over an already-rendered page. Synchronous: the
    /// parsed DOM never crosses an await point.
    fn probe(&self, page: &RenderedPage, strategy: ProbeStrategy) -> Option<LearnedLayout> {
        let doc = Html::parse_document(&page.html);
        let card = detect_card_container(&doc, strategy, &self.signals)?;
        let card_selector = Selector::parse(&card.selector).ok()?;

        let sampled: Vec<ElementRef> = doc
            .select(&card_selector)
            .take(self.config.card_sample_size)
            .collect();
        if sampled.is_empty() {
            return None;
        }
        let sample_count = sampled.len();

        // (field, relative path) -> aggregate across sampled cards
        let mut stats: HashMap<(JobField, String), PathStat> = HashMap::new();

        for card_el in &sampled {
            // Best score per (field, path) within this card, so repeated
            // siblings inside one card count once
            let mut local: HashMap<(JobField, String), (f32, Option<String>)> = HashMap::new();

            for node in card_el.descendants() {
                let Some(el) = ElementRef::wrap(node) else {
                    continue;
                };
                if el.id() == card_el.id() {
                    continue;
                }
                let Some(path) = relative_path(card_el, &el) else {
                    continue;
                };
                let text = normalize_whitespace(&el.text().collect::<String>());

                for field in LEARNED_FIELDS {
                    let score = score_field(&self.heuristics, &self.signals, field, &el, &text);
                    if score <= 0.0 {
                        continue;
                    }
                    let attribute = (field == JobField::DetailLink).then(|| "href".to_string());
                    let entry = local
                        .entry((field, path.clone()))
                        .or_insert((0.0, attribute.clone()));
                    if score > entry.0 {
                        *entry = (score, attribute);
                    }
                }
            }

            for ((field, path), (score, attribute)) in local {
                let stat = stats.entry((field, path)).or_default();
                stat.cards_matched += 1;
                stat.score_sum += score;
                stat.attribute = attribute;
            }
        }

        // Per field: the highest-scoring path that resolved on every
        // sampled card
        let mut selectors = HashMap::new();
        for field in LEARNED_FIELDS {
            let chosen = stats
                .iter()
                .filter(|((f, _), stat)| *f == field && stat.cards_matched == sample_count)
                .filter(|(_, stat)| stat.score_sum / sample_count as f32 >= MIN_FIELD_SCORE)
                .max_by(|(_, a), (_, b)| {
                    a.score_sum
                        .partial_cmp(&b.score_sum)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

            if let Some(((_, path), stat)) = chosen {
                selectors.insert(
                    field,
                    FieldSelector {
                        path: path.clone(),
                        attribute: stat.attribute.clone(),
                        transform: default_transform(field),
                    },
                );
            }
        }

        let located_scored = JobField::SCORED
            .iter()
            .filter(|field| selectors.contains_key(*field))
            .count();
        let confidence = located_scored as f32 / JobField::SCORED.len() as f32;

        Some(LearnedLayout {
            card_selector: card.selector,
            selectors,
            confidence,
        })
    }

    fn build_pattern(
        &self,
        page: &RenderedPage,
        domain: &str,
        site_name: Option<&str>,
        layout: LearnedLayout,
    ) -> SitePattern {
        let list_page_pattern = infer_list_pattern(&page.final_url);

        let detail_pattern = layout
            .selectors
            .get(&JobField::DetailLink)
            .and_then(|selector| first_detail_link(page, &layout.card_selector, selector))
            .and_then(|link| infer_detail_pattern(&link));

        let mut pattern = SitePattern::new(domain, list_page_pattern)
            .with_site_name(site_name.unwrap_or(domain))
            .with_card_selector(layout.card_selector)
            .with_confidence(layout.confidence);
        if let Some(detail) = detail_pattern {
            pattern = pattern.with_detail_pattern(detail);
        }
        for (field, selector) in layout.selectors {
            pattern = pattern.with_selector(field, selector);
        }
        pattern
    }
}

/// Fields the learner tries to locate (the scored five plus the link).
const LEARNED_FIELDS: [JobField; 6] = [
    JobField::Title,
    JobField::Company,
    JobField::Location,
    JobField::Salary,
    JobField::Deadline,
    JobField::DetailLink,
];

#[derive(Debug, Default)]
struct PathStat {
    cards_matched: usize,
    score_sum: f32,
    attribute: Option<String>,
}

struct LearnedLayout {
    card_selector: String,
    selectors: HashMap<JobField, FieldSelector>,
    confidence: f32,
}

fn default_transform(field: JobField) -> Transform {
    match field {
        JobField::Salary => Transform::Salary,
        JobField::Deadline => Transform::Date,
        JobField::Skills => Transform::List,
        _ => Transform::Text,
    }
}

/// CSS path of `el` relative to `card`, child combinators all the way:
/// `div.meta > h3 > a`.
fn relative_path(card: &ElementRef<'_>, el: &ElementRef<'_>) -> Option<String> {
    let mut segments = Vec::new();
    let mut current = *el;

    loop {
        if current.id() == card.id() {
            break;
        }
        segments.push(segment(&current)?);
        current = current.parent().and_then(ElementRef::wrap)?;
    }

    if segments.is_empty() {
        return None;
    }
    segments.reverse();
    Some(segments.join(" > "))
}

fn segment(el: &ElementRef<'_>) -> Option<String> {
    let value = el.value();
    let tag = value.name();
    let mut classes: Vec<&str> = value
        .classes()
        .filter(|class| {
            let mut chars = class.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
        .collect();
    classes.sort_unstable();
    classes.dedup();

    if classes.is_empty() {
        Some(tag.to_string())
    } else {
        Some(format!("{}.{}", tag, classes.join(".")))
    }
}

/// Query keys treated as pagination controls.
const PAGE_KEYS: [&str; 6] = ["page", "p", "pg", "pageno", "page_no", "recruitpage"];

/// Query keys treated as search keywords.
const KEYWORD_KEYS: [&str; 7] = [
    "q",
    "query",
    "keyword",
    "kw",
    "search",
    "searchword",
    "searchtext",
];

/// Turn the rendered final URL into a listing template: known page and
/// keyword query keys become placeholders, missing ones are appended.
fn infer_list_pattern(final_url: &str) -> String {
    let Ok(url) = Url::parse(final_url) else {
        return final_url.to_string();
    };

    let mut query_parts: Vec<String> = Vec::new();
    let mut saw_page = false;
    let mut saw_keyword = false;

    for (key, value) in url.query_pairs() {
        let lowered = key.to_ascii_lowercase();
        if PAGE_KEYS.contains(&lowered.as_str()) {
            query_parts.push(format!("{key}={{page}}"));
            saw_page = true;
        } else if KEYWORD_KEYS.contains(&lowered.as_str()) {
            query_parts.push(format!("{key}={{keyword}}"));
            saw_keyword = true;
        } else {
            let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
            query_parts.push(format!("{key}={encoded}"));
        }
    }
    if !saw_keyword {
        query_parts.push("keyword={keyword}".to_string());
    }
    if !saw_page {
        query_parts.push("page={page}".to_string());
    }

    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    format!("{}?{}", base, query_parts.join("&"))
}

/// Resolve the first card's detail link to an absolute URL.
fn first_detail_link(
    page: &RenderedPage,
    card_selector: &str,
    selector: &FieldSelector,
) -> Option<String> {
    let doc = Html::parse_document(&page.html);
    let cards = Selector::parse(card_selector).ok()?;
    let path = Selector::parse(&selector.path).ok()?;

    let card = doc.select(&cards).next()?;
    let link = card.select(&path).next()?;
    let href = link.value().attr("href")?;

    let base = Url::parse(&page.final_url).ok()?;
    base.join(href).ok().map(|joined| joined.to_string())
}

/// Template a detail URL by replacing its longest digit run with `{id}`.
fn infer_detail_pattern(link: &str) -> Option<String> {
    let bytes = link.as_bytes();
    let mut best: Option<(usize, usize)> = None;
    let mut start = None;

    for (i, byte) in bytes.iter().enumerate() {
        if byte.is_ascii_digit() {
            start.get_or_insert(i);
        } else if let Some(s) = start.take() {
            if best.is_none_or(|(bs, be)| i - s > be - bs) {
                best = Some((s, i));
            }
        }
    }
    if let Some(s) = start {
        if best.is_none_or(|(bs, be)| bytes.len() - s > be - bs) {
            best = Some((s, bytes.len()));
        }
    }

    let (s, e) = best.filter(|(s, e)| e - s >= 3)?;
    Some(format!("{}{{id}}{}", &link[..s], &link[e..]))
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_list_pattern_templates_known_keys() {
        let pattern = infer_list_pattern("https://jobs.example.com/search?q=rust&page=1&sort=new");
        assert_eq!(
            pattern,
            "https://jobs.example.com/search?q={keyword}&page={page}&sort=new"
        );
    }

    #[test]
    fn test_infer_list_pattern_appends_missing_placeholders() {
        let pattern = infer_list_pattern("https://jobs.example.com/listings");
        assert_eq!(
            pattern,
            "https://jobs.example.com/listings?keyword={keyword}&page={page}"
        );
    }

    #[test]
    fn test_infer_detail_pattern_templates_longest_digit_run() {
        assert_eq!(
            infer_detail_pattern("https://a.example/jobs/448812?tab=2").as_deref(),
            Some("https://a.example/jobs/{id}?tab=2")
        );
        assert_eq!(infer_detail_pattern("https://a.example/jobs/about"), None);
    }

    #[test]
    fn test_relative_path() {
        let doc = Html::parse_fragment(
            r#"<div class="card"><div class="meta"><h3><a href="/x">Job title here</a></h3></div></div>"#,
        );
        let card_sel = Selector::parse("div.card").unwrap();
        let a_sel = Selector::parse("a").unwrap();
        let card = doc.select(&card_sel).next().unwrap();
        let link = doc.select(&a_sel).next().unwrap();

        assert_eq!(
            relative_path(&card, &link).as_deref(),
            Some("div.meta > h3 > a")
        );
    }
}
