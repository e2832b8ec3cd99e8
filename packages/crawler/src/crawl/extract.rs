//! Applying a learned pattern to a rendered listing page.

use scraper::{Html, Selector};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;
use url::Url;

use crate::crawl::normalize::Normalizer;
use crate::types::job::ScrapedJob;
use crate::types::pattern::{JobField, SitePattern, Transform};

/// Raw field values pulled from one card, before normalization.
#[derive(Debug, Default)]
pub(crate) struct ExtractedCard {
    pub fields: HashMap<JobField, String>,
}

/// Result of applying a pattern to one page.
#[derive(Debug, Default)]
pub(crate) struct ExtractedPage {
    /// Card elements matched, regardless of whether their fields parsed.
    /// Zero here is the layout-drift signal.
    pub cards_found: usize,
    pub cards: Vec<ExtractedCard>,
}

/// Why one card was skipped. Recovered locally, logged, never propagated.
#[derive(Debug)]
pub(crate) enum CardAnomaly {
    MissingField(JobField),
    BadLink(String),
}

impl fmt::Display for CardAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardAnomaly::MissingField(field) => write!(f, "missing required field {field:?}"),
            CardAnomaly::BadLink(link) => write!(f, "unresolvable detail link {link}"),
        }
    }
}

/// Apply the pattern's card and field selectors to a page. Synchronous:
/// the parsed DOM stays inside this call.
pub(crate) fn extract_page(html: &str, pattern: &SitePattern) -> ExtractedPage {
    let doc = Html::parse_document(html);

    let Ok(card_selector) = Selector::parse(&pattern.card_selector) else {
        warn!(domain = %pattern.domain, selector = %pattern.card_selector, "card selector does not parse");
        return ExtractedPage::default();
    };

    // Pre-parse field selectors once per page
    let field_selectors: Vec<(JobField, Selector, Option<&str>)> = pattern
        .selectors
        .iter()
        .filter_map(|(field, selector)| match Selector::parse(&selector.path) {
            Ok(parsed) => Some((*field, parsed, selector.attribute.as_deref())),
            Err(_) => {
                warn!(
                    domain = %pattern.domain,
                    field = ?field,
                    selector = %selector.path,
                    "field selector does not parse"
                );
                None
            }
        })
        .collect();

    let mut page = ExtractedPage::default();

    for card_el in doc.select(&card_selector) {
        page.cards_found += 1;

        let mut card = ExtractedCard::default();
        for (field, selector, attribute) in &field_selectors {
            let Some(found) = card_el.select(selector).next() else {
                continue;
            };
            let raw = match attribute {
                Some(name) => found.value().attr(name).unwrap_or_default().to_string(),
                None => found.text().collect::<String>(),
            };
            if !raw.trim().is_empty() {
                card.fields.insert(*field, raw);
            }
        }
        page.cards.push(card);
    }

    page
}

/// Normalize one extracted card into a [`ScrapedJob`].
///
/// Title, company and a resolvable detail link are required; their
/// absence skips this card only. Optional fields that fail their
/// transform are simply left absent.
pub(crate) fn build_job(
    site_name: &str,
    base_url: &str,
    pattern: &SitePattern,
    card: &ExtractedCard,
    normalizer: &Normalizer,
) -> Result<ScrapedJob, CardAnomaly> {
    let title = required_text(card, JobField::Title, pattern, normalizer)?;
    let company = required_text(card, JobField::Company, pattern, normalizer)?;

    let raw_link = card
        .fields
        .get(&JobField::DetailLink)
        .ok_or(CardAnomaly::MissingField(JobField::DetailLink))?;
    let source_url = resolve_link(base_url, raw_link.trim())
        .ok_or_else(|| CardAnomaly::BadLink(raw_link.trim().to_string()))?;

    let mut job = ScrapedJob::new(site_name, source_url, title, company);

    if let Some(raw) = card.fields.get(&JobField::Location) {
        job.location = normalizer.apply_text(transform_for(pattern, JobField::Location), raw);
        // Location strings often carry the work arrangement inline
        if job.work_type.is_none() {
            job.work_type = normalizer.parse_work_type(raw);
        }
    }
    if let Some(raw) = card.fields.get(&JobField::Salary) {
        job.salary = normalizer.parse_salary(raw);
    }
    if let Some(raw) = card.fields.get(&JobField::Deadline) {
        job.deadline = normalizer.parse_date(raw);
    }
    if let Some(raw) = card.fields.get(&JobField::Skills) {
        job.skills = normalizer.split_list(raw);
    }
    if let Some(raw) = card.fields.get(&JobField::Description) {
        job.description =
            normalizer.apply_text(transform_for(pattern, JobField::Description), raw);
    }

    Ok(job)
}

fn required_text(
    card: &ExtractedCard,
    field: JobField,
    pattern: &SitePattern,
    normalizer: &Normalizer,
) -> Result<String, CardAnomaly> {
    let raw = card
        .fields
        .get(&field)
        .ok_or(CardAnomaly::MissingField(field))?;
    normalizer
        .apply_text(transform_for(pattern, field), raw)
        .ok_or(CardAnomaly::MissingField(field))
}

fn transform_for(pattern: &SitePattern, field: JobField) -> &Transform {
    pattern
        .selectors
        .get(&field)
        .map(|selector| &selector.transform)
        .unwrap_or(&Transform::Text)
}

fn resolve_link(base_url: &str, href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}
