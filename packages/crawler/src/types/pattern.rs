//! Learned site patterns: the persisted recipe for extracting job cards
//! from one domain without site-specific code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical job-card fields a pattern can locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobField {
    Title,
    Company,
    Location,
    Salary,
    Deadline,
    Skills,
    Description,
    DetailLink,
}

impl JobField {
    /// The fields that count toward learner confidence.
    pub const SCORED: [JobField; 5] = [
        JobField::Title,
        JobField::Company,
        JobField::Location,
        JobField::Salary,
        JobField::Deadline,
    ];
}

/// Per-field extraction transform applied to the raw located text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
    /// Trim and collapse whitespace
    Text,
    /// Extract a capture group from the text
    Regex { pattern: String, group: usize },
    /// Parse a salary range into whole currency units
    Salary,
    /// Parse a calendar date
    Date,
    /// Parse an experience range in years
    Experience,
    /// Canonicalize onsite/remote/dispatch wording
    WorkType,
    /// Split a delimited list into items
    List,
}

/// A structural locator for one field, relative to the card container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSelector {
    /// CSS path relative to the card root, e.g. `h2.title > a`
    pub path: String,

    /// Attribute to read instead of text content (e.g. `href`)
    pub attribute: Option<String>,

    /// Transform applied to the raw value
    pub transform: Transform,
}

impl FieldSelector {
    /// Text-content selector with whitespace normalization.
    pub fn text(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attribute: None,
            transform: Transform::Text,
        }
    }

    /// Attribute selector (e.g. an anchor's `href`).
    pub fn attribute(path: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attribute: Some(attribute.into()),
            transform: Transform::Text,
        }
    }

    /// Replace the transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// A learned recipe for one domain.
///
/// Created by the pattern learner on first encounter, read by every
/// crawl, deleted and lazily relearned on layout drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitePattern {
    /// Canonical hostname, unique key
    pub domain: String,

    /// Human-readable site name; falls back to the domain
    pub site_name: String,

    /// Listing URL template with `{keyword}` and `{page}` placeholders
    pub list_page_pattern: String,

    /// Optional detail URL template with an `{id}` placeholder
    pub detail_page_pattern: Option<String>,

    /// CSS locator for the repeating job-card container
    pub card_selector: String,

    /// Field locators relative to the card container
    pub selectors: BTreeMap<JobField, FieldSelector>,

    /// Fraction of scored fields located consistently during learning
    pub confidence: f32,

    pub created_at: DateTime<Utc>,

    /// Updated on every successful save or re-validation
    pub last_updated: DateTime<Utc>,
}

impl SitePattern {
    /// Create a pattern with no selectors yet.
    pub fn new(domain: impl Into<String>, list_page_pattern: impl Into<String>) -> Self {
        let domain = domain.into();
        let now = Utc::now();
        Self {
            site_name: domain.clone(),
            domain,
            list_page_pattern: list_page_pattern.into(),
            detail_page_pattern: None,
            card_selector: String::new(),
            selectors: BTreeMap::new(),
            confidence: 0.0,
            created_at: now,
            last_updated: now,
        }
    }

    /// Set the display name.
    pub fn with_site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = name.into();
        self
    }

    /// Set the card container selector.
    pub fn with_card_selector(mut self, selector: impl Into<String>) -> Self {
        self.card_selector = selector.into();
        self
    }

    /// Add a field selector.
    pub fn with_selector(mut self, field: JobField, selector: FieldSelector) -> Self {
        self.selectors.insert(field, selector);
        self
    }

    /// Set the confidence score.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the detail URL template.
    pub fn with_detail_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.detail_page_pattern = Some(pattern.into());
        self
    }

    /// A pattern is usable when it can at least locate cards and titles.
    pub fn is_usable(&self) -> bool {
        !self.card_selector.is_empty() && self.selectors.contains_key(&JobField::Title)
    }

    /// Build the listing URL for a page number and optional keyword.
    pub fn listing_url(&self, keyword: Option<&str>, page: usize) -> String {
        self.list_page_pattern
            .replace("{page}", &page.to_string())
            .replace("{keyword}", &urlencode(keyword.unwrap_or("")))
    }
}

/// Summary shape exposed to external consumers: templates and field
/// coverage without selector internals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSummary {
    pub domain: String,
    pub site_name: String,
    pub list_page_pattern: String,
    pub detail_page_pattern: Option<String>,
    pub fields: Vec<JobField>,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<&SitePattern> for PatternSummary {
    fn from(pattern: &SitePattern) -> Self {
        Self {
            domain: pattern.domain.clone(),
            site_name: pattern.site_name.clone(),
            list_page_pattern: pattern.list_page_pattern.clone(),
            detail_page_pattern: pattern.detail_page_pattern.clone(),
            fields: pattern.selectors.keys().copied().collect(),
            confidence: pattern.confidence,
            created_at: pattern.created_at,
            last_updated: pattern.last_updated,
        }
    }
}

/// Minimal percent-encoding for query values substituted into templates.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
