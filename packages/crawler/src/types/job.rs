//! The canonical, source-agnostic job record every site crawler produces.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Work arrangement, canonicalized from free-form site text.
///
/// Unrecognized wording is dropped (field left absent), never passed
/// through raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Onsite,
    Remote,
    Dispatch,
}

/// Salary range in whole currency units. `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: u64,
    pub max: u64,
}

impl SalaryRange {
    /// Build a range, swapping reversed bounds.
    pub fn new(min: u64, max: u64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

/// Required experience in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceRange {
    pub min: u32,
    pub max: u32,
}

impl ExperienceRange {
    pub fn new(min: u32, max: u32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

/// Normalized job record: the output contract of every site crawl.
///
/// Constructed fresh on every crawl; persistence is a collaborator's
/// concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedJob {
    /// Deterministic id derived from source + source-native identifier,
    /// so repeated crawls of the same posting collapse to one id
    pub id: String,

    /// Site name the record came from
    pub source: String,

    /// Absolute URL of the posting
    pub source_url: String,

    pub title: String,
    pub company: String,

    /// Source-native company id when extractable, else a slug of the name
    pub company_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered list as stated by the posting
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,

    /// Deduplicated and sorted; order carries no meaning
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<SalaryRange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<ExperienceRange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_type: Option<WorkType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<NaiveDate>,
}

impl ScrapedJob {
    /// Create a record with the required identity fields; everything
    /// else starts absent.
    pub fn new(
        source: impl Into<String>,
        source_url: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let source_url = source_url.into();
        let company = company.into();
        Self {
            id: job_id(&source, &source_url),
            company_id: slugify(&company),
            source,
            source_url,
            title: title.into(),
            company,
            location: None,
            description: None,
            requirements: Vec::new(),
            skills: Vec::new(),
            keywords: Vec::new(),
            salary: None,
            experience: None,
            education: None,
            employment_type: None,
            work_type: None,
            industry: None,
            deadline: None,
            posted_at: None,
        }
    }
}

/// Query keys sites commonly use for a posting's native identifier.
const ID_QUERY_KEYS: [&str; 5] = ["id", "idx", "jobid", "job_id", "rec_idx"];

/// Derive a stable job id from the source name and posting URL.
///
/// Prefers a source-native identifier (an id-like query parameter, else
/// the last path segment when it is numeric) so URL noise such as
/// tracking parameters does not split identities; falls back to the full
/// URL.
pub fn job_id(source: &str, source_url: &str) -> String {
    let native = Url::parse(source_url).ok().and_then(|url| {
        let from_query = url.query_pairs().find_map(|(key, value)| {
            if ID_QUERY_KEYS.contains(&key.to_ascii_lowercase().as_str()) && !value.is_empty() {
                Some(value.into_owned())
            } else {
                None
            }
        });
        from_query.or_else(|| {
            url.path_segments()?
                .filter(|segment| !segment.is_empty())
                .next_back()
                .filter(|segment| segment.bytes().all(|b| b.is_ascii_digit()))
                .map(|segment| segment.to_string())
        })
    });

    let key = native.unwrap_or_else(|| source_url.to_string());
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b":");
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// Lowercase alphanumeric slug used for company grouping.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
