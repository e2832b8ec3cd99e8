//! Aggregation outcome and the cross-site company report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::CrawlError;
use crate::types::job::ScrapedJob;

/// Result of one `crawl_all` invocation.
///
/// Jobs arrive in completion order across sites; per-site failures are
/// isolated into their own slots and never abort siblings.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Identifies this aggregation run in logs
    pub crawl_id: Uuid,

    pub jobs: Vec<ScrapedJob>,

    /// Domain -> unrecovered error for that site
    pub per_site_errors: BTreeMap<String, CrawlError>,

    /// How many requested sites completed without error
    pub sites_succeeded: usize,

    pub crawled_at: DateTime<Utc>,
}

impl CrawlOutcome {
    /// True when every requested site failed.
    pub fn all_failed(&self) -> bool {
        self.sites_succeeded == 0 && !self.per_site_errors.is_empty()
    }
}

/// A flat article fed in by the analyzer collaborator: only title/body
/// text is consumed here, for company mention counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub body: String,
}

/// One company's slice of an aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyGroup {
    pub company_id: String,
    pub company: String,
    pub job_count: usize,
    pub job_ids: Vec<String>,

    /// Articles mentioning the company by name; zero when no article
    /// list was supplied
    pub article_mentions: usize,
}

/// Deterministic grouping of a merged job list by company id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyReport {
    /// Sorted by company id
    pub companies: Vec<CompanyGroup>,
}

impl CompanyReport {
    /// Group jobs by `company_id`. Job ids within a group keep crawl
    /// order; groups are sorted by company id so the report is stable
    /// regardless of site completion order.
    pub fn from_jobs(jobs: &[ScrapedJob]) -> Self {
        let mut groups: BTreeMap<String, CompanyGroup> = BTreeMap::new();
        for job in jobs {
            let group = groups
                .entry(job.company_id.clone())
                .or_insert_with(|| CompanyGroup {
                    company_id: job.company_id.clone(),
                    company: job.company.clone(),
                    job_count: 0,
                    job_ids: Vec::new(),
                    article_mentions: 0,
                });
            group.job_count += 1;
            group.job_ids.push(job.id.clone());
        }
        Self {
            companies: groups.into_values().collect(),
        }
    }

    /// Count case-insensitive company-name mentions across an article
    /// list from the analyzer collaborator.
    pub fn with_articles(mut self, articles: &[Article]) -> Self {
        for group in &mut self.companies {
            let needle = group.company.to_lowercase();
            if needle.is_empty() {
                continue;
            }
            group.article_mentions = articles
                .iter()
                .filter(|article| {
                    article.title.to_lowercase().contains(&needle)
                        || article.body.to_lowercase().contains(&needle)
                })
                .count();
        }
        self
    }

    pub fn company(&self, company_id: &str) -> Option<&CompanyGroup> {
        self.companies
            .iter()
            .find(|group| group.company_id == company_id)
    }
}
