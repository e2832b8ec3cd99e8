//! Request/response contracts exchanged with the API-layer collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::job::ScrapedJob;
use crate::types::report::CrawlOutcome;

/// Crawl parameters as received from the inbound request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_min: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_max: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tech_stack: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub benefits: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Listing URL to learn from when the domain has no stored pattern.
    /// Defaults to `https://{domain}/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_url: Option<String>,
}

impl CrawlParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_salary_range(mut self, min: u64, max: u64) -> Self {
        self.salary_min = Some(min.min(max));
        self.salary_max = Some(min.max(max));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_seed_url(mut self, url: impl Into<String>) -> Self {
        self.seed_url = Some(url.into());
        self
    }

    /// Post-extraction filter: does a job satisfy the requested bounds?
    ///
    /// Sites apply the keyword server-side through the listing URL; salary
    /// and experience bounds are enforced here because most sites cannot.
    pub fn accepts(&self, job: &ScrapedJob) -> bool {
        if let (Some(min), Some(salary)) = (self.salary_min, job.salary.as_ref()) {
            if salary.max < min {
                return false;
            }
        }
        if let (Some(max), Some(salary)) = (self.salary_max, job.salary.as_ref()) {
            if salary.min > max {
                return false;
            }
        }
        if let (Some(min), Some(exp)) = (self.experience_min, job.experience.as_ref()) {
            if exp.max < min {
                return false;
            }
        }
        if let (Some(max), Some(exp)) = (self.experience_max, job.experience.as_ref()) {
            if exp.min > max {
                return false;
            }
        }
        if let (Some(wanted), Some(actual)) = (&self.employment_type, &job.employment_type) {
            if !actual.eq_ignore_ascii_case(wanted) {
                return false;
            }
        }
        true
    }
}

/// Inbound aggregation request: which sites to crawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    /// Domains to aggregate; empty means all configured sites
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sites: Vec<String>,

    #[serde(flatten)]
    pub params: CrawlParams,
}

/// Outbound aggregation result in the wire shape the collaborator expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    /// True when at least one site succeeded
    pub success: bool,

    pub jobs: Vec<ScrapedJob>,
    pub count: usize,
    pub crawled_at: DateTime<Utc>,

    /// Per-site failure descriptions; present when any site failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl AggregateResponse {
    /// Map an orchestrator outcome to the wire contract.
    ///
    /// Total failure (every requested site errored) is the only case that
    /// reports `success = false`; the error list is then guaranteed
    /// non-empty so callers can tell "nothing matched" from "everything
    /// failed".
    pub fn from_outcome(outcome: CrawlOutcome) -> Self {
        let errors: Vec<String> = outcome
            .per_site_errors
            .iter()
            .map(|(domain, error)| format!("{domain}: {error}"))
            .collect();
        let success = outcome.sites_succeeded > 0 || outcome.per_site_errors.is_empty();
        Self {
            success,
            count: outcome.jobs.len(),
            jobs: outcome.jobs,
            crawled_at: outcome.crawled_at,
            errors,
        }
    }
}

/// Inbound learning trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnRequest {
    pub site_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::job::SalaryRange;

    fn job_with_salary(min: u64, max: u64) -> ScrapedJob {
        let mut job = ScrapedJob::new("test", "https://t.example/1", "Engineer", "Acme");
        job.salary = Some(SalaryRange::new(min, max));
        job
    }

    #[test]
    fn test_salary_bounds_filter() {
        let params = CrawlParams::new().with_salary_range(3000, 6000);

        assert!(params.accepts(&job_with_salary(4000, 5000)));
        // Overlapping ranges pass
        assert!(params.accepts(&job_with_salary(2000, 3500)));
        assert!(!params.accepts(&job_with_salary(1000, 2000)));
        assert!(!params.accepts(&job_with_salary(7000, 9000)));

        // Absent salary is not filtered out
        let bare = ScrapedJob::new("test", "https://t.example/2", "Engineer", "Acme");
        assert!(params.accepts(&bare));
    }

    #[test]
    fn test_params_wire_shape_is_camel_case() {
        let params = CrawlParams::new().with_keyword("rust").with_limit(10);
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("keyword").is_some());
        assert!(json.get("limit").is_some());
        assert!(json.get("salaryMin").is_none());
    }
}
