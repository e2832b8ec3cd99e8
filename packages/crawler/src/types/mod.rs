//! Core data types: learned patterns, normalized job records, and the
//! request/response contracts.

pub mod job;
pub mod params;
pub mod pattern;
pub mod report;

pub use job::{job_id, slugify, ExperienceRange, SalaryRange, ScrapedJob, WorkType};
pub use params::{AggregateRequest, AggregateResponse, CrawlParams, LearnRequest};
pub use pattern::{FieldSelector, JobField, PatternSummary, SitePattern, Transform};
pub use report::{Article, CompanyGroup, CompanyReport, CrawlOutcome};
