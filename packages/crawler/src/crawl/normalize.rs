//! Field normalization.
//!
//! Every extracted value passes through the transform recorded in the
//! pattern before it reaches a [`ScrapedJob`]. Unrecognized enum-like
//! text is dropped, never passed through raw.

use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;

use crate::types::job::{ExperienceRange, SalaryRange, WorkType};
use crate::types::pattern::Transform;

/// Canonicalization table from site wording to [`WorkType`].
const WORK_TYPE_TABLE: [(&str, WorkType); 12] = [
    ("remote", WorkType::Remote),
    ("재택", WorkType::Remote),
    ("원격", WorkType::Remote),
    ("wfh", WorkType::Remote),
    ("work from home", WorkType::Remote),
    ("onsite", WorkType::Onsite),
    ("on-site", WorkType::Onsite),
    ("출근", WorkType::Onsite),
    ("상주", WorkType::Onsite),
    ("office", WorkType::Onsite),
    ("dispatch", WorkType::Dispatch),
    ("파견", WorkType::Dispatch),
];

/// Compiled parsers for the structured field transforms.
pub struct Normalizer {
    number: Regex,
    thousands: Regex,
    ymd: Regex,
    relative_day: Regex,
    experience_range: Regex,
    experience_single: Regex,
    entry_level: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            number: Regex::new(r"\d[\d,]*").expect("number pattern compiles"),
            thousands: Regex::new(r"(?i)\d\s*k\b").expect("thousands pattern compiles"),
            ymd: Regex::new(r"(\d{4})[-./](\d{1,2})[-./](\d{1,2})").expect("ymd pattern compiles"),
            relative_day: Regex::new(r"(?i)d-(\d{1,3})").expect("relative-day pattern compiles"),
            experience_range: Regex::new(r"(\d{1,2})\s*[-~]\s*(\d{1,2})\s*(?:년|years?|yrs?)")
                .expect("experience range pattern compiles"),
            experience_single: Regex::new(r"(\d{1,2})\s*\+?\s*(?:년|years?|yrs?)")
                .expect("experience pattern compiles"),
            entry_level: Regex::new(r"(?i)신입|entry[\s-]?level|no experience")
                .expect("entry-level pattern compiles"),
        }
    }

    /// Collapse whitespace runs and trim.
    pub fn clean_text(&self, raw: &str) -> String {
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Parse a salary range into whole currency units.
    ///
    /// `만`/`만원` scales ×10,000 and a `k` suffix ×1,000. One number
    /// yields a degenerate range; reversed bounds are swapped by
    /// [`SalaryRange::new`].
    pub fn parse_salary(&self, raw: &str) -> Option<SalaryRange> {
        let scale: u64 = if raw.contains('만') {
            10_000
        } else if self.thousands.is_match(raw) {
            1_000
        } else {
            1
        };

        let mut numbers = self
            .number
            .find_iter(raw)
            .filter_map(|m| m.as_str().replace(',', "").parse::<u64>().ok())
            .map(|n| n.saturating_mul(scale));

        let first = numbers.next()?;
        let second = numbers.next().unwrap_or(first);
        Some(SalaryRange::new(first, second))
    }

    /// Parse a calendar date: `YYYY-MM-DD` (also `.` or `/` separated),
    /// or a relative `D-n` countdown. "Open until filled" wording has no
    /// date and yields None.
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        if let Some(captures) = self.ymd.captures(raw) {
            let year = captures[1].parse().ok()?;
            let month = captures[2].parse().ok()?;
            let day = captures[3].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }
        if let Some(captures) = self.relative_day.captures(raw) {
            let days: i64 = captures[1].parse().ok()?;
            return Some(Utc::now().date_naive() + Duration::days(days));
        }
        None
    }

    /// Parse required experience in years. Entry-level wording maps to
    /// zero; a bare "N+ years" collapses to `N..N`.
    pub fn parse_experience(&self, raw: &str) -> Option<ExperienceRange> {
        if self.entry_level.is_match(raw) {
            return Some(ExperienceRange::new(0, 0));
        }
        if let Some(captures) = self.experience_range.captures(raw) {
            let min = captures[1].parse().ok()?;
            let max = captures[2].parse().ok()?;
            return Some(ExperienceRange::new(min, max));
        }
        if let Some(captures) = self.experience_single.captures(raw) {
            let years = captures[1].parse().ok()?;
            return Some(ExperienceRange::new(years, years));
        }
        None
    }

    /// Canonicalize work arrangement wording through the table.
    pub fn parse_work_type(&self, raw: &str) -> Option<WorkType> {
        let lowered = raw.to_lowercase();
        WORK_TYPE_TABLE
            .iter()
            .find(|(marker, _)| lowered.contains(marker))
            .map(|(_, work_type)| *work_type)
    }

    /// Split a delimited list; items are deduplicated and sorted (set
    /// semantics).
    pub fn split_list(&self, raw: &str) -> Vec<String> {
        let mut items: Vec<String> = raw
            .split(|c| matches!(c, ',' | '/' | '|' | '·' | ';'))
            .map(|item| self.clean_text(item))
            .filter(|item| !item.is_empty())
            .collect();
        items.sort();
        items.dedup();
        items
    }

    /// Apply a regex-extract transform.
    pub fn apply_regex(&self, raw: &str, pattern: &str, group: usize) -> Option<String> {
        let regex = Regex::new(pattern).ok()?;
        regex
            .captures(raw)
            .and_then(|captures| captures.get(group))
            .map(|m| self.clean_text(m.as_str()))
    }

    /// Apply a transform to a raw string, producing plain text for the
    /// text-like transforms. Structured transforms go through the typed
    /// parsers above in the job builder.
    pub fn apply_text(&self, transform: &Transform, raw: &str) -> Option<String> {
        match transform {
            Transform::Regex { pattern, group } => self.apply_regex(raw, pattern, *group),
            _ => {
                let cleaned = self.clean_text(raw);
                (!cleaned.is_empty()).then_some(cleaned)
            }
        }
    }
}
