//! Field-level heuristics.
//!
//! Each canonical field is scored through a pluggable list of
//! [`FieldHeuristic`] probes rather than inline conditionals, so new
//! rules can be added without touching the learner's control flow.

use regex::Regex;
use scraper::ElementRef;

use crate::types::pattern::JobField;

/// A candidate locator must reach this combined score to count as
/// "located" for a field.
pub const MIN_FIELD_SCORE: f32 = 0.5;

/// Compiled content classifiers shared by card detection and field
/// scoring.
pub struct SignalPatterns {
    salary: Regex,
    date: Regex,
}

impl Default for SignalPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalPatterns {
    pub fn new() -> Self {
        Self {
            salary: Regex::new(
                r"(?i)(?:[$€£¥₩]\s*\d[\d,.]*|\d[\d,.]*\s*(?:만원|만|원|krw|usd|eur|k\b))",
            )
            .expect("salary pattern compiles"),
            date: Regex::new(
                r"(?i)(?:\d{4}[-./]\d{1,2}[-./]\d{1,2}|\d{1,2}/\d{1,2}\b|deadline|마감|d-\d+|상시채용|채용시)",
            )
            .expect("date pattern compiles"),
        }
    }

    pub fn is_salary_like(&self, text: &str) -> bool {
        self.salary.is_match(text)
    }

    pub fn is_date_like(&self, text: &str) -> bool {
        self.date.is_match(text)
    }
}

/// Title-shaped: a heading or link with a plausible posting-title length.
pub fn is_title_like(el: &ElementRef, text: &str) -> bool {
    let len = text.chars().count();
    if !(8..=120).contains(&len) {
        return false;
    }
    matches!(el.value().name(), "h1" | "h2" | "h3" | "h4" | "h5" | "a" | "strong")
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_class_hint(el: &ElementRef, hints: &[&str]) -> bool {
    el.value().classes().any(|class| {
        let lowered = class.to_lowercase();
        hints.iter().any(|hint| lowered.contains(hint))
    })
}

fn href<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    el.value().attr("href").filter(|href| !href.is_empty())
}

/// One scoring rule for one field.
#[derive(Clone)]
pub struct FieldHeuristic {
    pub field: JobField,
    pub name: &'static str,
    pub weight: f32,
    pub probe: fn(&SignalPatterns, &ElementRef<'_>, &str) -> bool,
}

/// The built-in rule set. Callers may extend or replace it via
/// [`PatternLearner::with_heuristics`](crate::learn::PatternLearner::with_heuristics).
pub fn default_heuristics() -> Vec<FieldHeuristic> {
    vec![
        FieldHeuristic {
            field: JobField::Title,
            name: "heading-tag",
            weight: 0.5,
            probe: |_, el, text| {
                !text.is_empty() && matches!(el.value().name(), "h1" | "h2" | "h3" | "h4" | "h5")
            },
        },
        FieldHeuristic {
            field: JobField::Title,
            name: "link-bearing",
            weight: 0.3,
            probe: |_, el, text| is_title_like(el, text) && href(el).is_some(),
        },
        FieldHeuristic {
            field: JobField::Title,
            name: "title-class",
            weight: 0.4,
            probe: |_, el, text| {
                !text.is_empty() && has_class_hint(el, &["title", "tit", "subject", "position"])
            },
        },
        FieldHeuristic {
            field: JobField::Company,
            name: "company-class",
            weight: 0.8,
            probe: |_, el, text| {
                !text.is_empty() && has_class_hint(el, &["company", "corp", "employer", "firm"])
            },
        },
        FieldHeuristic {
            field: JobField::Company,
            name: "short-name",
            weight: 0.2,
            probe: |_, _, text| {
                let len = text.chars().count();
                (2..=40).contains(&len) && !text.chars().any(|c| c.is_ascii_digit())
            },
        },
        FieldHeuristic {
            field: JobField::Location,
            name: "location-class",
            weight: 0.8,
            probe: |_, el, text| {
                !text.is_empty()
                    && has_class_hint(el, &["location", "region", "area", "addr", "city", "place"])
            },
        },
        FieldHeuristic {
            field: JobField::Location,
            name: "short-text",
            weight: 0.2,
            probe: |_, _, text| (2..=40).contains(&text.chars().count()),
        },
        FieldHeuristic {
            field: JobField::Salary,
            name: "salary-text",
            weight: 0.8,
            probe: |signals, _, text| !text.is_empty() && signals.is_salary_like(text),
        },
        FieldHeuristic {
            field: JobField::Salary,
            name: "salary-class",
            weight: 0.4,
            probe: |_, el, text| {
                !text.is_empty() && has_class_hint(el, &["salary", "pay", "wage", "annual"])
            },
        },
        FieldHeuristic {
            field: JobField::Deadline,
            name: "date-text",
            weight: 0.7,
            probe: |signals, _, text| !text.is_empty() && signals.is_date_like(text),
        },
        FieldHeuristic {
            field: JobField::Deadline,
            name: "date-class",
            weight: 0.4,
            probe: |_, el, text| {
                !text.is_empty() && has_class_hint(el, &["date", "deadline", "due", "expire"])
            },
        },
        FieldHeuristic {
            field: JobField::DetailLink,
            name: "href",
            weight: 0.7,
            probe: |_, el, _| el.value().name() == "a" && href(el).is_some(),
        },
        FieldHeuristic {
            field: JobField::DetailLink,
            name: "job-href",
            weight: 0.3,
            probe: |_, el, _| {
                href(el).is_some_and(|href| {
                    let lowered = href.to_lowercase();
                    ["job", "view", "position", "recruit", "detail"]
                        .iter()
                        .any(|hint| lowered.contains(hint))
                })
            },
        },
    ]
}

/// Combined score of an element for one field.
pub fn score_field(
    heuristics: &[FieldHeuristic],
    signals: &SignalPatterns,
    field: JobField,
    el: &ElementRef<'_>,
    text: &str,
) -> f32 {
    heuristics
        .iter()
        .filter(|h| h.field == field)
        .filter(|h| (h.probe)(signals, el, text))
        .map(|h| h.weight)
        .sum()
}
