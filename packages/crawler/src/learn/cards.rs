//! Repeating-card detection.
//!
//! Job listings are rendered from a repeated template, so the card
//! container is the structural ancestor that occurs with the highest
//! multiplicity among elements carrying salary-like, date-like or
//! title-like text.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use crate::learn::fields::{is_title_like, normalize_whitespace, SignalPatterns};

/// How aggressively to probe for card candidates.
///
/// `Widened` is the retry strategy: a deeper ancestor window, a lower
/// multiplicity floor, and class-less container tags admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    Standard,
    Widened,
}

impl ProbeStrategy {
    /// Strategies to try, in order, for the configured retry count.
    pub fn sequence(retries: usize) -> &'static [ProbeStrategy] {
        if retries == 0 {
            &[ProbeStrategy::Standard]
        } else {
            &[ProbeStrategy::Standard, ProbeStrategy::Widened]
        }
    }

    fn ancestor_window(self) -> usize {
        match self {
            ProbeStrategy::Standard => 4,
            ProbeStrategy::Widened => 7,
        }
    }

    fn min_cards(self) -> usize {
        match self {
            ProbeStrategy::Standard => 4,
            ProbeStrategy::Widened => 2,
        }
    }

    fn min_kinds(self) -> usize {
        match self {
            ProbeStrategy::Standard => 2,
            ProbeStrategy::Widened => 1,
        }
    }

    fn allow_classless(self) -> bool {
        matches!(self, ProbeStrategy::Widened)
    }
}

/// Which signal kinds a subtree carries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SignalSet {
    pub salary: bool,
    pub date: bool,
    pub title: bool,
}

impl SignalSet {
    pub fn is_empty(self) -> bool {
        !(self.salary || self.date || self.title)
    }

    pub fn len(self) -> usize {
        self.salary as usize + self.date as usize + self.title as usize
    }

    pub fn merge(&mut self, other: SignalSet) {
        self.salary |= other.salary;
        self.date |= other.date;
        self.title |= other.title;
    }
}

/// Classify one element's own text. Length gates keep containers (whose
/// concatenated text matches everything) from registering as signals.
pub(crate) fn classify_signals(
    el: &ElementRef<'_>,
    text: &str,
    signals: &SignalPatterns,
) -> SignalSet {
    let mut set = SignalSet::default();
    let len = text.chars().count();
    if len > 0 && len <= 80 {
        set.salary = signals.is_salary_like(text);
        set.date = signals.is_date_like(text);
    }
    set.title = is_title_like(el, text);
    set
}

/// The winning card container.
#[derive(Debug, Clone)]
pub(crate) struct CardCandidate {
    pub selector: String,
    pub multiplicity: usize,
}

/// Find the repeating job-card container, or None when nothing repeats
/// enough under the given strategy.
pub(crate) fn detect_card_container(
    doc: &Html,
    strategy: ProbeStrategy,
    signals: &SignalPatterns,
) -> Option<CardCandidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for node in doc.tree.nodes() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        let text = normalize_whitespace(&el.text().collect::<String>());
        if classify_signals(&el, &text, signals).is_empty() {
            continue;
        }

        // Walk the ancestor window of each signal-bearing element; every
        // distinct structural signature along the way is a candidate
        let mut current = Some(el);
        for _ in 0..strategy.ancestor_window() {
            let Some(ancestor) = current else { break };
            if let Some(sig) = signature(&ancestor, strategy) {
                if seen.insert(sig.clone()) {
                    candidates.push(sig);
                }
            }
            current = ancestor.parent().and_then(ElementRef::wrap);
        }
    }

    let mut best: Option<(usize, usize, usize, CardCandidate)> = None;

    for sig in candidates {
        let Ok(selector) = Selector::parse(&sig) else {
            continue;
        };

        let mut multiplicity = 0usize;
        let mut kinds = SignalSet::default();
        let mut depth_sum = 0usize;

        for matched in doc.select(&selector) {
            let within = kinds_within(&matched, signals);
            if within.is_empty() {
                continue;
            }
            multiplicity += 1;
            kinds.merge(within);
            depth_sum += matched.ancestors().count();
        }

        if multiplicity < strategy.min_cards() || kinds.len() < strategy.min_kinds() {
            continue;
        }

        let avg_depth = depth_sum / multiplicity;
        let candidate = CardCandidate {
            selector: sig,
            multiplicity,
        };

        // Most signal kinds, then most repeats, then the outermost
        // container (title may live outside an inner wrapper)
        let better = match &best {
            None => true,
            Some((best_kinds, best_mult, best_depth, _)) => {
                (kinds.len(), multiplicity, usize::MAX - avg_depth)
                    > (*best_kinds, *best_mult, usize::MAX - *best_depth)
            }
        };
        if better {
            best = Some((kinds.len(), multiplicity, avg_depth, candidate));
        }
    }

    best.map(|(_, _, _, candidate)| candidate)
}

/// Union of signal kinds across a subtree.
fn kinds_within(root: &ElementRef<'_>, signals: &SignalPatterns) -> SignalSet {
    let mut kinds = SignalSet::default();
    for node in root.descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        let text = normalize_whitespace(&el.text().collect::<String>());
        kinds.merge(classify_signals(&el, &text, signals));
        if kinds.len() == 3 {
            break;
        }
    }
    kinds
}

/// Container tags admitted without classes under the widened strategy.
const CLASSLESS_CONTAINERS: [&str; 5] = ["li", "article", "tr", "div", "section"];

/// Structural signature usable as a CSS selector: `tag.class1.class2`.
fn signature(el: &ElementRef<'_>, strategy: ProbeStrategy) -> Option<String> {
    let value = el.value();
    let tag = value.name();
    if matches!(
        tag,
        "html" | "body" | "head" | "script" | "style" | "main" | "header" | "footer" | "nav"
    ) {
        return None;
    }

    let mut classes: Vec<&str> = value.classes().filter(|c| is_css_identifier(c)).collect();
    classes.sort_unstable();
    classes.dedup();

    if classes.is_empty() {
        if strategy.allow_classless() && CLASSLESS_CONTAINERS.contains(&tag) {
            Some(tag.to_string())
        } else {
            None
        }
    } else {
        Some(format!("{}.{}", tag, classes.join(".")))
    }
}

/// Conservative CSS identifier check so generated selectors always parse.
fn is_css_identifier(class: &str) -> bool {
    let mut chars = class.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(cards: usize) -> String {
        let mut html = String::from(r#"<html><body><div class="job-list">"#);
        for i in 0..cards {
            html.push_str(&format!(
                r#"<div class="job-card">
                    <h2 class="job-title"><a href="/jobs/{i}">Senior Rust Engineer {i}</a></h2>
                    <span class="company">Acme {i}</span>
                    <span class="salary">$90,000 - $120,000</span>
                    <span class="deadline">2026-09-0{d}</span>
                </div>"#,
                i = i,
                d = (i % 9) + 1,
            ));
        }
        html.push_str("</div></body></html>");
        html
    }

    #[test]
    fn test_detects_repeating_card() {
        let doc = Html::parse_document(&listing(10));
        let signals = SignalPatterns::new();

        let card = detect_card_container(&doc, ProbeStrategy::Standard, &signals).unwrap();
        assert_eq!(card.selector, "div.job-card");
        assert_eq!(card.multiplicity, 10);
    }

    #[test]
    fn test_too_few_cards_fails_standard_but_not_widened() {
        let doc = Html::parse_document(&listing(3));
        let signals = SignalPatterns::new();

        assert!(detect_card_container(&doc, ProbeStrategy::Standard, &signals).is_none());

        let card = detect_card_container(&doc, ProbeStrategy::Widened, &signals).unwrap();
        assert_eq!(card.selector, "div.job-card");
    }

    #[test]
    fn test_no_repetition_yields_none() {
        let doc = Html::parse_document(
            r#"<html><body><article>
                <h1>About our company</h1>
                <p>We are a company that values craft.</p>
            </article></body></html>"#,
        );
        let signals = SignalPatterns::new();
        assert!(detect_card_container(&doc, ProbeStrategy::Standard, &signals).is_none());
        assert!(detect_card_container(&doc, ProbeStrategy::Widened, &signals).is_none());
    }

    #[test]
    fn test_prefers_outer_container_over_inner_wrapper() {
        let mut html = String::from("<html><body>");
        for i in 0..6 {
            html.push_str(&format!(
                r#"<div class="posting">
                    <div class="meta">
                        <h3><a href="/p/{i}">Backend Engineer {i}</a></h3>
                        <span>$80,000</span>
                        <span>2026-10-01</span>
                    </div>
                </div>"#
            ));
        }
        html.push_str("</body></html>");
        let doc = Html::parse_document(&html);
        let signals = SignalPatterns::new();

        let card = detect_card_container(&doc, ProbeStrategy::Standard, &signals).unwrap();
        assert_eq!(card.selector, "div.posting");
    }
}
