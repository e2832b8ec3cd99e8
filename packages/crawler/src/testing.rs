//! Testing utilities: a scriptable mock renderer and HTML fixtures.
//!
//! Useful for exercising the learner, crawler and orchestrator without a
//! browser or network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::render::{PageRenderer, RenderRequest, RenderedPage};

/// Scripted behavior for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Serve this HTML
    Html(String),
    /// Serve HTML as if redirected to `final_url`
    HtmlAt { html: String, final_url: String },
    /// Fail with a fetch timeout
    Timeout,
    /// Fail with bot detection
    Blocked,
    /// Fail with this HTTP status
    Status(u16),
    /// Never respond (for budget-expiry tests)
    Hang,
}

/// A renderer serving canned pages, with call recording.
///
/// URLs without a scripted response serve an empty listing page, which
/// reads as "no more results" to the crawler.
#[derive(Default)]
pub struct MockRenderer {
    responses: RwLock<HashMap<String, MockResponse>>,
    calls: RwLock<Vec<String>>,
    delay: RwLock<Option<Duration>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `url`.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert(url.into(), MockResponse::Html(html.into()));
        self
    }

    /// Serve `html` at `url` as if redirected to `final_url`.
    pub fn with_page_at(
        self,
        url: impl Into<String>,
        final_url: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        self.responses.write().unwrap().insert(
            url.into(),
            MockResponse::HtmlAt {
                html: html.into(),
                final_url: final_url.into(),
            },
        );
        self
    }

    /// Script any response for `url`.
    pub fn with_response(self, url: impl Into<String>, response: MockResponse) -> Self {
        self.responses.write().unwrap().insert(url.into(), response);
        self
    }

    /// Fail every render of `url` with a timeout.
    pub fn with_timeout(self, url: impl Into<String>) -> Self {
        self.with_response(url, MockResponse::Timeout)
    }

    /// Delay every render (simulates a slow site).
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write().unwrap() = Some(delay);
        self
    }

    /// Replace the scripted response for a URL after construction.
    pub fn set_page(&self, url: impl Into<String>, html: impl Into<String>) {
        self.responses
            .write()
            .unwrap()
            .insert(url.into(), MockResponse::Html(html.into()));
    }

    /// All rendered URLs, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// How many times `url` was rendered.
    pub fn render_count(&self, url: &str) -> usize {
        self.calls.read().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn render(&self, req: &RenderRequest) -> FetchResult<RenderedPage> {
        self.calls.write().unwrap().push(req.url.clone());

        let delay = *self.delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.read().unwrap().get(&req.url).cloned();
        match response {
            Some(MockResponse::Html(html)) => Ok(RenderedPage {
                html,
                final_url: req.url.clone(),
                status_code: 200,
            }),
            Some(MockResponse::HtmlAt { html, final_url }) => Ok(RenderedPage {
                html,
                final_url,
                status_code: 200,
            }),
            Some(MockResponse::Timeout) => Err(FetchError::Timeout {
                url: req.url.clone(),
                timeout_ms: req.timeout.as_millis() as u64,
            }),
            Some(MockResponse::Blocked) => Err(FetchError::Blocked {
                url: req.url.clone(),
                reason: "scripted block".to_string(),
            }),
            Some(MockResponse::Status(status)) => Err(FetchError::Status {
                url: req.url.clone(),
                status,
            }),
            Some(MockResponse::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::Timeout {
                    url: req.url.clone(),
                    timeout_ms: req.timeout.as_millis() as u64,
                })
            }
            None => Ok(RenderedPage {
                html: fixtures::empty_page(),
                final_url: req.url.clone(),
                status_code: 200,
            }),
        }
    }
}

/// Synthetic listing and detail pages.
pub mod fixtures {
    const COMPANIES: [&str; 5] = ["Acme Industries", "Globex", "Initech", "Umbrella", "Hooli"];
    const LOCATIONS: [&str; 5] = ["Seoul", "Berlin", "Lisbon", "Austin", "Remote"];

    /// A clean listing: `count` cards, all five canonical fields in
    /// recognizable markup.
    pub fn listing_page(count: usize) -> String {
        listing_page_from(0, count)
    }

    /// Like [`listing_page`] but with posting ids starting at `start`,
    /// so successive pages carry distinct jobs.
    pub fn listing_page_from(start: usize, count: usize) -> String {
        let mut html = String::from(
            r#"<html><head><title>Jobs</title></head><body><div class="job-list">"#,
        );
        for i in start..start + count {
            html.push_str(&format!(
                r#"<div class="job-card">
                    <h2 class="job-title"><a href="/jobs/{id}">Senior Rust Engineer {id}</a></h2>
                    <span class="company">{company}</span>
                    <span class="location">{location}</span>
                    <span class="salary">$90,000 - $120,000</span>
                    <span class="deadline">2026-09-15</span>
                </div>"#,
                id = i + 1,
                company = COMPANIES[i % COMPANIES.len()],
                location = LOCATIONS[i % LOCATIONS.len()],
            ));
        }
        html.push_str("</div></body></html>");
        html
    }

    /// A listing where only title, company and location are reliably
    /// present; salary and deadline appear on alternating cards only.
    pub fn sparse_listing_page(count: usize) -> String {
        let mut html = String::from(
            r#"<html><head><title>Jobs</title></head><body><div class="job-list">"#,
        );
        for i in 0..count {
            let extras = if i % 2 == 0 {
                r#"<span class="salary">$80,000</span><span class="deadline">2026-09-30</span>"#
            } else {
                ""
            };
            html.push_str(&format!(
                r#"<div class="job-card">
                    <h2 class="job-title"><a href="/jobs/{id}">Backend Engineer {id}</a></h2>
                    <span class="company">{company}</span>
                    <span class="location">{location}</span>
                    {extras}
                </div>"#,
                id = i + 1,
                company = COMPANIES[i % COMPANIES.len()],
                location = LOCATIONS[i % LOCATIONS.len()],
            ));
        }
        html.push_str("</div></body></html>");
        html
    }

    /// The same jobs after a site redesign: different container and
    /// field markup, still learnable.
    pub fn shifted_listing_page(count: usize) -> String {
        let mut html =
            String::from(r#"<html><head><title>Jobs</title></head><body><ul class="results">"#);
        for i in 0..count {
            html.push_str(&format!(
                r#"<li class="posting">
                    <h3 class="post-title"><a href="/positions/{id}">Senior Rust Engineer {id}</a></h3>
                    <span class="employer">{company}</span>
                    <span class="region">{location}</span>
                    <em class="pay">$95,000 - $125,000</em>
                    <time class="due">2026-10-01</time>
                </li>"#,
                id = i + 1,
                company = COMPANIES[i % COMPANIES.len()],
                location = LOCATIONS[i % LOCATIONS.len()],
            ));
        }
        html.push_str("</ul></body></html>");
        html
    }

    /// A results page with no cards at all.
    pub fn empty_page() -> String {
        r#"<html><head><title>Jobs</title></head><body>
            <div class="job-list"><p class="no-results">No postings matched.</p></div>
        </body></html>"#
            .to_string()
    }

    /// A minimal detail page.
    pub fn detail_page(title: &str) -> String {
        format!(
            r#"<html><head><title>{title}</title></head><body>
                <h1>{title}</h1>
                <p>We are looking for an engineer. Remote work is possible. 3~5년 experience.</p>
            </body></html>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_renderer_serves_and_records() {
        let renderer = MockRenderer::new().with_page("https://a.example/jobs", "<html>x</html>");

        let page = renderer
            .render(&RenderRequest::new("https://a.example/jobs"))
            .await
            .unwrap();
        assert_eq!(page.html, "<html>x</html>");
        assert_eq!(renderer.render_count("https://a.example/jobs"), 1);
    }

    #[tokio::test]
    async fn test_mock_renderer_scripted_timeout() {
        let renderer = MockRenderer::new().with_timeout("https://b.example/");
        let err = renderer
            .render(&RenderRequest::new("https://b.example/"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_unknown_url_serves_empty_listing() {
        let renderer = MockRenderer::new();
        let page = renderer
            .render(&RenderRequest::new("https://nowhere.example/"))
            .await
            .unwrap();
        assert!(page.html.contains("no-results"));
    }
}
