//! Plain-HTTP renderer.
//!
//! Suitable for server-rendered sites and fixtures; JS-heavy sites need
//! [`ChromeRenderer`](crate::render::ChromeRenderer). `wait_for_selector`
//! has no effect here, since there is no script to wait on.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::render::{check_blocked, PageRenderer, RenderRequest, RenderedPage};

/// Renderer that fetches the server HTML over HTTP.
pub struct HttpRenderer {
    client: reqwest::Client,
    user_agent: String,
}

impl Default for HttpRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRenderer {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: "JobCrawler/0.1".to_string(),
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, req: &RenderRequest) -> FetchResult<RenderedPage> {
        if url::Url::parse(&req.url).is_err() {
            return Err(FetchError::InvalidUrl {
                url: req.url.clone(),
            });
        }

        debug!(url = %req.url, "HTTP fetch starting");

        let response = self
            .client
            .get(&req.url)
            .header("User-Agent", &self.user_agent)
            .timeout(req.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %req.url, error = %e, "HTTP request failed");
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: req.url.clone(),
                        timeout_ms: req.timeout.as_millis() as u64,
                    }
                } else {
                    FetchError::Transport {
                        url: req.url.clone(),
                        source: Box::new(e),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let html = response.text().await.map_err(|e| FetchError::Transport {
            url: req.url.clone(),
            source: Box::new(e),
        })?;

        check_blocked(&final_url, status, &html)?;

        if status >= 400 {
            return Err(FetchError::Status {
                url: req.url.clone(),
                status,
            });
        }

        debug!(url = %req.url, status, content_length = html.len(), "HTTP fetch completed");
        Ok(RenderedPage {
            html,
            final_url,
            status_code: status,
        })
    }
}
