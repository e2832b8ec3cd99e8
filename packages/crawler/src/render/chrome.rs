//! Headless-Chrome renderer.
//!
//! Executes client-side script so JS-driven listing pages yield their
//! complete DOM, not just the initial server HTML. The CDP calls are
//! blocking, so each render runs on the blocking thread pool with the
//! browser lease moved into the task.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::render::pool::{BrowserLease, BrowserPool};
use crate::render::{check_blocked, PageRenderer, RenderRequest, RenderedPage};

/// Renderer backed by a [`BrowserPool`].
///
/// Note: Chrome does not surface the HTTP status without network-event
/// plumbing, so rendered pages report 200 and block detection relies on
/// content markers and empty bodies.
pub struct ChromeRenderer {
    pool: BrowserPool,
}

impl ChromeRenderer {
    /// Create a renderer with a pool of `capacity` browsers.
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: BrowserPool::new(capacity),
        }
    }

    /// Use a pre-configured pool.
    pub fn with_pool(pool: BrowserPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &BrowserPool {
        &self.pool
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, req: &RenderRequest) -> FetchResult<RenderedPage> {
        if url::Url::parse(&req.url).is_err() {
            return Err(FetchError::InvalidUrl {
                url: req.url.clone(),
            });
        }

        debug!(url = %req.url, timeout_ms = req.timeout.as_millis() as u64, "chrome render starting");

        let lease = self.pool.acquire().await?;
        let url = req.url.clone();
        let wait_for = req.wait_for_selector.clone();
        let timeout = req.timeout;

        let handle =
            tokio::task::spawn_blocking(move || render_blocking(lease, &url, wait_for, timeout));

        // Grace period on top of the tab's own deadline so the blocking
        // task reports its timeout before we give up on the join handle
        let page = match tokio::time::timeout(timeout + Duration::from_secs(5), handle).await {
            Err(_) => {
                warn!(url = %req.url, "render exceeded deadline");
                return Err(FetchError::Timeout {
                    url: req.url.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Ok(joined) => joined.map_err(|e| FetchError::Browser(Box::new(e)))??,
        };

        check_blocked(&page.final_url, page.status_code, &page.html)?;

        debug!(
            url = %req.url,
            final_url = %page.final_url,
            content_length = page.html.len(),
            "chrome render completed"
        );
        Ok(page)
    }
}

fn render_blocking(
    lease: BrowserLease,
    url: &str,
    wait_for: Option<String>,
    timeout: Duration,
) -> FetchResult<RenderedPage> {
    let tab = lease
        .browser()
        .new_tab()
        .map_err(|e| FetchError::Browser(e.into()))?;
    tab.set_default_timeout(timeout);

    let result = (|| {
        tab.navigate_to(url)
            .map_err(|e| classify(url, timeout, e))?;
        tab.wait_until_navigated()
            .map_err(|e| classify(url, timeout, e))?;

        if let Some(selector) = &wait_for {
            tab.wait_for_element(selector)
                .map_err(|e| classify(url, timeout, e))?;
        }

        let html = tab.get_content().map_err(|e| FetchError::Browser(e.into()))?;
        let final_url = tab.get_url();

        Ok(RenderedPage {
            html,
            final_url,
            status_code: 200,
        })
    })();

    // Close the tab regardless of outcome; the browser itself returns to
    // the pool when the lease drops
    if let Err(close_err) = tab.close(true) {
        warn!(url = %url, error = %close_err, "failed to close tab");
    }

    result
}

/// Map navigation/wait failures, distinguishing deadline expiry.
fn classify(url: &str, timeout: Duration, error: anyhow::Error) -> FetchError {
    let text = error.to_string().to_lowercase();
    if text.contains("timeout") || text.contains("timed out") {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        FetchError::Browser(error.into())
    }
}
