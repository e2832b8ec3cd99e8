//! Page acquisition.
//!
//! Everything downstream consumes a fully rendered DOM through the
//! [`PageRenderer`] trait:
//! - [`ChromeRenderer`]: headless Chrome from a bounded pool, for
//!   JS-driven sites
//! - [`HttpRenderer`]: plain HTTP, for static sites
//! - [`RateLimitedRenderer`]: governor-based decorator for politeness

pub mod chrome;
pub mod http;
pub mod pool;
pub mod rate_limited;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{FetchError, FetchResult};

pub use chrome::ChromeRenderer;
pub use http::HttpRenderer;
pub use pool::{BrowserLease, BrowserPool};
pub use rate_limited::{RateLimitedRenderer, RendererExt};

/// One render request.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: String,

    /// Hard deadline for the whole render
    pub timeout: Duration,

    /// Selector that must appear before the DOM is considered complete;
    /// lets JS-driven listings finish populating
    pub wait_for_selector: Option<String>,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(30),
            wait_for_selector: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for_selector = Some(selector.into());
        self
    }
}

/// A fully rendered page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub final_url: String,
    pub status_code: u16,
}

/// Renders a page to its post-script DOM.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, req: &RenderRequest) -> FetchResult<RenderedPage>;
}

/// Markers that indicate a bot-detection interstitial rather than content.
const BLOCK_MARKERS: [&str; 6] = [
    "captcha",
    "cf-chl",
    "cf-challenge",
    "are you a robot",
    "access denied",
    "unusual traffic",
];

/// Classify a response as blocked: 403, CAPTCHA markers, or an empty
/// body on a 200.
pub(crate) fn check_blocked(url: &str, status: u16, html: &str) -> FetchResult<()> {
    if status == 403 {
        return Err(FetchError::Blocked {
            url: url.to_string(),
            reason: "HTTP 403".to_string(),
        });
    }
    if status == 200 && html.trim().is_empty() {
        return Err(FetchError::Blocked {
            url: url.to_string(),
            reason: "empty body on 200".to_string(),
        });
    }
    let lowered = html.to_lowercase();
    if let Some(marker) = BLOCK_MARKERS.iter().find(|m| lowered.contains(**m)) {
        return Err(FetchError::Blocked {
            url: url.to_string(),
            reason: format!("block marker: {marker}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_403_is_blocked() {
        let err = check_blocked("https://a.example", 403, "<html>forbidden</html>").unwrap_err();
        assert!(matches!(err, FetchError::Blocked { .. }));
    }

    #[test]
    fn test_empty_200_is_blocked() {
        let err = check_blocked("https://a.example", 200, "   \n").unwrap_err();
        assert!(matches!(err, FetchError::Blocked { .. }));
    }

    #[test]
    fn test_captcha_marker_is_blocked() {
        let html = "<html><body>Please solve this CAPTCHA to continue</body></html>";
        let err = check_blocked("https://a.example", 200, html).unwrap_err();
        assert!(matches!(err, FetchError::Blocked { .. }));
    }

    #[test]
    fn test_ordinary_page_passes() {
        let html = "<html><body><div class=\"job\">Engineer</div></body></html>";
        assert!(check_blocked("https://a.example", 200, html).is_ok());
    }
}
