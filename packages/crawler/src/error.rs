//! Typed errors for the crawler library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors raised by the fetch/render layer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No response within the configured timeout
    #[error("timeout rendering {url} after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Bot detection: 403, CAPTCHA markers, or an empty body on 200
    #[error("blocked fetching {url}: {reason}")]
    Blocked { url: String, reason: String },

    /// Non-success HTTP status (other than 403, which maps to Blocked)
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Network-level failure (connection, TLS, DNS)
    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Browser process failure (launch, tab creation, protocol)
    #[error("browser error: {0}")]
    Browser(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised while learning a site pattern.
///
/// `Aborted` means the site could not even be loaded; `LowConfidence`
/// means it loaded but no confident pattern emerged. Callers must be able
/// to tell the two apart.
#[derive(Debug, Error)]
pub enum LearnError {
    /// Render failed during learning; the site could not be loaded
    #[error("learning aborted, could not load page: {0}")]
    Aborted(#[from] FetchError),

    /// Confidence stayed below threshold after all probe strategies
    #[error("confidence {confidence:.2} below threshold {threshold:.2} for {url}")]
    LowConfidence {
        url: String,
        confidence: f32,
        threshold: f32,
    },
}

/// Errors raised by pattern store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing storage failed
    #[error("storage error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored pattern could not be (de)serialized
    #[error("pattern serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by a site crawl, and by extension the orchestrator's
/// per-site error slots.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("pattern learning failed: {0}")]
    Learn(#[from] LearnError),

    #[error("pattern store failed: {0}")]
    Store(#[from] StoreError),

    /// An established pattern stopped matching and relearning did not
    /// recover a working one
    #[error("site layout drift unrecovered for {domain}")]
    DriftUnrecovered { domain: String },

    /// The orchestrator wall-clock budget expired before this site finished
    #[error("crawl of {domain} exceeded budget of {budget_ms}ms")]
    Timeout { domain: String, budget_ms: u64 },
}

impl CrawlError {
    /// Whether this error is a timeout of some kind (render, learning
    /// render, or budget).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CrawlError::Timeout { .. }
                | CrawlError::Fetch(FetchError::Timeout { .. })
                | CrawlError::Learn(LearnError::Aborted(FetchError::Timeout { .. }))
        )
    }
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for learning operations.
pub type LearnResult<T> = std::result::Result<T, LearnError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for crawl operations.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;
