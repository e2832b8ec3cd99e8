//! Rate-limited renderer wrapper.
//!
//! Wraps any renderer with request pacing via the governor crate, so
//! sustained crawls stay polite to the target sites.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::render::{PageRenderer, RenderRequest, RenderedPage};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A renderer wrapper that enforces a request rate.
pub struct RateLimitedRenderer<R: PageRenderer> {
    inner: R,
    limiter: Arc<DefaultRateLimiter>,
}

impl<R: PageRenderer> RateLimitedRenderer<R> {
    /// Wrap a renderer with a sustained requests-per-second limit.
    pub fn new(renderer: R, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        );
        Self {
            inner: renderer,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wrap with burst support.
    pub fn with_burst(renderer: R, requests_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        )
        .allow_burst(NonZeroU32::new(burst).expect("burst must be > 0"));

        Self {
            inner: renderer,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<R: PageRenderer> PageRenderer for RateLimitedRenderer<R> {
    async fn render(&self, req: &RenderRequest) -> FetchResult<RenderedPage> {
        self.limiter.until_ready().await;
        self.inner.render(req).await
    }
}

/// Extension trait for easy rate limiting.
pub trait RendererExt: PageRenderer + Sized {
    /// Wrap this renderer with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedRenderer<Self> {
        RateLimitedRenderer::new(self, requests_per_second)
    }

    /// Wrap with rate limiting and burst support.
    fn rate_limited_with_burst(
        self,
        requests_per_second: u32,
        burst: u32,
    ) -> RateLimitedRenderer<Self> {
        RateLimitedRenderer::with_burst(self, requests_per_second, burst)
    }
}

impl<R: PageRenderer + Sized> RendererExt for R {}
