//! Bounded pool of headless browser processes.
//!
//! Browser startup is expensive and leaked processes are the classic
//! failure mode under sustained crawling, so acquisition is scoped: a
//! [`BrowserLease`] returns its browser to the pool on `Drop`, whichever
//! exit path (success, error, panic during a blocking render) releases it.

use headless_chrome::{Browser, LaunchOptions};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::{FetchError, FetchResult};

/// Pool of at most `capacity` concurrently leased browsers.
///
/// Browsers are launched lazily on first demand and reused afterwards.
pub struct BrowserPool {
    semaphore: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<Browser>>>,
    capacity: usize,
    idle_timeout: Duration,
}

impl BrowserPool {
    /// Create a pool with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            idle: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
            capacity,
            idle_timeout: Duration::from_secs(300),
        }
    }

    /// How long a pooled browser may sit idle before Chrome exits itself.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Browsers currently parked in the pool.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().len()
    }

    /// Acquire a browser, waiting for a slot if the pool is saturated.
    pub async fn acquire(&self) -> FetchResult<BrowserLease> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("browser pool semaphore never closes");

        let parked = self.idle.lock().unwrap().pop();
        let browser = match parked {
            Some(browser) => browser,
            None => {
                debug!(capacity = self.capacity, "launching pooled browser");
                launch_browser(self.idle_timeout).await?
            }
        };

        Ok(BrowserLease {
            browser: Some(browser),
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }
}

/// A scoped browser acquisition. Dropping the lease returns the browser
/// to the pool and frees the concurrency slot.
pub struct BrowserLease {
    browser: Option<Browser>,
    idle: Arc<Mutex<Vec<Browser>>>,
    _permit: OwnedSemaphorePermit,
}

impl BrowserLease {
    pub fn browser(&self) -> &Browser {
        self.browser.as_ref().expect("lease holds a browser until drop")
    }
}

impl Drop for BrowserLease {
    fn drop(&mut self) {
        if let Some(browser) = self.browser.take() {
            self.idle.lock().unwrap().push(browser);
        }
        // _permit drops after the browser is parked, so a waiter always
        // finds it in the idle list
    }
}

async fn launch_browser(idle_timeout: Duration) -> FetchResult<Browser> {
    tokio::task::spawn_blocking(move || {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .idle_browser_timeout(idle_timeout)
            .build()
            .map_err(|e| FetchError::Browser(e.to_string().into()))?;
        Browser::new(options).map_err(|e| FetchError::Browser(e.into()))
    })
    .await
    .map_err(|e| FetchError::Browser(Box::new(e)))?
}
