//! Pattern persistence.
//!
//! The store is an explicit injected interface, not an ambient cache, so
//! tests can substitute an in-memory fake. Backends:
//! - [`MemoryPatternStore`]: process memory, for tests and development
//! - [`SqlitePatternStore`]: durable across restarts (feature `sqlite`)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::pattern::SitePattern;

pub use memory::MemoryPatternStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePatternStore;

/// Durable mapping from site domain to learned extraction pattern.
///
/// Writes are keyed by domain; last-write-wins is acceptable because
/// patterns are idempotently re-derivable. Reads must be safe under
/// concurrent crawls.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Look up the pattern for a domain.
    async fn get(&self, domain: &str) -> StoreResult<Option<SitePattern>>;

    /// Insert or replace the pattern for `pattern.domain`.
    async fn save(&self, pattern: &SitePattern) -> StoreResult<()>;

    /// All stored patterns.
    async fn list(&self) -> StoreResult<Vec<SitePattern>>;

    /// Remove a domain's pattern. Removing an absent domain is a no-op.
    async fn delete(&self, domain: &str) -> StoreResult<()>;
}
