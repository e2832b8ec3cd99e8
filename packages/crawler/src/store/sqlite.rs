//! SQLite pattern store.
//!
//! File-based persistence so learned patterns survive process restarts,
//! which keeps cold-start learning a once-per-domain cost.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Row};
use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};
use crate::store::PatternStore;
use crate::types::pattern::{FieldSelector, JobField, SitePattern};

/// SQLite-backed pattern store.
pub struct SqlitePatternStore {
    pool: SqlitePool,
}

impl SqlitePatternStore {
    /// Open (and migrate) a store at the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - ephemeral, for tests
    /// - `sqlite:patterns.db?mode=rwc` - file, created if missing
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(Box::new(e)))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS site_patterns (
                domain TEXT PRIMARY KEY,
                site_name TEXT NOT NULL,
                list_page_pattern TEXT NOT NULL,
                detail_page_pattern TEXT,
                card_selector TEXT NOT NULL,
                selectors TEXT NOT NULL DEFAULT '{}',
                confidence REAL NOT NULL,
                created_at TEXT NOT NULL,
                last_updated TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(Box::new(e)))?;

        Ok(())
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct PatternRow {
    domain: String,
    site_name: String,
    list_page_pattern: String,
    detail_page_pattern: Option<String>,
    card_selector: String,
    selectors: String,
    confidence: f64,
    created_at: String,
    last_updated: String,
}

impl PatternRow {
    fn into_pattern(self) -> StoreResult<SitePattern> {
        let selectors: BTreeMap<JobField, FieldSelector> = serde_json::from_str(&self.selectors)?;
        Ok(SitePattern {
            domain: self.domain,
            site_name: self.site_name,
            list_page_pattern: self.list_page_pattern,
            detail_page_pattern: self.detail_page_pattern,
            card_selector: self.card_selector,
            selectors,
            confidence: self.confidence as f32,
            created_at: parse_timestamp(&self.created_at)?,
            last_updated: parse_timestamp(&self.last_updated)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(Box::new(e)))
}

#[async_trait]
impl PatternStore for SqlitePatternStore {
    async fn get(&self, domain: &str) -> StoreResult<Option<SitePattern>> {
        let row: Option<PatternRow> =
            sqlx::query_as("SELECT * FROM site_patterns WHERE domain = ?")
                .bind(domain)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(Box::new(e)))?;

        row.map(PatternRow::into_pattern).transpose()
    }

    async fn save(&self, pattern: &SitePattern) -> StoreResult<()> {
        let selectors = serde_json::to_string(&pattern.selectors)?;

        // Single-statement upsert: concurrent same-domain writers cannot
        // interleave a partial record, last write wins.
        sqlx::query(
            r#"
            INSERT INTO site_patterns
                (domain, site_name, list_page_pattern, detail_page_pattern,
                 card_selector, selectors, confidence, created_at, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(domain) DO UPDATE SET
                site_name = excluded.site_name,
                list_page_pattern = excluded.list_page_pattern,
                detail_page_pattern = excluded.detail_page_pattern,
                card_selector = excluded.card_selector,
                selectors = excluded.selectors,
                confidence = excluded.confidence,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&pattern.domain)
        .bind(&pattern.site_name)
        .bind(&pattern.list_page_pattern)
        .bind(&pattern.detail_page_pattern)
        .bind(&pattern.card_selector)
        .bind(selectors)
        .bind(pattern.confidence as f64)
        .bind(pattern.created_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(Box::new(e)))?;

        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<SitePattern>> {
        let rows: Vec<PatternRow> =
            sqlx::query_as("SELECT * FROM site_patterns ORDER BY domain")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(Box::new(e)))?;

        rows.into_iter().map(PatternRow::into_pattern).collect()
    }

    async fn delete(&self, domain: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM site_patterns WHERE domain = ?")
            .bind(domain)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(Box::new(e)))?;
        Ok(())
    }
}

/// Count stored patterns; used by operational tooling.
pub async fn pattern_count(store: &SqlitePatternStore) -> StoreResult<u64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM site_patterns")
        .fetch_one(store.pool())
        .await
        .map_err(|e| StoreError::Backend(Box::new(e)))?;
    let n: i64 = row.get("n");
    Ok(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pattern::{FieldSelector, JobField};

    fn pattern(domain: &str) -> SitePattern {
        SitePattern::new(domain, format!("https://{domain}/jobs?page={{page}}"))
            .with_card_selector("div.card")
            .with_selector(JobField::Title, FieldSelector::text("h2 > a"))
            .with_selector(
                JobField::DetailLink,
                FieldSelector::attribute("h2 > a", "href"),
            )
            .with_confidence(0.8)
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_selectors() {
        let store = SqlitePatternStore::in_memory().await.unwrap();

        store.save(&pattern("a.example.com")).await.unwrap();
        let loaded = store.get("a.example.com").await.unwrap().unwrap();

        assert_eq!(loaded.domain, "a.example.com");
        assert_eq!(loaded.card_selector, "div.card");
        assert_eq!(loaded.selectors.len(), 2);
        assert_eq!(
            loaded.selectors[&JobField::DetailLink].attribute.as_deref(),
            Some("href")
        );
        assert!((loaded.confidence - 0.8).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_touches_timestamp() {
        let store = SqlitePatternStore::in_memory().await.unwrap();

        store.save(&pattern("a.example.com")).await.unwrap();
        let first = store.get("a.example.com").await.unwrap().unwrap();

        let updated = pattern("a.example.com").with_card_selector("li.job");
        store.save(&updated).await.unwrap();

        let second = store.get("a.example.com").await.unwrap().unwrap();
        assert_eq!(second.card_selector, "li.job");
        assert!(second.last_updated >= first.last_updated);
        assert_eq!(pattern_count(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_none() {
        let store = SqlitePatternStore::in_memory().await.unwrap();
        store.save(&pattern("a.example.com")).await.unwrap();
        store.delete("a.example.com").await.unwrap();
        assert!(store.get("a.example.com").await.unwrap().is_none());
    }
}
