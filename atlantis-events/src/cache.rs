//! TTL cache for pin lists and explanation text.
//!
//! Backed by [`moka`] with a per-entry expiry policy: each entry carries its
//! own TTL, chosen by the caller at `set` time. Expired entries are never
//! returned and never come back; only a fresh `set` creates a live entry
//! again. The cache is an explicit handle constructed once and cloned to
//! every caller. Clones share storage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::ops::compute::Op;
use moka::Expiry;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::PipelineError;
use crate::types::Pin;

/// A cached value: a pin list or a text blob.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Pins(Arc<Vec<Pin>>),
    Text(Arc<str>),
}

impl CachedValue {
    pub fn into_pins(self) -> Option<Arc<Vec<Pin>>> {
        match self {
            Self::Pins(pins) => Some(pins),
            Self::Text(_) => None,
        }
    }

    pub fn into_text(self) -> Option<Arc<str>> {
        match self {
            Self::Text(text) => Some(text),
            Self::Pins(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: CachedValue,
    ttl: Duration,
}

/// Expires each entry `ttl` after it was last written. Reads do not extend it.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Shared TTL store keyed by canonical key digests.
#[derive(Clone)]
pub struct TemporalGeoCache {
    inner: Cache<String, Entry>,
    config: Arc<CacheConfig>,
}

impl TemporalGeoCache {
    /// Build a cache from a validated configuration.
    pub fn new(config: CacheConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let inner = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the live value under `key`, or `None` if absent or expired.
    pub async fn get(&self, key: &str) -> Option<CachedValue> {
        self.inner.get(key).await.map(|entry| entry.value)
    }

    /// Store `value` under `key`, live for `ttl` from now.
    pub async fn set(&self, key: impl Into<String>, value: CachedValue, ttl: Duration) {
        self.inner.insert(key.into(), Entry { value, ttl }).await;
    }

    pub async fn get_pins(&self, key: &str) -> Option<Arc<Vec<Pin>>> {
        self.get(key).await.and_then(CachedValue::into_pins)
    }

    pub async fn set_pins(&self, key: impl Into<String>, pins: Vec<Pin>, ttl: Duration) {
        self.set(key, CachedValue::Pins(Arc::new(pins)), ttl).await;
    }

    pub async fn get_explanation(&self, key: &str) -> Option<Arc<str>> {
        self.get(key).await.and_then(CachedValue::into_text)
    }

    pub async fn set_explanation(&self, key: impl Into<String>, text: &str, ttl: Duration) {
        self.set(key, CachedValue::Text(Arc::from(text)), ttl).await;
    }

    /// Atomically replace the pin list under `key` with `f(current)`.
    ///
    /// Calls for the same key are serialized, so concurrent updates never
    /// lose each other's writes. `current` is `None` when the entry is absent
    /// or expired. The new value is live for `ttl` and is returned.
    pub async fn update_pins<F>(&self, key: &str, ttl: Duration, f: F) -> Arc<Vec<Pin>>
    where
        F: FnOnce(Option<Arc<Vec<Pin>>>) -> Vec<Pin>,
    {
        let result = self
            .inner
            .entry(key.to_owned())
            .and_compute_with(|current| {
                let current = current.and_then(|e| e.into_value().value.into_pins());
                let next = CachedValue::Pins(Arc::new(f(current)));
                std::future::ready(Op::Put(Entry { value: next, ttl }))
            })
            .await;

        match result.into_entry().map(|e| e.into_value().value) {
            Some(CachedValue::Pins(pins)) => pins,
            _ => Arc::new(Vec::new()),
        }
    }

    /// Purge expired entries and apply pending evictions.
    pub async fn cleanup(&self) {
        self.inner.run_pending_tasks().await;
        debug!(entries = self.inner.entry_count(), "cache cleanup");
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    /// Approximate number of live entries. Exact after [`cleanup`](Self::cleanup).
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::types::Category;

    fn pin(id: &str) -> Pin {
        Pin {
            event_id: id.into(),
            title: "A".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
            lat: 1.0,
            lng: 2.0,
            location_label: "X".into(),
            category: Category::Science,
            significance_score: 0.5,
            one_liner: "x".into(),
            confidence: 0.5,
            positivity_scale: 0.5,
            related_event_ids: None,
        }
    }

    fn cache() -> TemporalGeoCache {
        TemporalGeoCache::new(CacheConfig::default()).expect("cache")
    }

    #[test]
    fn rejects_invalid_config() {
        let config = CacheConfig {
            max_entries: 0,
            ..CacheConfig::default()
        };
        assert!(TemporalGeoCache::new(config).is_err());
    }

    #[tokio::test]
    async fn miss_returns_none() {
        assert!(cache().get("pins:nothing").await.is_none());
    }

    #[tokio::test]
    async fn set_then_get_before_expiry() {
        let cache = cache();
        cache
            .set_pins("pins:a", vec![pin("evt_1")], Duration::from_secs(30))
            .await;
        let pins = cache.get_pins("pins:a").await.expect("hit");
        assert_eq!(pins[0].event_id, "evt_1");
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let cache = cache();
        cache
            .set_explanation("explain:a", "text", Duration::from_millis(200))
            .await;
        assert_eq!(cache.get_explanation("explain:a").await.as_deref(), Some("text"));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(cache.get("explain:a").await.is_none());
        assert!(cache.get("explain:a").await.is_none(), "never resurrected");
    }

    #[tokio::test]
    async fn fresh_set_after_expiry_is_live() {
        let cache = cache();
        cache
            .set_explanation("explain:a", "old", Duration::from_millis(100))
            .await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(cache.get("explain:a").await.is_none());

        cache
            .set_explanation("explain:a", "new", Duration::from_secs(30))
            .await;
        assert_eq!(cache.get_explanation("explain:a").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn per_entry_ttls_are_independent() {
        let cache = cache();
        cache.set_pins("short", vec![], Duration::from_millis(100)).await;
        cache.set_pins("long", vec![], Duration::from_secs(30)).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(cache.get("short").await.is_none());
        assert!(cache.get("long").await.is_some());
    }

    #[tokio::test]
    async fn typed_getters_ignore_other_kind() {
        let cache = cache();
        cache.set_explanation("k", "text", Duration::from_secs(30)).await;
        assert!(cache.get_pins("k").await.is_none());
        assert!(cache.get_explanation("k").await.is_some());
    }

    #[tokio::test]
    async fn update_pins_sees_current_value() {
        let cache = cache();
        let ttl = Duration::from_secs(30);
        let first = cache
            .update_pins("accum:a", ttl, |current| {
                assert!(current.is_none());
                vec![pin("evt_1")]
            })
            .await;
        assert_eq!(first.len(), 1);

        let second = cache
            .update_pins("accum:a", ttl, |current| {
                let mut pins = current.map(|p| p.as_ref().clone()).unwrap_or_default();
                pins.push(pin("evt_2"));
                pins
            })
            .await;
        assert_eq!(second.len(), 2);
        assert_eq!(cache.get_pins("accum:a").await.expect("hit").len(), 2);
    }

    #[tokio::test]
    async fn cleanup_and_clear() {
        let cache = cache();
        cache.set_pins("a", vec![], Duration::from_millis(50)).await;
        cache.set_pins("b", vec![], Duration::from_secs(30)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        cache.cleanup().await;
        assert_eq!(cache.entry_count(), 1);

        cache.clear().await;
        assert_eq!(cache.entry_count(), 0);
        assert!(cache.get("b").await.is_none());
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let a = cache();
        let b = a.clone();
        a.set_explanation("k", "v", Duration::from_secs(30)).await;
        assert!(b.get("k").await.is_some());
    }
}
