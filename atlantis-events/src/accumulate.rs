//! Per-(window, language) accumulation of pins across queries.
//!
//! Every extraction and every exact-query cache hit is folded into one
//! growing set per time window and language, deduplicated by identifier.
//! The set ignores geography, so pins discovered through different
//! viewports over the same period converge.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::cache::TemporalGeoCache;
use crate::key::AccumulationKey;
use crate::types::{Pin, TimeWindow};

/// Keep the first pin for each identifier, preserving order.
pub fn dedup_by_identifier(pins: impl IntoIterator<Item = Pin>) -> Vec<Pin> {
    let mut seen = HashSet::new();
    pins.into_iter()
        .filter(|pin| seen.insert(pin.event_id.clone()))
        .collect()
}

/// Union of `existing` and `incoming`, existing pins first.
///
/// On an identifier conflict the earlier pin wins, so a merge never
/// replaces what is already accumulated.
pub fn merge_pins(existing: &[Pin], incoming: &[Pin]) -> Vec<Pin> {
    dedup_by_identifier(existing.iter().chain(incoming).cloned())
}

/// Folds new pins into the shared accumulation set.
#[derive(Clone)]
pub struct AccumulationMerger {
    cache: TemporalGeoCache,
}

impl AccumulationMerger {
    pub fn new(cache: TemporalGeoCache) -> Self {
        Self { cache }
    }

    /// Merge `incoming` into the set for `(window, language)` and return the union.
    ///
    /// The read-modify-write is serialized per key, and the entry's TTL is
    /// refreshed. An expired set counts as empty.
    pub async fn merge(
        &self,
        window: &TimeWindow,
        language: &str,
        incoming: &[Pin],
    ) -> Arc<Vec<Pin>> {
        let key = AccumulationKey::new(window, language);
        let ttl = self.cache.config().accumulation_ttl();
        let merged = self
            .cache
            .update_pins(&key.digest(), ttl, |current| {
                let existing = current.as_deref().map_or(&[][..], Vec::as_slice);
                merge_pins(existing, incoming)
            })
            .await;
        debug!(
            window = %window,
            language,
            incoming = incoming.len(),
            total = merged.len(),
            "merged into accumulation set"
        );
        merged
    }

    /// Current accumulated set, empty if absent or expired.
    pub async fn current(&self, window: &TimeWindow, language: &str) -> Arc<Vec<Pin>> {
        let key = AccumulationKey::new(window, language);
        self.cache
            .get_pins(&key.digest())
            .await
            .unwrap_or_default()
    }
}
