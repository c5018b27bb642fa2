//! Cache configuration with sensible defaults.
//!
//! [`CacheConfig`] controls the three TTLs used by callers of
//! [`TemporalGeoCache`](crate::cache::TemporalGeoCache) and its capacity bound.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Configuration for the pin and explanation cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for per-viewport pin lists (exact query hits).
    pub pins_ttl_seconds: u64,
    /// TTL for cached explanation text.
    pub explanation_ttl_seconds: u64,
    /// TTL for the accumulated per-(window, language) pin set.
    /// Refreshed on every merge.
    pub accumulation_ttl_seconds: u64,
    /// Upper bound on live entries across all namespaces.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pins_ttl_seconds: 60 * 60,
            explanation_ttl_seconds: 12 * 60 * 60,
            accumulation_ttl_seconds: 12 * 60 * 60,
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Every TTL and the capacity must be greater than zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.pins_ttl_seconds == 0 {
            return Err(PipelineError::Config(
                "pins_ttl_seconds must be greater than 0".into(),
            ));
        }
        if self.explanation_ttl_seconds == 0 {
            return Err(PipelineError::Config(
                "explanation_ttl_seconds must be greater than 0".into(),
            ));
        }
        if self.accumulation_ttl_seconds == 0 {
            return Err(PipelineError::Config(
                "accumulation_ttl_seconds must be greater than 0".into(),
            ));
        }
        if self.max_entries == 0 {
            return Err(PipelineError::Config(
                "max_entries must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Short TTL for per-viewport pin lists.
    pub fn pins_ttl(&self) -> Duration {
        Duration::from_secs(self.pins_ttl_seconds)
    }

    /// Long TTL for explanation text.
    pub fn explanation_ttl(&self) -> Duration {
        Duration::from_secs(self.explanation_ttl_seconds)
    }

    /// TTL applied to the accumulation entry on every merge.
    pub fn accumulation_ttl(&self) -> Duration {
        Duration::from_secs(self.accumulation_ttl_seconds)
    }
}
