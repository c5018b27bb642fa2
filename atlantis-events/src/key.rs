//! Canonical cache keys.
//!
//! Each key serializes its fields in one fixed order into a canonical string
//! and hashes that with SHA-256. Floating-point noise is removed before
//! serialization: bounding-box edges are rounded to one decimal degree and
//! zoom is truncated to an integer, so near-identical viewports share a key.
//! Every digest carries a namespace prefix so the three key kinds can never
//! collide in the shared store.

use sha2::{Digest, Sha256};

use crate::types::{TimeWindow, Viewport};

/// Fine-grained key for an exact repeat query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    window: TimeWindow,
    /// Edges (west, south, east, north) in tenths of a degree.
    bbox_tenths: [i64; 4],
    zoom_bucket: i64,
    language: String,
    limit: usize,
}

impl QueryKey {
    pub fn new(window: &TimeWindow, viewport: &Viewport, language: &str, limit: usize) -> Self {
        let b = viewport.bbox;
        Self {
            window: *window,
            bbox_tenths: [b.west, b.south, b.east, b.north].map(tenths),
            zoom_bucket: if viewport.zoom.is_finite() {
                viewport.zoom.trunc() as i64
            } else {
                0
            },
            language: normalize_language(language),
            limit,
        }
    }

    /// Fixed-order textual form of the key.
    pub fn canonical(&self) -> String {
        let [w, s, e, n] = self.bbox_tenths;
        format!(
            "{}|{}|{},{},{},{}|{}|{}|{}",
            self.window.start,
            self.window.end,
            w,
            s,
            e,
            n,
            self.zoom_bucket,
            self.language,
            self.limit
        )
    }

    pub fn digest(&self) -> String {
        hashed("pins", &self.canonical())
    }
}

/// Coarse key for the per-(window, language) accumulated set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccumulationKey {
    window: TimeWindow,
    language: String,
}

impl AccumulationKey {
    pub fn new(window: &TimeWindow, language: &str) -> Self {
        Self {
            window: *window,
            language: normalize_language(language),
        }
    }

    pub fn canonical(&self) -> String {
        format!("{}|{}|{}", self.window.start, self.window.end, self.language)
    }

    pub fn digest(&self) -> String {
        hashed("accum", &self.canonical())
    }
}

/// Key for cached explanation text of one event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExplanationKey {
    event_id: String,
    language: String,
}

impl ExplanationKey {
    pub fn new(event_id: &str, language: &str) -> Self {
        Self {
            event_id: event_id.trim().to_owned(),
            language: normalize_language(language),
        }
    }

    pub fn canonical(&self) -> String {
        format!("{}|{}", self.event_id, self.language)
    }

    pub fn digest(&self) -> String {
        hashed("explain", &self.canonical())
    }
}

/// Lowercased, trimmed language code.
pub fn normalize_language(language: &str) -> String {
    language.trim().to_lowercase()
}

fn tenths(degrees: f64) -> i64 {
    if degrees.is_finite() {
        (degrees * 10.0).round() as i64
    } else {
        0
    }
}

fn hashed(namespace: &str, canonical: &str) -> String {
    format!("{namespace}:{:x}", Sha256::digest(canonical.as_bytes()))
}
