//! # atlantis-events
//!
//! Turns free-text generations that are supposed to contain geotagged event
//! records into validated [`Pin`]s, and keeps a time-windowed cache of them.
//!
//! ## Design
//!
//! - Extraction never fails: fences and prose are stripped, truncated output
//!   is repaired, and unparseable text falls back to pattern recovery
//! - Every record is schema-checked; bad records are dropped and counted,
//!   never clamped into validity
//! - An explicit [`TemporalGeoCache`] handle answers exact repeat queries
//! - An [`AccumulationMerger`] grows one deduplicated set per time window and
//!   language, serializing concurrent merges per key
//!
//! ## Example
//!
//! ```
//! let raw = "```json\n[{\"event_id\": \"evt_1\", \"title\": \"A\", \"date\": \"2024-01-01\",
//!   \"lat\": 10, \"lng\": 20, \"location_label\": \"X\", \"category\": \"politics\",
//!   \"significance_score\": 0.9, \"one_liner\": \"x\", \"confidence\": 0.8,
//!   \"positivity_scale\": 0.5}, {\"event_id\": \"evt_2\", \"title\": \"B";
//! let extraction = atlantis_events::extract_pins(raw, None);
//! assert_eq!(extraction.pins.len(), 1);
//! assert_eq!(extraction.pins[0].event_id, "evt_1");
//! ```

pub mod accumulate;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod key;
pub mod types;

pub use accumulate::AccumulationMerger;
pub use cache::{CachedValue, TemporalGeoCache};
pub use config::CacheConfig;
pub use error::{PipelineError, Result};
pub use extract::{extract_pins, Extraction, ExtractionMethod, ExtractionReport};
pub use key::{AccumulationKey, ExplanationKey, QueryKey};
pub use types::{BoundingBox, Category, Pin, TimeWindow, Viewport};
