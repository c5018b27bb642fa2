//! Collaborator traits: the generation provider and the geocoder.
//!
//! The service never builds prompts or talks to the network itself. It hands
//! a fully normalized [`GenerationRequest`] to a [`GenerationProvider`] and
//! consumes the raw text that comes back; pins without coordinates are
//! resolved through a [`Geocoder`].

use async_trait::async_trait;
use atlantis_events::{BoundingBox, Pin, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Whether the request targets the visible area or the whole world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    /// Zoomed in: events inside the bounding box.
    Local,
    /// Zoomed out: globally significant events.
    Global,
}

/// Which attempt this request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attempt {
    First,
    /// The previous answer had no recoverable structure; ask for strict JSON.
    Retry,
}

/// Parameters handed to the generation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub window: TimeWindow,
    pub bbox: BoundingBox,
    pub zoom: f64,
    pub language: String,
    pub max_pins: usize,
    pub focus: Focus,
    pub max_output_tokens: u32,
    pub attempt: Attempt,
}

impl GenerationRequest {
    /// Same request, marked as the retry attempt.
    #[must_use]
    pub fn retry(&self) -> Self {
        Self {
            attempt: Attempt::Retry,
            ..self.clone()
        }
    }
}

/// A geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub lat: f64,
    pub lng: f64,
    pub display_name: Option<String>,
}

/// Source of raw generated text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Human-readable provider name, for logs.
    fn name(&self) -> &str;

    /// Generate raw text expected to contain a pin document.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Generate explanatory prose about one pin.
    async fn explain(&self, pin: &Pin, language: &str) -> Result<String>;
}

/// Resolves free-text place names to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns `None` when the place is unknown.
    async fn geocode(&self, place: &str) -> Result<Option<GeocodedPlace>>;
}

/// Geocoder that never resolves anything.
pub struct NoGeocoder;

#[async_trait]
impl Geocoder for NoGeocoder {
    async fn geocode(&self, _place: &str) -> Result<Option<GeocodedPlace>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            window: TimeWindow::parse("2024-01-01", "2024-01-03").unwrap(),
            bbox: BoundingBox {
                west: -10.0,
                south: 35.0,
                east: 30.0,
                north: 60.0,
            },
            zoom: 4.0,
            language: "en".into(),
            max_pins: 8,
            focus: Focus::Global,
            max_output_tokens: 4800,
            attempt: Attempt::First,
        }
    }

    #[test]
    fn retry_only_changes_attempt() {
        let first = request();
        let retry = first.retry();
        assert_eq!(retry.attempt, Attempt::Retry);
        assert_eq!(GenerationRequest { attempt: Attempt::First, ..retry }, first);
    }

    #[test]
    fn request_serializes_lowercase_enums() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["focus"], "global");
        assert_eq!(json["attempt"], "first");
        assert_eq!(json["window"]["start"], "2024-01-01");
    }

    #[tokio::test]
    async fn no_geocoder_resolves_nothing() {
        assert!(NoGeocoder.geocode("Paris").await.unwrap().is_none());
    }
}
