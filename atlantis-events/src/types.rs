//! Core types: the pin record, its category tags, time windows and viewports.
//!
//! Field names and enum spellings here are the wire contract shared with
//! every caller, so they serialize exactly as written.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// ISO calendar date format used on the wire.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One validated, geotagged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Identifier, unique within a generation batch.
    pub event_id: String,
    /// Short headline.
    pub title: String,
    /// Calendar date the event happened on.
    pub date: NaiveDate,
    /// Latitude in degrees, always within `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, always within `[-180, 180]`.
    pub lng: f64,
    /// Human-readable place name.
    pub location_label: String,
    /// Closed category tag.
    pub category: Category,
    /// How significant the event is, `[0, 1]`.
    pub significance_score: f64,
    /// One sentence preview.
    pub one_liner: String,
    /// How well-sourced the event is, `[0, 1]`.
    pub confidence: f64,
    /// Sentiment, `0` negative to `1` positive.
    pub positivity_scale: f64,
    /// Identifiers of related events, if the provider supplied any.
    #[serde(default)]
    pub related_event_ids: Option<Vec<String>>,
}

impl Pin {
    /// Returns a copy of this pin placed at new coordinates.
    ///
    /// Coordinates are clamped into their legal ranges. The label is replaced
    /// only when `label` is `Some`.
    #[must_use]
    pub fn relocated(&self, lat: f64, lng: f64, label: Option<&str>) -> Self {
        let mut pin = self.clone();
        pin.lat = clamp_lat(lat);
        pin.lng = clamp_lng(lng);
        if let Some(label) = label {
            pin.location_label = label.to_owned();
        }
        pin
    }

    /// True when the provider gave no usable coordinates.
    pub fn lacks_coordinates(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// Clamp a latitude into `[-90, 90]`. NaN becomes 0.
pub fn clamp_lat(lat: f64) -> f64 {
    if lat.is_nan() {
        0.0
    } else {
        lat.clamp(-90.0, 90.0)
    }
}

/// Clamp a longitude into `[-180, 180]`. NaN becomes 0.
pub fn clamp_lng(lng: f64) -> f64 {
    if lng.is_nan() {
        0.0
    } else {
        lng.clamp(-180.0, 180.0)
    }
}

/// Closed set of event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Politics,
    Conflict,
    Culture,
    Science,
    Economics,
    Other,
}

impl Category {
    /// Returns the wire spelling of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Politics => "politics",
            Self::Conflict => "conflict",
            Self::Culture => "culture",
            Self::Science => "science",
            Self::Economics => "economics",
            Self::Other => "other",
        }
    }

    /// Parse the exact wire spelling. Anything else is outside the set.
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.as_str() == value)
    }

    /// Returns all category variants.
    pub fn all() -> &'static [Category] {
        &[
            Self::Politics,
            Self::Conflict,
            Self::Culture,
            Self::Science,
            Self::Economics,
            Self::Other,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive `[start, end]` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    /// Build a window, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PipelineError> {
        if start > end {
            return Err(PipelineError::InvalidWindow(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds from `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, PipelineError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map_err(|e| PipelineError::InvalidWindow(format!("bad date {s:?}: {e}")))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// Inclusive containment.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Geographic rectangle (west, south, east, north) in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// Map viewport: bounding box plus zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bbox: BoundingBox,
    pub zoom: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).expect("valid date")
    }

    fn sample_pin() -> Pin {
        Pin {
            event_id: "evt_1".into(),
            title: "A".into(),
            date: day("2024-01-01"),
            lat: 10.0,
            lng: 20.0,
            location_label: "X".into(),
            category: Category::Politics,
            significance_score: 0.9,
            one_liner: "x".into(),
            confidence: 0.8,
            positivity_scale: 0.5,
            related_event_ids: None,
        }
    }

    #[test]
    fn pin_serializes_wire_field_names() {
        let json = serde_json::to_value(sample_pin()).expect("serialize");
        assert_eq!(json["event_id"], "evt_1");
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["category"], "politics");
        assert_eq!(json["positivity_scale"], 0.5);
        assert!(json["related_event_ids"].is_null());
    }

    #[test]
    fn pin_deserializes_without_related_ids() {
        let raw = r#"{"event_id":"evt_1","title":"A","date":"2024-01-01","lat":10,"lng":20,
            "location_label":"X","category":"politics","significance_score":0.9,
            "one_liner":"x","confidence":0.8,"positivity_scale":0.5}"#;
        let pin: Pin = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(pin, sample_pin());
    }

    #[test]
    fn relocated_clamps_coordinates() {
        let pin = sample_pin().relocated(123.0, -500.0, Some("Somewhere, Else"));
        assert_eq!(pin.lat, 90.0);
        assert_eq!(pin.lng, -180.0);
        assert_eq!(pin.location_label, "Somewhere, Else");
    }

    #[test]
    fn lacks_coordinates_only_when_both_zero() {
        assert!(sample_pin().relocated(0.0, 0.0, None).lacks_coordinates());
        assert!(!sample_pin().relocated(0.0, 1.0, None).lacks_coordinates());
    }

    #[test]
    fn category_parse_is_exact() {
        assert_eq!(Category::parse("science"), Some(Category::Science));
        assert_eq!(Category::parse("Science"), None);
        assert_eq!(Category::parse("sports"), None);
        assert_eq!(Category::all().len(), 6);
    }

    #[test]
    fn window_rejects_reversed_bounds() {
        let err = TimeWindow::parse("2024-02-01", "2024-01-01").unwrap_err();
        assert!(err.to_string().contains("after"));
    }

    #[test]
    fn window_rejects_unparseable_bound() {
        assert!(TimeWindow::parse("yesterday", "2024-01-01").is_err());
    }

    #[test]
    fn window_contains_is_inclusive() {
        let window = TimeWindow::parse("2024-01-01", "2024-01-03").expect("window");
        assert!(window.contains(day("2024-01-01")));
        assert!(window.contains(day("2024-01-03")));
        assert!(!window.contains(day("2023-12-31")));
        assert!(!window.contains(day("2024-01-04")));
    }
}
