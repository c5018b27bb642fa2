//! Per-record schema validation and time-window filtering.
//!
//! Each candidate yields a [`RecordOutcome`]: an accepted [`Pin`] or a
//! [`Rejection`] naming why it was dropped. Rejections never fail the batch;
//! they are counted in [`RejectionCounts`] so callers can see how much of a
//! generation was discarded.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{clamp_lat, clamp_lng, Category, Pin, TimeWindow, DATE_FORMAT};

/// Field names every record must carry. Coordinates are optional: a record
/// without them is kept at 0/0 and left for geocoding.
pub const REQUIRED_FIELDS: [&str; 9] = [
    "event_id",
    "title",
    "date",
    "location_label",
    "category",
    "significance_score",
    "one_liner",
    "confidence",
    "positivity_scale",
];

const SCORE_FIELDS: [&str; 3] = ["significance_score", "confidence", "positivity_scale"];

/// Why a candidate record was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The candidate is not a JSON object.
    NotAnObject,
    /// A required field is absent, null, or an empty identifier.
    MissingField(&'static str),
    /// A field has the wrong basic JSON type.
    WrongType(&'static str),
    /// `category` is outside the closed set.
    UnknownCategory(String),
    /// A score lies outside `[0, 1]`. Scores are never clamped.
    ScoreOutOfRange { field: &'static str, value: f64 },
    /// The date does not parse and no window is active.
    InvalidDate(String),
    /// The date is outside the active window, or does not parse while one is active.
    OutsideWindow(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "record is not an object"),
            Self::MissingField(field) => write!(f, "missing field {field}"),
            Self::WrongType(field) => write!(f, "wrong type for {field}"),
            Self::UnknownCategory(c) => write!(f, "unknown category {c:?}"),
            Self::ScoreOutOfRange { field, value } => {
                write!(f, "{field} {value} outside [0, 1]")
            }
            Self::InvalidDate(d) => write!(f, "unparseable date {d:?}"),
            Self::OutsideWindow(d) => write!(f, "date {d:?} outside requested window"),
        }
    }
}

/// Result of validating one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Accepted(Pin),
    Rejected(Rejection),
}

/// Rejected-record counters, one per [`Rejection`] kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    pub not_an_object: usize,
    pub missing_field: usize,
    pub wrong_type: usize,
    pub unknown_category: usize,
    pub score_out_of_range: usize,
    pub invalid_date: usize,
    pub outside_window: usize,
}

impl RejectionCounts {
    pub fn record(&mut self, rejection: &Rejection) {
        let slot = match rejection {
            Rejection::NotAnObject => &mut self.not_an_object,
            Rejection::MissingField(_) => &mut self.missing_field,
            Rejection::WrongType(_) => &mut self.wrong_type,
            Rejection::UnknownCategory(_) => &mut self.unknown_category,
            Rejection::ScoreOutOfRange { .. } => &mut self.score_out_of_range,
            Rejection::InvalidDate(_) => &mut self.invalid_date,
            Rejection::OutsideWindow(_) => &mut self.outside_window,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.not_an_object
            + self.missing_field
            + self.wrong_type
            + self.unknown_category
            + self.score_out_of_range
            + self.invalid_date
            + self.outside_window
    }
}

/// Survivors of a validated batch plus what was dropped.
#[derive(Debug, Clone, Default)]
pub struct ValidatedBatch {
    pub pins: Vec<Pin>,
    pub rejected: RejectionCounts,
    /// Valid records dropped because an earlier record had the same id.
    pub duplicates: usize,
}

/// Validate a single candidate record.
pub fn validate_record(candidate: &Value, window: Option<&TimeWindow>) -> RecordOutcome {
    match build_pin(candidate, window) {
        Ok(pin) => RecordOutcome::Accepted(pin),
        Err(rejection) => RecordOutcome::Rejected(rejection),
    }
}

/// Validate a batch, keeping the first record for each identifier.
pub fn validate_records(candidates: Vec<Value>, window: Option<&TimeWindow>) -> ValidatedBatch {
    let mut batch = ValidatedBatch::default();
    let mut seen: HashSet<String> = HashSet::new();

    for candidate in &candidates {
        match validate_record(candidate, window) {
            RecordOutcome::Accepted(pin) => {
                if seen.insert(pin.event_id.clone()) {
                    batch.pins.push(pin);
                } else {
                    debug!(event_id = %pin.event_id, "dropping duplicate record");
                    batch.duplicates += 1;
                }
            }
            RecordOutcome::Rejected(rejection) => {
                let event_id = candidate
                    .get("event_id")
                    .and_then(Value::as_str)
                    .unwrap_or("<none>");
                debug!(event_id, reason = %rejection, "rejected record");
                batch.rejected.record(&rejection);
            }
        }
    }
    batch
}

fn build_pin(candidate: &Value, window: Option<&TimeWindow>) -> Result<Pin, Rejection> {
    let record = candidate.as_object().ok_or(Rejection::NotAnObject)?;

    let event_id = required_str(record, "event_id")?;
    if event_id.trim().is_empty() {
        return Err(Rejection::MissingField("event_id"));
    }
    let title = required_str(record, "title")?;
    let raw_date = required_str(record, "date")?;
    let location_label = required_str(record, "location_label")?;
    let raw_category = required_str(record, "category")?;
    let one_liner = required_str(record, "one_liner")?;

    let date = check_date(raw_date, window)?;
    let category = Category::parse(raw_category.trim())
        .ok_or_else(|| Rejection::UnknownCategory(raw_category.to_owned()))?;

    let [significance_score, confidence, positivity_scale] = {
        let mut scores = [0.0; 3];
        for (slot, field) in scores.iter_mut().zip(SCORE_FIELDS) {
            *slot = score(record, field)?;
        }
        scores
    };

    let lat = coordinate(record, "lat")?;
    let lng = coordinate(record, "lng")?;
    let related_event_ids = related_ids(record)?;

    Ok(Pin {
        event_id: event_id.to_owned(),
        title: title.to_owned(),
        date,
        lat: clamp_lat(lat),
        lng: clamp_lng(lng),
        location_label: location_label.to_owned(),
        category,
        significance_score,
        one_liner: one_liner.to_owned(),
        confidence,
        positivity_scale,
        related_event_ids,
    })
}

fn required_str<'a>(
    record: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, Rejection> {
    match record.get(field) {
        None | Some(Value::Null) => Err(Rejection::MissingField(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(Rejection::WrongType(field)),
    }
}

fn check_date(raw: &str, window: Option<&TimeWindow>) -> Result<NaiveDate, Rejection> {
    let parsed = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok();
    match (parsed, window) {
        (Some(date), Some(window)) if window.contains(date) => Ok(date),
        (Some(date), None) => Ok(date),
        (_, Some(_)) => Err(Rejection::OutsideWindow(raw.to_owned())),
        (None, None) => Err(Rejection::InvalidDate(raw.to_owned())),
    }
}

fn score(record: &Map<String, Value>, field: &'static str) -> Result<f64, Rejection> {
    let value = match record.get(field) {
        None | Some(Value::Null) => return Err(Rejection::MissingField(field)),
        Some(v) => v.as_f64().ok_or(Rejection::WrongType(field))?,
    };
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Rejection::ScoreOutOfRange { field, value })
    }
}

/// Absent or null coordinates read as 0 so the pin can be geocoded later.
fn coordinate(record: &Map<String, Value>, field: &'static str) -> Result<f64, Rejection> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(0.0),
        Some(v) => v.as_f64().ok_or(Rejection::WrongType(field)),
    }
}

fn related_ids(record: &Map<String, Value>) -> Result<Option<Vec<String>>, Rejection> {
    const FIELD: &str = "related_event_ids";
    match record.get(FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or(Rejection::WrongType(FIELD))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(Rejection::WrongType(FIELD)),
    }
}
