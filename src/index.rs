//! In-memory index of every pin the service has produced.

use std::collections::HashMap;

use atlantis_events::types::DATE_FORMAT;
use atlantis_events::{Category, Pin};
use chrono::{Local, NaiveDate};
use tokio::sync::RwLock;

/// Pins by identifier. Later inserts replace earlier ones.
#[derive(Default)]
pub struct PinIndex {
    pins: RwLock<HashMap<String, Pin>>,
}

impl PinIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_all(&self, pins: &[Pin]) {
        let mut index = self.pins.write().await;
        for pin in pins {
            index.insert(pin.event_id.clone(), pin.clone());
        }
    }

    pub async fn get(&self, event_id: &str) -> Option<Pin> {
        self.pins.read().await.get(event_id).cloned()
    }

    /// The indexed pin, or a placeholder derived from the identifier.
    pub async fn get_or_placeholder(&self, event_id: &str) -> Pin {
        match self.get(event_id).await {
            Some(pin) => pin,
            None => placeholder_pin(event_id, Local::now().date_naive()),
        }
    }
}

/// Stand-in for an identifier the index has never seen.
///
/// Identifiers shaped `evt_YYYY-MM-DD_...` carry their date; anything else
/// is dated `today`.
pub fn placeholder_pin(event_id: &str, today: NaiveDate) -> Pin {
    let date = event_id
        .split('_')
        .nth(1)
        .and_then(|segment| NaiveDate::parse_from_str(segment, DATE_FORMAT).ok())
        .unwrap_or(today);
    Pin {
        event_id: event_id.to_owned(),
        title: "Event".into(),
        date,
        lat: 0.0,
        lng: 0.0,
        location_label: "Unknown".into(),
        category: Category::Other,
        significance_score: 0.5,
        one_liner: "Event description".into(),
        confidence: 0.5,
        positivity_scale: 0.5,
        related_event_ids: None,
    }
}
