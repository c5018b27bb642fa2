//! Geocoding of pins that arrive without coordinates.

use atlantis_events::Pin;
use tracing::{debug, warn};

use crate::config::GeocodingConfig;
use crate::provider::Geocoder;

/// True if `candidate` names a place more precisely than `current`.
///
/// More comma-separated components wins; with equal counts the longer first
/// component wins. Empty names are never more specific.
pub fn is_more_specific(candidate: &str, current: &str) -> bool {
    if candidate.trim().is_empty() || current.trim().is_empty() {
        return false;
    }
    fn parts(name: &str) -> Vec<&str> {
        name.split(',').map(str::trim).collect()
    }
    let (a, b) = (parts(candidate), parts(current));
    match a.len().cmp(&b.len()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => a[0].len() > b[0].len(),
    }
}

/// Resolve coordinates for every pin sitting at 0/0.
///
/// Lookups that fail, time out, or find nothing leave the pin as it was.
pub async fn resolve_missing(
    geocoder: &dyn Geocoder,
    config: &GeocodingConfig,
    pins: Vec<Pin>,
) -> Vec<Pin> {
    if !config.enabled {
        return pins;
    }
    let mut resolved = Vec::with_capacity(pins.len());
    for pin in pins {
        if pin.lacks_coordinates() {
            resolved.push(resolve_one(geocoder, config, pin).await);
        } else {
            resolved.push(pin);
        }
    }
    resolved
}

async fn resolve_one(geocoder: &dyn Geocoder, config: &GeocodingConfig, pin: Pin) -> Pin {
    let lookup = geocoder.geocode(&pin.location_label);
    match tokio::time::timeout(config.timeout(), lookup).await {
        Ok(Ok(Some(place))) => {
            let label = place
                .display_name
                .as_deref()
                .filter(|name| is_more_specific(name, &pin.location_label));
            debug!(
                event_id = %pin.event_id,
                lat = place.lat,
                lng = place.lng,
                relabelled = label.is_some(),
                "geocoded pin"
            );
            pin.relocated(place.lat, place.lng, label)
        }
        Ok(Ok(None)) => {
            debug!(event_id = %pin.event_id, place = %pin.location_label, "place not found");
            pin
        }
        Ok(Err(e)) => {
            warn!(event_id = %pin.event_id, error = %e, "geocoding failed");
            pin
        }
        Err(_) => {
            warn!(
                event_id = %pin.event_id,
                timeout_secs = config.timeout_seconds,
                "geocoding timed out"
            );
            pin
        }
    }
}
