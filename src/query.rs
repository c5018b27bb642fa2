//! Pin requests and their normalization.

use atlantis_events::{QueryKey, TimeWindow, Viewport};
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::{AtlantisError, Result};
use crate::provider::{Attempt, Focus, GenerationRequest};

const DEFAULT_LANGUAGE: &str = "en";
const MAX_ZOOM: f64 = 20.0;

/// Trimmed, lowercased language code; blank means English.
pub fn request_language(language: &str) -> String {
    match language.trim().to_lowercase() {
        l if l.is_empty() => DEFAULT_LANGUAGE.to_owned(),
        l => l,
    }
}

/// A request for pins in a viewport and time window, as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinsQuery {
    pub window: TimeWindow,
    pub viewport: Viewport,
    #[serde(default)]
    pub language: String,
    /// `0` means "use the configured default".
    #[serde(default)]
    pub max_pins: usize,
}

/// A query after normalization. Only constructed through [`PinsQuery::normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    window: TimeWindow,
    viewport: Viewport,
    language: String,
    max_pins: usize,
}

impl PinsQuery {
    /// Normalize language, pin count, zoom and window.
    ///
    /// # Errors
    ///
    /// Returns [`AtlantisError::InvalidRequest`] when the window is reversed
    /// or the viewport has non-finite coordinates.
    pub fn normalize(&self, config: &GenerationConfig) -> Result<NormalizedQuery> {
        if self.window.start > self.window.end {
            return Err(AtlantisError::InvalidRequest(format!(
                "window start {} is after end {}",
                self.window.start, self.window.end
            )));
        }
        let b = self.viewport.bbox;
        if ![b.west, b.south, b.east, b.north].iter().all(|v| v.is_finite()) {
            return Err(AtlantisError::InvalidRequest(
                "bounding box must have finite edges".into(),
            ));
        }

        let language = request_language(&self.language);
        let limit = config.max_pins_limit.max(1);
        let max_pins = match self.max_pins {
            0 => config.default_max_pins.clamp(1, limit),
            n => n.clamp(1, limit),
        };
        let zoom = if self.viewport.zoom.is_finite() {
            self.viewport.zoom.clamp(0.0, MAX_ZOOM)
        } else {
            0.0
        };

        Ok(NormalizedQuery {
            window: self.window,
            viewport: Viewport { bbox: b, zoom },
            language,
            max_pins,
        })
    }
}

impl NormalizedQuery {
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn max_pins(&self) -> usize {
        self.max_pins
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::new(&self.window, &self.viewport, &self.language, self.max_pins)
    }

    /// First-attempt provider request for this query.
    pub fn generation_request(&self, config: &GenerationConfig) -> GenerationRequest {
        let focus = if self.viewport.zoom >= config.local_zoom_threshold {
            Focus::Local
        } else {
            Focus::Global
        };
        let wanted = u32::try_from(self.max_pins)
            .unwrap_or(u32::MAX)
            .saturating_mul(config.tokens_per_pin);
        GenerationRequest {
            window: self.window,
            bbox: self.viewport.bbox,
            zoom: self.viewport.zoom,
            language: self.language.clone(),
            max_pins: self.max_pins,
            focus,
            max_output_tokens: wanted.max(config.min_output_tokens),
            attempt: Attempt::First,
        }
    }
}
