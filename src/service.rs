//! Request orchestration: cache, provider, extraction, geocoding, accumulation.
//!
//! [`EventService`] is cheap to clone and shares one cache, one accumulation
//! set and one pin index across clones. Generation and explanation work runs
//! in spawned tasks, so once started it commits to the cache even if the
//! caller stops waiting.

use std::sync::Arc;

use atlantis_events::{
    extract_pins, AccumulationMerger, ExplanationKey, Extraction, ExtractionReport, Pin,
    TemporalGeoCache, TimeWindow,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AtlantisConfig;
use crate::error::{AtlantisError, Result};
use crate::geocode::resolve_missing;
use crate::index::PinIndex;
use crate::provider::{GenerationProvider, GenerationRequest, Geocoder};
use crate::query::{request_language, NormalizedQuery, PinsQuery};

/// Chunks buffered between the explanation task and its receiver.
const EXPLANATION_CHANNEL_CAPACITY: usize = 32;

/// Answer to a pins request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinsResponse {
    pub window: TimeWindow,
    /// Pins for this exact query, at most `max_pins`.
    pub pins: Vec<Pin>,
    /// Everything accumulated for the window and language so far.
    pub accumulated: Vec<Pin>,
    /// Extraction diagnostics; `None` when served from cache.
    pub report: Option<ExtractionReport>,
    pub cached: bool,
}

struct Inner {
    config: AtlantisConfig,
    cache: TemporalGeoCache,
    merger: AccumulationMerger,
    index: PinIndex,
    provider: Arc<dyn GenerationProvider>,
    geocoder: Arc<dyn Geocoder>,
}

/// Shared entry point for pin generation and explanations.
#[derive(Clone)]
pub struct EventService {
    inner: Arc<Inner>,
}

impl EventService {
    /// Build a service with its own cache.
    ///
    /// # Errors
    ///
    /// Returns [`AtlantisError::Config`] or a pipeline error if `config` is invalid.
    pub fn new(
        config: AtlantisConfig,
        provider: Arc<dyn GenerationProvider>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Result<Self> {
        config.validate()?;
        let cache = TemporalGeoCache::new(config.cache.clone())?;
        let merger = AccumulationMerger::new(cache.clone());
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                cache,
                merger,
                index: PinIndex::new(),
                provider,
                geocoder,
            }),
        })
    }

    pub fn config(&self) -> &AtlantisConfig {
        &self.inner.config
    }

    /// Handle to the shared cache.
    pub fn cache(&self) -> &TemporalGeoCache {
        &self.inner.cache
    }

    /// Pins for a viewport and window, served from cache when possible.
    ///
    /// # Errors
    ///
    /// - [`AtlantisError::InvalidRequest`] for a query that cannot be normalized
    /// - [`AtlantisError::Upstream`] / [`AtlantisError::Timeout`] when the
    ///   provider fails; the cache is left untouched
    /// - [`AtlantisError::Unrecoverable`] when neither attempt yields any structure
    pub async fn generate_pins(&self, query: &PinsQuery) -> Result<PinsResponse> {
        let query = query.normalize(&self.inner.config.generation)?;
        let key = query.query_key().digest();

        if let Some(pins) = self.inner.cache.get_pins(&key).await {
            debug!(key = %key, count = pins.len(), "query cache hit");
            let accumulated = self
                .inner
                .merger
                .merge(query.window(), query.language(), &pins)
                .await;
            return Ok(PinsResponse {
                window: *query.window(),
                pins: pins.as_ref().clone(),
                accumulated: accumulated.as_ref().clone(),
                report: None,
                cached: true,
            });
        }
        debug!(key = %key, "query cache miss");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.generate_uncached(query, key).await })
            .await
            .map_err(|e| AtlantisError::Upstream(format!("generation task failed: {e}")))?
    }

    /// Everything accumulated for `(window, language)`; empty when absent or expired.
    pub async fn accumulated(&self, window: &TimeWindow, language: &str) -> Vec<Pin> {
        let language = request_language(language);
        self.inner
            .merger
            .current(window, &language)
            .await
            .as_ref()
            .clone()
    }

    /// A previously produced pin, or a placeholder for an unknown identifier.
    pub async fn pin(&self, event_id: &str) -> Pin {
        self.inner.index.get_or_placeholder(event_id).await
    }

    /// Stream explanatory text for one pin in chunks.
    ///
    /// Cached text arrives as a single chunk. Fresh text is cached once fully
    /// received from the provider, whether or not the receiver is still
    /// listening. A provider failure yields one error chunk and caches nothing.
    pub fn stream_explanation(&self, event_id: &str, language: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(EXPLANATION_CHANNEL_CAPACITY);
        let inner = Arc::clone(&self.inner);
        let event_id = event_id.trim().to_owned();
        let language = request_language(language);
        tokio::spawn(async move { inner.explain_into(&event_id, &language, tx).await });
        rx
    }
}

impl Inner {
    async fn generate_uncached(&self, query: NormalizedQuery, key: String) -> Result<PinsResponse> {
        let generation = &self.config.generation;
        let request = query.generation_request(generation);

        let mut extraction = self.attempt(&request, query.window()).await?;
        if extraction.is_unstructured() {
            if !generation.retry_on_parse_failure {
                return Err(AtlantisError::Unrecoverable(
                    "no records could be recovered from the response".into(),
                ));
            }
            info!(provider = self.provider.name(), "no structure recovered, retrying");
            extraction = self.attempt(&request.retry(), query.window()).await?;
            if extraction.is_unstructured() {
                return Err(AtlantisError::Unrecoverable(
                    "no records could be recovered after retry".into(),
                ));
            }
        }

        let Extraction { mut pins, report } = extraction;
        pins.truncate(query.max_pins());
        let pins = resolve_missing(self.geocoder.as_ref(), &self.config.geocoding, pins).await;

        if pins.is_empty() {
            debug!("nothing survived validation, not caching");
        } else {
            self.cache
                .set_pins(key, pins.clone(), self.cache.config().pins_ttl())
                .await;
        }
        let accumulated = self
            .merger
            .merge(query.window(), query.language(), &pins)
            .await;
        self.index.insert_all(&pins).await;

        Ok(PinsResponse {
            window: *query.window(),
            pins,
            accumulated: accumulated.as_ref().clone(),
            report: Some(report),
            cached: false,
        })
    }

    /// One bounded provider call followed by extraction.
    async fn attempt(&self, request: &GenerationRequest, window: &TimeWindow) -> Result<Extraction> {
        let provider = self.provider.name();
        let timeout = self.config.generation.timeout();

        let raw = match tokio::time::timeout(timeout, self.provider.generate(request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(provider, attempt = ?request.attempt, error = %e, "generation failed");
                return Err(match e {
                    AtlantisError::Upstream(_) | AtlantisError::Timeout(_) => e,
                    other => AtlantisError::Upstream(other.to_string()),
                });
            }
            Err(_) => {
                warn!(provider, attempt = ?request.attempt, "generation timed out");
                return Err(AtlantisError::Timeout(format!(
                    "{provider} did not answer within {}s",
                    timeout.as_secs()
                )));
            }
        };

        let extraction = extract_pins(&raw, Some(window));
        info!(
            provider,
            attempt = ?request.attempt,
            method = ?extraction.report.method,
            accepted = extraction.report.accepted,
            rejected = extraction.report.rejected.total(),
            "extracted pins"
        );
        Ok(extraction)
    }

    async fn explain_into(&self, event_id: &str, language: &str, tx: mpsc::Sender<String>) {
        let key = ExplanationKey::new(event_id, language).digest();
        if let Some(text) = self.cache.get_explanation(&key).await {
            debug!(event_id, "explanation cache hit");
            send_or_log(&tx, event_id, text.to_string()).await;
            return;
        }

        let pin = self.index.get_or_placeholder(event_id).await;
        let timeout = self.config.generation.timeout();
        let text = match tokio::time::timeout(timeout, self.provider.explain(&pin, language)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(event_id, error = %e, "explanation failed");
                send_or_log(&tx, event_id, format!("Error: {e}")).await;
                return;
            }
            Err(_) => {
                warn!(event_id, "explanation timed out");
                let message = format!("Error: no answer within {}s", timeout.as_secs());
                send_or_log(&tx, event_id, message).await;
                return;
            }
        };

        if text.trim().is_empty() {
            warn!(event_id, "provider returned an empty explanation");
            return;
        }
        self.cache
            .set_explanation(key, &text, self.cache.config().explanation_ttl())
            .await;

        for chunk in chunks(&text, self.config.explanation.chunk_chars) {
            if !send_or_log(&tx, event_id, chunk).await {
                break;
            }
        }
    }
}

/// Send one chunk; a dropped receiver is logged, not an error.
async fn send_or_log(tx: &mpsc::Sender<String>, event_id: &str, chunk: String) -> bool {
    let sent = tx.send(chunk).await.is_ok();
    if !sent {
        debug!(event_id, "explanation receiver dropped");
    }
    sent
}

/// Split `text` into pieces of at most `size` characters.
fn chunks(text: &str, size: usize) -> impl Iterator<Item = String> + '_ {
    let size = size.max(1);
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(size)
            .map_or(rest.len(), |(idx, _)| idx);
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(head.to_owned())
    })
}
