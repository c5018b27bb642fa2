//! Atlantis: time-windowed, geotagged event pins from generative text providers.
//!
//! This crate wraps the extraction and cache core in `atlantis-events` with
//! the service layer that feeds it:
//! Request → normalize → cache → provider → extract → geocode → cache/accumulate
//!
//! # Architecture
//!
//! - **Query**: normalizes language, pin count, zoom and window into cache keys
//!   and a provider request
//! - **Provider**: [`GenerationProvider`] and [`Geocoder`] traits implemented
//!   by the caller; no prompts or network clients live here
//! - **Service**: [`EventService`] runs generation with a bounded retry,
//!   geocodes pins without coordinates and commits results in spawned tasks
//! - **Index**: every produced pin is retrievable by identifier

pub mod config;
pub mod error;
pub mod geocode;
pub mod index;
pub mod provider;
pub mod query;
pub mod service;

pub use atlantis_events;
pub use config::AtlantisConfig;
pub use error::{AtlantisError, Result};
pub use provider::{Attempt, Focus, GenerationProvider, GenerationRequest, GeocodedPlace, Geocoder};
pub use query::{NormalizedQuery, PinsQuery};
pub use service::{EventService, PinsResponse};
