//! Configuration types for the atlantis service.

use std::path::PathBuf;
use std::time::Duration;

use atlantis_events::CacheConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AtlantisError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlantisConfig {
    /// TTLs and capacity of the pin and explanation cache.
    pub cache: CacheConfig,
    /// Generation provider request settings.
    pub generation: GenerationConfig,
    /// Geocoding settings.
    pub geocoding: GeocodingConfig,
    /// Explanation streaming settings.
    pub explanation: ExplanationConfig,
}

/// Generation provider request settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Pins requested when the caller does not say.
    pub default_max_pins: usize,
    /// Hard upper bound on pins per request.
    pub max_pins_limit: usize,
    /// Deadline for one provider call, in seconds.
    pub timeout_seconds: u64,
    /// Ask the provider once more when nothing could be recovered.
    pub retry_on_parse_failure: bool,
    /// Output token allowance per requested pin.
    pub tokens_per_pin: u32,
    /// Floor for the output token allowance.
    pub min_output_tokens: u32,
    /// Zoom at and above which requests focus on the viewport.
    pub local_zoom_threshold: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_max_pins: 8,
            max_pins_limit: 20,
            timeout_seconds: 60,
            retry_on_parse_failure: true,
            tokens_per_pin: 600,
            min_output_tokens: 4000,
            local_zoom_threshold: 6.0,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Geocoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    /// Resolve pins that arrive without coordinates.
    pub enabled: bool,
    /// Deadline for one lookup, in seconds.
    pub timeout_seconds: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: 10,
        }
    }
}

impl GeocodingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Explanation streaming settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    /// Characters per streamed chunk.
    pub chunk_chars: usize,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self { chunk_chars: 50 }
    }
}

impl AtlantisConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AtlantisError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AtlantisError::Config(e.to_string()))
    }

    /// Returns the default config file path: `~/.config/atlantis/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("atlantis").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("atlantis")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/atlantis-config/config.toml")
        }
    }

    /// Check every section for values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;

        let generation = &self.generation;
        if generation.max_pins_limit == 0 {
            return Err(AtlantisError::Config(
                "generation.max_pins_limit must be greater than 0".into(),
            ));
        }
        if generation.default_max_pins == 0 || generation.default_max_pins > generation.max_pins_limit
        {
            return Err(AtlantisError::Config(format!(
                "generation.default_max_pins must be within 1..={}",
                generation.max_pins_limit
            )));
        }
        if generation.timeout_seconds == 0 {
            return Err(AtlantisError::Config(
                "generation.timeout_seconds must be greater than 0".into(),
            ));
        }
        if !generation.local_zoom_threshold.is_finite() {
            return Err(AtlantisError::Config(
                "generation.local_zoom_threshold must be finite".into(),
            ));
        }
        if self.geocoding.enabled && self.geocoding.timeout_seconds == 0 {
            return Err(AtlantisError::Config(
                "geocoding.timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.explanation.chunk_chars == 0 {
            return Err(AtlantisError::Config(
                "explanation.chunk_chars must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AtlantisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generation.default_max_pins, 8);
        assert_eq!(config.cache.pins_ttl_seconds, 3600);
        assert_eq!(config.explanation.chunk_chars, 50);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AtlantisConfig = toml::from_str(
            r#"
            [generation]
            max_pins_limit = 12

            [cache]
            pins_ttl_seconds = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.generation.max_pins_limit, 12);
        assert_eq!(config.generation.timeout_seconds, 60);
        assert_eq!(config.cache.pins_ttl_seconds, 60);
        assert_eq!(config.cache.explanation_ttl_seconds, 43_200);
        assert!(config.geocoding.enabled);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = AtlantisConfig::default();
        config.generation.default_max_pins = 30;
        assert!(config.validate().is_err());

        let mut config = AtlantisConfig::default();
        config.cache.accumulation_ttl_seconds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("accumulation_ttl_seconds"));

        let mut config = AtlantisConfig::default();
        config.explanation.chunk_chars = 0;
        assert!(config.validate().is_err());

        let mut config = AtlantisConfig::default();
        config.geocoding.enabled = false;
        config.geocoding.timeout_seconds = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AtlantisConfig::default();
        config.generation.local_zoom_threshold = 7.5;
        config.save_to_file(&path).unwrap();

        let loaded = AtlantisConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = AtlantisConfig::from_file(std::path::Path::new("/nonexistent/atlantis.toml"));
        assert!(matches!(result, Err(AtlantisError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(matches!(
            AtlantisConfig::from_file(&path),
            Err(AtlantisError::Config(_))
        ));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = AtlantisConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("atlantis"));
    }
}
