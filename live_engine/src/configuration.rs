use std::{path::Path, str::FromStr};

use ride_tracker_lib::statistics::{ElevationBaseline, DEFAULT_ELEVATION_THRESHOLD_M, DEFAULT_EMISSIONS_GRAMS_PER_KM};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("Line {line} is not a `key = value` pair: {content}")]
    InvalidLine { line: usize, content: String },
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Tuning of the live statistics.
///
/// Read from a plain `key = value` file. Lines starting with `#` are comments, unknown keys are
/// reported and skipped, missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Climbs at or below this many meters between two altitude samples are noise.
    pub elevation_threshold_m: f64,
    pub elevation_baseline: ElevationBaseline,
    pub emissions_grams_per_km: f64,
    /// Samples received before the open track is written to storage again.
    pub storage_batch_size: usize,
    /// Display name of a measurement is this prefix followed by its id.
    pub display_name_prefix: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            elevation_threshold_m: DEFAULT_ELEVATION_THRESHOLD_M,
            elevation_baseline: ElevationBaseline::Advance,
            emissions_grams_per_km: DEFAULT_EMISSIONS_GRAMS_PER_KM,
            storage_batch_size: 50,
            display_name_prefix: "Measurement".into(),
        }
    }
}

impl Configuration {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::InvalidLine {
                    line: number + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "elevation_threshold_m" => {
                    config.elevation_threshold_m = parse_value(key, value)?;
                    if !config.elevation_threshold_m.is_finite() || config.elevation_threshold_m < 0.0 {
                        return Err(invalid(key, value));
                    }
                }
                "elevation_baseline" => {
                    config.elevation_baseline = match value {
                        "advance" => ElevationBaseline::Advance,
                        "hold" => ElevationBaseline::Hold,
                        _ => return Err(invalid(key, value)),
                    }
                }
                "emissions_grams_per_km" => {
                    config.emissions_grams_per_km = parse_value(key, value)?;
                    if !config.emissions_grams_per_km.is_finite() || config.emissions_grams_per_km < 0.0 {
                        return Err(invalid(key, value));
                    }
                }
                "storage_batch_size" => {
                    config.storage_batch_size = parse_value(key, value)?;
                    if config.storage_batch_size == 0 {
                        return Err(invalid(key, value));
                    }
                }
                "display_name_prefix" => config.display_name_prefix = value.to_string(),
                _ => tracing::warn!("Unknown config key: {}", key),
            }
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}
