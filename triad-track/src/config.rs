//! Tracker configuration.

use crate::compensator::{FilteredMotion, MotionApplier, RawMotion};
use crate::error::TrackError;
use crate::filter::SpatialMotionFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// How motions are applied to the base frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompensationMode {
    /// Apply the estimated motion as is.
    Raw,
    /// Median-filter translations over the neighbor graph first.
    #[default]
    Filtered,
}

/// Tracker settings, usually read from a JSON file.
///
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames per estimation window.
    pub batch_size: usize,
    /// Neighbors per point in the neighbor graph.
    pub neighbors: usize,
    /// Neighbors used by the median filter; defaults to `neighbors`.
    pub filter_neighbors: Option<usize>,
    pub compensation: CompensationMode,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            batch_size: 2,
            neighbors: 8,
            filter_neighbors: None,
            compensation: CompensationMode::default(),
            log_level: "info".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        let file = File::open(path.as_ref())?;
        let config: TrackerConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        debug!("Loaded tracker config: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        if self.batch_size < 2 {
            return Err(TrackError::BatchSizeTooSmall(self.batch_size));
        }
        if self.neighbors == 0 {
            return Err(TrackError::Config("neighbors must be at least 1".into()));
        }
        if let Some(k) = self.filter_neighbors {
            if k == 0 || k > self.neighbors {
                return Err(TrackError::Config(format!(
                    "filter_neighbors must be in 1..={}, got {}",
                    self.neighbors, k
                )));
            }
        }
        Ok(())
    }

    pub fn filter_neighbors(&self) -> usize {
        self.filter_neighbors.unwrap_or(self.neighbors)
    }

    /// The motion application strategy selected by `compensation`.
    pub fn applier(&self) -> Box<dyn MotionApplier> {
        match self.compensation {
            CompensationMode::Raw => Box::new(RawMotion),
            CompensationMode::Filtered => Box::new(FilteredMotion::new(SpatialMotionFilter::new(
                self.filter_neighbors(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: TrackerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.filter_neighbors(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_fields() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{ "batch_size": 5, "neighbors": 16, "filter_neighbors": 4, "compensation": "raw" }"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.filter_neighbors(), 4);
        assert_eq!(config.compensation, CompensationMode::Raw);
    }

    #[test]
    fn test_validation() {
        let bad_batch = TrackerConfig {
            batch_size: 1,
            ..Default::default()
        };
        assert!(matches!(
            bad_batch.validate(),
            Err(TrackError::BatchSizeTooSmall(1))
        ));

        let bad_filter = TrackerConfig {
            filter_neighbors: Some(9),
            ..Default::default()
        };
        assert!(matches!(bad_filter.validate(), Err(TrackError::Config(_))));

        let no_neighbors = TrackerConfig {
            neighbors: 0,
            ..Default::default()
        };
        assert!(no_neighbors.validate().is_err());
    }
}
