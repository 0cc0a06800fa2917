//! Heat map and loader configuration.
//!
//! Defaults reproduce the application's map: 3-decimal grid cells
//! (~0.001° per axis), opacity saturating at 10 samples per cell and
//! 20 m markers.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{MotionMapsError, Result};
use crate::grid::GridPrecision;

/// What to do with samples that are not valid WGS-84 coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum CoordinatePolicy {
    /// Skip and report samples outside [-90, 90] / [-180, 180] or non-finite.
    #[default]
    Reject,
    /// Quantize out-of-range values as-is. Non-finite values are still
    /// skipped since they have no grid cell.
    PassThrough,
}

/// Configuration for heat map aggregation and marker rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HeatmapConfig {
    /// Decimal places kept when rounding latitude/longitude into cells.
    /// Default: 3 (cell size ~0.001° per axis)
    pub grid_precision_decimal_places: u8,

    /// Sample count at which marker opacity saturates at 1.0.
    /// Default: 10
    pub opacity_count_cap: u32,

    /// Radius of the circle drawn for each cell.
    /// Default: 20.0 meters
    pub marker_radius_meters: f64,

    /// Handling of invalid coordinates.
    /// Default: reject
    pub coordinate_policy: CoordinatePolicy,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            grid_precision_decimal_places: GridPrecision::DEFAULT.decimal_places(),
            opacity_count_cap: 10,
            marker_radius_meters: 20.0,
            coordinate_policy: CoordinatePolicy::Reject,
        }
    }
}

impl HeatmapConfig {
    /// Parse a JSON configuration; missing fields take their defaults.
    ///
    /// ```
    /// use motion_maps::HeatmapConfig;
    /// let config = HeatmapConfig::from_json(r#"{"opacity_count_cap": 25}"#).unwrap();
    /// assert_eq!(config.opacity_count_cap, 25);
    /// assert_eq!(config.grid_precision_decimal_places, 3);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: HeatmapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        GridPrecision::new(self.grid_precision_decimal_places)?;
        if !self.marker_radius_meters.is_finite() || self.marker_radius_meters <= 0.0 {
            return Err(MotionMapsError::config(format!(
                "marker_radius_meters must be positive, got {}",
                self.marker_radius_meters
            )));
        }
        Ok(())
    }

    /// Grid precision, clamped to the supported range. Call
    /// [`validate`](Self::validate) first to reject an out-of-range value.
    pub fn precision(&self) -> GridPrecision {
        if self.grid_precision_decimal_places > GridPrecision::MAX_DECIMAL_PLACES {
            warn!(
                "[HeatmapConfig] Clamping grid precision {} to {}",
                self.grid_precision_decimal_places,
                GridPrecision::MAX_DECIMAL_PLACES
            );
        }
        GridPrecision::clamped(self.grid_precision_decimal_places)
    }
}

/// Configuration for [`RouteLoader`](crate::RouteLoader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Route queries in flight at once.
    /// Default: 8
    pub max_concurrency: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}
