//! Grid quantization of GPS samples.
//!
//! A sample falls into the cell obtained by rounding latitude and longitude
//! independently to a fixed number of decimal places:
//!
//! ```text
//! cell_lat = round(lat * 10^p) / 10^p
//! cell_lng = round(lng * 10^p) / 10^p
//! ```
//!
//! Rounding is half-away-from-zero (`f64::round`), applied to the product
//! as computed in IEEE-754 double precision. `0.0025` at 3 places is an
//! exact tie and rounds to `0.003`; `-0.0025` rounds to `-0.003`. A value
//! whose decimal form looks like a tie only rounds up when its product is
//! at or above the `.5` mark in binary.
//!
//! Cells are keyed by the integer indices `round(v * 10^p)` rather than
//! by the rounded floats, so equality and hashing are exact.

use std::fmt;

use crate::error::{MotionMapsError, Result};
use crate::GeoSample;

/// Number of decimal places kept when quantizing coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPrecision(u8);

impl GridPrecision {
    /// 3 decimal places: ~111 m north-south, narrower east-west away from the equator.
    pub const DEFAULT: GridPrecision = GridPrecision(3);

    /// Beyond 9 places the cell is smaller than GPS noise and
    /// `180 * 10^p` starts to lose integer precision in an f64.
    pub const MAX_DECIMAL_PLACES: u8 = 9;

    pub fn new(decimal_places: u8) -> Result<Self> {
        if decimal_places > Self::MAX_DECIMAL_PLACES {
            return Err(MotionMapsError::config(format!(
                "grid precision must be at most {} decimal places, got {}",
                Self::MAX_DECIMAL_PLACES,
                decimal_places
            )));
        }
        Ok(Self(decimal_places))
    }

    pub(crate) fn clamped(decimal_places: u8) -> Self {
        Self(decimal_places.min(Self::MAX_DECIMAL_PLACES))
    }

    pub fn decimal_places(&self) -> u8 {
        self.0
    }

    /// Multiplier `10^p`.
    #[inline]
    pub fn scale(&self) -> f64 {
        10f64.powi(self.0 as i32)
    }

    /// Cell edge length in degrees (`10^-p`).
    pub fn cell_size_degrees(&self) -> f64 {
        1.0 / self.scale()
    }

    /// Quantize one coordinate to its integer cell index.
    ///
    /// Returns `None` for NaN, infinities and values whose scaled product
    /// does not fit in an `i64`; none of these have a distinct cell.
    #[inline]
    pub fn quantize(&self, value: f64) -> Option<i64> {
        let scaled = (value * self.scale()).round();
        // i64::MAX as f64 is 2^63, one past the largest index
        if scaled.is_finite() && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64 {
            Some(scaled as i64)
        } else {
            None
        }
    }

    /// Rounded coordinate for a cell index.
    #[inline]
    pub fn dequantize(&self, index: i64) -> f64 {
        index as f64 / self.scale()
    }
}

impl Default for GridPrecision {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A quantized latitude/longitude pair used as an aggregation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    lat_index: i64,
    lng_index: i64,
    precision: GridPrecision,
}

impl GridCell {
    /// Cell containing the given coordinates, or `None` if either is not finite.
    pub fn from_coords(latitude: f64, longitude: f64, precision: GridPrecision) -> Option<Self> {
        Some(Self {
            lat_index: precision.quantize(latitude)?,
            lng_index: precision.quantize(longitude)?,
            precision,
        })
    }

    pub fn from_sample(sample: &GeoSample, precision: GridPrecision) -> Option<Self> {
        Self::from_coords(sample.latitude, sample.longitude, precision)
    }

    /// Rounded latitude, i.e. the cell center.
    pub fn latitude(&self) -> f64 {
        self.precision.dequantize(self.lat_index)
    }

    /// Rounded longitude, i.e. the cell center.
    pub fn longitude(&self) -> f64 {
        self.precision.dequantize(self.lng_index)
    }

    pub fn center(&self) -> GeoSample {
        GeoSample::new(self.latitude(), self.longitude())
    }

    pub fn indices(&self) -> (i64, i64) {
        (self.lat_index, self.lng_index)
    }

    pub fn precision(&self) -> GridPrecision {
        self.precision
    }

    pub fn contains(&self, sample: &GeoSample) -> bool {
        Self::from_sample(sample, self.precision).as_ref() == Some(self)
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = self.precision.decimal_places() as usize;
        write!(
            f,
            "({:.*}, {:.*})",
            places,
            self.latitude(),
            places,
            self.longitude()
        )
    }
}
