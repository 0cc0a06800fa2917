//! Unified error handling for the motion-maps library.
//!
//! Aggregation itself never fails as a whole: a bad sample is reported as an
//! [`MotionMapsError::InvalidCoordinate`] and skipped. The remaining variants
//! cover configuration and the health-data collaborator.

use thiserror::Error;

/// Unified error type for motion-maps operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
pub enum MotionMapsError {
    /// A GPS sample is non-finite or outside [-90, 90] / [-180, 180]
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Configuration value out of range or unparseable
    #[error("configuration error: {message}")]
    InvalidConfig { message: String },

    /// The health-data store is not available on this device
    #[error("health data is not available")]
    HealthDataUnavailable,

    /// The user declined read access to workouts or routes
    #[error("health data authorization denied: {message}")]
    AuthorizationDenied { message: String },

    /// A workout or route query against the health store failed
    #[error("health query failed: {message}")]
    HealthQuery { message: String },

    /// Generic internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl MotionMapsError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        MotionMapsError::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn query(message: impl Into<String>) -> Self {
        MotionMapsError::HealthQuery {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MotionMapsError {
    fn from(err: serde_json::Error) -> Self {
        MotionMapsError::config(err.to_string())
    }
}

/// Result type alias for motion-maps operations.
pub type Result<T> = std::result::Result<T, MotionMapsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MotionMapsError::InvalidCoordinate {
            latitude: 91.0,
            longitude: 0.5,
        };
        assert_eq!(err.to_string(), "invalid coordinate (91, 0.5)");

        let err = MotionMapsError::query("route series missing");
        assert!(err.to_string().contains("route series missing"));
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let err: MotionMapsError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, MotionMapsError::InvalidConfig { .. }));
    }
}
