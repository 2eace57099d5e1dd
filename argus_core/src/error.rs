// argus_core/src/error.rs

use thiserror::Error;

/// Failures of the time-indexed state history lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("state history is empty")]
    Empty,

    #[error("no state within {tolerance}s of t={query} (nearest at t={nearest})")]
    NotFound {
        query: f64,
        nearest: f64,
        tolerance: f64,
    },

    #[error("state {0} is no longer buffered")]
    Evicted(crate::types::StateIndex),
}

/// Failures while turning a raw pose message into an observation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    #[error("orientation quaternion has non-finite or zero norm")]
    InvalidOrientation,

    #[error("position contains non-finite values")]
    NonFinitePosition,

    #[error("sensor covariance contains non-finite values")]
    NonFiniteCovariance,

    #[error("attitude error scalar part {scalar} is too small to linearize")]
    IllConditionedAttitude { scalar: f64 },

    #[error("vision-world yaw is too close to ±90 degrees to linearize (denominator {denominator})")]
    IllConditionedYaw { denominator: f64 },
}
