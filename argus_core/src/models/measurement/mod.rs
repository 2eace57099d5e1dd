// argus_core/src/models/measurement/mod.rs

use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

use crate::error::MeasurementError;
use crate::frames::FilterState;

/// The meaning of one row of a measurement vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementRow {
    Px,
    Py,
    Pz,
    AttitudeX,
    AttitudeY,
    AttitudeZ,
    VisionWorldYaw,
}

// --- MEASUREMENT MODEL TRAIT ---
// Represents the linearized model of a sensor: `r ≈ H δx + v`
pub trait Measurement: Debug + Send + Sync {
    /// The sensor reading, already in the canonical convention.
    type Reading;

    /// Describes the layout of the residual vector `r`.
    fn get_measurement_layout(&self) -> Vec<MeasurementRow>;

    /// Calculates the observation Jacobian `H = ∂h/∂δx` at a state snapshot.
    fn calculate_jacobian(&self, filter_state: &FilterState) -> DMatrix<f64>;

    /// Calculates the innovation `r = z ⊖ h(x)` of a reading against a state snapshot.
    fn calculate_residual(
        &self,
        filter_state: &FilterState,
        reading: &Self::Reading,
    ) -> Result<DVector<f64>, MeasurementError>;
}

pub mod convention;
pub mod noise;
pub mod pose;
