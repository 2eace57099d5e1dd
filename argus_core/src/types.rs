// argus_core/src/types.rs

use nalgebra::{SMatrix, SVector};

use crate::frames::layout::ERROR_STATE_DIM;

// --- Measurement Dimensions ---
/// Rows of the pose observation: position (3), attitude (3), vision-world yaw anchor (1).
pub const POSE_MEASUREMENT_DIM: usize = 7;

// --- Core Type Aliases ---
pub type PoseJacobian = SMatrix<f64, POSE_MEASUREMENT_DIM, ERROR_STATE_DIM>;
pub type PoseResidual = SVector<f64, POSE_MEASUREMENT_DIM>;
pub type PoseNoiseCovariance = SMatrix<f64, POSE_MEASUREMENT_DIM, POSE_MEASUREMENT_DIM>;

// --- Core Identifier ---
/// Identifies one snapshot in the filter's time-indexed state history.
///
/// Indices grow monotonically as snapshots are recorded, so an index stays
/// meaningful even after older snapshots have been evicted from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StateIndex(pub u64);

impl std::fmt::Display for StateIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
