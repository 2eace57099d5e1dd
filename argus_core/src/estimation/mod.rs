// argus_core/src/estimation/mod.rs

use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};

use crate::error::HistoryError;
use crate::frames::FilterState;
use crate::types::StateIndex;

/// The contract of the filter engine a measurement handler feeds.
///
/// The engine owns the time-indexed state history, the Kalman gain and the
/// state correction. Handlers only look up a snapshot and hand back a
/// linearized observation.
pub trait FilterEngine {
    /// Returns the buffered snapshot closest in time to `timestamp`, or an
    /// error when nothing lies within the engine's staleness tolerance.
    fn closest_state(&self, timestamp: f64) -> Result<(StateIndex, &FilterState), HistoryError>;

    /// Performs the Kalman update of the snapshot `index` with the
    /// observation Jacobian `h`, residual `r` and measurement noise `noise`.
    fn apply_measurement(
        &mut self,
        index: StateIndex,
        h: &DMatrix<f64>,
        r: &DVector<f64>,
        noise: &DMatrix<f64>,
    );

    /// Records the latest measured camera pose for the engine's initialization routine.
    fn set_measurement_feedback(&mut self, position: Vector3<f64>, orientation: UnitQuaternion<f64>);
}

pub mod filters;
pub mod history;
pub mod pose_update;
