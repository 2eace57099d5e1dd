// argus_core/src/estimation/filters/ekf.rs

use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};
use tracing::{debug, warn};

use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::estimation::history::StateHistory;
use crate::estimation::FilterEngine;
use crate::frames::layout::{ErrorStateBlock, ERROR_STATE_DIM};
use crate::frames::FilterState;
use crate::types::StateIndex;

/// The last camera pose a measurement handler reported, kept for filter initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementFeedback {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

/// A reference error-state Extended Kalman Filter engine.
///
/// It owns the buffered state history and applies Kalman corrections to
/// individual snapshots. State propagation happens elsewhere: whoever drives
/// the filter records new snapshots with [`ErrorStateEkf::record_state`].
#[derive(Debug, Clone)]
pub struct ErrorStateEkf {
    /// The time-indexed snapshots (x, P, t).
    history: StateHistory,
    /// The last pose reported by a measurement handler.
    feedback: Option<MeasurementFeedback>,
    /// Number of corrections applied so far.
    updates_applied: u64,
}

impl ErrorStateEkf {
    /// Creates a new EKF engine with an initial snapshot.
    pub fn new(initial_state: FilterState, config: HistoryConfig) -> Self {
        assert_eq!(initial_state.covariance.nrows(), ERROR_STATE_DIM);
        assert_eq!(initial_state.covariance.ncols(), ERROR_STATE_DIM);

        let mut history = StateHistory::new(config);
        history.push(initial_state);

        Self {
            history,
            feedback: None,
            updates_applied: 0,
        }
    }

    /// Records a propagated snapshot.
    pub fn record_state(&mut self, state: FilterState) -> StateIndex {
        self.history.push(state)
    }

    /// The newest snapshot, the filter's current best estimate.
    pub fn latest_state(&self) -> Option<&FilterState> {
        self.history.latest().map(|(_, s)| s)
    }

    pub fn state(&self, index: StateIndex) -> Option<&FilterState> {
        self.history.get(index)
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn feedback(&self) -> Option<&MeasurementFeedback> {
        self.feedback.as_ref()
    }

    pub fn updates_applied(&self) -> u64 {
        self.updates_applied
    }

    // --- Private Helper Methods for the EKF Algorithm ---

    /// Computes the error-state correction `δx = K r` and the corrected
    /// covariance for one snapshot. Returns `None` when `S` is singular.
    fn correction(
        p_priori: &DMatrix<f64>,
        h_jac: &DMatrix<f64>,
        r: &DVector<f64>,
        r_mat: &DMatrix<f64>,
    ) -> Option<(DVector<f64>, DMatrix<f64>)> {
        // 1. Innovation covariance S = H P Hᵀ + R.
        let s = h_jac * p_priori * h_jac.transpose() + r_mat;
        let s_inv = s.try_inverse()?;

        // 2. Kalman gain K = P Hᵀ S⁻¹.
        let k_gain = p_priori * h_jac.transpose() * s_inv;

        // 3. Error-state correction and covariance P = (I - K H) P, kept symmetric.
        let delta = &k_gain * r;
        let i = DMatrix::<f64>::identity(p_priori.nrows(), p_priori.ncols());
        let p_post = (i - k_gain * h_jac) * p_priori;
        let p_post = (&p_post + p_post.transpose()) * 0.5;

        Some((delta, p_post))
    }
}

impl FilterEngine for ErrorStateEkf {
    fn closest_state(&self, timestamp: f64) -> Result<(StateIndex, &FilterState), HistoryError> {
        self.history.closest(timestamp)
    }

    fn apply_measurement(
        &mut self,
        index: StateIndex,
        h: &DMatrix<f64>,
        r: &DVector<f64>,
        noise: &DMatrix<f64>,
    ) {
        assert_eq!(h.ncols(), ERROR_STATE_DIM);
        assert_eq!(h.nrows(), r.nrows());
        assert_eq!(noise.nrows(), r.nrows());

        let Some(state) = self.history.get_mut(index) else {
            warn!(%index, "snapshot evicted before its measurement could be applied");
            return;
        };

        let Some((delta, p_post)) = Self::correction(&state.covariance, h, r, noise) else {
            // If S is not invertible, the measurement is likely redundant or problematic.
            // We skip the update to maintain filter stability.
            warn!(%index, "innovation covariance is singular, skipping update");
            return;
        };

        state.inject(&delta);
        state.covariance = p_post;
        let timestamp = state.timestamp;

        // Calibration states are nearly constant, so newer snapshots inherit their correction.
        let calibration: Vec<ErrorStateBlock> = ErrorStateBlock::ALL
            .into_iter()
            .filter(|b| b.is_calibration())
            .collect();
        for newer in self.history.newer_than_mut(timestamp) {
            newer.inject_blocks(&delta, &calibration);
        }

        self.updates_applied += 1;
        debug!(
            %index,
            t = timestamp,
            correction_norm = delta.norm(),
            "measurement applied"
        );
    }

    fn set_measurement_feedback(&mut self, position: Vector3<f64>, orientation: UnitQuaternion<f64>) {
        self.feedback = Some(MeasurementFeedback {
            position,
            orientation,
        });
    }
}
