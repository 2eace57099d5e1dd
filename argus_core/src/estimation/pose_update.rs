// argus_core/src/estimation/pose_update.rs

//! Fuses external 6-DOF pose readings into a [`FilterEngine`].
//!
//! Every reading goes through the same steps:
//! 1. bring it into the sensor-w.r.t.-world convention,
//! 2. match it to the buffered snapshot closest in time,
//! 3. linearize the pose model at that snapshot (H, r, R),
//! 4. hand the observation to the engine.
//!
//! A reading with no snapshot close enough in time is dropped. Its pose is
//! still reported to the engine as feedback for initialization.

use std::sync::Arc;

use nalgebra::DMatrix;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SharedPoseConfig;
use crate::error::{HistoryError, MeasurementError};
use crate::estimation::FilterEngine;
use crate::messages::PoseMeasurement;
use crate::models::measurement::convention::normalize_measurement;
use crate::models::measurement::noise::CovarianceSource;
use crate::models::measurement::pose::PoseModel;
use crate::models::measurement::Measurement;
use crate::types::{PoseResidual, StateIndex, POSE_MEASUREMENT_DIM};

/// Why a reading did not reach the filter engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AbortReason {
    #[error("no matching state: {0}")]
    StaleHistory(#[from] HistoryError),

    #[error("unusable measurement: {0}")]
    Measurement(#[from] MeasurementError),
}

/// The terminal state of one handled reading.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The observation was forwarded to the engine for the snapshot `index`.
    /// `residual` is the innovation it carried.
    Dispatched {
        index: StateIndex,
        residual: PoseResidual,
    },
    /// Nothing was forwarded.
    Aborted(AbortReason),
}

impl UpdateOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, UpdateOutcome::Dispatched { .. })
    }
}

/// The measurement handler of a pose sensor.
///
/// It holds no per-reading state. The only state shared across readings is
/// the runtime configuration, read once at the start of every reading.
#[derive(Debug, Clone)]
pub struct PoseUpdateHandler {
    model: PoseModel,
    config: Arc<SharedPoseConfig>,
}

impl PoseUpdateHandler {
    pub fn new(config: Arc<SharedPoseConfig>) -> Self {
        Self {
            model: PoseModel::default(),
            config,
        }
    }

    pub fn with_model(mut self, model: PoseModel) -> Self {
        self.model = model;
        self
    }

    /// The configuration handle, for delivering reconfiguration requests.
    pub fn config(&self) -> &Arc<SharedPoseConfig> {
        &self.config
    }

    pub fn model(&self) -> &PoseModel {
        &self.model
    }

    /// Processes one pose reading to completion.
    ///
    /// A reading without covariance is weighted with the identity covariance;
    /// a configured fixed covariance overrides both cases.
    pub fn handle<E>(&self, engine: &mut E, measurement: &PoseMeasurement) -> UpdateOutcome
    where
        E: FilterEngine + ?Sized,
    {
        let config = self.config.snapshot();

        let reading = normalize_measurement(measurement, config.convention);
        engine.set_measurement_feedback(reading.position, reading.orientation);

        let built = {
            let (index, state) = match engine.closest_state(measurement.timestamp) {
                Ok(found) => found,
                Err(err) => {
                    debug!(t = measurement.timestamp, %err, "dropping pose measurement");
                    return UpdateOutcome::Aborted(err.into());
                }
            };

            let source = CovarianceSource::resolve(&config, reading.covariance.as_ref());
            source.noise_covariance().and_then(|noise| {
                let h = self.model.calculate_jacobian(state);
                let r = self.model.calculate_residual(state, &reading)?;
                Ok((index, h, r, noise))
            })
        };

        let (index, h, r, noise) = match built {
            Ok(built) => built,
            Err(err) => {
                warn!(t = measurement.timestamp, %err, "rejecting pose measurement");
                return UpdateOutcome::Aborted(err.into());
            }
        };

        let noise = DMatrix::from_column_slice(
            POSE_MEASUREMENT_DIM,
            POSE_MEASUREMENT_DIM,
            noise.as_slice(),
        );
        engine.apply_measurement(index, &h, &r, &noise);

        UpdateOutcome::Dispatched {
            index,
            residual: PoseResidual::from_column_slice(r.as_slice()),
        }
    }
}
