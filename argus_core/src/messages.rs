// argus_core/src/messages.rs

use nalgebra::{Matrix6, Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::MeasurementError;

// =========================================================================
// == Sensor Conventions ==
// =========================================================================

/// How an external pose source reports its pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseConvention {
    /// The sensor pose expressed in the world frame (motion capture, most SLAM systems).
    #[default]
    SensorInWorld,
    /// The world expressed in the sensor frame (e.g. PTAM-style camera trackers).
    WorldInSensor,
}

// =========================================================================
// == Core Message ==
// =========================================================================

/// A 6-DOF pose reading from an external positioning source.
///
/// The 6x6 covariance, when present, is ordered `[position, attitude]` with
/// attitude expressed as small angles.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseMeasurement {
    pub timestamp: f64,
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub covariance: Option<Matrix6<f64>>,
}

impl PoseMeasurement {
    /// Builds a measurement from raw transport fields.
    ///
    /// The orientation is normalized here; a zero or non-finite quaternion is
    /// rejected since no rotation can be recovered from it.
    pub fn from_raw(
        timestamp: f64,
        position: Vector3<f64>,
        orientation: Quaternion<f64>,
        covariance: Option<Matrix6<f64>>,
    ) -> Result<Self, MeasurementError> {
        if !position.iter().all(|v| v.is_finite()) {
            return Err(MeasurementError::NonFinitePosition);
        }
        let norm = orientation.norm();
        if !norm.is_finite() || norm < f64::EPSILON {
            return Err(MeasurementError::InvalidOrientation);
        }

        Ok(Self {
            timestamp,
            position,
            orientation: UnitQuaternion::from_quaternion(orientation),
            covariance,
        })
    }

    /// Attaches a covariance given as a 36-element row-major array, the layout
    /// most transport formats use.
    pub fn with_row_major_covariance(mut self, covariance: &[f64; 36]) -> Self {
        self.covariance = Some(Matrix6::from_row_slice(covariance));
        self
    }
}
