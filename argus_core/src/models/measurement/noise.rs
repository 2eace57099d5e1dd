// argus_core/src/models/measurement/noise.rs

use nalgebra::{Matrix3, Matrix6};
use tracing::warn;

use crate::config::PoseSensorConfig;
use crate::error::MeasurementError;
use crate::types::PoseNoiseCovariance;

/// Noise of the vision-world yaw pseudo-measurement.
pub const VISION_YAW_NOISE: f64 = 1e-6;

/// Where the 6x6 pose block of the measurement covariance comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CovarianceSource {
    /// The covariance reported by the sensor, cross-correlations removed.
    FromSensor(Matrix6<f64>),
    /// Unit variance on every axis, for streams that report no covariance.
    Identity,
    /// A configured diagonal: `position_noise` and `attitude_noise` are standard deviations.
    Fixed {
        position_noise: f64,
        attitude_noise: f64,
    },
}

impl CovarianceSource {
    /// Picks the policy for one measurement. A fixed covariance configured at
    /// runtime overrides whatever the sensor sent.
    pub fn resolve(config: &PoseSensorConfig, sensor_covariance: Option<&Matrix6<f64>>) -> Self {
        if config.use_fixed_covariance {
            return CovarianceSource::Fixed {
                position_noise: config.position_noise,
                attitude_noise: config.attitude_noise,
            };
        }
        match sensor_covariance {
            Some(cov) => CovarianceSource::FromSensor(*cov),
            None => CovarianceSource::Identity,
        }
    }

    /// Builds the 7x7 measurement covariance `R`.
    ///
    /// The position/attitude cross blocks are always zero and `R(6, 6)` is
    /// always [`VISION_YAW_NOISE`]. A sensor covariance is not checked for
    /// positive semi-definiteness; only non-finite entries are rejected.
    pub fn noise_covariance(&self) -> Result<PoseNoiseCovariance, MeasurementError> {
        let mut r = PoseNoiseCovariance::zeros();

        match self {
            CovarianceSource::FromSensor(cov) => {
                if !cov.iter().all(|v| v.is_finite()) {
                    return Err(MeasurementError::NonFiniteCovariance);
                }
                if (0..6).any(|i| cov[(i, i)] < 0.0) {
                    warn!("sensor covariance has a negative variance; passing it through");
                }
                r.fixed_view_mut::<6, 6>(0, 0).copy_from(cov);
                r.fixed_view_mut::<3, 3>(0, 3).copy_from(&Matrix3::zeros());
                r.fixed_view_mut::<3, 3>(3, 0).copy_from(&Matrix3::zeros());
            }
            CovarianceSource::Identity => {
                r.fixed_view_mut::<6, 6>(0, 0).fill_with_identity();
            }
            CovarianceSource::Fixed {
                position_noise,
                attitude_noise,
            } => {
                let s_zp = position_noise * position_noise;
                let s_zq = attitude_noise * attitude_noise;
                for i in 0..3 {
                    r[(i, i)] = s_zp;
                    r[(i + 3, i + 3)] = s_zq;
                }
            }
        }

        r[(6, 6)] = VISION_YAW_NOISE;
        Ok(r)
    }
}
