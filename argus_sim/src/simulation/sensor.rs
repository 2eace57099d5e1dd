// argus_sim/src/simulation/sensor.rs

use argus_core::models::measurement::convention::normalize;
use argus_core::prelude::{FilterState, PoseMeasurement, PoseModel};
use argus_core::utils::geometry::quaternion_from_small_angle;
use nalgebra::{Matrix6, Vector3, Vector6};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::trace;

use crate::error::{Result, SimError};
use crate::simulation::config::SensorConfig;
use crate::simulation::prng::SimulationRng;

/// A simulated 6-DOF pose sensor: a camera tracked by a vision system.
///
/// Readings are generated from a truth snapshot through the same pose model
/// the filter uses, corrupted with white noise and reported in the configured
/// convention.
#[derive(Debug, Clone)]
pub struct PoseSensor {
    config: SensorConfig,
    model: PoseModel,
    // Store the noise distributions for efficiency
    position_noise: Normal<f64>,
    attitude_noise: Normal<f64>,
    period: f64,
    next_capture: f64,
}

impl PoseSensor {
    pub fn new(config: SensorConfig) -> Result<Self> {
        let position_noise =
            zero_mean_noise("sensor.position_noise_stddev", config.position_noise_stddev)?;
        let attitude_noise =
            zero_mean_noise("sensor.attitude_noise_stddev", config.attitude_noise_stddev)?;

        Ok(Self {
            period: 1.0 / config.rate,
            next_capture: 0.0,
            config,
            model: PoseModel::default(),
            position_noise,
            attitude_noise,
        })
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Whether a reading is due at time `t`. Advances the capture schedule when it is.
    pub fn poll(&mut self, t: f64) -> bool {
        // A nanosecond of slack absorbs floating-point drift in the caller's clock.
        if t + 0.5e-9 < self.next_capture {
            return false;
        }
        while self.next_capture <= t + 0.5e-9 {
            self.next_capture += self.period;
        }
        true
    }

    /// The covariance of the noise this sensor adds, in the `[position, attitude]` order.
    pub fn noise_covariance(&self) -> Matrix6<f64> {
        let p = self.config.position_noise_stddev.powi(2);
        let q = self.config.attitude_noise_stddev.powi(2);
        Matrix6::from_diagonal(&Vector6::new(p, p, p, q, q, q))
    }

    /// Captures a reading of the camera pose implied by `truth`.
    pub fn capture(&self, truth: &FilterState, rng: &mut SimulationRng) -> PoseMeasurement {
        let ideal = self.model.predict_measurement(truth);

        let position = ideal.position
            + Vector3::from_fn(|_, _| self.position_noise.sample(&mut rng.0));
        let attitude_error = Vector3::from_fn(|_, _| self.attitude_noise.sample(&mut rng.0));
        let orientation = ideal.orientation * quaternion_from_small_angle(&attitude_error);

        let covariance = self
            .config
            .report_covariance
            .then(|| self.noise_covariance());

        // The inversion is its own inverse, so the same normalizer produces a
        // reading in the world-in-sensor convention.
        let reported = normalize(
            &position,
            &orientation,
            covariance.as_ref(),
            self.config.convention,
        );

        let mut timestamp = truth.timestamp;
        if self.config.clock_glitch_fraction > 0.0
            && rng.0.gen_bool(self.config.clock_glitch_fraction)
        {
            timestamp += self.config.clock_glitch_offset;
            trace!(t = truth.timestamp, stamped = timestamp, "sensor clock glitch");
        }

        PoseMeasurement {
            timestamp,
            position: reported.position,
            orientation: reported.orientation,
            covariance: reported.covariance,
        }
    }
}

// `Normal::new` only rejects non-finite standard deviations.
fn zero_mean_noise(name: &str, std_dev: f64) -> Result<Normal<f64>> {
    if !(std_dev.is_finite() && std_dev >= 0.0) {
        return Err(SimError::Invalid(format!(
            "{name} must be finite and non-negative, got {std_dev}"
        )));
    }
    Normal::new(0.0, std_dev).map_err(|e| SimError::Invalid(format!("{name}: {e}")))
}
