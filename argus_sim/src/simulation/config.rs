// argus_sim/src/simulation/config.rs

//! Scenario configuration: the TOML schema, its defaults and how it is loaded.
//!
//! Sources are layered in order: built-in defaults, the scenario file, then
//! `ARGUS_`-prefixed environment variables (`ARGUS_SENSOR__RATE=30`).

use std::path::Path;

use argus_core::prelude::{HistoryConfig, PoseConvention, PoseSensorConfig};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SimError};

// =========================================================================
// == Top-Level Scenario Configuration ==
// =========================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ScenarioConfig {
    pub simulation: SimulationConfig,
    pub history: HistoryConfig,
    pub trajectory: TrajectoryConfig,
    /// The calibration the simulated world actually has.
    pub truth: CalibrationConfig,
    pub estimator: EstimatorConfig,
    pub sensor: SensorConfig,
    /// The measurement handler's runtime configuration at start-up.
    pub pose_model: PoseSensorConfig,
    /// Runtime reconfigurations applied during the run.
    pub reconfigure: Vec<ReconfigureEvent>,
}

// =========================================================================
// == Simulation & Trajectory ==
// =========================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationConfig {
    /// Seed of the simulation PRNG. A random seed is drawn when absent.
    pub seed: Option<u64>,
    pub duration_seconds: f64,
    /// Rate at which nominal snapshots are recorded, in Hz.
    pub state_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: Some(42),
            duration_seconds: 30.0,
            state_rate: 100.0,
        }
    }
}

/// A horizontal circle with a roll/pitch wobble to excite the extrinsics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct TrajectoryConfig {
    pub radius: f64,
    pub height: f64,
    /// Angular rate around the circle, in rad/s.
    pub angular_rate: f64,
    /// Amplitude of the roll and pitch oscillation, in radians.
    pub wobble: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            height: 1.0,
            angular_rate: 0.5,
            wobble: 0.2,
        }
    }
}

// =========================================================================
// == Calibration & Estimator ==
// =========================================================================

/// Values of the calibration blocks. Rotations are roll/pitch/yaw in radians.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct CalibrationConfig {
    pub scale: f64,
    pub vision_world_rpy: [f64; 3],
    pub camera_imu_rpy: [f64; 3],
    pub camera_imu_translation: [f64; 3],
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            vision_world_rpy: [0.0; 3],
            camera_imu_rpy: [0.0; 3],
            camera_imu_translation: [0.0; 3],
        }
    }
}

impl CalibrationConfig {
    pub fn vision_world(&self) -> UnitQuaternion<f64> {
        let [r, p, y] = self.vision_world_rpy;
        UnitQuaternion::from_euler_angles(r, p, y)
    }

    pub fn camera_imu_rotation(&self) -> UnitQuaternion<f64> {
        let [r, p, y] = self.camera_imu_rpy;
        UnitQuaternion::from_euler_angles(r, p, y)
    }

    pub fn camera_imu_translation(&self) -> Vector3<f64> {
        Vector3::from(self.camera_imu_translation)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct EstimatorConfig {
    /// The filter's initial guess of the calibration.
    pub initial: CalibrationConfig,
    /// Initial variance of every error-state component.
    pub initial_variance: f64,
    /// Variance added per second to the navigation blocks of each new snapshot.
    pub navigation_process_noise: f64,
    /// Variance added per second to the calibration blocks of each new snapshot.
    pub calibration_process_noise: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            initial: CalibrationConfig {
                scale: 0.8,
                ..Default::default()
            },
            initial_variance: 0.1,
            navigation_process_noise: 1e-3,
            calibration_process_noise: 1e-6,
        }
    }
}

// =========================================================================
// == Sensor ==
// =========================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SensorConfig {
    /// Reading rate in Hz.
    pub rate: f64,
    /// Delay between capture and delivery, in seconds.
    pub latency: f64,
    pub position_noise_stddev: f64,
    pub attitude_noise_stddev: f64,
    /// Attach the true noise covariance to each reading.
    pub report_covariance: bool,
    /// Convention the sensor reports its pose in.
    pub convention: PoseConvention,
    /// Fraction of readings whose timestamp is corrupted by a clock glitch.
    pub clock_glitch_fraction: f64,
    /// Offset applied to glitched timestamps, in seconds.
    pub clock_glitch_offset: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            rate: 20.0,
            latency: 0.03,
            position_noise_stddev: 0.01,
            attitude_noise_stddev: 0.005,
            report_covariance: true,
            convention: PoseConvention::SensorInWorld,
            clock_glitch_fraction: 0.0,
            clock_glitch_offset: 1.0,
        }
    }
}

/// A runtime reconfiguration of the measurement handler.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReconfigureEvent {
    /// Simulation time at which the event fires, in seconds.
    pub at: f64,
    pub position_noise: f64,
    pub attitude_noise: f64,
    /// When set, also switches the fixed-covariance flag.
    #[serde(default)]
    pub use_fixed_covariance: Option<bool>,
}

// =========================================================================
// == Loading & Validation ==
// =========================================================================

impl ScenarioConfig {
    /// Loads a scenario file layered over the defaults and the environment.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SimError::ScenarioNotFound(path.to_path_buf()));
        }
        info!("Loading scenario from: {}", path.display());

        let config: ScenarioConfig = Figment::from(Serialized::defaults(ScenarioConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("ARGUS_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a scenario from a TOML string, without environment overrides.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: ScenarioConfig = Figment::from(Serialized::defaults(ScenarioConfig::default()))
            .merge(Toml::string(source))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimError::Invalid(format!("{name} must be positive, got {value}")))
            }
        }
        fn non_negative(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(SimError::Invalid(format!("{name} must be non-negative, got {value}")))
            }
        }

        positive("simulation.duration_seconds", self.simulation.duration_seconds)?;
        positive("simulation.state_rate", self.simulation.state_rate)?;
        positive("history.tolerance", self.history.tolerance)?;
        if self.history.capacity == 0 {
            return Err(SimError::Invalid("history.capacity must be at least 1".into()));
        }
        positive("truth.scale", self.truth.scale)?;
        positive("estimator.initial.scale", self.estimator.initial.scale)?;
        positive("estimator.initial_variance", self.estimator.initial_variance)?;
        non_negative("estimator.navigation_process_noise", self.estimator.navigation_process_noise)?;
        non_negative("estimator.calibration_process_noise", self.estimator.calibration_process_noise)?;
        positive("sensor.rate", self.sensor.rate)?;
        non_negative("sensor.latency", self.sensor.latency)?;
        non_negative("sensor.position_noise_stddev", self.sensor.position_noise_stddev)?;
        non_negative("sensor.attitude_noise_stddev", self.sensor.attitude_noise_stddev)?;
        if !(0.0..=1.0).contains(&self.sensor.clock_glitch_fraction) {
            return Err(SimError::Invalid(format!(
                "sensor.clock_glitch_fraction must lie in [0, 1], got {}",
                self.sensor.clock_glitch_fraction
            )));
        }
        for event in &self.reconfigure {
            non_negative("reconfigure.at", event.at)?;
            positive("reconfigure.position_noise", event.position_noise)?;
            positive("reconfigure.attitude_noise", event.attitude_noise)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scenario_uses_defaults() {
        let config = ScenarioConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScenarioConfig::default());
        assert_eq!(config.pose_model.position_noise, 9.9);
        assert_eq!(config.history.capacity, 256);
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = ScenarioConfig::from_toml_str(
            r#"
            [sensor]
            rate = 30.0
            convention = "world_in_sensor"

            [pose_model]
            use_fixed_covariance = true
            convention = "world_in_sensor"

            [[reconfigure]]
            at = 5.0
            position_noise = 0.5
            attitude_noise = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.sensor.rate, 30.0);
        assert_eq!(config.sensor.latency, SensorConfig::default().latency);
        assert_eq!(config.sensor.convention, PoseConvention::WorldInSensor);
        assert!(config.pose_model.use_fixed_covariance);
        assert_eq!(config.reconfigure.len(), 1);
        assert_eq!(config.reconfigure[0].use_fixed_covariance, None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ScenarioConfig::from_toml_str("[sensor]\nfrequency = 10.0\n").unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ScenarioConfig::from_toml_str("[sensor]\nrate = 0.0\n").unwrap_err();
        assert!(matches!(err, SimError::Invalid(_)));

        let err = ScenarioConfig::from_toml_str("[sensor]\nclock_glitch_fraction = 1.5\n").unwrap_err();
        assert!(matches!(err, SimError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ScenarioConfig::load(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, SimError::ScenarioNotFound(_)));
    }

    #[test]
    fn bundled_scenarios_parse() {
        let circle = ScenarioConfig::from_toml_str(include_str!(
            "../../../assets/scenarios/00_circle.toml"
        ))
        .unwrap();
        assert_eq!(circle.estimator.initial.scale, 0.8);

        let ptam = ScenarioConfig::from_toml_str(include_str!(
            "../../../assets/scenarios/01_world_in_sensor.toml"
        ))
        .unwrap();
        assert_eq!(ptam.pose_model.convention, PoseConvention::WorldInSensor);
        assert_eq!(ptam.reconfigure[0].use_fixed_covariance, Some(true));
        // Unset keys of a partially given table keep their defaults.
        assert_eq!(ptam.estimator.initial_variance, EstimatorConfig::default().initial_variance);
    }

    #[test]
    fn resolved_scenario_prints_as_toml() {
        let config = ScenarioConfig::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[sensor]"));
        assert_eq!(ScenarioConfig::from_toml_str(&text).unwrap(), config);
    }
}
