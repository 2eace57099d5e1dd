// argus_core/src/config.rs

//! Runtime configuration of the pose update.
//!
//! The configuration can be changed from another thread while measurements
//! are being processed. Each measurement reads one snapshot at its start.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::messages::PoseConvention;

/// Tunables of the pose measurement model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseSensorConfig {
    /// Position noise standard deviation, used when `use_fixed_covariance` is set.
    pub position_noise: f64,
    /// Attitude noise standard deviation (rad), used when `use_fixed_covariance` is set.
    pub attitude_noise: f64,
    /// Ignore any sensor-supplied covariance and use the diagonal built from
    /// `position_noise` and `attitude_noise`.
    pub use_fixed_covariance: bool,
    /// How the sensor reports its pose.
    pub convention: PoseConvention,
}

impl Default for PoseSensorConfig {
    fn default() -> Self {
        Self {
            position_noise: 9.9,
            attitude_noise: 0.02,
            use_fixed_covariance: false,
            convention: PoseConvention::SensorInWorld,
        }
    }
}

/// Tunables of the state history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of buffered snapshots.
    pub capacity: usize,
    /// Maximum time between a measurement and its matched snapshot, in seconds.
    pub tolerance: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            tolerance: 0.1,
        }
    }
}

/// A [`PoseSensorConfig`] shared between the measurement handler and whatever
/// delivers reconfiguration requests.
#[derive(Debug, Default)]
pub struct SharedPoseConfig {
    current: RwLock<Arc<PoseSensorConfig>>,
}

impl SharedPoseConfig {
    pub fn new(config: PoseSensorConfig) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// The configuration in effect right now.
    pub fn snapshot(&self) -> Arc<PoseSensorConfig> {
        Arc::clone(&self.current.read())
    }

    /// Replaces the configuration and returns the one it replaced.
    pub fn update(&self, config: PoseSensorConfig) -> Arc<PoseSensorConfig> {
        let previous = std::mem::replace(&mut *self.current.write(), Arc::new(config));
        tracing::info!(
            position_noise = config.position_noise,
            attitude_noise = config.attitude_noise,
            fixed = config.use_fixed_covariance,
            convention = ?config.convention,
            "pose sensor reconfigured"
        );
        previous
    }

    /// Changes only the noise levels, as a dynamic reconfiguration GUI would.
    pub fn update_noise(&self, position_noise: f64, attitude_noise: f64) -> Arc<PoseSensorConfig> {
        let mut guard = self.current.write();
        let next = PoseSensorConfig {
            position_noise,
            attitude_noise,
            ..**guard
        };
        let previous = std::mem::replace(&mut *guard, Arc::new(next));
        tracing::info!(position_noise, attitude_noise, "pose sensor noise reconfigured");
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PoseSensorConfig::default();
        assert_eq!(config.position_noise, 9.9);
        assert_eq!(config.attitude_noise, 0.02);
        assert!(!config.use_fixed_covariance);
        assert_eq!(config.convention, PoseConvention::SensorInWorld);
    }

    #[test]
    fn update_returns_previous_snapshot() {
        let shared = SharedPoseConfig::new(PoseSensorConfig::default());
        let before = shared.snapshot();

        let next = PoseSensorConfig {
            use_fixed_covariance: true,
            ..PoseSensorConfig::default()
        };
        let previous = shared.update(next);

        assert_eq!(*previous, *before);
        assert!(shared.snapshot().use_fixed_covariance);
        // Snapshots taken earlier are unaffected.
        assert!(!before.use_fixed_covariance);
    }

    #[test]
    fn update_noise_keeps_flags() {
        let shared = SharedPoseConfig::new(PoseSensorConfig {
            convention: PoseConvention::WorldInSensor,
            ..PoseSensorConfig::default()
        });
        let previous = shared.update_noise(0.05, 0.01);

        assert_eq!(previous.position_noise, 9.9);
        let now = shared.snapshot();
        assert_eq!(now.position_noise, 0.05);
        assert_eq!(now.attitude_noise, 0.01);
        assert_eq!(now.convention, PoseConvention::WorldInSensor);
    }
}
