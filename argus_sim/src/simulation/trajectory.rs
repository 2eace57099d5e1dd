// argus_sim/src/simulation/trajectory.rs

use nalgebra::{UnitQuaternion, Vector3};

use crate::simulation::config::TrajectoryConfig;

/// The ground-truth navigation state of the body at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TruthSample {
    pub timestamp: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

/// A body flying a horizontal circle, nose along the tangent, with a roll and
/// pitch wobble on top.
#[derive(Debug, Clone)]
pub struct CircularTrajectory {
    config: TrajectoryConfig,
}

impl CircularTrajectory {
    pub fn new(config: TrajectoryConfig) -> Self {
        Self { config }
    }

    pub fn sample(&self, t: f64) -> TruthSample {
        let TrajectoryConfig {
            radius,
            height,
            angular_rate: w,
            wobble,
        } = self.config;
        let phase = w * t;

        let position = Vector3::new(radius * phase.cos(), radius * phase.sin(), height);
        let velocity = Vector3::new(-radius * w * phase.sin(), radius * w * phase.cos(), 0.0);

        let roll = wobble * (2.0 * phase).sin();
        let pitch = wobble * (3.0 * phase).sin();
        let yaw = phase + std::f64::consts::FRAC_PI_2;

        TruthSample {
            timestamp: t,
            position,
            velocity,
            orientation: UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        }
    }
}
