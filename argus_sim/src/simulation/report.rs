// argus_sim/src/simulation/report.rs

use std::fmt;

use serde::Serialize;

/// An estimated scalar next to its true value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationError {
    pub estimated: f64,
    pub truth: f64,
    /// The filter's own 1-sigma uncertainty.
    pub stddev: f64,
}

impl CalibrationError {
    pub fn error(&self) -> f64 {
        (self.estimated - self.truth).abs()
    }
}

/// End-of-run summary of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub duration_seconds: f64,
    pub snapshots: u64,
    pub readings: u64,
    pub dispatched: u64,
    pub aborted_stale: u64,
    pub aborted_invalid: u64,
    pub updates_applied: u64,
    pub position_innovation_rms: f64,
    pub vision_world_error_deg: f64,
    pub camera_imu_rotation_error_deg: f64,
    pub camera_imu_translation_error: f64,
    pub scale: CalibrationError,
}

impl RunReport {
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Simulation Report ({:.1} s) ---", self.duration_seconds)?;
        writeln!(
            f,
            "readings: {} (dispatched {}, stale {}, invalid {})",
            self.readings, self.dispatched, self.aborted_stale, self.aborted_invalid
        )?;
        writeln!(f, "snapshots: {}, updates applied: {}", self.snapshots, self.updates_applied)?;
        writeln!(f, "position innovation RMS: {:.4}", self.position_innovation_rms)?;
        writeln!(
            f,
            "scale: {:.4} (truth {:.4}, error {:.4}, 1-sigma {:.4})",
            self.scale.estimated,
            self.scale.truth,
            self.scale.error(),
            self.scale.stddev
        )?;
        writeln!(f, "vision-world rotation error: {:.3} deg", self.vision_world_error_deg)?;
        writeln!(f, "camera-IMU rotation error: {:.3} deg", self.camera_imu_rotation_error_deg)?;
        write!(f, "camera-IMU translation error: {:.4}", self.camera_imu_translation_error)
    }
}
