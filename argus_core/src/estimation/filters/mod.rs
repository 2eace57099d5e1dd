// argus_core/src/estimation/filters/mod.rs

pub mod ekf;

pub use ekf::{ErrorStateEkf, MeasurementFeedback};
