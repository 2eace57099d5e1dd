// argus_sim/src/prelude.rs

// Re-export the entire argus_core prelude so the pure filter types are one import away.
pub use argus_core::prelude::*;

// Re-export common simulation-specific types.
pub use crate::error::SimError;
pub use crate::simulation::config::{
    CalibrationConfig, EstimatorConfig, ReconfigureEvent, ScenarioConfig, SensorConfig,
    SimulationConfig, TrajectoryConfig,
};
pub use crate::simulation::prng::SimulationRng;
pub use crate::simulation::report::RunReport;
pub use crate::simulation::runner::Simulation;
