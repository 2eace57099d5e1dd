// argus_sim/src/lib.rs

// Shared imports for the binary and the simulation modules.
pub mod prelude;

// Scenario loading, the closed loop and its report.
pub mod cli;
pub mod error;
pub mod simulation;
