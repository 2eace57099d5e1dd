// argus_core/src/lib.rs

// This file defines the public modules of the library.
pub mod config;
pub mod error;
pub mod estimation;
pub mod frames;
pub mod messages;
pub mod models;
pub mod prelude;
pub mod types;
pub mod utils;
