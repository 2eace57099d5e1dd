// argus_core/src/utils/mod.rs

pub mod geometry;
