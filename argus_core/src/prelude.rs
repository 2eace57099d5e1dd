// argus_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::FilterEngine;
pub use crate::messages::{PoseConvention, PoseMeasurement};
pub use crate::models::measurement::Measurement;
pub use crate::types::{PoseJacobian, PoseNoiseCovariance, PoseResidual, StateIndex};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::config::{HistoryConfig, PoseSensorConfig, SharedPoseConfig};
pub use crate::error::{HistoryError, MeasurementError};
pub use crate::frames::layout::{ErrorStateBlock, ERROR_STATE_DIM};
pub use crate::frames::FilterState;

// --- Estimation Algorithms ---
pub use crate::estimation::filters::{ErrorStateEkf, MeasurementFeedback};
pub use crate::estimation::history::StateHistory;
pub use crate::estimation::pose_update::{AbortReason, PoseUpdateHandler, UpdateOutcome};

// --- Concrete Model Implementations ---
pub use crate::models::measurement::convention::{normalize, CanonicalPose};
pub use crate::models::measurement::noise::CovarianceSource;
pub use crate::models::measurement::pose::{PoseModel, PredictedPose};
