// argus_core/src/frames/layout.rs

use std::ops::Range;

/// The dimension of the error-state vector.
pub const ERROR_STATE_DIM: usize = 25;

/// The named blocks of the 25-dimensional error state.
///
/// The error state is composed of:
/// - Position (3) in World Frame
/// - Velocity (3) in World Frame
/// - Attitude (3, small-angle) of Body w.r.t. World
/// - Gyroscope Bias (3) in Body Frame
/// - Accelerometer Bias (3) in Body Frame
/// - Visual Scale (1)
/// - Vision-World Rotation (3, small-angle)
/// - Camera-IMU Rotation (3, small-angle)
/// - Camera-IMU Translation (3) in Body Frame
///
/// Rotations are minimal tangent perturbations: `q <- q * dq(dtheta)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStateBlock {
    Position,
    Velocity,
    Attitude,
    GyroBias,
    AccelBias,
    Scale,
    VisionWorldRotation,
    ExtrinsicRotation,
    ExtrinsicTranslation,
}

impl ErrorStateBlock {
    /// Every block, in state-vector order.
    pub const ALL: [ErrorStateBlock; 9] = [
        ErrorStateBlock::Position,
        ErrorStateBlock::Velocity,
        ErrorStateBlock::Attitude,
        ErrorStateBlock::GyroBias,
        ErrorStateBlock::AccelBias,
        ErrorStateBlock::Scale,
        ErrorStateBlock::VisionWorldRotation,
        ErrorStateBlock::ExtrinsicRotation,
        ErrorStateBlock::ExtrinsicTranslation,
    ];

    /// Number of error-state columns this block occupies.
    pub const fn dim(self) -> usize {
        match self {
            ErrorStateBlock::Scale => 1,
            _ => 3,
        }
    }

    /// First column of this block.
    pub const fn offset(self) -> usize {
        match self {
            ErrorStateBlock::Position => 0,   // indices 0-2
            ErrorStateBlock::Velocity => 3,   // indices 3-5
            ErrorStateBlock::Attitude => 6,   // indices 6-8
            ErrorStateBlock::GyroBias => 9,   // indices 9-11
            ErrorStateBlock::AccelBias => 12, // indices 12-14
            ErrorStateBlock::Scale => 15,     // index 15
            ErrorStateBlock::VisionWorldRotation => 16, // indices 16-18
            ErrorStateBlock::ExtrinsicRotation => 19,   // indices 19-21
            ErrorStateBlock::ExtrinsicTranslation => 22, // indices 22-24
        }
    }

    /// The column range this block occupies in the error state.
    pub const fn columns(self) -> Range<usize> {
        self.offset()..self.offset() + self.dim()
    }

    /// Whether this block is one of the calibration states that stay nearly
    /// constant over the trajectory (biases, scale, alignment, extrinsics).
    pub const fn is_calibration(self) -> bool {
        !matches!(
            self,
            ErrorStateBlock::Position | ErrorStateBlock::Velocity | ErrorStateBlock::Attitude
        )
    }
}

/// The single error-state column of the vision-world yaw. Pose measurements
/// alone leave it unobservable.
pub const VISION_WORLD_YAW_COLUMN: usize = ErrorStateBlock::VisionWorldRotation.offset() + 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_tile_the_error_state() {
        let mut next = 0;
        for block in ErrorStateBlock::ALL {
            assert_eq!(block.offset(), next, "{:?} is not contiguous", block);
            next = block.columns().end;
        }
        assert_eq!(next, ERROR_STATE_DIM);
    }

    #[test]
    fn yaw_column_is_last_vision_world_column() {
        assert_eq!(VISION_WORLD_YAW_COLUMN, 18);
        assert!(ErrorStateBlock::VisionWorldRotation
            .columns()
            .contains(&VISION_WORLD_YAW_COLUMN));
    }
}
