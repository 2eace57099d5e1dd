// argus_core/src/frames.rs

use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};

use crate::frames::layout::{ErrorStateBlock, ERROR_STATE_DIM};
use crate::utils::geometry::quaternion_from_small_angle;

pub mod layout;

/// One buffered snapshot of the filter's nominal state, bundled with its
/// error-state covariance and timestamp.
///
/// Frame conventions follow "child w.r.t. parent": `orientation` rotates body
/// vectors into the world frame, `vision_world` rotates vision-frame vectors
/// into the world frame and `camera_imu` rotates camera vectors into the body.
#[derive(Debug, Clone)]
pub struct FilterState {
    /// The timestamp this snapshot describes, in seconds.
    pub timestamp: f64,
    /// Body position `p` in the World frame.
    pub position: Vector3<f64>,
    /// Body velocity `v` in the World frame.
    pub velocity: Vector3<f64>,
    /// Body orientation `q` w.r.t. the World frame.
    pub orientation: UnitQuaternion<f64>,
    /// Gyroscope bias `b_w`.
    pub gyro_bias: Vector3<f64>,
    /// Accelerometer bias `b_a`.
    pub accel_bias: Vector3<f64>,
    /// Metric scale `L` of the vision frame.
    pub scale: f64,
    /// Vision-World alignment `q_wv`.
    pub vision_world: UnitQuaternion<f64>,
    /// Camera-IMU rotation `q_ci`.
    pub camera_imu_rotation: UnitQuaternion<f64>,
    /// Camera-IMU translation `p_ci`, expressed in the body frame.
    pub camera_imu_translation: Vector3<f64>,
    /// The error-state covariance `P` (25x25).
    pub covariance: DMatrix<f64>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl FilterState {
    /// Creates a snapshot at the origin with identity rotations, unit scale
    /// and the covariance set to a scaled identity matrix.
    pub fn new(timestamp: f64, initial_covariance_val: f64) -> Self {
        Self {
            timestamp,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            gyro_bias: Vector3::zeros(),
            accel_bias: Vector3::zeros(),
            scale: 1.0,
            vision_world: UnitQuaternion::identity(),
            camera_imu_rotation: UnitQuaternion::identity(),
            camera_imu_translation: Vector3::zeros(),
            covariance: DMatrix::identity(ERROR_STATE_DIM, ERROR_STATE_DIM)
                * initial_covariance_val,
        }
    }

    /// Returns the dimension of the error state this snapshot is linearized in.
    pub fn dim(&self) -> usize {
        ERROR_STATE_DIM
    }

    /// Injects an error-state correction into the nominal state.
    ///
    /// Vectors and scale are corrected additively, rotations by right
    /// multiplication with the small-angle quaternion. Only the listed blocks
    /// are touched, so a correction can be restricted to the calibration states.
    pub fn inject_blocks(&mut self, delta: &DVector<f64>, blocks: &[ErrorStateBlock]) {
        assert_eq!(delta.nrows(), ERROR_STATE_DIM);

        let vec3 = |block: ErrorStateBlock| -> Vector3<f64> {
            delta.fixed_rows::<3>(block.offset()).into_owned()
        };

        for &block in blocks {
            match block {
                ErrorStateBlock::Position => self.position += vec3(block),
                ErrorStateBlock::Velocity => self.velocity += vec3(block),
                ErrorStateBlock::Attitude => {
                    self.orientation *= quaternion_from_small_angle(&vec3(block))
                }
                ErrorStateBlock::GyroBias => self.gyro_bias += vec3(block),
                ErrorStateBlock::AccelBias => self.accel_bias += vec3(block),
                ErrorStateBlock::Scale => self.scale += delta[block.offset()],
                ErrorStateBlock::VisionWorldRotation => {
                    self.vision_world *= quaternion_from_small_angle(&vec3(block))
                }
                ErrorStateBlock::ExtrinsicRotation => {
                    self.camera_imu_rotation *= quaternion_from_small_angle(&vec3(block))
                }
                ErrorStateBlock::ExtrinsicTranslation => {
                    self.camera_imu_translation += vec3(block)
                }
            }
        }
    }

    /// Injects a full error-state correction.
    pub fn inject(&mut self, delta: &DVector<f64>) {
        self.inject_blocks(delta, &ErrorStateBlock::ALL);
    }
}
