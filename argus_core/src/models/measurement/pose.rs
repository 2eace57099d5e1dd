// argus_core/src/models/measurement/pose.rs

use nalgebra::{DMatrix, DVector, Matrix3, UnitQuaternion, Vector3};

use crate::error::MeasurementError;
use crate::frames::layout::{ErrorStateBlock, VISION_WORLD_YAW_COLUMN};
use crate::frames::FilterState;
use crate::models::measurement::convention::CanonicalPose;
use crate::models::measurement::{Measurement, MeasurementRow};
use crate::types::{PoseJacobian, PoseResidual, POSE_MEASUREMENT_DIM};
use crate::utils::geometry::{
    conjugate_rotation_matrix, skew, small_angle_from_quaternion, vision_yaw_residual,
};

const POSITION_ROW: usize = 0;
const ATTITUDE_ROW: usize = 3;
const VISION_YAW_ROW: usize = 6;

/// Default lower bound on the scalar part of the attitude error quaternion.
pub const DEFAULT_MIN_ATTITUDE_SCALAR: f64 = 1e-6;

/// The sensor pose predicted from a state snapshot, in the vision frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

/// Measurement model of a 6-DOF pose sensor (camera) observed through the
/// vision frame, with unknown scale, vision-world alignment and camera-IMU
/// extrinsics.
///
/// ```text
/// z_p = C_wvᵀ (p + C_qᵀ p_ci) L
/// z_q = q_wv ⊗ q ⊗ q_ci
/// ```
/// where `C_x` is the rotation matrix of `conj(q_x)`.
#[derive(Debug, Clone, Copy)]
pub struct PoseModel {
    /// Attitude errors whose scalar part falls below this are rejected.
    pub min_attitude_scalar: f64,
}

impl Default for PoseModel {
    fn default() -> Self {
        Self {
            min_attitude_scalar: DEFAULT_MIN_ATTITUDE_SCALAR,
        }
    }
}

/// The rotation matrices shared by prediction and linearization.
struct Rotations {
    c_wv: Matrix3<f64>,
    c_q: Matrix3<f64>,
    c_ci: Matrix3<f64>,
}

impl Rotations {
    fn of(state: &FilterState) -> Self {
        Self {
            c_wv: conjugate_rotation_matrix(&state.vision_world),
            c_q: conjugate_rotation_matrix(&state.orientation),
            c_ci: conjugate_rotation_matrix(&state.camera_imu_rotation),
        }
    }
}

/// Writes a 3x3 block into the rows starting at `row`, in the columns of `block`.
fn set_block(h: &mut PoseJacobian, row: usize, block: ErrorStateBlock, value: &Matrix3<f64>) {
    debug_assert_eq!(block.dim(), 3);
    h.fixed_view_mut::<3, 3>(row, block.offset()).copy_from(value);
}

impl PoseModel {
    /// Predicts the camera pose `h(x)` the sensor should report.
    pub fn predict_measurement(&self, state: &FilterState) -> PredictedPose {
        let rot = Rotations::of(state);
        let camera_in_world =
            state.position + rot.c_q.transpose() * state.camera_imu_translation;

        PredictedPose {
            position: rot.c_wv.transpose() * camera_in_world * state.scale,
            orientation: state.vision_world * state.orientation * state.camera_imu_rotation,
        }
    }

    /// Builds the 7x25 observation Jacobian at `state`.
    ///
    /// Only the position, attitude, scale, vision-world rotation and extrinsic
    /// blocks are non-zero. Row 6 anchors the vision-world yaw.
    pub fn jacobian(&self, state: &FilterState) -> PoseJacobian {
        let Rotations { c_wv, c_q, c_ci } = Rotations::of(state);
        let scale = state.scale;
        let p = &state.position;
        let p_ci = &state.camera_imu_translation;

        let camera_in_world_scaled = (p + c_q.transpose() * p_ci) * scale;
        let skew_camera = skew(&camera_in_world_scaled);
        let skew_p_ci = skew(p_ci);

        let mut h = PoseJacobian::zeros();

        // position
        set_block(&mut h, POSITION_ROW, ErrorStateBlock::Position, &(c_wv.transpose() * scale));
        set_block(
            &mut h,
            POSITION_ROW,
            ErrorStateBlock::Attitude,
            &(-c_wv.transpose() * c_q.transpose() * skew_p_ci * scale),
        );
        h.fixed_view_mut::<3, 1>(POSITION_ROW, ErrorStateBlock::Scale.offset())
            .copy_from(&(c_wv.transpose() * c_q.transpose() * p_ci + c_wv.transpose() * p));
        set_block(
            &mut h,
            POSITION_ROW,
            ErrorStateBlock::VisionWorldRotation,
            &(-c_wv.transpose() * skew_camera),
        );
        set_block(
            &mut h,
            POSITION_ROW,
            ErrorStateBlock::ExtrinsicTranslation,
            &(c_wv.transpose() * c_q.transpose() * scale),
        );

        // attitude
        set_block(&mut h, ATTITUDE_ROW, ErrorStateBlock::Attitude, &c_ci);
        set_block(
            &mut h,
            ATTITUDE_ROW,
            ErrorStateBlock::VisionWorldRotation,
            &(c_ci * c_q),
        );
        set_block(
            &mut h,
            ATTITUDE_ROW,
            ErrorStateBlock::ExtrinsicRotation,
            &Matrix3::identity(),
        );

        // pseudo-measurement pinning the otherwise unobservable vision-world yaw
        h[(VISION_YAW_ROW, VISION_WORLD_YAW_COLUMN)] = 1.0;

        h
    }

    /// Computes the innovation of a canonical reading against `state`.
    ///
    /// Rows 0-2 hold the position error, rows 3-5 the small-angle attitude
    /// error `2 vec(q_err) / w(q_err)` with `q_err = conj(ẑ_q) ⊗ z_q`, and
    /// row 6 the vision-world yaw residual, which does not depend on the reading.
    pub fn residual(
        &self,
        state: &FilterState,
        reading: &CanonicalPose,
    ) -> Result<PoseResidual, MeasurementError> {
        let predicted = self.predict_measurement(state);

        let q_err = predicted.orientation.conjugate() * reading.orientation;
        let attitude_error = small_angle_from_quaternion(&q_err, self.min_attitude_scalar)
            .ok_or(MeasurementError::IllConditionedAttitude { scalar: q_err.w })?;

        let vw = &state.vision_world;
        let yaw = vision_yaw_residual(vw, self.min_attitude_scalar).ok_or(
            MeasurementError::IllConditionedYaw {
                denominator: 1.0 - 2.0 * (vw.j * vw.j + vw.k * vw.k),
            },
        )?;

        let mut r = PoseResidual::zeros();
        r.fixed_rows_mut::<3>(POSITION_ROW)
            .copy_from(&(reading.position - predicted.position));
        r.fixed_rows_mut::<3>(ATTITUDE_ROW).copy_from(&attitude_error);
        r[VISION_YAW_ROW] = yaw;

        Ok(r)
    }
}

impl Measurement for PoseModel {
    type Reading = CanonicalPose;

    fn get_measurement_layout(&self) -> Vec<MeasurementRow> {
        vec![
            MeasurementRow::Px,
            MeasurementRow::Py,
            MeasurementRow::Pz,
            MeasurementRow::AttitudeX,
            MeasurementRow::AttitudeY,
            MeasurementRow::AttitudeZ,
            MeasurementRow::VisionWorldYaw,
        ]
    }

    fn calculate_jacobian(&self, filter_state: &FilterState) -> DMatrix<f64> {
        let h = self.jacobian(filter_state);
        DMatrix::from_column_slice(POSE_MEASUREMENT_DIM, filter_state.dim(), h.as_slice())
    }

    fn calculate_residual(
        &self,
        filter_state: &FilterState,
        reading: &CanonicalPose,
    ) -> Result<DVector<f64>, MeasurementError> {
        let r = self.residual(filter_state, reading)?;
        Ok(DVector::from_column_slice(r.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::layout::ERROR_STATE_DIM;
    use approx::assert_abs_diff_eq;

    fn general_state() -> FilterState {
        let mut state = FilterState::new(0.0, 1.0);
        state.position = Vector3::new(1.0, 2.0, 0.5);
        state.orientation = UnitQuaternion::from_euler_angles(0.1, -0.2, 0.7);
        state.scale = 1.3;
        state.vision_world = UnitQuaternion::from_euler_angles(0.05, 0.02, 0.4);
        state.camera_imu_rotation = UnitQuaternion::from_euler_angles(0.3, 0.1, -0.2);
        state.camera_imu_translation = Vector3::new(0.1, -0.05, 0.02);
        state
    }

    fn reading_from(predicted: PredictedPose) -> CanonicalPose {
        CanonicalPose {
            position: predicted.position,
            orientation: predicted.orientation,
            covariance: None,
        }
    }

    fn block(h: &PoseJacobian, row: usize, block: ErrorStateBlock) -> Matrix3<f64> {
        h.fixed_view::<3, 3>(row, block.offset()).into_owned()
    }

    #[test]
    fn concrete_scenario_has_zero_residual() {
        let mut state = FilterState::new(0.0, 1.0);
        state.position = Vector3::new(1.0, 0.0, 0.0);
        let reading = CanonicalPose {
            position: Vector3::new(1.0, 0.0, 0.0),
            orientation: UnitQuaternion::identity(),
            covariance: None,
        };
        let model = PoseModel::default();

        let r = model.residual(&state, &reading).unwrap();
        assert_abs_diff_eq!(r, PoseResidual::zeros(), epsilon = 1e-12);

        let h = model.jacobian(&state);
        assert_eq!(block(&h, 0, ErrorStateBlock::Position), Matrix3::identity());
        assert_eq!(
            h.fixed_view::<3, 1>(0, ErrorStateBlock::Scale.offset()).into_owned(),
            Vector3::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn attitude_blocks_are_identity_at_identity_extrinsics() {
        let mut state = general_state();
        state.scale = 1.0;
        state.camera_imu_translation = Vector3::zeros();
        state.camera_imu_rotation = UnitQuaternion::identity();

        let h = PoseModel::default().jacobian(&state);

        assert_abs_diff_eq!(
            block(&h, 3, ErrorStateBlock::Attitude),
            Matrix3::identity(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            block(&h, 3, ErrorStateBlock::ExtrinsicRotation),
            Matrix3::identity(),
            epsilon = 1e-12
        );
        // no lever arm, so attitude does not move the camera position
        assert_abs_diff_eq!(
            block(&h, 0, ErrorStateBlock::Attitude),
            Matrix3::zeros(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn untouched_blocks_stay_zero() {
        let h = PoseModel::default().jacobian(&general_state());
        for block in [
            ErrorStateBlock::Velocity,
            ErrorStateBlock::GyroBias,
            ErrorStateBlock::AccelBias,
        ] {
            for col in block.columns() {
                assert!(h.column(col).iter().all(|v| *v == 0.0), "{:?} column {}", block, col);
            }
        }

        // the yaw row touches exactly one column
        for col in 0..ERROR_STATE_DIM {
            let expected = if col == VISION_WORLD_YAW_COLUMN { 1.0 } else { 0.0 };
            assert_eq!(h[(6, col)], expected);
        }
    }

    #[test]
    fn residual_vanishes_for_predicted_pose_at_any_vision_yaw() {
        let model = PoseModel::default();
        for yaw in [-2.5, -0.3, 0.0, 0.8, 3.0] {
            let mut state = general_state();
            state.vision_world = UnitQuaternion::from_euler_angles(0.02, -0.01, yaw);
            let reading = reading_from(model.predict_measurement(&state));

            let r = model.residual(&state, &reading).unwrap();

            assert_abs_diff_eq!(
                r.fixed_rows::<6>(0).into_owned(),
                nalgebra::Vector6::zeros(),
                epsilon = 1e-9
            );
            let expected = vision_yaw_residual(&state.vision_world, 1e-6).unwrap();
            assert_abs_diff_eq!(r[6], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn yaw_row_ignores_the_reading() {
        let model = PoseModel::default();
        let state = general_state();
        let mut reading = reading_from(model.predict_measurement(&state));
        let r0 = model.residual(&state, &reading).unwrap();

        reading.position += Vector3::new(0.3, -0.1, 0.2);
        reading.orientation *= UnitQuaternion::from_euler_angles(0.05, 0.0, -0.04);
        let r1 = model.residual(&state, &reading).unwrap();

        assert_eq!(r0[6], r1[6]);
    }

    #[test]
    fn jacobian_matches_finite_perturbation() {
        let model = PoseModel::default();
        let state = general_state();
        let h = model.jacobian(&state);

        let touched = [
            ErrorStateBlock::Position,
            ErrorStateBlock::Attitude,
            ErrorStateBlock::Scale,
            ErrorStateBlock::VisionWorldRotation,
            ErrorStateBlock::ExtrinsicRotation,
            ErrorStateBlock::ExtrinsicTranslation,
        ];
        let eps = 1e-6;

        for block in touched {
            for col in block.columns() {
                let mut delta = DVector::zeros(ERROR_STATE_DIM);
                delta[col] = eps;

                let mut perturbed = state.clone();
                perturbed.inject(&delta);
                let reading = reading_from(model.predict_measurement(&perturbed));

                let r = model.residual(&state, &reading).unwrap();
                for row in 0..6 {
                    let numeric = r[row] / eps;
                    assert_abs_diff_eq!(numeric, h[(row, col)], epsilon = 1e-4);
                }
            }
        }
    }

    #[test]
    fn ill_conditioned_attitude_error_is_rejected() {
        let model = PoseModel::default();
        let state = general_state();
        let mut reading = reading_from(model.predict_measurement(&state));
        reading.orientation *=
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::PI);

        assert!(matches!(
            model.residual(&state, &reading),
            Err(MeasurementError::IllConditionedAttitude { .. })
        ));
    }

    #[test]
    fn quarter_turn_vision_yaw_is_rejected() {
        let model = PoseModel::default();
        let mut state = general_state();
        state.vision_world =
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        let reading = reading_from(model.predict_measurement(&state));

        assert!(matches!(
            model.residual(&state, &reading),
            Err(MeasurementError::IllConditionedYaw { .. })
        ));
    }

    #[test]
    fn dynamic_views_match_fixed_results() {
        let model = PoseModel::default();
        let state = general_state();
        let reading = reading_from(model.predict_measurement(&state));

        let h = model.calculate_jacobian(&state);
        assert_eq!(h.shape(), (7, ERROR_STATE_DIM));
        assert_eq!(h[(6, VISION_WORLD_YAW_COLUMN)], 1.0);
        assert_eq!(h, DMatrix::from_column_slice(7, 25, model.jacobian(&state).as_slice()));

        let r = model.calculate_residual(&state, &reading).unwrap();
        assert_eq!(r.len(), 7);
        assert_eq!(model.get_measurement_layout().len(), r.len());
    }
}
