// argus_core/src/models/measurement/convention.rs

use nalgebra::{Matrix6, UnitQuaternion, Vector3};

use crate::messages::{PoseConvention, PoseMeasurement};
use crate::utils::geometry::rotation_matrix;

/// A pose in the canonical convention: the sensor w.r.t. the world.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub covariance: Option<Matrix6<f64>>,
}

/// Brings a reported pose into the canonical sensor-w.r.t.-world convention.
///
/// For [`PoseConvention::WorldInSensor`] the pose is inverted
/// (`q' = q*`, `p' = -R(q)ᵀ p`) and the covariance is transformed congruently
/// with `J = diag(R(q), R(q))`: `Σ' = Jᵀ Σ J`. Applying the inversion twice
/// returns the original pose.
pub fn normalize(
    position: &Vector3<f64>,
    orientation: &UnitQuaternion<f64>,
    covariance: Option<&Matrix6<f64>>,
    convention: PoseConvention,
) -> CanonicalPose {
    match convention {
        PoseConvention::SensorInWorld => CanonicalPose {
            position: *position,
            orientation: *orientation,
            covariance: covariance.copied(),
        },
        PoseConvention::WorldInSensor => {
            let c_zq = rotation_matrix(orientation);

            let mut jacobian = Matrix6::zeros();
            jacobian.fixed_view_mut::<3, 3>(0, 0).copy_from(&c_zq);
            jacobian.fixed_view_mut::<3, 3>(3, 3).copy_from(&c_zq);

            CanonicalPose {
                position: -(c_zq.transpose() * position),
                orientation: orientation.conjugate(),
                covariance: covariance.map(|cov| jacobian.transpose() * cov * jacobian),
            }
        }
    }
}

/// [`normalize`] applied to a whole message.
pub fn normalize_measurement(
    measurement: &PoseMeasurement,
    convention: PoseConvention,
) -> CanonicalPose {
    normalize(
        &measurement.position,
        &measurement.orientation,
        measurement.covariance.as_ref(),
        convention,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_covariance() -> Matrix6<f64> {
        let a = Matrix6::from_fn(|i, j| ((i * 7 + j * 3) % 5) as f64 * 0.1);
        a * a.transpose() + Matrix6::identity() * 0.01
    }

    #[test]
    fn sensor_in_world_passes_through() {
        let p = Vector3::new(1.0, -2.0, 0.5);
        let q = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let cov = sample_covariance();

        let out = normalize(&p, &q, Some(&cov), PoseConvention::SensorInWorld);

        assert_eq!(out.position, p);
        assert_eq!(out.orientation, q);
        assert_eq!(out.covariance, Some(cov));
    }

    #[test]
    fn inversion_yields_inverse_pose() {
        let p = Vector3::new(1.0, -2.0, 0.5);
        let q = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);

        let out = normalize(&p, &q, None, PoseConvention::WorldInSensor);

        // Composing a transform with its inverse gives the identity.
        let composed_rotation = q * out.orientation;
        let composed_translation = q * out.position + p;
        assert_abs_diff_eq!(composed_rotation.angle(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(composed_translation, Vector3::zeros(), epsilon = 1e-12);
        assert!(out.covariance.is_none());
    }

    #[test]
    fn inversion_is_self_inverse() {
        let p = Vector3::new(0.4, 3.0, -1.2);
        let q = UnitQuaternion::from_euler_angles(-0.6, 0.25, 2.1);
        let cov = sample_covariance();

        let once = normalize(&p, &q, Some(&cov), PoseConvention::WorldInSensor);
        let twice = normalize(
            &once.position,
            &once.orientation,
            once.covariance.as_ref(),
            PoseConvention::WorldInSensor,
        );

        assert_abs_diff_eq!(twice.position, p, epsilon = 1e-12);
        assert_abs_diff_eq!(twice.orientation.angle_to(&q), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(twice.covariance.unwrap(), cov, epsilon = 1e-12);
    }

    #[test]
    fn inversion_keeps_covariance_symmetric() {
        let q = UnitQuaternion::from_euler_angles(0.3, -0.2, 0.9);
        let cov = sample_covariance();
        let out = normalize(&Vector3::zeros(), &q, Some(&cov), PoseConvention::WorldInSensor)
            .covariance
            .unwrap();
        assert_abs_diff_eq!(out, out.transpose(), epsilon = 1e-12);
        assert_abs_diff_eq!(out.trace(), cov.trace(), epsilon = 1e-12);
    }
}
