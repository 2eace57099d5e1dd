//! Rotation helpers for the multiplicative error model.
//!
//! Quaternions follow the Hamilton convention (`w, x, y, z`), as nalgebra does.
//! A quaternion `q_ab` describes frame `a` w.r.t. frame `b`: its rotation
//! matrix maps vectors from `a` into `b`.

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

/// Constructs the skew-symmetric matrix [v]× such that [v]× u = v × u.
///
/// ```text
/// [v]× = |  0   -v_z   v_y |
///        |  v_z   0   -v_x |
///        | -v_y  v_x    0  |
/// ```
#[inline]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    )
}

/// The rotation matrix of `q`.
#[inline]
pub fn rotation_matrix(q: &UnitQuaternion<f64>) -> Matrix3<f64> {
    q.to_rotation_matrix().into_inner()
}

/// The rotation matrix of the conjugate of `q`, i.e. the parent-to-child
/// transform when `q` is a child w.r.t. parent rotation.
#[inline]
pub fn conjugate_rotation_matrix(q: &UnitQuaternion<f64>) -> Matrix3<f64> {
    rotation_matrix(&q.conjugate())
}

/// Builds the unit quaternion of a small rotation vector using the
/// first-order map `dq = [1, dtheta / 2]`, renormalized.
pub fn quaternion_from_small_angle(dtheta: &Vector3<f64>) -> UnitQuaternion<f64> {
    let half = dtheta * 0.5;
    UnitQuaternion::from_quaternion(Quaternion::new(1.0, half.x, half.y, half.z))
}

/// The inverse of [`quaternion_from_small_angle`]: `dtheta = 2 vec(q) / w`.
///
/// Returns `None` when `|w|` is below `min_scalar`. The division is
/// ill-conditioned as the rotation approaches 180 degrees.
///
/// `q` and `-q` are the same rotation. The representative with a
/// non-negative scalar part is used, so the result describes the short arc.
pub fn small_angle_from_quaternion(
    q: &UnitQuaternion<f64>,
    min_scalar: f64,
) -> Option<Vector3<f64>> {
    let (w, vec) = if q.w < 0.0 {
        (-q.w, -q.imag())
    } else {
        (q.w, q.imag())
    };

    if w < min_scalar {
        return None;
    }
    Some(vec * (2.0 / w))
}

/// The yaw pseudo-measurement residual of the vision-world alignment.
///
/// Evaluates `-tan(yaw)` of `q` through the ratio form of the standard
/// quaternion-to-yaw conversion, i.e. the residual of a zero-yaw
/// pseudo-measurement.
///
/// Returns `None` when the denominator `1 - 2(y² + z²)` is below
/// `min_denominator` in magnitude, which happens as the yaw approaches ±90
/// degrees.
pub fn vision_yaw_residual(q: &UnitQuaternion<f64>, min_denominator: f64) -> Option<f64> {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    let denominator = 1.0 - 2.0 * (y * y + z * z);
    if denominator.is_nan() || denominator.abs() < min_denominator {
        return None;
    }
    let residual = -2.0 * (w * z + x * y) / denominator;
    residual.is_finite().then_some(residual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn skew_matches_cross_product() {
        let v = Vector3::new(0.3, -1.2, 2.0);
        let u = Vector3::new(-0.7, 0.4, 1.5);
        assert_abs_diff_eq!(skew(&v) * u, v.cross(&u), epsilon = 1e-12);
        assert_abs_diff_eq!(skew(&v).transpose(), -skew(&v), epsilon = 1e-12);
    }

    #[test]
    fn conjugate_rotation_is_transpose() {
        let q = UnitQuaternion::from_euler_angles(0.2, -0.4, 1.1);
        assert_abs_diff_eq!(
            conjugate_rotation_matrix(&q),
            rotation_matrix(&q).transpose(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn rotation_matrix_rotates_like_quaternion() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let v = Vector3::new(1.0, 0.0, 0.0);
        assert_abs_diff_eq!(rotation_matrix(&q) * v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(rotation_matrix(&q) * v, q * v, epsilon = 1e-12);
    }

    #[test]
    fn small_angle_round_trip() {
        let dtheta = Vector3::new(0.01, -0.02, 0.005);
        let q = quaternion_from_small_angle(&dtheta);
        let back = small_angle_from_quaternion(&q, 1e-6).unwrap();
        assert_abs_diff_eq!(back, dtheta, epsilon = 1e-12);
    }

    #[test]
    fn small_angle_uses_short_arc_representative() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.1);
        let negated = UnitQuaternion::new_unchecked(-q.into_inner());
        let a = small_angle_from_quaternion(&q, 1e-6).unwrap();
        let b = small_angle_from_quaternion(&negated, 1e-6).unwrap();
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }

    #[test]
    fn small_angle_rejects_half_turn() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::PI);
        assert!(small_angle_from_quaternion(&q, 1e-6).is_none());
    }

    #[test]
    fn yaw_residual_is_negated_tangent_of_yaw() {
        let yaw = 0.3;
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, yaw);
        assert_abs_diff_eq!(vision_yaw_residual(&q, 1e-6).unwrap(), -yaw.tan(), epsilon = 1e-12);
        assert_abs_diff_eq!(vision_yaw_residual(&UnitQuaternion::identity(), 1e-6).unwrap(), 0.0);
    }

    #[test]
    fn yaw_residual_rejects_quarter_turn() {
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, FRAC_PI_2);
        assert!(vision_yaw_residual(&q, 1e-6).is_none());
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, -FRAC_PI_2);
        assert!(vision_yaw_residual(&q, 1e-6).is_none());
    }
}
