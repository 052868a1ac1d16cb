//! Small geometric helpers on top of nalgebra.

use std::f64::consts::{PI, TAU};

use nalgebra::{Unit, UnitQuaternion, Vector2, Vector3};

/// Shortest rotation taking direction `from` onto direction `to`.
///
/// The vectors need not be normalized. Antiparallel inputs have no unique
/// shortest rotation; a half turn about an axis perpendicular to `from` is
/// returned instead.
#[must_use]
pub fn rotation_between(from: &Vector3<f64>, to: &Vector3<f64>) -> UnitQuaternion<f64> {
    if let Some(q) = UnitQuaternion::rotation_between(from, to) {
        return q;
    }
    if from.norm_squared() < f64::EPSILON || to.norm_squared() < f64::EPSILON {
        return UnitQuaternion::identity();
    }
    let perp = if from.z.abs() > f64::EPSILON {
        Vector3::new(0.0, -from.z, from.y)
    } else {
        Vector3::new(-from.y, from.x, 0.0)
    };
    UnitQuaternion::from_axis_angle(&Unit::new_normalize(perp), PI)
}

/// Normalize an angle into `[0, 2π)`.
#[must_use]
pub fn positive_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if a >= TAU { 0.0 } else { a }
}

/// Polar angle of a planar vector.
#[must_use]
pub fn polar_angle(v: &Vector2<f64>) -> f64 {
    v.y.atan2(v.x)
}

/// Unit planar vector at the given polar angle.
#[must_use]
pub fn unit_at(angle: f64) -> Vector2<f64> {
    Vector2::new(angle.cos(), angle.sin())
}

/// Rotate a planar vector a quarter turn counter-clockwise.
#[must_use]
pub fn perp_ccw(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-v.y, v.x)
}

/// Rotate a planar vector a quarter turn clockwise.
#[must_use]
pub fn perp_cw(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(v.y, -v.x)
}

/// z component of the planar cross product `a × b`.
#[must_use]
pub fn cross_2d(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Whether every component of the vector is finite.
#[must_use]
pub fn is_finite(v: &Vector3<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_between_general() {
        let from = Vector3::new(0.0, 0.0, 2.0);
        let to = Vector3::new(1.0, 1.0, 0.0);
        let q = rotation_between(&from, &to);
        assert_relative_eq!(q * Vector3::z(), to.normalize(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_between_antiparallel() {
        let q = rotation_between(&Vector3::z(), &(-Vector3::z()));
        assert_relative_eq!(q * Vector3::z(), -Vector3::z(), epsilon = 1e-12);

        let q = rotation_between(&Vector3::x(), &(-Vector3::x()));
        assert_relative_eq!(q * Vector3::x(), -Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_between_identical() {
        let q = rotation_between(&Vector3::x(), &Vector3::x());
        assert_relative_eq!(q.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_positive_angle() {
        assert_relative_eq!(positive_angle(-0.5), TAU - 0.5, epsilon = 1e-12);
        assert_relative_eq!(positive_angle(7.0), 7.0 - TAU, epsilon = 1e-12);
        assert!(positive_angle(-1e-300) < TAU);
        assert_eq!(positive_angle(0.0), 0.0);
    }

    #[test]
    fn test_perpendiculars() {
        let v = Vector2::new(1.0, 0.0);
        assert_relative_eq!(perp_ccw(&v), Vector2::new(0.0, 1.0));
        assert_relative_eq!(perp_cw(&v), Vector2::new(0.0, -1.0));
        assert!(cross_2d(&v, &perp_ccw(&v)) > 0.0);
    }
}
