//! Tangent-line and circle geometry in a cylinder's cross-section plane.
//!
//! All functions here are planar and work on a cylinder's local XY plane
//! (the cylinder axis is local Z). They report "no solution" as `None`
//! rather than approximating.
//!
//! # Tangents from a point
//!
//! For a circle of radius `r` centred at `c` and an external point `p` at
//! distance `D`, the tangent length is `L = √(D² − r²)`. The two tangent
//! points are where the circle meets an auxiliary circle of radius `L`
//! centred on `p`:
//!
//! ```text
//!            t₁
//!          ╱ |
//!     L  ╱   | r
//!      ╱     |
//!    p ──────c
//!      ╲     |
//!     L  ╲   | r
//!          ╲ |
//!            t₂
//! ```

use nalgebra::{Point2, Vector2};

use crate::math::{cross_2d, perp_ccw, perp_cw};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance used for coincident centres and zero-length directions.
const GEOMETRY_EPSILON: f64 = 1e-12;

/// Intersection points of two circles.
///
/// Returns `None` when the circles are separate, one contains the other, or
/// they coincide. Touching circles give two identical points.
#[must_use]
pub fn circle_circle_intersections(
    c0: &Point2<f64>,
    r0: f64,
    c1: &Point2<f64>,
    r1: f64,
) -> Option<[Point2<f64>; 2]> {
    let delta = c1 - c0;
    let dist = delta.norm();

    if dist < GEOMETRY_EPSILON {
        return None;
    }
    // small slack so tangency computed with rounding still meets
    let slack = GEOMETRY_EPSILON * (1.0 + r0 + r1);
    if dist > r0 + r1 + slack || dist < (r0 - r1).abs() - slack {
        return None;
    }

    let a = (r0 * r0 - r1 * r1 + dist * dist) / (2.0 * dist);
    let h = (r0 * r0 - a * a).max(0.0).sqrt();

    let u = delta / dist;
    let mid = c0 + u * a;
    let offset = perp_cw(&u) * h;

    Some([mid + offset, mid - offset])
}

/// The two tangent points on a circle as seen from an external point.
///
/// Returns `None` if the point lies inside the circle (`D² < r²`). A point
/// exactly on the circle yields a degenerate pair, both equal to the point.
///
/// The first point is reached turning clockwise from the centre-to-point
/// direction, the second counter-clockwise:
/// `angle(tᵢ − c) = angle(p − c) ∓ acos(r / D)`.
#[must_use]
pub fn find_tangents(
    center: &Point2<f64>,
    radius: f64,
    external: &Point2<f64>,
) -> Option<[Point2<f64>; 2]> {
    let d_squared = (external - center).norm_squared();
    let r_squared = radius * radius;
    if d_squared < r_squared {
        return None;
    }
    if d_squared - r_squared <= GEOMETRY_EPSILON * r_squared.max(1.0) {
        return Some([*external, *external]);
    }

    let tangent_length = (d_squared - r_squared).sqrt();
    circle_circle_intersections(center, radius, external, tangent_length)
}

/// A straight segment touching two circles, running from circle 1 to circle 2.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bitangent {
    /// Tangent point on the first circle.
    pub start: Point2<f64>,
    /// Tangent point on the second circle.
    pub end: Point2<f64>,
}

impl Bitangent {
    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Which side of the travel direction a circle centre lies on:
    /// positive for left, negative for right.
    #[must_use]
    pub fn side_of(&self, center: &Point2<f64>, at: &Point2<f64>) -> f64 {
        cross_2d(&(self.end - self.start), &(center - at))
    }
}

/// All common tangents of two circles.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CircleTangents {
    /// Tangents with both circles on the same side.
    pub outer: [Bitangent; 2],
    /// Tangents crossing between the circles; `None` when they overlap.
    pub inner: Option<[Bitangent; 2]>,
}

/// Common tangents of two circles, each segment running from circle 1 to
/// circle 2.
///
/// Outer tangents come from the tangents of `c1` to a circle of radius
/// `r2 − r1` about `c2`, pushed sideways by `r1`. Inner tangents come from
/// the tangents of `c2` to a circle of radius `r1 + r2` about `c1`, pulled
/// back by `r2`; they only exist when the circles do not overlap.
///
/// Returns `None` when one circle lies inside the other.
#[must_use]
pub fn find_circle_circle_tangents(
    c1: &Point2<f64>,
    r1: f64,
    c2: &Point2<f64>,
    r2: f64,
) -> Option<CircleTangents> {
    if r1 > r2 {
        let swapped = find_circle_circle_tangents(c2, r2, c1, r1)?;
        let reverse = |t: Bitangent| Bitangent {
            start: t.end,
            end: t.start,
        };
        return Some(CircleTangents {
            outer: swapped.outer.map(reverse),
            inner: swapped.inner.map(|inner| inner.map(reverse)),
        });
    }

    let [o1, o2] = find_tangents(c2, r2 - r1, c1)?;
    let u1 = (o1 - c1).try_normalize(GEOMETRY_EPSILON)?;
    let u2 = (o2 - c1).try_normalize(GEOMETRY_EPSILON)?;
    let shift1: Vector2<f64> = perp_ccw(&u1) * r1;
    let shift2: Vector2<f64> = perp_cw(&u2) * r1;
    let outer = [
        Bitangent {
            start: c1 + shift1,
            end: o1 + shift1,
        },
        Bitangent {
            start: c1 + shift2,
            end: o2 + shift2,
        },
    ];

    let inner = if (c2 - c1).norm() <= r1 + r2 {
        None
    } else {
        find_tangents(c1, r1 + r2, c2).and_then(|[i1, i2]| {
            let n1 = (i1 - c1).try_normalize(GEOMETRY_EPSILON)?;
            let n2 = (i2 - c1).try_normalize(GEOMETRY_EPSILON)?;
            Some([
                Bitangent {
                    start: c1 + n1 * r1,
                    end: c2 - n1 * r2,
                },
                Bitangent {
                    start: c1 + n2 * r1,
                    end: c2 - n2 * r2,
                },
            ])
        })
    };

    Some(CircleTangents { outer, inner })
}
