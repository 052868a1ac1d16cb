//! Straight and via-point strap paths.
//!
//! # Path Computation
//!
//! The length is the polyline length through the attachment points:
//!
//! ```text
//! L = Σᵢ ||pᵢ₊₁ - pᵢ||
//! ```
//!
//! Forces follow from a single tension along the polyline. An end point is
//! pulled toward its neighbour. A via point is frictionless, so it feels the
//! sum of the unit pulls toward both neighbours:
//!
//! ```text
//!   O ●───────● V          dir(V) = û(O − V) + û(I − V)
//!              ╲
//!               ● I
//! ```

use nalgebra::{Point3, Vector3};

use crate::body::BodyPoses;
use crate::force::PointForce;
use crate::marker::{MarkerId, MarkerSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometry produced by one strap evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathSolution {
    /// Total path length.
    pub length: f64,

    /// Forces in strap-specific order (attachments first).
    pub forces: Vec<PointForce>,

    /// Ordered world points along the path, for display.
    pub coordinates: Vec<Point3<f64>>,
}

/// Unit vector from `from` to `to`.
///
/// Coincident points give a non-finite vector; the strap replaces it.
pub(crate) fn direction(from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64> {
    let delta = to - from;
    delta / delta.norm()
}

/// Length of a polyline.
#[must_use]
pub fn polyline_length(points: &[Point3<f64>]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// Directions of a frictionless polyline under unit tension.
#[must_use]
pub fn polyline_directions(points: &[Point3<f64>]) -> Vec<Vector3<f64>> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let prev = i.checked_sub(1).map(|j| direction(&points[i], &points[j]));
            let next = (i + 1 < n).then(|| direction(&points[i], &points[i + 1]));
            match (prev, next) {
                (Some(a), Some(b)) => a + b,
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => Vector3::zeros(),
            }
        })
        .collect()
}

/// A straight strap between two markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwoPoint {
    /// Origin marker.
    pub origin: MarkerId,
    /// Insertion marker.
    pub insertion: MarkerId,
}

impl TwoPoint {
    /// Create a two-point path.
    #[must_use]
    pub fn new(origin: MarkerId, insertion: MarkerId) -> Self {
        Self { origin, insertion }
    }

    /// Markers read by this path.
    #[must_use]
    pub fn markers(&self) -> Vec<MarkerId> {
        vec![self.origin, self.insertion]
    }

    /// Evaluate the path for the current body poses.
    ///
    /// Forces are `[origin, insertion]`.
    #[must_use]
    pub fn solve(&self, markers: &MarkerSet, bodies: &BodyPoses) -> PathSolution {
        let origin = &markers[self.origin];
        let insertion = &markers[self.insertion];
        let o = origin.world_position(bodies);
        let i = insertion.world_position(bodies);

        let towards_insertion = direction(&o, &i);
        PathSolution {
            length: (i - o).norm(),
            forces: vec![
                PointForce::new(origin.body(), o, towards_insertion),
                PointForce::new(insertion.body(), i, -towards_insertion),
            ],
            coordinates: vec![o, i],
        }
    }
}

/// A strap running through an ordered list of via points.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NPoint {
    /// Origin marker.
    pub origin: MarkerId,
    /// Via points in path order. Never empty.
    pub via_points: Vec<MarkerId>,
    /// Insertion marker.
    pub insertion: MarkerId,
}

impl NPoint {
    /// Create a via-point path.
    #[must_use]
    pub fn new(origin: MarkerId, via_points: Vec<MarkerId>, insertion: MarkerId) -> Self {
        Self {
            origin,
            via_points,
            insertion,
        }
    }

    /// Markers read by this path, in path order.
    #[must_use]
    pub fn markers(&self) -> Vec<MarkerId> {
        std::iter::once(self.origin)
            .chain(self.via_points.iter().copied())
            .chain(std::iter::once(self.insertion))
            .collect()
    }

    /// Evaluate the path for the current body poses.
    ///
    /// Forces are `[origin, insertion, via points...]`.
    #[must_use]
    pub fn solve(&self, markers: &MarkerSet, bodies: &BodyPoses) -> PathSolution {
        let ids = self.markers();
        let points: Vec<Point3<f64>> = ids
            .iter()
            .map(|&id| markers[id].world_position(bodies))
            .collect();
        let directions = polyline_directions(&points);

        let force_at = |k: usize| PointForce::new(markers[ids[k]].body(), points[k], directions[k]);
        let last = ids.len() - 1;
        let forces = [0, last]
            .into_iter()
            .chain(1..last)
            .map(force_at)
            .collect();

        PathSolution {
            length: polyline_length(&points),
            forces,
            coordinates: points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyId, Pose};
    use crate::force::net_direction;
    use crate::marker::Marker;
    use approx::assert_relative_eq;

    fn world_markers(points: &[[f64; 3]]) -> (MarkerSet, Vec<MarkerId>) {
        let mut set = MarkerSet::new();
        let ids = points
            .iter()
            .enumerate()
            .map(|(k, p)| {
                set.insert(
                    Marker::world(format!("m{k}")).with_position(Point3::new(p[0], p[1], p[2])),
                )
                .unwrap()
            })
            .collect();
        (set, ids)
    }

    #[test]
    fn test_polyline_length() {
        let points = [
            Point3::origin(),
            Point3::new(3.0, 4.0, 0.0),
            Point3::new(3.0, 4.0, 2.0),
        ];
        assert_relative_eq!(polyline_length(&points), 7.0, epsilon = 1e-12);
        assert_relative_eq!(polyline_length(&points[..1]), 0.0);
    }

    #[test]
    fn test_two_point() {
        let (set, ids) = world_markers(&[[0.0, 0.0, 0.0], [0.0, 3.0, 4.0]]);
        let path = TwoPoint::new(ids[0], ids[1]);
        let solution = path.solve(&set, &BodyPoses::new());

        assert_relative_eq!(solution.length, 5.0, epsilon = 1e-12);
        assert_relative_eq!(
            solution.forces[0].direction,
            Vector3::new(0.0, 0.6, 0.8),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            solution.forces[1].direction,
            -solution.forces[0].direction,
            epsilon = 1e-12
        );
        assert_eq!(solution.coordinates.len(), 2);
    }

    #[test]
    fn test_two_point_uses_body_poses() {
        let mut set = MarkerSet::new();
        let body = BodyId::new(7);
        let o = set.insert(Marker::world("o")).unwrap();
        let i = set
            .insert(Marker::on_body("i", body).with_position(Point3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let bodies =
            BodyPoses::new().with_pose(body, Pose::from_position(Point3::new(2.0, 0.0, 0.0)));

        let solution = TwoPoint::new(o, i).solve(&set, &bodies);
        assert_relative_eq!(solution.length, 3.0, epsilon = 1e-12);
        assert_eq!(solution.forces[1].body, Some(body));
        assert_eq!(solution.forces[0].body, None);
    }

    #[test]
    fn test_n_point_via_direction() {
        let (set, ids) = world_markers(&[[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 0.0, 0.0]]);
        let path = NPoint::new(ids[0], vec![ids[1]], ids[2]);
        let solution = path.solve(&set, &BodyPoses::new());

        assert_relative_eq!(solution.length, 2.0 * 2.0_f64.sqrt(), epsilon = 1e-12);
        // order is origin, insertion, via
        let via = solution.forces[2].direction;
        assert_relative_eq!(via, Vector3::new(0.0, -2.0_f64.sqrt(), 0.0), epsilon = 1e-12);
        assert_relative_eq!(net_direction(&solution.forces), Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_n_point_collinear_via_has_no_force() {
        let (set, ids) = world_markers(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [3.0, 0.0, 0.0]]);
        let solution = NPoint::new(ids[0], vec![ids[1]], ids[2]).solve(&set, &BodyPoses::new());
        assert_relative_eq!(solution.forces[2].direction, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(solution.length, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_points_give_non_finite_direction() {
        let points = [Point3::origin(), Point3::origin()];
        let directions = polyline_directions(&points);
        assert!(directions.iter().all(|d| !d.iter().all(|x| x.is_finite())));
    }

    #[test]
    fn test_markers_in_path_order() {
        let (_, ids) = world_markers(&[[0.0; 3], [1.0; 3], [2.0; 3], [3.0; 3]]);
        let path = NPoint::new(ids[0], vec![ids[1], ids[2]], ids[3]);
        assert_eq!(path.markers(), ids);
    }
}
