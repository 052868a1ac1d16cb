//! Strap wrapping around a single cylinder.
//!
//! # Wrap Frame
//!
//! The cylinder is described by a marker. The marker's local X axis is the
//! cylinder axis; it is rotated onto Z so that all wrap geometry happens in
//! the XY plane of a local frame centred on the marker:
//!
//! ```text
//!          T₁ ╭───╮
//!       ╱    ╱  c  ╲      O, I: attachments (outside the circle)
//!    O ●    │   ●   │     T₁, T₂: tangent points
//!            ╲     ╱ ╲    arc T₁→T₂ is counter-clockwise
//!             ╰───╯ T₂ ● I
//! ```
//!
//! # Helical Arc
//!
//! Unrolled onto a plane, the path is a straight line. Height along the
//! cylinder therefore varies linearly with planar path length `s`, and the
//! total length is `√(s_total² + Δz²)`. The path stays tangent-continuous
//! where it touches and leaves the surface.

use nalgebra::{Point2, Point3, Vector3};

use crate::body::{BodyPoses, Pose};
use crate::config::{WrapPolicy, DEFAULT_WRAP_SEGMENTS};
use crate::force::PointForce;
use crate::marker::{Axis, Marker, MarkerId, MarkerSet};
use crate::math::{polar_angle, positive_angle, rotation_between, unit_at};
use crate::path::{direction, PathSolution};
use crate::tangent::find_tangents;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of a single-cylinder wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WrapStatus {
    /// An attachment lies on or inside the cylinder. The straight path is used.
    Impossible,

    /// The wrap angle is outside the policy band. The straight path is used.
    #[default]
    NoWrap,

    /// The path wraps around the cylinder.
    Wrapped,
}

impl WrapStatus {
    /// Check if wrapping occurred.
    #[must_use]
    pub fn is_wrapped(self) -> bool {
        self == Self::Wrapped
    }
}

/// Direction of travel around a cylinder, seen from its +Z axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WrapSense {
    /// Right-hand rule about the cylinder axis.
    #[default]
    CounterClockwise,
    /// Left-hand rule about the cylinder axis.
    Clockwise,
}

impl WrapSense {
    /// `+1` for counter-clockwise, `-1` for clockwise.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::CounterClockwise => 1.0,
            Self::Clockwise => -1.0,
        }
    }

    /// The other sense.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::CounterClockwise => Self::Clockwise,
            Self::Clockwise => Self::CounterClockwise,
        }
    }
}

/// Polar angle where a path coming from `from` touches the circle.
///
/// `None` if `from` is on or inside the circle.
#[must_use]
pub fn touchdown_angle(
    center: &Point2<f64>,
    radius: f64,
    from: &Point2<f64>,
    sense: WrapSense,
) -> Option<f64> {
    if (from - center).norm() <= radius {
        return None;
    }
    let [cw, ccw] = find_tangents(center, radius, from)?;
    let touch = match sense {
        WrapSense::CounterClockwise => ccw,
        WrapSense::Clockwise => cw,
    };
    Some(polar_angle(&(touch - center)))
}

/// Polar angle where a path heading to `to` leaves the circle.
///
/// `None` if `to` is on or inside the circle.
#[must_use]
pub fn liftoff_angle(
    center: &Point2<f64>,
    radius: f64,
    to: &Point2<f64>,
    sense: WrapSense,
) -> Option<f64> {
    touchdown_angle(center, radius, to, sense.reversed())
}

/// Angle swept travelling from `start` to `end` in the given sense, in `[0, 2π)`.
#[must_use]
pub fn swept_angle(start: f64, end: f64, sense: WrapSense) -> f64 {
    positive_angle(sense.sign() * (end - start))
}

/// A planar arc on a cylinder cross-section.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WrapArc {
    /// Circle centre in the wrap plane.
    pub center: Point2<f64>,
    /// Circle radius.
    pub radius: f64,
    /// Polar angle where the path touches down.
    pub start_angle: f64,
    /// Signed angle swept; positive is counter-clockwise.
    pub sweep: f64,
}

impl WrapArc {
    /// Arc from `start_angle` sweeping `angle` in the given sense.
    #[must_use]
    pub fn new(
        center: Point2<f64>,
        radius: f64,
        start_angle: f64,
        angle: f64,
        sense: WrapSense,
    ) -> Self {
        Self {
            center,
            radius,
            start_angle,
            sweep: sense.sign() * angle,
        }
    }

    /// Unsigned wrap angle.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.sweep.abs()
    }

    /// Planar arc length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.radius * self.angle()
    }

    /// Point on the arc at a fraction `t` in `[0, 1]` of the sweep.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        self.center + unit_at(self.start_angle + self.sweep * t) * self.radius
    }

    /// Where the path touches down.
    #[must_use]
    pub fn entry(&self) -> Point2<f64> {
        self.point_at(0.0)
    }

    /// Where the path leaves.
    #[must_use]
    pub fn exit(&self) -> Point2<f64> {
        self.point_at(1.0)
    }
}

/// Plan a wrap of the segment `O → I` around a circle in a fixed sense.
///
/// Returns the status and, when wrapped, the arc. `admit` decides whether a
/// wrap angle is accepted.
pub(crate) fn plan_wrap(
    o: &Point2<f64>,
    i: &Point2<f64>,
    center: &Point2<f64>,
    radius: f64,
    sense: WrapSense,
    admit: impl Fn(f64) -> bool,
) -> (WrapStatus, Option<WrapArc>) {
    let angles = touchdown_angle(center, radius, o, sense)
        .zip(liftoff_angle(center, radius, i, sense));
    let Some((start, end)) = angles else {
        return (WrapStatus::Impossible, None);
    };

    let angle = swept_angle(start, end, sense);
    if admit(angle) {
        (
            WrapStatus::Wrapped,
            Some(WrapArc::new(*center, radius, start, angle, sense)),
        )
    } else {
        (WrapStatus::NoWrap, None)
    }
}

/// Wrap `O → I` counter-clockwise around a cylinder of `radius` on the local Z
/// axis. Both points are in the wrap frame.
///
/// # Example
///
/// ```
/// use nalgebra::Point3;
/// use sim_strap::{single_wrap, WrapPolicy, WrapStatus};
///
/// let o = Point3::new(5.0, 0.0, 0.0);
/// let i = Point3::new(-5.0, 0.0, 0.0);
/// let (status, arc) = single_wrap(&o, &i, 1.0, &WrapPolicy::default());
/// assert_eq!(status, WrapStatus::Wrapped);
/// assert!(arc.is_some());
/// ```
#[must_use]
pub fn single_wrap(
    o: &Point3<f64>,
    i: &Point3<f64>,
    radius: f64,
    policy: &WrapPolicy,
) -> (WrapStatus, Option<WrapArc>) {
    plan_wrap(
        &o.xy(),
        &i.xy(),
        &Point2::origin(),
        radius,
        WrapSense::CounterClockwise,
        |angle| !policy.bypasses(angle),
    )
}

/// A path in a wrap frame: straight runs joined by helical arcs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocalPath {
    pub length: f64,
    pub origin_direction: Vector3<f64>,
    pub insertion_direction: Vector3<f64>,
    /// Per arc: application point on the axis and reaction direction.
    pub contacts: Vec<(Point3<f64>, Vector3<f64>)>,
    pub coordinates: Vec<Point3<f64>>,
}

/// Build the 3-D path `O → arcs → I` in a wrap frame.
///
/// Every arc is sampled with `segments` pieces for display; its reaction is
/// applied on the axis at the height of the arc midpoint.
pub(crate) fn helical_path(
    o: &Point3<f64>,
    i: &Point3<f64>,
    arcs: &[WrapArc],
    segments: usize,
) -> LocalPath {
    // planar distance along the path at each arc entry and exit
    let mut marks = Vec::with_capacity(arcs.len());
    let mut s = 0.0;
    let mut previous = o.xy();
    for arc in arcs {
        s += (arc.entry() - previous).norm();
        let entry_s = s;
        s += arc.length();
        marks.push((entry_s, s));
        previous = arc.exit();
    }
    let planar_total = s + (i.xy() - previous).norm();

    let rise = i.z - o.z;
    let height = |s: f64| {
        if planar_total > f64::EPSILON {
            o.z + rise * s / planar_total
        } else {
            o.z
        }
    };
    let lift = |p: Point2<f64>, s: f64| Point3::new(p.x, p.y, height(s));

    // O, entry₁, exit₁, ..., I
    let mut anchors = Vec::with_capacity(2 * arcs.len() + 2);
    anchors.push(*o);
    for (arc, &(entry_s, exit_s)) in arcs.iter().zip(&marks) {
        anchors.push(lift(arc.entry(), entry_s));
        anchors.push(lift(arc.exit(), exit_s));
    }
    anchors.push(*i);

    let last = anchors.len() - 1;
    let contacts = arcs
        .iter()
        .zip(&marks)
        .enumerate()
        .map(|(k, (arc, &(entry_s, exit_s)))| {
            let entry = &anchors[2 * k + 1];
            let exit = &anchors[2 * k + 2];
            let reaction =
                direction(entry, &anchors[2 * k]) + direction(exit, &anchors[2 * k + 3]);
            let axis_point = lift(arc.center, 0.5 * (entry_s + exit_s));
            (axis_point, reaction)
        })
        .collect();

    let mut coordinates = Vec::with_capacity(anchors.len() + arcs.len() * segments);
    coordinates.push(*o);
    for (arc, &(entry_s, exit_s)) in arcs.iter().zip(&marks) {
        coordinates.push(lift(arc.entry(), entry_s));
        for j in 1..segments {
            let t = j as f64 / segments as f64;
            coordinates.push(lift(arc.point_at(t), entry_s + (exit_s - entry_s) * t));
        }
        coordinates.push(lift(arc.exit(), exit_s));
    }
    coordinates.push(*i);

    LocalPath {
        length: (planar_total * planar_total + rise * rise).sqrt(),
        origin_direction: direction(&anchors[0], &anchors[1]),
        insertion_direction: direction(&anchors[last], &anchors[last - 1]),
        contacts,
        coordinates,
    }
}

/// World pose of the wrap frame defined by a cylinder marker.
///
/// The origin is the marker position; local Z is the marker's X axis.
#[must_use]
pub fn wrap_frame(cylinder: &Marker, bodies: &BodyPoses) -> Pose {
    let axis = rotation_between(&Vector3::z(), &cylinder.axis(Axis::X));
    bodies
        .frame(cylinder.body())
        .compose(&Pose::new(cylinder.position(), axis))
}

/// A strap wrapping around one cylinder.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CylinderWrap {
    /// Origin marker.
    pub origin: MarkerId,
    /// Insertion marker.
    pub insertion: MarkerId,
    /// Marker whose X axis is the cylinder axis.
    pub cylinder: MarkerId,
    /// Cylinder radius.
    pub radius: f64,
    /// Display samples per arc.
    pub segments: usize,
    /// Wrap thresholds.
    pub policy: WrapPolicy,
    pub(crate) status: WrapStatus,
}

impl CylinderWrap {
    /// Create a wrap with default policy and tessellation.
    #[must_use]
    pub fn new(origin: MarkerId, insertion: MarkerId, cylinder: MarkerId, radius: f64) -> Self {
        Self {
            origin,
            insertion,
            cylinder,
            radius,
            segments: DEFAULT_WRAP_SEGMENTS,
            policy: WrapPolicy::default(),
            status: WrapStatus::default(),
        }
    }

    /// Set the display samples per arc.
    #[must_use]
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }

    /// Set the wrap policy.
    #[must_use]
    pub fn with_policy(mut self, policy: WrapPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Outcome of the last evaluation.
    #[must_use]
    pub fn status(&self) -> WrapStatus {
        self.status
    }

    /// Markers read by this strap.
    #[must_use]
    pub fn markers(&self) -> Vec<MarkerId> {
        vec![self.origin, self.insertion, self.cylinder]
    }

    /// Evaluate the wrap for the current body poses.
    ///
    /// Forces are `[origin, insertion, cylinder]`. The cylinder force is
    /// inactive unless the path wraps.
    #[must_use]
    pub fn solve(&self, markers: &MarkerSet, bodies: &BodyPoses) -> (WrapStatus, PathSolution) {
        let origin = &markers[self.origin];
        let insertion = &markers[self.insertion];
        let cylinder = &markers[self.cylinder];

        let frame = wrap_frame(cylinder, bodies);
        let o_world = origin.world_position(bodies);
        let i_world = insertion.world_position(bodies);
        let o = frame.inverse_transform_point(&o_world);
        let i = frame.inverse_transform_point(&i_world);

        let (status, arc) = single_wrap(&o, &i, self.radius, &self.policy);
        let local = helical_path(&o, &i, arc.as_slice(), self.segments);

        let cylinder_force = match local.contacts.first() {
            Some((point, reaction)) => PointForce::new(
                cylinder.body(),
                frame.transform_point(point),
                frame.transform_vector(reaction),
            ),
            None => PointForce::inactive(cylinder.body(), frame.position),
        };

        let solution = PathSolution {
            length: local.length,
            forces: vec![
                PointForce::new(
                    origin.body(),
                    o_world,
                    frame.transform_vector(&local.origin_direction),
                ),
                PointForce::new(
                    insertion.body(),
                    i_world,
                    frame.transform_vector(&local.insertion_direction),
                ),
                cylinder_force,
            ],
            coordinates: local
                .coordinates
                .iter()
                .map(|p| frame.transform_point(p))
                .collect(),
        };
        (status, solution)
    }
}
