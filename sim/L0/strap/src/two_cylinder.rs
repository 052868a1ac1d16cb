//! Strap wrapping around two cylinders in sequence.
//!
//! The path leaves the origin, wraps counter-clockwise around cylinder 1,
//! crosses to cylinder 2 along a common tangent, wraps around cylinder 2 and
//! runs to the insertion:
//!
//! ```text
//!   O ●                                   (Opposite sense)
//!      ╲  ╭─╮
//!       ╲│ 1 │╲ bridge    ╭─╮
//!         ╰─╯   ╲_______ │ 2 │
//!                        ╰─╯╲
//!                            ● I
//! ```
//!
//! Both cylinders share cylinder 1's wrap frame. Cylinder 2's centre is
//! projected into that frame and its axis is taken as parallel.
//!
//! # Outcome
//!
//! Every evaluation starts from scratch and tries, in order: the full double
//! wrap, cylinder 1 alone, cylinder 2 alone. The first candidate whose wrap
//! angles all lie strictly inside the policy band wins; otherwise the path is
//! the straight segment.

use nalgebra::{Point2, Point3};

use crate::body::BodyPoses;
use crate::config::{WrapPolicy, DEFAULT_WRAP_SEGMENTS};
use crate::cylinder::{
    helical_path, liftoff_angle, plan_wrap, swept_angle, touchdown_angle, wrap_frame, WrapArc,
    WrapSense, WrapStatus,
};
use crate::force::PointForce;
use crate::marker::{MarkerId, MarkerSet};
use crate::math::polar_angle;
use crate::path::PathSolution;
use crate::tangent::find_circle_circle_tangents;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the path wraps cylinder 2 relative to cylinder 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SecondCylinderSense {
    /// Clockwise around cylinder 2; the bridge is an inner tangent crossing
    /// between the cylinders.
    #[default]
    Opposite,

    /// Counter-clockwise around cylinder 2; the bridge is an outer tangent.
    Same,
}

impl SecondCylinderSense {
    /// Travel sense around cylinder 2.
    #[must_use]
    pub fn wrap_sense(self) -> WrapSense {
        match self {
            Self::Opposite => WrapSense::Clockwise,
            Self::Same => WrapSense::CounterClockwise,
        }
    }
}

/// Result of a double-cylinder evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TwoCylinderOutcome {
    /// The origin is inside cylinder 1 or the insertion inside cylinder 2.
    /// The straight path is used.
    NoSolution,

    /// The path wraps both cylinders.
    DoubleWrap,

    /// The path wraps cylinder 1 only.
    Cylinder1Only,

    /// The path wraps cylinder 2 only.
    Cylinder2Only,

    /// No wrap is admissible; the path is straight.
    #[default]
    Straight,
}

impl TwoCylinderOutcome {
    /// Whether cylinder 1 carries part of the path.
    #[must_use]
    pub fn uses_cylinder1(self) -> bool {
        matches!(self, Self::DoubleWrap | Self::Cylinder1Only)
    }

    /// Whether cylinder 2 carries part of the path.
    #[must_use]
    pub fn uses_cylinder2(self) -> bool {
        matches!(self, Self::DoubleWrap | Self::Cylinder2Only)
    }
}

/// Try the full wrap `O → cylinder 1 → bridge → cylinder 2 → I`.
///
/// The bridge is the common tangent that leaves cylinder 1 with its centre on
/// the left and reaches cylinder 2 with its centre on the side matching the
/// travel sense there, so both arcs join the bridge without a kink.
fn double_wrap(
    o: &Point2<f64>,
    i: &Point2<f64>,
    c1: &Point2<f64>,
    r1: f64,
    c2: &Point2<f64>,
    r2: f64,
    second: WrapSense,
    policy: &WrapPolicy,
) -> Option<[WrapArc; 2]> {
    let first = WrapSense::CounterClockwise;
    let tangents = find_circle_circle_tangents(c1, r1, c2, r2)?;
    let candidates = match second {
        WrapSense::CounterClockwise => tangents.outer,
        WrapSense::Clockwise => tangents.inner?,
    };
    let bridge = candidates.into_iter().find(|b| {
        b.side_of(c1, &b.start) > 0.0 && second.sign() * b.side_of(c2, &b.end) > 0.0
    })?;

    let start1 = touchdown_angle(c1, r1, o, first)?;
    let angle1 = swept_angle(start1, polar_angle(&(bridge.start - c1)), first);
    let start2 = polar_angle(&(bridge.end - c2));
    let angle2 = swept_angle(start2, liftoff_angle(c2, r2, i, second)?, second);

    (policy.admits(angle1) && policy.admits(angle2)).then(|| {
        [
            WrapArc::new(*c1, r1, start1, angle1, first),
            WrapArc::new(*c2, r2, start2, angle2, second),
        ]
    })
}

/// Resolve the double-cylinder state machine in the shared wrap frame.
///
/// Cylinder 1 sits on the local Z axis; cylinder 2 at `c2`. Returns the
/// outcome and the arcs in path order.
#[must_use]
pub fn two_cylinder_wrap(
    o: &Point3<f64>,
    i: &Point3<f64>,
    r1: f64,
    c2: &Point2<f64>,
    r2: f64,
    sense: SecondCylinderSense,
    policy: &WrapPolicy,
) -> (TwoCylinderOutcome, Vec<WrapArc>) {
    let c1 = Point2::origin();
    let (o, i) = (o.xy(), i.xy());
    if (o - c1).norm() <= r1 || (i - c2).norm() <= r2 {
        return (TwoCylinderOutcome::NoSolution, Vec::new());
    }

    let second = sense.wrap_sense();
    let admit = |angle: f64| policy.admits(angle);

    if let Some(arcs) = double_wrap(&o, &i, &c1, r1, c2, r2, second, policy) {
        return (TwoCylinderOutcome::DoubleWrap, arcs.to_vec());
    }
    if let (WrapStatus::Wrapped, Some(arc)) =
        plan_wrap(&o, &i, &c1, r1, WrapSense::CounterClockwise, admit)
    {
        return (TwoCylinderOutcome::Cylinder1Only, vec![arc]);
    }
    if let (WrapStatus::Wrapped, Some(arc)) = plan_wrap(&o, &i, c2, r2, second, admit) {
        return (TwoCylinderOutcome::Cylinder2Only, vec![arc]);
    }
    (TwoCylinderOutcome::Straight, Vec::new())
}

/// A strap wrapping around two cylinders.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwoCylinderWrap {
    /// Origin marker.
    pub origin: MarkerId,
    /// Insertion marker.
    pub insertion: MarkerId,
    /// First cylinder marker; its X axis defines the shared wrap frame.
    pub cylinder1: MarkerId,
    /// First cylinder radius.
    pub radius1: f64,
    /// Second cylinder marker; only its position is used.
    pub cylinder2: MarkerId,
    /// Second cylinder radius.
    pub radius2: f64,
    /// How cylinder 2 is wrapped.
    pub sense: SecondCylinderSense,
    /// Display samples per arc.
    pub segments: usize,
    /// Wrap thresholds.
    pub policy: WrapPolicy,
    pub(crate) outcome: TwoCylinderOutcome,
}

impl TwoCylinderWrap {
    /// Create a double wrap with default sense, policy and tessellation.
    #[must_use]
    pub fn new(
        origin: MarkerId,
        insertion: MarkerId,
        cylinder1: MarkerId,
        radius1: f64,
        cylinder2: MarkerId,
        radius2: f64,
    ) -> Self {
        Self {
            origin,
            insertion,
            cylinder1,
            radius1,
            cylinder2,
            radius2,
            sense: SecondCylinderSense::default(),
            segments: DEFAULT_WRAP_SEGMENTS,
            policy: WrapPolicy::default(),
            outcome: TwoCylinderOutcome::default(),
        }
    }

    /// Set how cylinder 2 is wrapped.
    #[must_use]
    pub fn with_sense(mut self, sense: SecondCylinderSense) -> Self {
        self.sense = sense;
        self
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
    pub fn outcome(&self) -> TwoCylinderOutcome {
        self.outcome
    }

    /// Markers read by this strap.
    #[must_use]
    pub fn markers(&self) -> Vec<MarkerId> {
        vec![self.origin, self.insertion, self.cylinder1, self.cylinder2]
    }

    /// Evaluate the wrap for the current body poses.
    ///
    /// Forces are `[origin, insertion, cylinder 1, cylinder 2]`; a cylinder
    /// the path does not touch gets an inactive force on its axis.
    #[must_use]
    pub fn solve(
        &self,
        markers: &MarkerSet,
        bodies: &BodyPoses,
    ) -> (TwoCylinderOutcome, PathSolution) {
        let origin = &markers[self.origin];
        let insertion = &markers[self.insertion];
        let cylinder1 = &markers[self.cylinder1];
        let cylinder2 = &markers[self.cylinder2];

        let frame = wrap_frame(cylinder1, bodies);
        let o_world = origin.world_position(bodies);
        let i_world = insertion.world_position(bodies);
        let c2_world = cylinder2.world_position(bodies);
        let o = frame.inverse_transform_point(&o_world);
        let i = frame.inverse_transform_point(&i_world);
        let c2 = frame.inverse_transform_point(&c2_world).xy();

        let (outcome, arcs) = two_cylinder_wrap(
            &o,
            &i,
            self.radius1,
            &c2,
            self.radius2,
            self.sense,
            &self.policy,
        );
        let local = helical_path(&o, &i, &arcs, self.segments);

        let mut contacts = local.contacts.iter().map(|(point, reaction)| {
            (
                frame.transform_point(point),
                frame.transform_vector(reaction),
            )
        });
        let cylinder1_force = match outcome.uses_cylinder1().then(|| contacts.next()).flatten() {
            Some((point, reaction)) => PointForce::new(cylinder1.body(), point, reaction),
            None => PointForce::inactive(cylinder1.body(), frame.position),
        };
        let cylinder2_force = match outcome.uses_cylinder2().then(|| contacts.next()).flatten() {
            Some((point, reaction)) => PointForce::new(cylinder2.body(), point, reaction),
            None => PointForce::inactive(cylinder2.body(), c2_world),
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
                cylinder1_force,
                cylinder2_force,
            ],
            coordinates: local
                .coordinates
                .iter()
                .map(|p| frame.transform_point(p))
                .collect(),
        };
        (outcome, solution)
    }
}
