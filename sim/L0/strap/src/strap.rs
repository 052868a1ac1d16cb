//! The strap: one path variant plus its per-step bookkeeping.
//!
//! A [`Strap`] is evaluated once per physics step. Evaluation is a pure
//! function of the current marker poses; the only state carried between steps
//! is the previous length, used for the finite-difference velocity:
//!
//! ```text
//! v = (L - L_prev) / Δt      (0 on the first step or when Δt ≤ 0)
//! ```

use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::body::BodyPoses;
use crate::cylinder::{CylinderWrap, WrapStatus};
use crate::force::{FrameVector, PointForce};
use crate::marker::{Marker, MarkerId, MarkerSet};
use crate::path::{NPoint, PathSolution, TwoPoint};
use crate::two_cylinder::{TwoCylinderOutcome, TwoCylinderWrap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of a strap within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StrapId(pub usize);

impl StrapId {
    /// Index into the owning model.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for StrapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Strap({})", self.0)
    }
}

/// The path variant of a strap.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StrapKind {
    /// Straight origin-insertion segment.
    TwoPoint(TwoPoint),
    /// Polyline through via points.
    NPoint(NPoint),
    /// Wrap around one cylinder.
    CylinderWrap(CylinderWrap),
    /// Wrap around two cylinders.
    TwoCylinderWrap(TwoCylinderWrap),
}

impl StrapKind {
    /// Markers read by this variant.
    #[must_use]
    pub fn markers(&self) -> Vec<MarkerId> {
        match self {
            Self::TwoPoint(p) => p.markers(),
            Self::NPoint(p) => p.markers(),
            Self::CylinderWrap(w) => w.markers(),
            Self::TwoCylinderWrap(w) => w.markers(),
        }
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::TwoPoint(_) => "two-point",
            Self::NPoint(_) => "n-point",
            Self::CylinderWrap(_) => "cylinder-wrap",
            Self::TwoCylinderWrap(_) => "two-cylinder-wrap",
        }
    }
}

/// A muscle-tendon path with its current length, velocity and forces.
///
/// # Example
///
/// ```
/// use nalgebra::Point3;
/// use sim_strap::{BodyPoses, Marker, MarkerSet, Strap, StrapKind, TwoPoint};
///
/// let mut markers = MarkerSet::new();
/// let o = markers.insert(Marker::world("o")).unwrap();
/// let i = markers
///     .insert(Marker::world("i").with_position(Point3::new(0.0, 0.0, 0.3)))
///     .unwrap();
///
/// let mut strap = Strap::new("biceps", StrapKind::TwoPoint(TwoPoint::new(o, i)));
/// strap.calculate(&markers, &BodyPoses::new(), 0.01);
/// assert!((strap.length() - 0.3).abs() < 1e-12);
/// assert_eq!(strap.velocity(), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Strap {
    name: String,
    kind: StrapKind,
    /// `None` until the first evaluation.
    length: Option<f64>,
    velocity: f64,
    point_forces: Vec<PointForce>,
    path: Vec<Point3<f64>>,
    fixups: usize,
}

impl Strap {
    /// Create a strap. Nothing is computed until [`calculate`](Self::calculate).
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StrapKind) -> Self {
        Self {
            name: name.into(),
            kind,
            length: None,
            velocity: 0.0,
            point_forces: Vec::new(),
            path: Vec::new(),
            fixups: 0,
        }
    }

    /// Strap name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path variant.
    #[must_use]
    pub fn kind(&self) -> &StrapKind {
        &self.kind
    }

    /// Current length; 0 before the first evaluation.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length.unwrap_or(0.0)
    }

    /// Rate of change of length over the last step.
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Unit-tension forces from the last evaluation.
    #[must_use]
    pub fn point_forces(&self) -> &[PointForce] {
        &self.point_forces
    }

    /// Ordered world points along the path, for display only.
    #[must_use]
    pub fn path_coordinates(&self) -> &[Point3<f64>] {
        &self.path
    }

    /// Number of non-finite directions replaced with zero in the last
    /// evaluation.
    #[must_use]
    pub fn fixup_count(&self) -> usize {
        self.fixups
    }

    /// Single-cylinder wrap status, if this is a cylinder wrap.
    #[must_use]
    pub fn wrap_status(&self) -> Option<WrapStatus> {
        match &self.kind {
            StrapKind::CylinderWrap(w) => Some(w.status()),
            _ => None,
        }
    }

    /// Double-cylinder outcome, if this is a double wrap.
    #[must_use]
    pub fn two_cylinder_outcome(&self) -> Option<TwoCylinderOutcome> {
        match &self.kind {
            StrapKind::TwoCylinderWrap(w) => Some(w.outcome()),
            _ => None,
        }
    }

    /// Recompute the path from current marker poses.
    ///
    /// `time_increment` is the step since the previous call and only feeds the
    /// velocity. Degenerate geometry never fails: it falls back to the
    /// straight path or to zero directions, with a warning.
    pub fn calculate(&mut self, markers: &MarkerSet, bodies: &BodyPoses, time_increment: f64) {
        if let Some(missing) = self
            .kind
            .markers()
            .into_iter()
            .find(|&id| markers.get(id).is_none())
        {
            warn!(
                strap = %self.name,
                marker = %missing,
                "marker not in set, strap left unevaluated"
            );
            self.velocity = 0.0;
            self.point_forces.clear();
            self.path.clear();
            self.fixups = 0;
            return;
        }

        let PathSolution {
            length,
            mut forces,
            coordinates,
        } = self.solve(markers, bodies);

        let mut fixups = 0;
        for (index, force) in forces.iter_mut().enumerate() {
            if !force.is_finite() {
                warn!(
                    strap = %self.name,
                    index,
                    direction = ?force.direction,
                    "non-finite point force direction replaced with zero"
                );
                force.direction = Vector3::zeros();
                fixups += 1;
            }
        }

        self.velocity = match self.length {
            Some(previous) if time_increment > 0.0 => (length - previous) / time_increment,
            _ => 0.0,
        };
        self.length = Some(length);
        self.point_forces = forces;
        self.path = coordinates;
        self.fixups = fixups;
    }

    fn solve(&mut self, markers: &MarkerSet, bodies: &BodyPoses) -> PathSolution {
        let name = &self.name;
        match &mut self.kind {
            StrapKind::TwoPoint(path) => path.solve(markers, bodies),
            StrapKind::NPoint(path) => path.solve(markers, bodies),
            StrapKind::CylinderWrap(wrap) => {
                let (status, solution) = wrap.solve(markers, bodies);
                if status == WrapStatus::Impossible {
                    warn!(
                        strap = %name,
                        "attachment inside wrap cylinder, using straight path"
                    );
                }
                if status != wrap.status {
                    debug!(strap = %name, from = ?wrap.status, to = ?status, "wrap status changed");
                }
                wrap.status = status;
                solution
            }
            StrapKind::TwoCylinderWrap(wrap) => {
                let (outcome, solution) = wrap.solve(markers, bodies);
                if outcome == TwoCylinderOutcome::NoSolution {
                    warn!(
                        strap = %name,
                        "attachment inside wrap cylinder, using straight path"
                    );
                }
                if outcome != wrap.outcome {
                    debug!(strap = %name, from = ?wrap.outcome, to = ?outcome, "wrap outcome changed");
                }
                wrap.outcome = outcome;
                solution
            }
        }
    }

    /// Torque exerted about a marker by the forces acting on the marker's
    /// body, for a given tension.
    ///
    /// Forces on other bodies are ignored, so for a marker at a joint centre
    /// this is the strap's contribution to that joint.
    #[must_use]
    pub fn torque_about(&self, marker: &Marker, bodies: &BodyPoses, tension: f64) -> FrameVector {
        let center = marker.world_position(bodies);
        let world: Vector3<f64> = self
            .point_forces
            .iter()
            .filter(|f| f.body == marker.body())
            .map(|f| f.torque_about(&center, tension))
            .sum();
        FrameVector {
            world,
            local: marker.local_vector(&world, bodies),
        }
    }

    /// Moment arm about a marker: torque per unit tension.
    #[must_use]
    pub fn moment_arm(&self, marker: &Marker, bodies: &BodyPoses) -> FrameVector {
        self.torque_about(marker, bodies, 1.0)
    }
}
