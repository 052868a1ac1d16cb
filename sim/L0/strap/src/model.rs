//! A model: bodies, markers and the straps that read them.
//!
//! Straps are defined by marker *names*. Names are resolved once, when the
//! strap is added, and every structural mistake is reported there with the
//! offending identifier. After that, [`StrapModel::calculate_all`] cannot
//! fail.

use hashbrown::HashMap;
use nalgebra::{Point3, UnitQuaternion};

use crate::body::{BodyId, BodyPoses, Pose};
use crate::config::{WrapPolicy, DEFAULT_WRAP_SEGMENTS};
use crate::cylinder::CylinderWrap;
use crate::error::{Result, StrapError};
use crate::marker::{Marker, MarkerId, MarkerSet};
use crate::path::{NPoint, TwoPoint};
use crate::strap::{Strap, StrapId, StrapKind};
use crate::two_cylinder::{SecondCylinderSense, TwoCylinderWrap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A strap described by marker names, before resolution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StrapDefinition {
    /// Straight segment.
    TwoPoint {
        /// Origin marker name.
        origin: String,
        /// Insertion marker name.
        insertion: String,
    },

    /// Polyline through via points.
    NPoint {
        /// Origin marker name.
        origin: String,
        /// Via point marker names, in path order.
        via_points: Vec<String>,
        /// Insertion marker name.
        insertion: String,
    },

    /// Wrap around one cylinder.
    CylinderWrap {
        /// Origin marker name.
        origin: String,
        /// Insertion marker name.
        insertion: String,
        /// Cylinder marker name.
        cylinder: String,
        /// Cylinder radius.
        radius: f64,
        /// Display samples per arc.
        segments: usize,
        /// Wrap thresholds.
        policy: WrapPolicy,
    },

    /// Wrap around two cylinders.
    TwoCylinderWrap {
        /// Origin marker name.
        origin: String,
        /// Insertion marker name.
        insertion: String,
        /// First cylinder marker name.
        cylinder1: String,
        /// First cylinder radius.
        radius1: f64,
        /// Second cylinder marker name.
        cylinder2: String,
        /// Second cylinder radius.
        radius2: f64,
        /// How cylinder 2 is wrapped.
        sense: SecondCylinderSense,
        /// Display samples per arc.
        segments: usize,
        /// Wrap thresholds.
        policy: WrapPolicy,
    },
}

impl StrapDefinition {
    /// A straight strap.
    #[must_use]
    pub fn two_point(origin: impl Into<String>, insertion: impl Into<String>) -> Self {
        Self::TwoPoint {
            origin: origin.into(),
            insertion: insertion.into(),
        }
    }

    /// A via-point strap.
    #[must_use]
    pub fn n_point<S: Into<String>>(
        origin: impl Into<String>,
        via_points: impl IntoIterator<Item = S>,
        insertion: impl Into<String>,
    ) -> Self {
        Self::NPoint {
            origin: origin.into(),
            via_points: via_points.into_iter().map(Into::into).collect(),
            insertion: insertion.into(),
        }
    }

    /// A single-cylinder wrap with default policy and tessellation.
    #[must_use]
    pub fn cylinder_wrap(
        origin: impl Into<String>,
        insertion: impl Into<String>,
        cylinder: impl Into<String>,
        radius: f64,
    ) -> Self {
        Self::CylinderWrap {
            origin: origin.into(),
            insertion: insertion.into(),
            cylinder: cylinder.into(),
            radius,
            segments: DEFAULT_WRAP_SEGMENTS,
            policy: WrapPolicy::default(),
        }
    }

    /// A double-cylinder wrap with default sense, policy and tessellation.
    #[must_use]
    pub fn two_cylinder_wrap(
        origin: impl Into<String>,
        insertion: impl Into<String>,
        cylinder1: impl Into<String>,
        radius1: f64,
        cylinder2: impl Into<String>,
        radius2: f64,
    ) -> Self {
        Self::TwoCylinderWrap {
            origin: origin.into(),
            insertion: insertion.into(),
            cylinder1: cylinder1.into(),
            radius1,
            cylinder2: cylinder2.into(),
            radius2,
            sense: SecondCylinderSense::default(),
            segments: DEFAULT_WRAP_SEGMENTS,
            policy: WrapPolicy::default(),
        }
    }

    /// Set the wrap policy. Ignored by straight and via-point straps.
    #[must_use]
    pub fn with_policy(mut self, new_policy: WrapPolicy) -> Self {
        match &mut self {
            Self::CylinderWrap { policy, .. } | Self::TwoCylinderWrap { policy, .. } => {
                *policy = new_policy;
            }
            Self::TwoPoint { .. } | Self::NPoint { .. } => {}
        }
        self
    }

    /// Set the display samples per arc. Ignored by straight and via-point
    /// straps.
    #[must_use]
    pub fn with_segments(mut self, count: usize) -> Self {
        match &mut self {
            Self::CylinderWrap { segments, .. } | Self::TwoCylinderWrap { segments, .. } => {
                *segments = count;
            }
            Self::TwoPoint { .. } | Self::NPoint { .. } => {}
        }
        self
    }

    /// Set how cylinder 2 is wrapped. Only used by double wraps.
    #[must_use]
    pub fn with_sense(mut self, new_sense: SecondCylinderSense) -> Self {
        if let Self::TwoCylinderWrap { sense, .. } = &mut self {
            *sense = new_sense;
        }
        self
    }

    /// Resolve names against a marker set and check the parameters.
    pub fn resolve(&self, strap: &str, markers: &MarkerSet) -> Result<StrapKind> {
        let marker = |name: &str| markers.resolve(strap, name);
        let radius = |r: f64| {
            if r.is_finite() && r > 0.0 {
                Ok(r)
            } else {
                Err(StrapError::invalid_radius(strap, r))
            }
        };

        let kind = match self {
            Self::TwoPoint { origin, insertion } => {
                StrapKind::TwoPoint(TwoPoint::new(marker(origin)?, marker(insertion)?))
            }
            Self::NPoint {
                origin,
                via_points,
                insertion,
            } => {
                if via_points.is_empty() {
                    return Err(StrapError::empty_via_points(strap));
                }
                let via = via_points
                    .iter()
                    .map(|name| marker(name.as_str()))
                    .collect::<Result<Vec<_>>>()?;
                StrapKind::NPoint(NPoint::new(marker(origin)?, via, marker(insertion)?))
            }
            Self::CylinderWrap {
                origin,
                insertion,
                cylinder,
                radius: r,
                segments,
                policy,
            } => {
                policy.validate().map_err(|e| e.for_strap(strap))?;
                StrapKind::CylinderWrap(
                    CylinderWrap::new(
                        marker(origin)?,
                        marker(insertion)?,
                        marker(cylinder)?,
                        radius(*r)?,
                    )
                    .with_segments(*segments)
                    .with_policy(*policy),
                )
            }
            Self::TwoCylinderWrap {
                origin,
                insertion,
                cylinder1,
                radius1,
                cylinder2,
                radius2,
                sense,
                segments,
                policy,
            } => {
                policy.validate().map_err(|e| e.for_strap(strap))?;
                StrapKind::TwoCylinderWrap(
                    TwoCylinderWrap::new(
                        marker(origin)?,
                        marker(insertion)?,
                        marker(cylinder1)?,
                        radius(*radius1)?,
                        marker(cylinder2)?,
                        radius(*radius2)?,
                    )
                    .with_sense(*sense)
                    .with_segments(*segments)
                    .with_policy(*policy),
                )
            }
        };
        Ok(kind)
    }
}

/// Bodies, markers and straps of one musculoskeletal model.
///
/// # Example
///
/// ```
/// use nalgebra::Point3;
/// use sim_strap::{BodyId, Marker, Pose, StrapDefinition, StrapModel};
///
/// let femur = BodyId::new(1);
/// let mut model = StrapModel::new();
/// model.add_body(femur, Pose::identity());
/// model.add_marker(Marker::world("pelvis").with_position(Point3::new(0.0, 0.0, 0.4)))?;
/// model.add_marker(Marker::on_body("knee", femur))?;
/// let id = model.add_strap("rectus", StrapDefinition::two_point("pelvis", "knee"))?;
///
/// model.calculate_all(0.001);
/// assert!((model.strap(id).map_or(0.0, |s| s.length()) - 0.4).abs() < 1e-12);
/// # Ok::<(), sim_strap::StrapError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct StrapModel {
    bodies: BodyPoses,
    markers: MarkerSet,
    straps: Vec<Strap>,
    by_name: HashMap<String, StrapId>,
}

impl StrapModel {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body with its initial pose.
    pub fn add_body(&mut self, body: BodyId, pose: Pose) {
        self.bodies.set_pose(body, pose);
    }

    /// Update a body pose after a physics step.
    ///
    /// Returns `false` if the body was never registered.
    pub fn set_body_pose(&mut self, body: BodyId, pose: Pose) -> bool {
        if !self.bodies.contains(body) {
            return false;
        }
        self.bodies.set_pose(body, pose);
        true
    }

    /// Current body poses.
    #[must_use]
    pub fn bodies(&self) -> &BodyPoses {
        &self.bodies
    }

    /// Add a marker. Its body must already be registered.
    pub fn add_marker(&mut self, marker: Marker) -> Result<MarkerId> {
        self.check_body(marker.name(), marker.body())?;
        self.markers.insert(marker)
    }

    /// Move a marker to another body (or the world), keeping its local offset.
    pub fn attach_marker(&mut self, id: MarkerId, body: Option<BodyId>) -> Result<()> {
        let Some(marker) = self.markers.get(id) else {
            return Err(StrapError::unknown_marker_id(id));
        };
        self.check_body(marker.name(), body)?;
        if let Some(marker) = self.markers.get_mut(id) {
            marker.set_body(body);
        }
        Ok(())
    }

    fn check_body(&self, marker: &str, body: Option<BodyId>) -> Result<()> {
        match body {
            Some(body) if !self.bodies.contains(body) => {
                Err(StrapError::unknown_body(marker, body))
            }
            _ => Ok(()),
        }
    }

    /// Move a marker so its origin sits at a world point.
    pub fn set_marker_world_position(&mut self, id: MarkerId, world: &Point3<f64>) {
        if let Some(marker) = self.markers.get_mut(id) {
            marker.set_world_position(world, &self.bodies);
        }
    }

    /// Orient a marker to a world orientation.
    pub fn set_marker_world_quaternion(&mut self, id: MarkerId, world: &UnitQuaternion<f64>) {
        if let Some(marker) = self.markers.get_mut(id) {
            marker.set_world_quaternion(world, &self.bodies);
        }
    }

    /// All markers.
    #[must_use]
    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    /// A marker by id.
    #[must_use]
    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id)
    }

    /// A marker by id, for editing its local pose.
    #[must_use]
    pub fn marker_mut(&mut self, id: MarkerId) -> Option<&mut Marker> {
        self.markers.get_mut(id)
    }

    /// Look up a marker by name.
    #[must_use]
    pub fn find_marker(&self, name: &str) -> Option<MarkerId> {
        self.markers.find(name)
    }

    /// Add a strap. Marker names are resolved and parameters checked here.
    pub fn add_strap(&mut self, name: &str, definition: StrapDefinition) -> Result<StrapId> {
        if self.by_name.contains_key(name) {
            return Err(StrapError::duplicate("strap", name));
        }
        let kind = definition.resolve(name, &self.markers)?;

        let id = StrapId(self.straps.len());
        self.link(id, &kind);
        self.straps.push(Strap::new(name, kind));
        self.by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Replace the path of an existing strap, keeping its name and id.
    ///
    /// On error the old definition stays in place. Length history is reset,
    /// so the next velocity is 0.
    pub fn redefine_strap(&mut self, name: &str, definition: StrapDefinition) -> Result<StrapId> {
        let Some(&id) = self.by_name.get(name) else {
            return self.add_strap(name, definition);
        };
        let kind = definition.resolve(name, &self.markers)?;

        if let Some(old) = self.straps.get(id.index()) {
            for marker in old.kind().markers() {
                if let Some(m) = self.markers.get_mut(marker) {
                    m.remove_dependent(id);
                }
            }
        }
        self.link(id, &kind);
        if let Some(slot) = self.straps.get_mut(id.index()) {
            *slot = Strap::new(name, kind);
        }
        Ok(id)
    }

    fn link(&mut self, id: StrapId, kind: &StrapKind) {
        for marker in kind.markers() {
            if let Some(m) = self.markers.get_mut(marker) {
                m.add_dependent(id);
            }
        }
    }

    /// A strap by id.
    #[must_use]
    pub fn strap(&self, id: StrapId) -> Option<&Strap> {
        self.straps.get(id.index())
    }

    /// Look up a strap by name.
    #[must_use]
    pub fn find_strap(&self, name: &str) -> Option<StrapId> {
        self.by_name.get(name).copied()
    }

    /// All straps with their ids.
    pub fn straps(&self) -> impl Iterator<Item = (StrapId, &Strap)> {
        self.straps
            .iter()
            .enumerate()
            .map(|(i, s)| (StrapId(i), s))
    }

    /// Straps that read a marker.
    pub fn dependents_of(&self, marker: MarkerId) -> Vec<StrapId> {
        let mut ids: Vec<StrapId> = self
            .markers
            .get(marker)
            .map(|m| m.dependents().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Number of straps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.straps.len()
    }

    /// Whether the model has no straps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.straps.is_empty()
    }

    /// Evaluate every strap once for the current body poses.
    pub fn calculate_all(&mut self, time_increment: f64) {
        for strap in &mut self.straps {
            strap.calculate(&self.markers, &self.bodies, time_increment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> StrapModel {
        let mut model = StrapModel::new();
        model.add_body(BodyId::new(1), Pose::identity());
        for (name, x) in [("a", 0.0), ("b", 1.0), ("c", 2.0), ("cyl", 0.5)] {
            model
                .add_marker(Marker::world(name).with_position(Point3::new(x, 0.0, 0.0)))
                .unwrap();
        }
        model
    }

    #[test]
    fn test_unknown_body_rejected() {
        let mut model = model();
        let err = model
            .add_marker(Marker::on_body("m", BodyId::new(9)))
            .unwrap_err();
        assert_eq!(err, StrapError::unknown_body("m", BodyId::new(9)));

        let id = model.find_marker("a").unwrap();
        assert!(model.attach_marker(id, Some(BodyId::new(9))).is_err());
        assert!(model.attach_marker(id, Some(BodyId::new(1))).is_ok());
        assert_eq!(model.marker(id).unwrap().body(), Some(BodyId::new(1)));

        let stray = MarkerId(model.markers().len());
        assert_eq!(
            model.attach_marker(stray, None),
            Err(StrapError::unknown_marker_id(stray))
        );
    }

    #[test]
    fn test_unknown_marker_rejected() {
        let mut model = model();
        let err = model
            .add_strap("s", StrapDefinition::n_point("a", ["b", "nope"], "c"))
            .unwrap_err();
        assert_eq!(err, StrapError::unknown_marker("s", "nope"));
        assert!(model.is_empty());
    }

    #[test]
    fn test_structural_errors() {
        let mut model = model();
        let empty: [&str; 0] = [];
        assert_eq!(
            model.add_strap("s", StrapDefinition::n_point("a", empty, "c")),
            Err(StrapError::empty_via_points("s"))
        );
        assert_eq!(
            model.add_strap("s", StrapDefinition::cylinder_wrap("a", "c", "cyl", 0.0)),
            Err(StrapError::invalid_radius("s", 0.0))
        );
        let bad_policy = WrapPolicy::new(0.1, 0.2);
        let err = model
            .add_strap(
                "gastroc",
                StrapDefinition::cylinder_wrap("a", "c", "cyl", 1.0).with_policy(bad_policy),
            )
            .unwrap_err();
        assert!(matches!(err, StrapError::InvalidPolicy { .. }));
        assert_eq!(err.subject(), Some("gastroc"));
        assert!(err.to_string().starts_with("strap \"gastroc\": invalid wrap policy"));
        let err = model
            .add_strap(
                "soleus",
                StrapDefinition::two_cylinder_wrap("a", "c", "cyl", 1.0, "b", 1.0)
                    .with_policy(bad_policy),
            )
            .unwrap_err();
        assert_eq!(err.subject(), Some("soleus"));
        assert!(model
            .add_strap(
                "s",
                StrapDefinition::two_cylinder_wrap("a", "c", "cyl", 1.0, "b", f64::NAN)
            )
            .is_err());
    }

    #[test]
    fn test_duplicate_strap_name() {
        let mut model = model();
        model
            .add_strap("s", StrapDefinition::two_point("a", "b"))
            .unwrap();
        assert_eq!(
            model.add_strap("s", StrapDefinition::two_point("a", "c")),
            Err(StrapError::duplicate("strap", "s"))
        );
    }

    #[test]
    fn test_dependents_tracked() {
        let mut model = model();
        let s0 = model
            .add_strap("s0", StrapDefinition::two_point("a", "b"))
            .unwrap();
        let s1 = model
            .add_strap("s1", StrapDefinition::n_point("a", ["b"], "c"))
            .unwrap();
        let a = model.find_marker("a").unwrap();
        let c = model.find_marker("c").unwrap();
        assert_eq!(model.dependents_of(a), vec![s0, s1]);
        assert_eq!(model.dependents_of(c), vec![s1]);

        model
            .redefine_strap("s1", StrapDefinition::two_point("b", "c"))
            .unwrap();
        assert_eq!(model.dependents_of(a), vec![s0]);
        assert_eq!(model.dependents_of(c), vec![s1]);
    }

    #[test]
    fn test_calculate_all_follows_bodies() {
        let mut model = StrapModel::new();
        let body = BodyId::new(1);
        model.add_body(body, Pose::identity());
        model.add_marker(Marker::world("o")).unwrap();
        model
            .add_marker(Marker::on_body("i", body).with_position(Point3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let id = model
            .add_strap("s", StrapDefinition::two_point("o", "i"))
            .unwrap();

        model.calculate_all(0.5);
        assert!(model.set_body_pose(body, Pose::from_position(Point3::new(1.0, 0.0, 0.0))));
        model.calculate_all(0.5);

        let strap = model.strap(id).unwrap();
        assert_relative_eq!(strap.length(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(strap.velocity(), 2.0, epsilon = 1e-12);
        assert!(!model.set_body_pose(BodyId::new(42), Pose::identity()));
    }

    #[test]
    fn test_set_marker_world_position() {
        let mut model = StrapModel::new();
        let body = BodyId::new(3);
        model.add_body(body, Pose::from_position(Point3::new(0.0, 0.0, 1.0)));
        let id = model.add_marker(Marker::on_body("m", body)).unwrap();
        model.set_marker_world_position(id, &Point3::new(0.0, 0.0, 3.0));
        let marker = model.marker(id).unwrap();
        assert_relative_eq!(marker.position(), Point3::new(0.0, 0.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!(
            marker.world_position(model.bodies()),
            Point3::new(0.0, 0.0, 3.0),
            epsilon = 1e-12
        );
    }
}
