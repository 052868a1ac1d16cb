//! Markers: named reference frames fixed to a body or to the world.
//!
//! A marker stores a position and orientation in its body's local frame.
//! Every world-space query composes that local offset with the body's current
//! pose from [`BodyPoses`]; a marker without a body lives directly in world
//! coordinates.
//!
//! ```text
//!   world ← body pose ← marker local pose ← marker-local point
//! ```
//!
//! Point transforms translate and rotate. Vector transforms only rotate,
//! because force and velocity directions must never pick up a translation.

use std::ops::Index;

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::body::{BodyId, BodyPoses, Pose};
use crate::error::{Result, StrapError};
use crate::strap::StrapId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a marker inside a [`MarkerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkerId(pub(crate) usize);

impl MarkerId {
    /// Get the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Marker({})", self.0)
    }
}

/// One of the three marker basis axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// Local +X.
    X,
    /// Local +Y.
    Y,
    /// Local +Z.
    Z,
}

impl Axis {
    /// The unit basis vector for this axis.
    #[must_use]
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Self::X => Vector3::x(),
            Self::Y => Vector3::y(),
            Self::Z => Vector3::z(),
        }
    }
}

/// A named, oriented reference point fixed to a body or to the world.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Marker {
    name: String,
    body: Option<BodyId>,
    position: Point3<f64>,
    quaternion: UnitQuaternion<f64>,
    /// Straps that read this marker. Non-owning, used for invalidation only.
    #[cfg_attr(feature = "serde", serde(skip))]
    dependents: HashSet<StrapId>,
}

impl Marker {
    /// Create a marker at the origin of `body` (or of the world).
    #[must_use]
    pub fn new(name: impl Into<String>, body: Option<BodyId>) -> Self {
        Self {
            name: name.into(),
            body,
            position: Point3::origin(),
            quaternion: UnitQuaternion::identity(),
            dependents: HashSet::new(),
        }
    }

    /// Create a marker fixed to the world frame.
    #[must_use]
    pub fn world(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    /// Create a marker fixed to a body.
    #[must_use]
    pub fn on_body(name: impl Into<String>, body: BodyId) -> Self {
        Self::new(name, Some(body))
    }

    /// Set the local position.
    #[must_use]
    pub fn with_position(mut self, position: Point3<f64>) -> Self {
        self.position = position;
        self
    }

    /// Set the local orientation.
    #[must_use]
    pub fn with_quaternion(mut self, quaternion: UnitQuaternion<f64>) -> Self {
        self.quaternion = quaternion;
        self
    }

    /// Marker name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning body, `None` for the world.
    #[must_use]
    pub fn body(&self) -> Option<BodyId> {
        self.body
    }

    /// Position in the owning body's frame.
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Orientation relative to the owning body.
    #[must_use]
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        self.quaternion
    }

    /// Set the position in the owning body's frame.
    pub fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
    }

    /// Set the orientation relative to the owning body.
    pub fn set_quaternion(&mut self, quaternion: UnitQuaternion<f64>) {
        self.quaternion = quaternion;
    }

    /// Place the marker at a world position, stored relative to its body's
    /// current pose.
    pub fn set_world_position(&mut self, world: &Point3<f64>, bodies: &BodyPoses) {
        self.position = bodies.frame(self.body).inverse_transform_point(world);
    }

    /// Orient the marker in world coordinates, stored relative to its body's
    /// current orientation.
    pub fn set_world_quaternion(&mut self, world: &UnitQuaternion<f64>, bodies: &BodyPoses) {
        self.quaternion = bodies.frame(self.body).rotation.inverse() * world;
    }

    pub(crate) fn set_body(&mut self, body: Option<BodyId>) {
        self.body = body;
    }

    /// World pose of the marker frame.
    #[must_use]
    pub fn world_pose(&self, bodies: &BodyPoses) -> Pose {
        bodies
            .frame(self.body)
            .compose(&Pose::new(self.position, self.quaternion))
    }

    /// World position of the marker origin.
    #[must_use]
    pub fn world_position(&self, bodies: &BodyPoses) -> Point3<f64> {
        bodies.frame(self.body).transform_point(&self.position)
    }

    /// World orientation of the marker frame.
    #[must_use]
    pub fn world_quaternion(&self, bodies: &BodyPoses) -> UnitQuaternion<f64> {
        bodies.frame(self.body).rotation * self.quaternion
    }

    /// Transform a point given in marker coordinates into world coordinates.
    #[must_use]
    pub fn world_point(&self, local: &Point3<f64>, bodies: &BodyPoses) -> Point3<f64> {
        self.world_pose(bodies).transform_point(local)
    }

    /// Transform a world point into marker coordinates.
    #[must_use]
    pub fn local_point(&self, world: &Point3<f64>, bodies: &BodyPoses) -> Point3<f64> {
        self.world_pose(bodies).inverse_transform_point(world)
    }

    /// Rotate a marker-frame vector into world coordinates.
    #[must_use]
    pub fn world_vector(&self, local: &Vector3<f64>, bodies: &BodyPoses) -> Vector3<f64> {
        self.world_pose(bodies).transform_vector(local)
    }

    /// Rotate a world vector into marker coordinates.
    #[must_use]
    pub fn local_vector(&self, world: &Vector3<f64>, bodies: &BodyPoses) -> Vector3<f64> {
        self.world_pose(bodies).inverse_transform_vector(world)
    }

    /// Compose a marker-relative orientation into world coordinates.
    #[must_use]
    pub fn world_quaternion_of(
        &self,
        local: &UnitQuaternion<f64>,
        bodies: &BodyPoses,
    ) -> UnitQuaternion<f64> {
        self.world_quaternion(bodies) * local
    }

    /// Express a world orientation relative to the marker frame.
    #[must_use]
    pub fn quaternion_of(
        &self,
        world: &UnitQuaternion<f64>,
        bodies: &BodyPoses,
    ) -> UnitQuaternion<f64> {
        self.world_quaternion(bodies).inverse() * world
    }

    /// Marker axis expressed in the owning body's frame.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> Vector3<f64> {
        self.quaternion * axis.unit()
    }

    /// Marker axis expressed in world coordinates.
    #[must_use]
    pub fn world_axis(&self, axis: Axis, bodies: &BodyPoses) -> Vector3<f64> {
        self.world_quaternion(bodies) * axis.unit()
    }

    /// Straps that currently read this marker.
    pub fn dependents(&self) -> impl Iterator<Item = StrapId> + '_ {
        self.dependents.iter().copied()
    }

    /// Whether a strap reads this marker.
    #[must_use]
    pub fn has_dependent(&self, strap: StrapId) -> bool {
        self.dependents.contains(&strap)
    }

    pub(crate) fn add_dependent(&mut self, strap: StrapId) {
        self.dependents.insert(strap);
    }

    pub(crate) fn remove_dependent(&mut self, strap: StrapId) {
        self.dependents.remove(&strap);
    }
}

/// All markers of a model, addressable by id or by name.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    markers: Vec<Marker>,
    by_name: HashMap<String, MarkerId>,
}

impl MarkerSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker. Names must be unique.
    pub fn insert(&mut self, marker: Marker) -> Result<MarkerId> {
        if self.by_name.contains_key(marker.name()) {
            return Err(StrapError::duplicate("marker", marker.name()));
        }
        let id = MarkerId(self.markers.len());
        self.by_name.insert(marker.name().to_owned(), id);
        self.markers.push(marker);
        Ok(id)
    }

    /// Look up a marker id by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<MarkerId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a marker name on behalf of a strap under construction.
    pub fn resolve(&self, strap: &str, name: &str) -> Result<MarkerId> {
        self.find(name)
            .ok_or_else(|| StrapError::unknown_marker(strap, name))
    }

    /// Get a marker by id.
    #[must_use]
    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id.0)
    }

    /// Get a marker mutably by id.
    #[must_use]
    pub fn get_mut(&mut self, id: MarkerId) -> Option<&mut Marker> {
        self.markers.get_mut(id.0)
    }

    /// Iterate over `(id, marker)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &Marker)> {
        self.markers
            .iter()
            .enumerate()
            .map(|(i, m)| (MarkerId(i), m))
    }

    /// Number of markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Panics on an id from another, larger set. [`Strap::calculate`] checks its
/// ids with [`MarkerSet::get`] before indexing.
///
/// [`Strap::calculate`]: crate::Strap::calculate
impl Index<MarkerId> for MarkerSet {
    type Output = Marker;

    fn index(&self, id: MarkerId) -> &Marker {
        &self.markers[id.0]
    }
}
