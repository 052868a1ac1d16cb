//! Rigid body poses as seen by the strap layer.
//!
//! Straps never integrate anything. The physics engine owns the bodies and,
//! once per step, writes each body's world pose into a [`BodyPoses`] table.
//! Markers read that table to find out where they are.

use hashbrown::HashMap;
use nalgebra::{Point3, Quaternion, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a rigid body owned by the physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for BodyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// World position and orientation of a body.
///
/// # Example
///
/// ```
/// use sim_strap::Pose;
///
/// // Quaternions arrive scalar-first from the physics engine.
/// let pose = Pose::from_arrays([1.0, 2.0, 3.0], [1.0, 0.0, 0.0, 0.0]);
/// assert_eq!(pose.position.z, 3.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position in world coordinates.
    pub position: Point3<f64>,
    /// Orientation as a unit quaternion.
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// The world frame itself.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Create a pose from position and rotation.
    #[must_use]
    pub const fn new(position: Point3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    /// Create a translation-only pose.
    #[must_use]
    pub fn from_position(position: Point3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    /// Create a pose from raw engine arrays.
    ///
    /// The quaternion is scalar-first `(w, x, y, z)` and is renormalized,
    /// since engines hand back slightly denormal values.
    #[must_use]
    pub fn from_arrays(position: [f64; 3], wxyz: [f64; 4]) -> Self {
        let [w, x, y, z] = wxyz;
        Self::new(
            Point3::new(position[0], position[1], position[2]),
            UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
        )
    }

    /// Transform a point from local to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.rotation * local.coords
    }

    /// Rotate a vector from local to world coordinates.
    #[must_use]
    pub fn transform_vector(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * local
    }

    /// Transform a point from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_point(&self, world: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation.inverse() * (world - self.position))
    }

    /// Rotate a vector from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_vector(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse() * world
    }

    /// Compose two poses: `self * other`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            position: self.transform_point(&other.position),
            rotation: self.rotation * other.rotation,
        }
    }
}

/// Current world pose of every body, written by the physics engine.
///
/// Straps only read this table. Unknown bodies resolve to the identity pose,
/// but markers are checked against the table when they are created so that
/// never happens in a well-formed model.
#[derive(Debug, Clone, Default)]
pub struct BodyPoses {
    poses: HashMap<BodyId, Pose>,
}

impl BodyPoses {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body, or overwrite its pose.
    pub fn set_pose(&mut self, body: BodyId, pose: Pose) {
        self.poses.insert(body, pose);
    }

    /// Builder-style [`set_pose`](Self::set_pose).
    #[must_use]
    pub fn with_pose(mut self, body: BodyId, pose: Pose) -> Self {
        self.set_pose(body, pose);
        self
    }

    /// Whether the body is known.
    #[must_use]
    pub fn contains(&self, body: BodyId) -> bool {
        self.poses.contains_key(&body)
    }

    /// Pose of a body, if known.
    #[must_use]
    pub fn get(&self, body: BodyId) -> Option<&Pose> {
        self.poses.get(&body)
    }

    /// Pose of an optional body; `None` is the world frame.
    #[must_use]
    pub fn frame(&self, body: Option<BodyId>) -> Pose {
        body.and_then(|id| self.get(id).copied())
            .unwrap_or_default()
    }

    /// Number of bodies in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}
