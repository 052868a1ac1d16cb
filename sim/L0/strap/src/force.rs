//! Point forces handed to the rigid-body solver.
//!
//! A strap never applies force itself. Each step it rewrites a list of
//! [`PointForce`] records holding unit directions; the muscle model that owns
//! the scalar tension scales them and passes them to the physics engine.

use nalgebra::{Point3, Vector3};

use crate::body::BodyId;
use crate::math::is_finite;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where and in which direction tension acts on a body.
///
/// `direction` is unscaled by tension. For attachments it is a unit vector;
/// for via points and wrap contacts it is the sum of the two adjoining
/// segment directions, so its magnitude carries the deflection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointForce {
    /// Body the force acts on; `None` is the world (ground).
    pub body: Option<BodyId>,

    /// Application point in world coordinates.
    pub point: Point3<f64>,

    /// Direction in world coordinates.
    pub direction: Vector3<f64>,
}

impl PointForce {
    /// Create a point force.
    #[must_use]
    pub fn new(body: Option<BodyId>, point: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            body,
            point,
            direction,
        }
    }

    /// A force that does not act, kept so the list layout stays fixed.
    #[must_use]
    pub fn inactive(body: Option<BodyId>, point: Point3<f64>) -> Self {
        Self::new(body, point, Vector3::zeros())
    }

    /// Force vector for a given tension.
    #[must_use]
    pub fn scaled(&self, tension: f64) -> Vector3<f64> {
        self.direction * tension
    }

    /// Torque of the scaled force about a world point.
    #[must_use]
    pub fn torque_about(&self, center: &Point3<f64>, tension: f64) -> Vector3<f64> {
        (self.point - center).cross(&self.scaled(tension))
    }

    /// Whether the direction is usable.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        is_finite(&self.direction)
    }

    /// Whether the force contributes anything.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.direction.norm_squared() > 0.0
    }
}

/// Sum of the directions of a force list.
///
/// For any massless path this is zero: tension pulls the attachments
/// together and the contacts push back.
#[must_use]
pub fn net_direction(forces: &[PointForce]) -> Vector3<f64> {
    forces.iter().map(|f| f.direction).sum()
}

/// A torque-like quantity given both in world and in a marker's frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameVector {
    /// World coordinates.
    pub world: Vector3<f64>,
    /// Coordinates of the reference marker.
    pub local: Vector3<f64>,
}
