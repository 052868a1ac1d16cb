//! Wrap policy constants.
//!
//! These decide when a strap bothers to wrap at all. They are passed into the
//! geometry functions explicitly so the wrap code can be exercised without a
//! model around it.

use std::f64::consts::PI;

use crate::error::{Result, StrapError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of arc segments used when tessellating a wrap for display.
pub const DEFAULT_WRAP_SEGMENTS: usize = 16;

/// Thresholds that decide whether a computed wrap is used.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WrapPolicy {
    /// Largest wrap angle (radians) accepted before the wrap is treated as
    /// coming off the wrong side of the cylinder. Useful values lie between
    /// π and 2π.
    pub max_wrap_angle: f64,

    /// Wrap angles below this are treated as no contact, since a near-zero
    /// arc leads to zero length segments.
    pub small_angle: f64,
}

impl Default for WrapPolicy {
    fn default() -> Self {
        Self {
            max_wrap_angle: PI,
            small_angle: 1e-10,
        }
    }
}

impl WrapPolicy {
    /// Create a policy from its two thresholds.
    #[must_use]
    pub fn new(max_wrap_angle: f64, small_angle: f64) -> Self {
        Self {
            max_wrap_angle,
            small_angle,
        }
    }

    /// Set the maximum wrap angle.
    #[must_use]
    pub fn with_max_wrap_angle(mut self, angle: f64) -> Self {
        self.max_wrap_angle = angle;
        self
    }

    /// Set the small-angle threshold.
    #[must_use]
    pub fn with_small_angle(mut self, angle: f64) -> Self {
        self.small_angle = angle;
        self
    }

    /// Check the thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.max_wrap_angle.is_finite() || !self.small_angle.is_finite() {
            return Err(StrapError::invalid_policy("thresholds must be finite"));
        }
        if self.small_angle < 0.0 {
            return Err(StrapError::invalid_policy(format!(
                "small angle {} is negative",
                self.small_angle
            )));
        }
        if self.small_angle >= self.max_wrap_angle {
            return Err(StrapError::invalid_policy(format!(
                "small angle {} is not below max wrap angle {}",
                self.small_angle, self.max_wrap_angle
            )));
        }
        Ok(())
    }

    /// Whether a single-cylinder wrap of this angle should fall back to the
    /// straight line.
    #[must_use]
    pub fn bypasses(&self, wrap_angle: f64) -> bool {
        wrap_angle > self.max_wrap_angle || wrap_angle < self.small_angle
    }

    /// Whether a wrap angle lies strictly inside the accepted band.
    #[must_use]
    pub fn admits(&self, wrap_angle: f64) -> bool {
        wrap_angle > self.small_angle && wrap_angle < self.max_wrap_angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = WrapPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.max_wrap_angle, PI);
    }

    #[test]
    fn test_policy_validation() {
        assert!(WrapPolicy::new(0.1, 0.2).validate().is_err());
        assert!(WrapPolicy::new(f64::NAN, 0.0).validate().is_err());
        assert!(WrapPolicy::new(PI, -1.0).validate().is_err());
        assert!(
            WrapPolicy::default()
                .with_max_wrap_angle(1.5 * PI)
                .with_small_angle(1e-6)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_bypass_and_admit_boundaries() {
        let policy = WrapPolicy::new(PI, 1e-3);
        assert!(policy.bypasses(1e-4));
        assert!(policy.bypasses(PI + 1e-6));
        assert!(!policy.bypasses(PI));
        assert!(!policy.admits(PI));
        assert!(policy.admits(1.0));
    }
}
