//! Error types for strap construction.
//!
//! Only model-building mistakes are errors. Degenerate geometry met while a
//! simulation is running is reported through status values and `tracing`
//! warnings instead, so a step always completes.

use thiserror::Error;

use crate::body::BodyId;
use crate::marker::MarkerId;

/// Errors that can occur while building a strap model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StrapError {
    /// A strap references a marker name that does not exist.
    #[error("strap \"{strap}\": marker \"{marker}\" not found")]
    UnknownMarker {
        /// The strap being built.
        strap: String,
        /// The unresolved marker name.
        marker: String,
    },

    /// A marker is attached to a body the model does not know about.
    #[error("marker \"{marker}\": {body} not found")]
    UnknownBody {
        /// The marker being attached.
        marker: String,
        /// The missing body.
        body: BodyId,
    },

    /// A marker or strap name is already in use.
    #[error("duplicate {kind} name \"{name}\"")]
    DuplicateName {
        /// What kind of object was being added ("marker" or "strap").
        kind: &'static str,
        /// The clashing name.
        name: String,
    },

    /// An N-point strap was given no via points.
    #[error("strap \"{strap}\": via point marker list is empty")]
    EmptyViaPoints {
        /// The strap being built.
        strap: String,
    },

    /// A cylinder radius is not a positive finite number.
    #[error("strap \"{strap}\": invalid cylinder radius {radius}")]
    InvalidRadius {
        /// The strap being built.
        strap: String,
        /// The rejected radius.
        radius: f64,
    },

    /// Wrap policy constants are inconsistent.
    #[error("{}invalid wrap policy: {reason}", strap_prefix(.strap))]
    InvalidPolicy {
        /// The strap being built, once known.
        strap: Option<String>,
        /// Description of what's wrong.
        reason: String,
    },

    /// A marker id does not belong to the model.
    #[error("{id} not found")]
    UnknownMarkerId {
        /// The stray id.
        id: MarkerId,
    },
}

fn strap_prefix(strap: &Option<String>) -> String {
    strap
        .as_ref()
        .map_or_else(String::new, |name| format!("strap \"{name}\": "))
}

impl StrapError {
    /// Create an unknown marker error.
    #[must_use]
    pub fn unknown_marker(strap: impl Into<String>, marker: impl Into<String>) -> Self {
        Self::UnknownMarker {
            strap: strap.into(),
            marker: marker.into(),
        }
    }

    /// Create an unknown body error.
    #[must_use]
    pub fn unknown_body(marker: impl Into<String>, body: BodyId) -> Self {
        Self::UnknownBody {
            marker: marker.into(),
            body,
        }
    }

    /// Create a duplicate name error.
    #[must_use]
    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// Create an empty via point list error.
    #[must_use]
    pub fn empty_via_points(strap: impl Into<String>) -> Self {
        Self::EmptyViaPoints {
            strap: strap.into(),
        }
    }

    /// Create an invalid radius error.
    #[must_use]
    pub fn invalid_radius(strap: impl Into<String>, radius: f64) -> Self {
        Self::InvalidRadius {
            strap: strap.into(),
            radius,
        }
    }

    /// Create an invalid policy error.
    #[must_use]
    pub fn invalid_policy(reason: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            strap: None,
            reason: reason.into(),
        }
    }

    /// Create an unknown marker id error.
    #[must_use]
    pub fn unknown_marker_id(id: MarkerId) -> Self {
        Self::UnknownMarkerId { id }
    }

    /// Attribute a policy error to the strap being built. Other errors
    /// already name their subject and are returned unchanged.
    #[must_use]
    pub fn for_strap(self, name: impl Into<String>) -> Self {
        match self {
            Self::InvalidPolicy { strap: None, reason } => Self::InvalidPolicy {
                strap: Some(name.into()),
                reason,
            },
            other => other,
        }
    }

    /// Name of the strap or marker this error is about, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::UnknownMarker { strap, .. }
            | Self::EmptyViaPoints { strap }
            | Self::InvalidRadius { strap, .. } => Some(strap),
            Self::UnknownBody { marker, .. } => Some(marker),
            Self::DuplicateName { name, .. } => Some(name),
            Self::InvalidPolicy { strap, .. } => strap.as_deref(),
            Self::UnknownMarkerId { .. } => None,
        }
    }
}

/// Result type for strap construction.
pub type Result<T> = std::result::Result<T, StrapError>;
