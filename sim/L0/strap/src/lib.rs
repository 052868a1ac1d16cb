//! Muscle-tendon path geometry for musculoskeletal simulation.
//!
//! A *strap* is the geometric path of a muscle-tendon unit between two
//! attachment markers. Each physics step it recomputes its length, its
//! lengthening velocity and the unit-tension forces it applies to the bodies
//! it touches. A muscle model elsewhere supplies the scalar tension.
//!
//! # Strap Variants
//!
//! ```text
//!   TwoPoint        O ●─────────────● I
//!
//!   NPoint          O ●──────● V₁────● V₂───● I
//!
//!   CylinderWrap    O ●────╮ ◯ ╭────● I        (helical arc on the cylinder)
//!
//!   TwoCylinderWrap O ●──╮ ◯ ╲_ ◯ ╭──● I       (arc, bridge tangent, arc)
//! ```
//!
//! Every variant emits forces that sum to zero: the attachments are pulled
//! together and via points and cylinders push back.
//!
//! # Markers
//!
//! A [`Marker`] is a named, oriented point fixed to a body or to the world.
//! Body poses are written into a [`BodyPoses`] table by the physics engine;
//! markers read it to find their world frame. A cylinder marker's local X
//! axis is the cylinder axis.
//!
//! # Degenerate Geometry
//!
//! Model-building mistakes are [`StrapError`]s. Geometry that goes bad while
//! running never fails a step:
//!
//! - an attachment inside a wrap cylinder falls back to the straight path;
//! - a coincident pair of points gives a zero force direction;
//! - both are logged with `tracing::warn!`.
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::Point3;
//! use sim_strap::{Marker, StrapDefinition, StrapModel};
//!
//! let mut model = StrapModel::new();
//! model.add_marker(Marker::world("origin").with_position(Point3::new(5.0, 0.0, 0.0)))?;
//! model.add_marker(Marker::world("insertion").with_position(Point3::new(-5.0, 0.0, 0.0)))?;
//! // the default marker X axis becomes the cylinder axis; here it is world Y
//! model.add_marker(Marker::world("bone").with_quaternion(
//!     nalgebra::UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
//! ))?;
//!
//! let id = model.add_strap(
//!     "flexor",
//!     StrapDefinition::cylinder_wrap("origin", "insertion", "bone", 1.0),
//! )?;
//! model.calculate_all(0.001);
//!
//! let strap = model.strap(id).unwrap();
//! assert!(strap.length() > 10.0);
//! assert_eq!(strap.point_forces().len(), 3);
//! # Ok::<(), sim_strap::StrapError>(())
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It never
//! integrates motion; it only reads body poses and produces forces, so it can
//! sit beside any rigid-body engine.

#![doc(html_root_url = "https://docs.rs/sim-strap/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::doc_markdown,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::too_many_arguments,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::imprecise_flops,
    clippy::many_single_char_names
)]
#![cfg_attr(
    test,
    allow(clippy::float_cmp, clippy::unwrap_used, clippy::expect_used)
)]

pub mod body;
pub mod config;
pub mod cylinder;
pub mod error;
pub mod force;
pub mod marker;
pub mod math;
pub mod model;
pub mod path;
pub mod strap;
pub mod tangent;
pub mod two_cylinder;

// Re-export main types at crate root
pub use body::{BodyId, BodyPoses, Pose};
pub use config::{WrapPolicy, DEFAULT_WRAP_SEGMENTS};
pub use cylinder::{single_wrap, wrap_frame, CylinderWrap, WrapArc, WrapSense, WrapStatus};
pub use error::{Result, StrapError};
pub use force::{net_direction, FrameVector, PointForce};
pub use marker::{Axis, Marker, MarkerId, MarkerSet};
pub use model::{StrapDefinition, StrapModel};
pub use path::{NPoint, PathSolution, TwoPoint};
pub use strap::{Strap, StrapId, StrapKind};
pub use tangent::{find_circle_circle_tangents, find_tangents, Bitangent, CircleTangents};
pub use two_cylinder::{
    two_cylinder_wrap, SecondCylinderSense, TwoCylinderOutcome, TwoCylinderWrap,
};
