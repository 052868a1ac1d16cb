//! End-to-end strap scenarios through the model API.
//!
//! Run with: cargo test -p sim-strap --test scenarios

use approx::assert_relative_eq;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use sim_strap::{
    net_direction, BodyId, Marker, Pose, StrapDefinition, StrapModel, WrapPolicy, WrapStatus,
};
use std::f64::consts::{FRAC_PI_2, PI};
use std::io;
use std::sync::{Arc, Mutex};

/// Marker orientation whose X axis points along world Z.
fn z_axis() -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(0.0, -FRAC_PI_2, 0.0)
}

/// Log sink shared between a test subscriber and the test body.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a warn-level subscriber and return what it logged.
fn capture_warnings(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

fn wrap_model(origin: Point3<f64>, insertion: Point3<f64>) -> StrapModel {
    let mut model = StrapModel::new();
    model
        .add_marker(Marker::world("origin").with_position(origin))
        .unwrap();
    model
        .add_marker(Marker::world("insertion").with_position(insertion))
        .unwrap();
    model
        .add_marker(Marker::world("cylinder").with_quaternion(z_axis()))
        .unwrap();
    model
}

// =============================================================================
// Single-cylinder wrap
// =============================================================================

#[test]
fn wrap_around_unit_cylinder_is_longer_than_straight() {
    let origin = Point3::new(5.0, 0.0, 0.0);
    let insertion = Point3::new(-5.0, 0.0, 2.0);
    let mut model = wrap_model(origin, insertion);
    let id = model
        .add_strap(
            "s",
            StrapDefinition::cylinder_wrap("origin", "insertion", "cylinder", 1.0),
        )
        .unwrap();
    model.calculate_all(0.01);

    let strap = model.strap(id).unwrap();
    assert_eq!(strap.wrap_status(), Some(WrapStatus::Wrapped));

    let phi = (1.0_f64 / 5.0).acos();
    let rho = PI - 2.0 * phi;
    assert!(rho > 0.0 && rho < PI);
    let planar = 2.0 * 24.0_f64.sqrt() + rho;
    assert_relative_eq!(strap.length(), (planar * planar + 4.0).sqrt(), epsilon = 1e-9);
    assert!(strap.length() > (insertion - origin).norm());

    // reaction acts on the axis, halfway up the arc
    let reaction = strap.point_forces()[2];
    assert_relative_eq!(reaction.point.x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(reaction.point.y, 0.0, epsilon = 1e-12);
    assert_relative_eq!(reaction.point.z, 1.0, epsilon = 1e-9);
    assert_relative_eq!(
        net_direction(strap.point_forces()),
        Vector3::zeros(),
        epsilon = 1e-12
    );
}

#[test]
fn tiny_wrap_angle_falls_back_to_straight_line() {
    let phi = (1.0_f64 / 5.0).acos();
    let alpha = 2.0 * phi + 0.0005;
    let origin = Point3::new(5.0, 0.0, 0.0);
    let insertion = Point3::new(5.0 * alpha.cos(), 5.0 * alpha.sin(), 0.0);

    let mut model = wrap_model(origin, insertion);
    let coarse = WrapPolicy::default().with_small_angle(1e-3);
    let bypassed = model
        .add_strap(
            "coarse",
            StrapDefinition::cylinder_wrap("origin", "insertion", "cylinder", 1.0)
                .with_policy(coarse),
        )
        .unwrap();
    let wrapped = model
        .add_strap(
            "fine",
            StrapDefinition::cylinder_wrap("origin", "insertion", "cylinder", 1.0),
        )
        .unwrap();
    model.calculate_all(0.01);

    let strap = model.strap(bypassed).unwrap();
    assert_eq!(strap.wrap_status(), Some(WrapStatus::NoWrap));
    assert_relative_eq!(strap.length(), (insertion - origin).norm(), epsilon = 1e-9);
    assert!(!strap.point_forces()[2].is_active());

    let strap = model.strap(wrapped).unwrap();
    assert_eq!(strap.wrap_status(), Some(WrapStatus::Wrapped));
}

#[test]
fn attachment_inside_cylinder_uses_straight_path() {
    let origin = Point3::new(0.2, 0.1, -1.0);
    let insertion = Point3::new(-4.0, 1.0, 1.0);
    let mut model = wrap_model(origin, insertion);
    let id = model
        .add_strap(
            "s",
            StrapDefinition::cylinder_wrap("origin", "insertion", "cylinder", 1.0),
        )
        .unwrap();
    let logs = capture_warnings(|| model.calculate_all(0.01));
    assert!(logs.contains("WARN"));
    assert!(logs.contains("attachment inside wrap cylinder"));

    let strap = model.strap(id).unwrap();
    assert_eq!(strap.wrap_status(), Some(WrapStatus::Impossible));
    assert_relative_eq!(strap.length(), (insertion - origin).norm(), epsilon = 1e-9);
    assert_eq!(strap.fixup_count(), 0);
}

#[test]
fn cylinder_on_moving_body() {
    let bone = BodyId::new(4);
    let mut model = StrapModel::new();
    model.add_body(bone, Pose::identity());
    model
        .add_marker(Marker::world("origin").with_position(Point3::new(5.0, 0.0, 0.0)))
        .unwrap();
    model
        .add_marker(Marker::world("insertion").with_position(Point3::new(-5.0, 0.0, 0.0)))
        .unwrap();
    model
        .add_marker(Marker::on_body("cylinder", bone).with_quaternion(z_axis()))
        .unwrap();
    let id = model
        .add_strap(
            "s",
            StrapDefinition::cylinder_wrap("origin", "insertion", "cylinder", 1.0),
        )
        .unwrap();

    model.calculate_all(0.01);
    let before = model.strap(id).unwrap().length();

    // half a turn about world X flips the cylinder axis, so the path wraps
    // the other side
    let flipped = Pose::new(Point3::origin(), UnitQuaternion::from_euler_angles(PI, 0.0, 0.0));
    model.set_body_pose(bone, flipped);
    model.calculate_all(0.01);

    let strap = model.strap(id).unwrap();
    assert_eq!(strap.point_forces()[2].body, Some(bone));
    assert_relative_eq!(strap.length(), before, epsilon = 1e-9);
    assert!(strap.path_coordinates()[1].y < 0.0);
}

// =============================================================================
// Via points
// =============================================================================

#[test]
fn coincident_via_points_are_zeroed() {
    let mut model = StrapModel::new();
    for (name, p) in [
        ("o", [0.0, 0.0, 0.0]),
        ("v1", [1.0, 1.0, 0.0]),
        ("v2", [1.0, 1.0, 0.0]),
        ("i", [2.0, 0.0, 0.0]),
    ] {
        model
            .add_marker(Marker::world(name).with_position(Point3::from(p)))
            .unwrap();
    }
    let id = model
        .add_strap("s", StrapDefinition::n_point("o", ["v1", "v2"], "i"))
        .unwrap();
    let logs = capture_warnings(|| model.calculate_all(0.01));
    assert_eq!(
        logs.matches("non-finite point force direction replaced with zero")
            .count(),
        2
    );
    assert!(logs.contains("strap=s"));

    let strap = model.strap(id).unwrap();
    let forces = strap.point_forces();
    assert_eq!(strap.fixup_count(), 2);
    assert_eq!(forces[2].direction, Vector3::zeros());
    assert_eq!(forces[3].direction, Vector3::zeros());

    let half = 0.5_f64.sqrt();
    assert_relative_eq!(forces[0].direction, Vector3::new(half, half, 0.0), epsilon = 1e-12);
    assert_relative_eq!(forces[1].direction, Vector3::new(-half, half, 0.0), epsilon = 1e-12);
    assert_relative_eq!(strap.length(), 2.0 * 2.0_f64.sqrt(), epsilon = 1e-12);
    assert_eq!(strap.path_coordinates().len(), 4);
}

#[test]
fn repeated_calculation_is_idempotent() {
    let origin = Point3::new(3.0, 1.0, 0.5);
    let insertion = Point3::new(-3.0, -1.0, -1.0);
    let mut model = wrap_model(origin, insertion);
    let id = model
        .add_strap(
            "s",
            StrapDefinition::cylinder_wrap("origin", "insertion", "cylinder", 1.0),
        )
        .unwrap();

    model.calculate_all(0.01);
    let first = model.strap(id).unwrap().clone();
    model.calculate_all(0.01);
    let second = model.strap(id).unwrap();

    assert_eq!(first.length(), second.length());
    assert_eq!(first.point_forces(), second.point_forces());
    assert_eq!(first.path_coordinates(), second.path_coordinates());
    assert_eq!(second.velocity(), 0.0);
}
