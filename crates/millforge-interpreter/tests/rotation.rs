use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use millforge_core::{Axis, Error, GcodeError, Positions};
use millforge_interpreter::{Interpreter, SimulatedMachine};
use millforge_settings::{InterpreterConfig, MachineProfile};
use proptest::prelude::*;

fn interpreter_at(positions: Positions) -> Interpreter<SimulatedMachine> {
    Interpreter::new(
        InterpreterConfig::default(),
        SimulatedMachine::new(&MachineProfile::default()).with_positions(positions),
    )
}

fn last_target(interp: &Interpreter<SimulatedMachine>) -> Positions {
    interp
        .machine()
        .move_targets()
        .last()
        .map(|(target, _)| *target)
        .unwrap_or_default()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_rotated_move_reaches_rotated_target() {
    let mut interp = interpreter_at([0; 6]);
    interp.parse_command("G68 X0 Y0 R90").unwrap();
    assert!(interp.motion().is_rotated());

    interp.parse_command("G1 X10 Y0 F100").unwrap();
    assert_eq!(last_target(&interp), [0, 10_000, 0, 0, 0, 0]);
    // the program still sees its own coordinates
    assert_eq!(interp.positions(), [10_000, 0, 0, 0, 0, 0]);
}

#[test]
fn test_clear_restores_read_back() {
    let start = [12_345, -6_789, 1_000, 0, 0, 0];
    let mut interp = interpreter_at(start);
    interp.parse_command("G68 X3 Y4 R33").unwrap();
    interp.parse_command("G69").unwrap();
    assert!(!interp.motion().is_rotated());
    assert_eq!(interp.positions(), start);
}

#[test]
fn test_g68_requires_r_and_a_nonzero_vector() {
    let mut interp = interpreter_at([0; 6]);
    assert!(matches!(
        interp.parse_command("G68 X0 Y0").unwrap_err(),
        Error::Gcode(GcodeError::LetterExpected { letter: 'R' })
    ));
    assert!(matches!(
        interp.parse_command("G68 X0 Y0 I0 J0 K0 R10").unwrap_err(),
        Error::Gcode(GcodeError::IjkVectorIsZero)
    ));
    assert!(!interp.motion().is_rotated());
}

#[test]
fn test_g68_11_sets_offset_only() {
    let mut interp = interpreter_at([0; 6]);
    interp.parse_command("G68.11 X5 Y6").unwrap();
    assert_eq!(interp.motion().offset(), [5_000, 6_000, 0]);
    assert!(!interp.motion().is_rotated());
}

#[test]
fn test_g68_12_sets_per_axis_angles() {
    let mut interp = interpreter_at([0; 6]);
    interp.parse_command("G68.12 K90").unwrap();
    assert!(close(interp.motion().angle(Axis::Z), FRAC_PI_2));
    assert_eq!(interp.motion().angle(Axis::X), 0.0);

    interp.parse_command("G1 X10 F100").unwrap();
    assert_eq!(last_target(&interp), [0, 10_000, 0, 0, 0, 0]);

    interp.parse_command("G68.10").unwrap();
    assert!(!interp.motion().is_rotated());
    assert_eq!(interp.motion().offset(), [0, 0, 0]);
}

#[test]
fn test_g68_13_derives_angle_from_point() {
    let mut interp = interpreter_at([0; 6]);
    interp.parse_command("G68.13 X10 Y10 K0").unwrap();
    assert!(close(interp.motion().angle(Axis::Z), FRAC_PI_4));

    assert!(matches!(
        interp.parse_command("G68.13 X10 Y10 I1").unwrap_err(),
        Error::Gcode(GcodeError::UnexpectedToken { found: 'I' })
    ));
}

#[test]
fn test_g68_13_composes_second_angle_on_hypot() {
    let mut interp = interpreter_at([0; 6]);
    interp.parse_command("G68.13 X10 Y10 Z10 J0 K0").unwrap();
    assert!(close(interp.motion().angle(Axis::Z), FRAC_PI_4));
    // second derivation measures Z against the in-plane distance sqrt(200)
    let expected = 1.0f64.atan2(2.0f64.sqrt());
    assert!((interp.motion().angle(Axis::Y) - expected).abs() < 1e-9);
    assert_eq!(interp.motion().angle(Axis::X), 0.0);
}

#[test]
fn test_g68_13_applies_offset_and_correction() {
    let mut interp = interpreter_at([0; 6]);
    interp.parse_command("G68.11 X1 Y1").unwrap();
    // X: 11 - 1 = 10, Y: 13 - 1 - 2 = 10
    interp.parse_command("G68.13 X11 Y13 K2").unwrap();
    assert!(close(interp.motion().angle(Axis::Z), FRAC_PI_4));

    interp.parse_command("G68.13 X11 Y1 K-10").unwrap();
    assert!(close(interp.motion().angle(Axis::Z), FRAC_PI_4));
    assert_eq!(interp.motion().offset(), [1_000, 1_000, 0]);
}

#[test]
fn test_g68_14_measures_along_y() {
    let mut interp = interpreter_at([0; 6]);
    interp.parse_command("G68.14 Y10 Z10 I0").unwrap();
    assert!(close(interp.motion().angle(Axis::X), FRAC_PI_4));
    assert_eq!(interp.motion().angle(Axis::Z), 0.0);

    assert!(matches!(
        interp.parse_command("G68.14 Y10 J1").unwrap_err(),
        Error::Gcode(GcodeError::UnexpectedToken { found: 'J' })
    ));
}

#[test]
fn test_g68_15_measures_along_z() {
    let mut interp = interpreter_at([0; 6]);
    interp.parse_command("G68.15 Z10 X5 J0").unwrap();
    assert!(close(interp.motion().angle(Axis::Y), 0.5f64.atan()));

    interp.parse_command("G68.15 Z10 X10 Y10 I0 J0").unwrap();
    assert!(close(interp.motion().angle(Axis::Y), FRAC_PI_4));
    let expected = 1.0f64.atan2(2.0f64.sqrt());
    assert!((interp.motion().angle(Axis::X) - expected).abs() < 1e-9);

    assert!(matches!(
        interp.parse_command("G68.15 Z10 K1").unwrap_err(),
        Error::Gcode(GcodeError::UnexpectedToken { found: 'K' })
    ));
}

#[test]
fn test_rotated_move_far_from_offset() {
    let mut interp = interpreter_at([0; 6]);
    interp.parse_command("G68 X2000000 R10").unwrap();
    interp.parse_command("G0 X-2000000").unwrap();

    // 4000 m from the offset, rotated by 10 degrees about Z
    let target = last_target(&interp);
    assert!((target[0] + 1_939_231_012).abs() <= 1, "{:?}", target);
    assert!((target[1] + 694_592_711).abs() <= 1, "{:?}", target);
    assert!((interp.positions()[0] + 2_000_000_000).abs() <= 1);
}

#[test]
fn test_unknown_rotation_variant() {
    let mut interp = interpreter_at([0; 6]);
    assert!(matches!(
        interp.parse_command("G68.3 R1").unwrap_err(),
        Error::Gcode(GcodeError::NotImplemented { letter: 'G', .. })
    ));
}

proptest! {
    #[test]
    fn prop_set_and_clear_leaves_read_back_unchanged(
        x in -100_000i32..100_000,
        y in -100_000i32..100_000,
        z in -50_000i32..0,
        ox in -50.0f64..50.0,
        oy in -50.0f64..50.0,
        degrees in -360.0f64..360.0,
    ) {
        let start = [x, y, z, 0, 0, 0];
        let mut interp = interpreter_at(start);
        interp
            .parse_command(&format!("G68 X{:.3} Y{:.3} R{:.3}", ox, oy, degrees))
            .unwrap();
        interp.parse_command("G69").unwrap();
        prop_assert_eq!(interp.positions(), start);
        prop_assert!(interp.machine().motion_log().is_empty());
    }
}
