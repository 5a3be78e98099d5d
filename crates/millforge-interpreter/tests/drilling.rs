use millforge_core::{Error, GcodeError, Positions};
use millforge_interpreter::{
    DrillCycle, Feed, Interpreter, MotionCall, RepeatableCommand, SimulatedMachine,
};
use millforge_settings::{InterpreterConfig, MachineProfile};
use proptest::prelude::*;

const RAPID: Feed = Feed::Rapid(5_000_000);

fn interpreter() -> Interpreter<SimulatedMachine> {
    Interpreter::new(
        InterpreterConfig::default(),
        SimulatedMachine::new(&MachineProfile::default()),
    )
}

fn interpreter_at(positions: Positions) -> Interpreter<SimulatedMachine> {
    Interpreter::new(
        InterpreterConfig::default(),
        SimulatedMachine::new(&MachineProfile::default()).with_positions(positions),
    )
}

fn at(x: i32, y: i32, z: i32) -> Positions {
    [x, y, z, 0, 0, 0]
}

#[test]
fn test_g81_exact_move_sequence() {
    let mut interp = interpreter();
    interp.parse_command("G81 X10 Z-5 R0 F100").unwrap();

    let work = Feed::Work(100_000);
    assert_eq!(
        interp.machine().move_targets(),
        vec![
            (at(10_000, 0, 0), RAPID),
            (at(10_000, 0, 0), RAPID),
            (at(10_000, 0, -5_000), work),
            (at(10_000, 0, 0), RAPID),
        ]
    );
    assert_eq!(
        interp.modal().repeatable,
        RepeatableCommand::Drill(DrillCycle::G81)
    );
}

#[test]
fn test_g83_pecks_never_overshoot() {
    let mut interp = interpreter();
    interp.parse_command("G83 Z-5 R0 Q2").unwrap();

    let feeds: Vec<i32> = interp
        .machine()
        .move_targets()
        .iter()
        .filter(|(_, feed)| !feed.is_rapid())
        .map(|(target, _)| target[2])
        .collect();
    assert_eq!(feeds, vec![-2_000, -4_000, -5_000]);

    // every plunge but the first starts from R
    let targets = interp.machine().move_targets();
    for window in targets.windows(2) {
        if !window[1].1.is_rapid() && window[1].0[2] != -2_000 {
            assert_eq!(window[0].0[2], 0);
            assert!(window[0].1.is_rapid());
        }
    }
}

#[test]
fn test_g73_retracts_by_peck_retraction() {
    let mut interp = interpreter();
    interp.parse_command("G73 Z-3 R0 Q1").unwrap();

    let z: Vec<i32> = interp
        .machine()
        .move_targets()
        .iter()
        .map(|(target, _)| target[2])
        .collect();
    // xy, R, peck, retract 0.2, peck, retract 0.2, final peck, R
    assert_eq!(z, vec![0, 0, -1_000, -800, -2_000, -1_800, -3_000, 0]);
}

#[test]
fn test_g82_dwells_at_bottom() {
    let mut interp = interpreter();
    // R above the start position
    interp.parse_command("G82 Z-2 R1 P250").unwrap_err();

    let mut interp = interpreter_at(at(0, 0, 2_000));
    interp.parse_command("G82 Z-2 R1 P250").unwrap();
    let log = interp.machine().motion_log();
    assert!(log.contains(&MotionCall::Wait { millis: 250 }));
    assert_eq!(log.len(), 5);
}

#[test]
fn test_g98_returns_to_initial_level() {
    let mut interp = interpreter_at(at(0, 0, 10_000));
    interp.parse_command("G98").unwrap();
    interp.parse_command("G81 Z-1 R2").unwrap();

    let (last, _) = interp.machine().move_targets().last().copied().unwrap();
    assert_eq!(last[2], 10_000);
}

#[test]
fn test_r_twice_issues_no_motion() {
    let mut interp = interpreter();
    let err = interp.parse_command("G81 Z-5 R0 R1").unwrap_err();
    assert!(matches!(
        err,
        Error::Gcode(GcodeError::AlreadySpecified { letter: 'R' })
    ));
    assert!(interp.machine().motion_log().is_empty());
}

#[test]
fn test_r_outside_interval_is_rejected() {
    let mut interp = interpreter();
    let err = interp.parse_command("G81 Z-5 R-6").unwrap_err();
    assert!(matches!(
        err,
        Error::Gcode(GcodeError::RMustBeBetweenCurrentAndBottom)
    ));
    assert!(interp.machine().motion_log().is_empty());
}

#[test]
fn test_rotary_axis_word_is_rejected() {
    let profile = MachineProfile {
        axes: vec![Default::default(); 4],
        ..MachineProfile::default()
    };
    let mut interp = Interpreter::new(
        InterpreterConfig::with_axes(4),
        SimulatedMachine::new(&profile),
    );
    let err = interp.parse_command("G81 X10 Z-5 R0 A30").unwrap_err();
    assert!(matches!(
        err,
        Error::Gcode(GcodeError::UnexpectedToken { found: 'A' })
    ));
    assert!(interp.machine().motion_log().is_empty());
    assert_eq!(interp.modal().repeatable, RepeatableCommand::None);

    // the same machine still drills with X, Y and Z words
    interp.parse_command("G81 X10 Z-5 R0").unwrap();
    assert_eq!(interp.machine().move_targets().len(), 4);
}

#[test]
fn test_cycle_words_validated() {
    let mut interp = interpreter();
    assert!(matches!(
        interp.parse_command("G81 Z-5 R0 L0").unwrap_err(),
        Error::Gcode(GcodeError::LMustBe1To255)
    ));
    assert!(matches!(
        interp.parse_command("G83 Z-5 R0 Q-1").unwrap_err(),
        Error::Gcode(GcodeError::QMustBePositive)
    ));
    assert!(matches!(
        interp.parse_command("G83 Z-5 R0").unwrap_err(),
        Error::Gcode(GcodeError::QMustNotBe0)
    ));
    assert!(interp.machine().motion_log().is_empty());
}

#[test]
fn test_bare_axis_words_repeat_the_cycle() {
    let mut interp = interpreter();
    interp.parse_command("G81 X10 Z-5 R0").unwrap();
    interp.machine_mut().take_motion_log();

    interp.parse_command("X20").unwrap();
    let targets = interp.machine().move_targets();
    assert_eq!(targets.len(), 4);
    assert_eq!(targets[0].0, at(20_000, 0, 0));
    assert_eq!(targets[2].0, at(20_000, 0, -5_000));
}

#[test]
fn test_relative_repeats_accumulate() {
    let mut interp = interpreter();
    interp.parse_command("G91").unwrap();
    interp.parse_command("G81 X5 Z-5 R0 L3").unwrap();

    let holes: Vec<i32> = interp
        .machine()
        .move_targets()
        .iter()
        .filter(|(_, feed)| !feed.is_rapid())
        .map(|(target, _)| target[0])
        .collect();
    assert_eq!(holes, vec![5_000, 10_000, 15_000]);
}

#[test]
fn test_g80_cancels_the_cycle() {
    let mut interp = interpreter();
    interp.parse_command("G81 X10 Z-5 R0").unwrap();
    interp.parse_command("G80").unwrap();
    assert!(matches!(
        interp.parse_command("X20").unwrap_err(),
        Error::Gcode(GcodeError::NoModalCommand)
    ));
}

proptest! {
    #[test]
    fn prop_peck_depths_step_toward_bottom(bottom in 1i32..40, peck in 1i32..10) {
        let mut interp = interpreter();
        interp
            .parse_command(&format!("G83 Z-{} R0 Q{}", bottom, peck))
            .unwrap();

        let depths: Vec<i32> = interp
            .machine()
            .move_targets()
            .iter()
            .filter(|(_, feed)| !feed.is_rapid())
            .map(|(target, _)| target[2])
            .collect();

        prop_assert_eq!(*depths.last().unwrap(), -bottom * 1_000);
        for pair in depths.windows(2) {
            prop_assert!(pair[1] < pair[0]);
            prop_assert!(pair[0] - pair[1] <= peck * 1_000);
        }
        for depth in depths {
            prop_assert!(depth >= -bottom * 1_000);
        }
    }
}
