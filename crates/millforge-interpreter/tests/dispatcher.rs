use millforge_core::{Error, GcodeError, MachineError, MessageLevel};
use millforge_interpreter::machine::{COOLANT_FLOOD, COOLANT_MIST, COOLANT_OFF};
use millforge_interpreter::{
    Interpreter, IoChannel, IoControl, MachineConfig, MotionCall, SimulatedMachine,
};
use millforge_settings::{InterpreterConfig, MachineProfile};

fn interpreter() -> Interpreter<SimulatedMachine> {
    Interpreter::new(
        InterpreterConfig::default(),
        SimulatedMachine::new(&MachineProfile::default()),
    )
}

fn last_output(interp: &Interpreter<SimulatedMachine>) -> Option<(MessageLevel, String)> {
    interp.machine().output().last().cloned()
}

#[test]
fn test_unknown_and_unsupported_codes() {
    let mut interp = interpreter();
    assert!(matches!(
        interp.parse_command("Q1").unwrap_err(),
        Error::Gcode(GcodeError::UnknownCommand { letter: 'Q' })
    ));
    assert!(matches!(
        interp.parse_command("G2 X1 Y1 I1").unwrap_err(),
        Error::Gcode(GcodeError::NotImplemented { letter: 'G', .. })
    ));
    assert!(matches!(
        interp.parse_command("G7").unwrap_err(),
        Error::Gcode(GcodeError::UnsupportedCode { letter: 'G', code: 7 })
    ));
    assert!(matches!(
        interp.parse_command("M999").unwrap_err(),
        Error::Gcode(GcodeError::UnsupportedCode { letter: 'M', code: 999 })
    ));
    assert!(interp.machine().motion_log().is_empty());
}

#[test]
fn test_errors_are_reported_to_display() {
    let mut interp = interpreter();
    let err = interp.parse_command("G7").unwrap_err();
    assert_eq!(
        last_output(&interp),
        Some((MessageLevel::Error, err.to_string()))
    );
}

#[test]
fn test_bare_axis_words_need_a_modal_command() {
    let mut interp = interpreter();
    assert!(matches!(
        interp.parse_command("X1").unwrap_err(),
        Error::Gcode(GcodeError::NoModalCommand)
    ));

    interp.parse_command("G1 X1 F100").unwrap();
    interp.parse_command("X2").unwrap();
    assert_eq!(interp.positions()[0], 2_000);
    assert_eq!(interp.machine().motion_log().len(), 2);
}

#[test]
fn test_duplicate_word_issues_no_move() {
    let mut interp = interpreter();
    assert!(matches!(
        interp.parse_command("G0 X1 X2").unwrap_err(),
        Error::Gcode(GcodeError::AlreadySpecified { letter: 'X' })
    ));
    assert!(interp.machine().motion_log().is_empty());
}

#[test]
fn test_spindle_and_coolant_levels() {
    let mut interp = interpreter();
    interp.parse_command("S1200 M3").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::Spindle), 1_200);
    assert_eq!(interp.machine().io_level(IoChannel::SpindleDir), 0);

    // S while running changes the speed right away
    interp.parse_command("S800").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::Spindle), 800);

    interp.parse_command("M4").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::SpindleDir), 1);
    interp.parse_command("M5").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::Spindle), 0);

    // S while stopped only arms the next M3
    interp.parse_command("S300").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::Spindle), 0);

    interp.parse_command("M7").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::Coolant), COOLANT_MIST);
    interp.parse_command("M8").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::Coolant), COOLANT_FLOOD);
    interp.parse_command("M9").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::Coolant), COOLANT_OFF);

    interp.parse_command("M10").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::Vacuum), 1);
    interp.parse_command("M11").unwrap();
    assert_eq!(interp.machine().io_level(IoChannel::Vacuum), 0);
    assert!(interp.machine().invalidations() >= 8);
}

#[test]
fn test_message_comment() {
    let mut interp = interpreter();
    interp.parse_command("(MSG, tool change next)").unwrap();
    assert_eq!(
        last_output(&interp),
        Some((MessageLevel::Output, "tool change next".to_string()))
    );
    // plain comments are silent
    interp.parse_command("(just a note) ; and another").unwrap();
    assert_eq!(interp.machine().output().len(), 1);
}

#[test]
fn test_beep_presets_and_explicit_tone() {
    let mut interp = interpreter();
    interp.parse_command("M300").unwrap();
    interp.parse_command("M300 S2").unwrap();
    interp.parse_command("M300 S1000 P100").unwrap();
    // presets keep their own length
    interp.parse_command("M300 S3 P100").unwrap();
    assert_eq!(
        interp.machine().beeps(),
        &[(440, 500), (880, 500), (1_000, 100), (1_760, 500)]
    );
}

#[test]
fn test_setting_commands_end_the_statement() {
    let mut interp = interpreter();
    interp.parse_command("G0 X0").unwrap();
    let moves = interp.machine().move_targets().len();

    for line in [
        "M110 N5 X7",
        "M111 S2 X7",
        "M114 X7",
        "M220 S80 X7",
        "M300 S2 X7",
        "& X7",
    ] {
        assert!(
            matches!(
                interp.parse_command(line).unwrap_err(),
                Error::Gcode(GcodeError::UnexpectedToken { found: 'X' })
            ),
            "{}",
            line
        );
    }
    assert_eq!(interp.machine().move_targets().len(), moves);
    assert_eq!(interp.modal().line_number, 0);
    assert_eq!(interp.machine().motion_dumps(), 0);
    assert!(interp.machine().beeps().is_empty());

    interp.parse_command("M110 N5 (renumber)").unwrap();
    assert_eq!(interp.modal().line_number, 5);
}

#[test]
fn test_unknown_tool_is_advisory() {
    let mut interp = interpreter();
    interp.parse_command("T9 G0 X1").unwrap();
    assert_eq!(interp.modal().tool, 9);
    assert_eq!(
        last_output(&interp).map(|(level, _)| level),
        Some(MessageLevel::Info)
    );
    assert_eq!(interp.positions()[0], 1_000);
}

#[test]
fn test_kill_command_stops_motion() {
    let mut interp = interpreter();
    let err = interp.parse_command("!").unwrap_err();
    assert!(err.is_kill());
    assert!(interp.machine().is_killed());

    assert!(matches!(
        interp.parse_command("G0 X1").unwrap_err(),
        Error::Machine(MachineError::Killed)
    ));
    assert!(interp.machine().motion_log().is_empty());
}

#[test]
fn test_kill_command_must_stand_alone() {
    let mut interp = interpreter();
    assert!(matches!(
        interp.parse_command("! X1").unwrap_err(),
        Error::Gcode(GcodeError::UnexpectedToken { found: 'X' })
    ));
    assert!(!interp.machine().is_killed());
}

#[test]
fn test_external_kill_aborts_before_motion() {
    let mut interp = interpreter();
    interp.machine_mut().request_kill();
    let err = interp.parse_command("G0 X1").unwrap_err();
    assert!(err.is_kill());
    assert!(interp.machine().is_killed());
    assert!(interp.machine().motion_log().is_empty());
}

#[test]
fn test_motion_state_dump() {
    let mut interp = interpreter();
    interp.parse_command("&").unwrap();
    assert_eq!(interp.machine().motion_dumps(), 1);
}

#[test]
fn test_m114_reports_positions() {
    let mut interp = interpreter();
    interp.parse_command("G10 L2 P1 X1").unwrap();
    interp.parse_command("G0 X2 Y-3.5").unwrap();

    interp.parse_command("M114").unwrap();
    assert_eq!(
        last_output(&interp).map(|(_, text)| text),
        Some("X:3.000 Y:-3.500 Z:0.000".to_string())
    );
    interp.parse_command("M114 S1").unwrap();
    assert_eq!(
        last_output(&interp).map(|(_, text)| text),
        Some("X:2.000 Y:-3.500 Z:0.000".to_string())
    );
}

#[test]
fn test_line_number_and_debug_level() {
    let mut interp = interpreter();
    interp.parse_command("N120 G0 X1").unwrap();
    assert_eq!(interp.modal().line_number, 120);
    interp.parse_command("M110 N5").unwrap();
    assert_eq!(interp.modal().line_number, 5);
    interp.parse_command("M111 S3").unwrap();
    assert_eq!(interp.modal().debug_level, 3);
}

#[test]
fn test_speed_override() {
    let mut interp = interpreter();
    interp.parse_command("M220 S80").unwrap();
    assert_eq!(interp.machine().speed_override(), 80);
    assert!(matches!(
        interp.parse_command("M220 S0").unwrap_err(),
        Error::Gcode(GcodeError::ValueOutOfRange { letter: 'S' })
    ));
    assert_eq!(interp.machine().speed_override(), 80);
}

#[test]
fn test_dwell_in_milliseconds() {
    let mut interp = interpreter();
    interp.parse_command("G4 P200").unwrap();
    assert_eq!(
        interp.machine().motion_log(),
        &[MotionCall::Wait { millis: 200 }]
    );
    assert!(matches!(
        interp.parse_command("G4").unwrap_err(),
        Error::Gcode(GcodeError::LetterExpected { letter: 'P' })
    ));
}

#[test]
fn test_inch_mode_scales_words() {
    let mut interp = interpreter();
    interp.parse_command("G20 G0 X1").unwrap();
    assert_eq!(interp.positions()[0], 25_400);
    interp.parse_command("G21 G0 X1").unwrap();
    assert_eq!(interp.positions()[0], 1_000);
}

#[test]
fn test_several_commands_share_a_statement() {
    let mut interp = interpreter();
    interp.parse_command("G91 G1 X1 F100 G0 Y2").unwrap();
    assert_eq!(interp.positions()[..2], [1_000, 2_000]);
    assert!(!interp.modal().absolute);
}
