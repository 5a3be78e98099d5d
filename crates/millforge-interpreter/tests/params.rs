use millforge_core::{Axis, Error, GcodeError, MessageLevel};
use millforge_interpreter::{
    lookup_name, Interpreter, MachineConfig, ParamAccess, SimulatedMachine, TableScope,
    PARAM_TABLE,
};
use millforge_settings::{InterpreterConfig, MachineProfile};
use proptest::prelude::*;

fn interpreter() -> Interpreter<SimulatedMachine> {
    Interpreter::new(
        InterpreterConfig::default(),
        SimulatedMachine::new(&MachineProfile::default()),
    )
}

fn last_output(interp: &Interpreter<SimulatedMachine>) -> String {
    interp
        .machine()
        .output()
        .last()
        .map(|(_, text)| text.clone())
        .unwrap_or_default()
}

/// Every read-only key reachable on a three-axis machine
fn read_only_keys() -> Vec<u16> {
    PARAM_TABLE
        .iter()
        .filter(|info| info.access == ParamAccess::Read)
        .flat_map(|info| {
            let count = if info.axis_indexable { 3 } else { 1 };
            (0..count).map(move |offset| info.key + offset)
        })
        .filter(|key| !(5423..=5425).contains(key))
        .collect()
}

#[test]
fn test_register_write_and_read() {
    let mut interp = interpreter();
    interp.parse_command("#1=[2 + 3] * 2").unwrap();
    interp.parse_command("#2=#1 / 4").unwrap();
    assert_eq!(interp.param_value(1, true), Ok(10.0));
    assert_eq!(interp.param_value(2, true), Ok(2.5));

    interp.parse_command("#2").unwrap();
    assert_eq!(last_output(&interp), "#2=2.500");
}

#[test]
fn test_register_read_in_mm_under_inch_units() {
    let mut interp = interpreter();
    interp.parse_command("G20").unwrap();
    interp.parse_command("#3=2").unwrap();
    assert_eq!(interp.param_value(3, true), Ok(2.0));
    assert!((interp.param_value(3, false).unwrap() - 50.8).abs() < 1e-9);

    interp.parse_command("G21").unwrap();
    assert_eq!(interp.param_value(3, false), Ok(2.0));
}

#[test]
fn test_register_used_as_word_value() {
    let mut interp = interpreter();
    interp.parse_command("#3=12.5").unwrap();
    interp.parse_command("G0 X#3 Y[#3 * 2]").unwrap();
    assert_eq!(interp.positions()[0], 12_500);
    assert_eq!(interp.positions()[1], 25_000);
}

#[test]
fn test_named_backlash_matches_numeric_key() {
    let mut interp = interpreter();
    interp.parse_command("#<_backlash:y>=0.05").unwrap();
    assert_eq!(interp.machine().backlash(Axis::Y), 50);
    assert_eq!(interp.param_value(5442, false), Ok(0.05));

    interp.parse_command("#5441=0.02").unwrap();
    assert_eq!(interp.machine().backlash(Axis::X), 20);
}

#[test]
fn test_backlash_names_resolve_for_every_axis() {
    let six = InterpreterConfig::with_axes(6);
    let profile = MachineProfile {
        axes: vec![Default::default(); 6],
        ..MachineProfile::default()
    };
    let mut interp = Interpreter::new(six, SimulatedMachine::new(&profile));
    for (offset, letter) in ['x', 'y', 'z', 'a', 'b', 'c'].iter().enumerate() {
        let value = offset as f64 + 1.0;
        interp
            .parse_command(&format!("#<_backlash:{}>={}", letter, value))
            .unwrap();
        assert_eq!(interp.param_value(5441 + offset as u16, false), Ok(value));
    }
}

#[test]
fn test_write_outside_table_is_unsupported() {
    let mut interp = interpreter();
    assert!(matches!(
        interp.parse_command("#4000=1").unwrap_err(),
        Error::Gcode(GcodeError::UnsupportedParameterNumber { key: 4000 })
    ));
}

#[test]
fn test_trailing_text_after_write_is_rejected() {
    let mut interp = interpreter();
    assert!(matches!(
        interp.parse_command("#1=5 X").unwrap_err(),
        Error::Gcode(GcodeError::UnexpectedToken { found: 'X' })
    ));
    assert_eq!(interp.param_value(1, true), Ok(0.0));

    interp.parse_command("#1=5 (comment)").unwrap();
    assert_eq!(interp.param_value(1, true), Ok(5.0));
}

#[test]
fn test_missing_equals() {
    let mut interp = interpreter();
    assert!(matches!(
        interp.parse_command("#1 5").unwrap_err(),
        Error::Gcode(GcodeError::EqExpected)
    ));
}

#[test]
fn test_current_position_in_active_units() {
    let mut interp = interpreter();
    interp.parse_command("G0 X25.4").unwrap();
    assert_eq!(interp.param_value(5420, true), Ok(25.4));
    interp.parse_command("G20").unwrap();
    assert_eq!(interp.param_value(5420, true), Ok(1.0));
    assert_eq!(interp.param_value(5420, false), Ok(25.4));
    // registers are never converted
    interp.parse_command("#1=2").unwrap();
    assert_eq!(interp.param_value(1, true), Ok(2.0));
}

#[test]
fn test_reference_position_follows_reference_side() {
    let interp = interpreter();
    // X references at min, Z at max
    assert_eq!(interp.param_value(5161, true), Ok(0.0));
    assert_eq!(interp.param_value(5163, true), Ok(0.0));
    assert_eq!(interp.param_value(5162, true), Ok(0.0));
    assert_eq!(interp.param_value(5461, true), Ok(200.0));
}

#[test]
fn test_print_all_lists_every_axis() {
    let mut interp = interpreter();
    interp.parse_command("#?").unwrap();
    let output = interp.machine().output();
    assert!(output
        .iter()
        .all(|(level, _)| *level == MessageLevel::Output));
    assert!(output
        .iter()
        .any(|(_, line)| line.starts_with("#<_backlash:Z>=") && line.ends_with(";5443")));
    assert!(output
        .iter()
        .any(|(_, line)| line.starts_with("#<_acc:X>=350\t")));
    // no row for axes that are not configured
    assert!(!output.iter().any(|(_, line)| line.contains(":A>")));
}

#[test]
fn test_print_expands_parameters() {
    let mut interp = interpreter();
    interp.parse_command("#7=1.5").unwrap();
    interp.parse_command("(PRINT, value #7 at #<_x>)").unwrap();
    assert_eq!(last_output(&interp), "value 1.500 at 0.000");
}

#[test]
fn test_lookup_name_is_case_insensitive() {
    let scope = TableScope {
        axis_count: 3,
        work_offset_count: 6,
    };
    assert_eq!(lookup_name("_G0FEEDRATE", scope).map(|info| info.key), Some(5511));
}

proptest! {
    #[test]
    fn prop_read_only_write_changes_nothing(
        index in 0usize..64,
        value in -1000.0f64..1000.0,
    ) {
        let keys = read_only_keys();
        let key = keys[index % keys.len()];

        let mut interp = interpreter();
        interp.parse_command("G0 X1 Y2 Z-3").unwrap();
        let modal = interp.modal().clone();
        let positions = interp.positions();
        let log = interp.machine().motion_log().len();

        let err = interp
            .parse_command(&format!("#{}={}", key, value))
            .unwrap_err();
        prop_assert!(matches!(err, Error::Gcode(GcodeError::ParameterReadOnly)));
        prop_assert_eq!(interp.modal(), &modal);
        prop_assert_eq!(interp.positions(), positions);
        prop_assert_eq!(interp.machine().motion_log().len(), log);
        prop_assert_eq!(interp.machine().backlash(Axis::X), 0);
    }
}
