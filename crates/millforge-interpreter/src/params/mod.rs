//! Parameter table and parameter references
//!
//! Every parameter above the general-purpose registers is described by a
//! static [`ParamInfo`] row. Rows hold no values: [`ParamSource`] names the
//! live field a row reads or writes. Lookup is a linear scan in table order,
//! first match wins.

pub mod expression;
mod resolve;

use millforge_core::{Axis, GcodeError, MAX_AXIS};

use crate::gcode::stream::StreamReader;

/// How a value is stored and printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Plain integer
    Int,
    /// Length or feed in mm1000, shown in the active units
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamAccess {
    Read,
    ReadWrite,
}

/// Live field behind a table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    ProbePosition,
    ProbeOk,
    ReferencePosition,
    G92Preset,
    /// Work offset, 0 = G54
    WorkOffset(u8),
    /// Logical position relative to the active offsets
    Current,
    /// Alias of [`ParamSource::Current`] for one fixed axis
    CurrentAxis(Axis),
    /// Machine position
    CurrentAbsolute,
    Backlash,
    BacklashFeed,
    MaxPosition,
    MinPosition,
    Acceleration,
    Deceleration,
    Jerk,
    ControllerFan,
    RapidFeed,
    WorkFeed,
}

/// Static description of one parameter or axis-indexed parameter range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamInfo {
    /// Key of the first axis, or the only key
    pub key: u16,
    pub name: &'static str,
    /// Row covers `key .. key + axis_count`
    pub axis_indexable: bool,
    pub kind: ParamKind,
    pub access: ParamAccess,
    pub source: ParamSource,
}

const fn row(
    key: u16,
    name: &'static str,
    axis_indexable: bool,
    kind: ParamKind,
    access: ParamAccess,
    source: ParamSource,
) -> ParamInfo {
    ParamInfo {
        key,
        name,
        axis_indexable,
        kind,
        access,
        source,
    }
}

use ParamAccess::{Read, ReadWrite};
use ParamKind::{Int, Length};

/// The parameter table, in lookup order
pub const PARAM_TABLE: &[ParamInfo] = &[
    row(5061, "_probePos", true, Length, Read, ParamSource::ProbePosition),
    row(5070, "_probeOK", false, Int, Read, ParamSource::ProbeOk),
    row(5161, "_g28home", true, Length, Read, ParamSource::ReferencePosition),
    row(5211, "_g92home", true, Length, Read, ParamSource::G92Preset),
    row(5221, "_g54home", true, Length, ReadWrite, ParamSource::WorkOffset(0)),
    row(5241, "_g55home", true, Length, ReadWrite, ParamSource::WorkOffset(1)),
    row(5261, "_g56home", true, Length, ReadWrite, ParamSource::WorkOffset(2)),
    row(5281, "_g57home", true, Length, ReadWrite, ParamSource::WorkOffset(3)),
    row(5301, "_g58home", true, Length, ReadWrite, ParamSource::WorkOffset(4)),
    row(5321, "_g59home", true, Length, ReadWrite, ParamSource::WorkOffset(5)),
    row(5420, "_current", true, Length, Read, ParamSource::Current),
    row(5420, "_x", false, Length, Read, ParamSource::CurrentAxis(Axis::X)),
    row(5421, "_y", false, Length, Read, ParamSource::CurrentAxis(Axis::Y)),
    row(5422, "_z", false, Length, Read, ParamSource::CurrentAxis(Axis::Z)),
    row(5423, "_a", false, Length, Read, ParamSource::CurrentAxis(Axis::A)),
    row(5424, "_b", false, Length, Read, ParamSource::CurrentAxis(Axis::B)),
    row(5425, "_c", false, Length, Read, ParamSource::CurrentAxis(Axis::C)),
    row(5430, "_currentAbs", true, Length, Read, ParamSource::CurrentAbsolute),
    row(5441, "_backlash", true, Length, ReadWrite, ParamSource::Backlash),
    row(5450, "_backlashfeed", false, Length, ReadWrite, ParamSource::BacklashFeed),
    row(5461, "_maxPos", true, Length, ReadWrite, ParamSource::MaxPosition),
    row(5471, "_minPos", true, Length, ReadWrite, ParamSource::MinPosition),
    row(5481, "_acc", true, Int, ReadWrite, ParamSource::Acceleration),
    row(5491, "_dec", true, Int, ReadWrite, ParamSource::Deceleration),
    row(5501, "_jerk", true, Int, ReadWrite, ParamSource::Jerk),
    row(5510, "_fan", false, Int, ReadWrite, ParamSource::ControllerFan),
    row(5511, "_g0feedrate", false, Length, ReadWrite, ParamSource::RapidFeed),
    row(5512, "_feedrate", false, Length, Read, ParamSource::WorkFeed),
];

/// Table limits that depend on the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableScope {
    pub axis_count: usize,
    pub work_offset_count: u8,
}

impl TableScope {
    fn has_row(&self, info: &ParamInfo) -> bool {
        match info.source {
            ParamSource::WorkOffset(index) => index < self.work_offset_count,
            ParamSource::CurrentAxis(axis) => axis.index() < self.axis_count,
            _ => true,
        }
    }
}

/// A resolved table row with the axis the key selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRef {
    pub info: &'static ParamInfo,
    pub axis: Axis,
}

impl ParamRef {
    pub fn key(&self) -> u16 {
        if self.info.axis_indexable {
            self.info.key + self.axis.index() as u16
        } else {
            self.info.key
        }
    }
}

/// Find the row covering `key`
pub fn lookup_key(key: u16, scope: TableScope) -> Option<ParamRef> {
    PARAM_TABLE
        .iter()
        .filter(|info| scope.has_row(info))
        .find_map(|info| {
            if info.axis_indexable {
                let offset = usize::from(key.checked_sub(info.key)?);
                (offset < scope.axis_count.min(MAX_AXIS)).then(|| ParamRef {
                    info,
                    axis: Axis::ALL[offset],
                })
            } else if info.key == key {
                let axis = match info.source {
                    ParamSource::CurrentAxis(axis) => axis,
                    _ => Axis::X,
                };
                Some(ParamRef { info, axis })
            } else {
                None
            }
        })
}

/// Find a row by name, ASCII case-insensitive
pub fn lookup_name(name: &str, scope: TableScope) -> Option<&'static ParamInfo> {
    PARAM_TABLE
        .iter()
        .filter(|info| scope.has_row(info))
        .find(|info| info.name.eq_ignore_ascii_case(name))
}

/// Read a parameter reference after the `#`
///
/// Accepts a bare number or `<name[:axis]>` and returns the numeric key.
pub fn parse_param_no(rd: &mut StreamReader<'_>, scope: TableScope) -> Result<u16, GcodeError> {
    if rd.peek() != Some('<') {
        let value = rd.read_uint().ok_or(GcodeError::NoValidVariableName)?;
        return u16::try_from(value).map_err(|_| GcodeError::ValueOutOfRange { letter: '#' });
    }

    rd.next_char();
    rd.skip_spaces();
    match rd.peek() {
        Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {}
        _ => return Err(GcodeError::VariableMustStartWithAlpha),
    }
    let name = rd.read_word();

    let mut axis = None;
    if rd.peek() == Some(':') {
        rd.next_char();
        let letter = rd.next_char().ok_or(GcodeError::NoValidVariableName)?;
        let selected = Axis::from_letter(letter)
            .filter(|axis| axis.index() < scope.axis_count)
            .ok_or(GcodeError::NoValidVariableName)?;
        axis = Some(selected);
    }
    rd.skip_spaces();
    if rd.next_char() != Some('>') {
        // covers a second ':' as well as an unterminated reference
        return Err(GcodeError::NoValidVariableName);
    }

    let info = lookup_name(name, scope).ok_or(GcodeError::ParameterDoesntExist)?;
    match axis {
        Some(axis) if info.axis_indexable => Ok(info.key + axis.index() as u16),
        Some(_) => Err(GcodeError::NoValidVariableName),
        None => Ok(info.key),
    }
}
