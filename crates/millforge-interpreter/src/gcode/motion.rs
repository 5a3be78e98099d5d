//! Coordinate rotation in front of the motion sink
//!
//! [`MotionControl`] keeps the logical (unrotated) position the program sees
//! and rotates every target about the stored offset before it reaches the
//! machine: `machine = R * (logical - offset) + offset`.

use millforge_core::{Axis, Feedrate, GcodeError, MachineError, Mm1000, Positions, NUM_AXIS_XYZ};
use nalgebra::{Rotation3, Unit, Vector3};

use crate::machine::{Feed, MotionSink};

/// Rotation about an explicit vector (classic G68)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorRotation {
    pub vector: [f64; NUM_AXIS_XYZ],
    /// Angle in radians
    pub angle: f64,
}

/// Rotation state and logical position cache
#[derive(Debug, Clone, PartialEq)]
pub struct MotionControl {
    /// Angle about X, Y and Z in radians
    angles: [f64; NUM_AXIS_XYZ],
    offset: [Mm1000; NUM_AXIS_XYZ],
    vector: Option<VectorRotation>,
    current: Positions,
}

impl MotionControl {
    /// Start unrotated at the machine's current position
    pub fn new(positions: Positions) -> Self {
        Self {
            angles: [0.0; NUM_AXIS_XYZ],
            offset: [0; NUM_AXIS_XYZ],
            vector: None,
            current: positions,
        }
    }

    /// Logical position of one axis
    pub fn position(&self, axis: Axis) -> Mm1000 {
        self.current[axis.index()]
    }

    /// Logical position of every axis
    pub fn positions(&self) -> Positions {
        self.current
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation().is_some()
    }

    pub fn offset(&self) -> [Mm1000; NUM_AXIS_XYZ] {
        self.offset
    }

    pub fn set_offset(&mut self, offset: [Mm1000; NUM_AXIS_XYZ]) {
        self.offset = offset;
    }

    /// Angle about `axis` in radians; zero for rotary axes
    pub fn angle(&self, axis: Axis) -> f64 {
        self.angles.get(axis.index()).copied().unwrap_or(0.0)
    }

    /// Set the angle about one of X, Y or Z
    ///
    /// Replaces an explicit vector rotation, other axis angles are kept.
    pub fn set_angle(&mut self, axis: Axis, radians: f64) {
        if let Some(angle) = self.angles.get_mut(axis.index()) {
            *angle = radians;
            self.vector = None;
        }
    }

    pub fn vector_rotation(&self) -> Option<VectorRotation> {
        self.vector
    }

    /// Rotate about an explicit vector
    pub fn set_vector_rotation(
        &mut self,
        vector: [f64; NUM_AXIS_XYZ],
        radians: f64,
    ) -> Result<(), GcodeError> {
        if vector.iter().all(|v| *v == 0.0) {
            return Err(GcodeError::IjkVectorIsZero);
        }
        self.angles = [0.0; NUM_AXIS_XYZ];
        self.vector = Some(VectorRotation {
            vector,
            angle: radians,
        });
        Ok(())
    }

    /// Drop every angle and the offset
    pub fn clear_rotation(&mut self) {
        self.angles = [0.0; NUM_AXIS_XYZ];
        self.vector = None;
        self.offset = [0; NUM_AXIS_XYZ];
    }

    /// Recompute the logical position from the machine position
    ///
    /// Without rotation the logical position equals the machine position.
    pub fn sync(&mut self, machine: &Positions) {
        self.current = self.inverse_transform(machine);
    }

    /// Logical target to machine coordinates
    pub fn transform(&self, logical: &Positions) -> Positions {
        match self.rotation() {
            Some(rotation) => self.apply(&rotation, logical),
            None => *logical,
        }
    }

    /// Machine coordinates back to logical
    pub fn inverse_transform(&self, machine: &Positions) -> Positions {
        match self.rotation() {
            Some(rotation) => self.apply(&rotation.inverse(), machine),
            None => *machine,
        }
    }

    /// Rotate and issue one absolute move
    pub fn move_abs<S: MotionSink + ?Sized>(
        &mut self,
        sink: &mut S,
        target: &Positions,
        feed: Feed,
    ) -> Result<(), MachineError> {
        let machine_target = self.transform(target);
        tracing::debug!(?target, ?machine_target, ?feed, "move");
        sink.move_abs(&machine_target, feed)?;
        self.current = *target;
        Ok(())
    }

    /// Rotate and issue a probe move, then re-read where the machine stopped
    pub fn probe_move<S: MotionSink + ?Sized>(
        &mut self,
        sink: &mut S,
        target: &Positions,
        feed: Feedrate,
        expected_level: bool,
    ) -> Result<bool, MachineError> {
        let machine_target = self.transform(target);
        let triggered = sink.probe_move(&machine_target, feed, expected_level)?;
        let stopped = sink.positions();
        self.sync(&stopped);
        Ok(triggered)
    }

    fn rotation(&self) -> Option<Rotation3<f64>> {
        if let Some(rotation) = self.vector {
            let axis = Unit::try_new(Vector3::from(rotation.vector), f64::EPSILON)?;
            return Some(Rotation3::from_axis_angle(&axis, rotation.angle));
        }
        if self.angles.iter().all(|angle| *angle == 0.0) {
            return None;
        }
        // X first, then Y, then Z
        let [x, y, z] = self.angles;
        Some(Rotation3::from_euler_angles(x, y, z))
    }

    fn apply(&self, rotation: &Rotation3<f64>, positions: &Positions) -> Positions {
        let relative =
            Vector3::from_fn(|i, _| f64::from(positions[i]) - f64::from(self.offset[i]));
        let rotated = rotation * relative;
        let mut result = *positions;
        for i in 0..NUM_AXIS_XYZ {
            // float to int casts saturate
            result[i] = (rotated[i] + f64::from(self.offset[i])).round() as Mm1000;
        }
        result
    }
}
