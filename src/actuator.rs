//! Actuator interface consumed by the command session
//!
//! Motors and lights live behind a local bus on the receiver; the protocol
//! core only sees this capability set. Motors are laid out
//!
//! ```text
//!   1      3
//!   0      2
//! ```
//!
//! with the left side facing forward. Positive speed is clockwise.

use crate::contracts::{clamp_speed, Rgb};
use crate::{NUM_LIGHTS, NUM_MOTORS};

pub const FRONT_LEFT_MOTOR: usize = 0;
pub const FRONT_RIGHT_MOTOR: usize = 1;
pub const REAR_LEFT_MOTOR: usize = 2;
pub const REAR_RIGHT_MOTOR: usize = 3;
pub const LEFT_LIGHT: usize = 0;
pub const RIGHT_LIGHT: usize = 1;

/// Motor, light and status-output capability set
pub trait Actuator {
    /// Apply a clamped speed to one motor; unknown positions are ignored
    fn set_motor_speed(&mut self, position: usize, speed: i8);

    /// Apply clamped speeds to all four motors at once
    fn set_all_motor_speeds(&mut self, speeds: [i8; NUM_MOTORS]);

    fn set_lights(&mut self, left: Rgb, right: Rgb);

    /// Drive the status LED / halt indicator
    fn set_digital_output(&mut self, active: bool);

    /// Zero all speeds and lights and assert the halt output
    fn halt_all(&mut self) {
        self.set_lights(Rgb::OFF, Rgb::OFF);
        self.set_all_motor_speeds([0; NUM_MOTORS]);
        self.set_digital_output(true);
    }
}

/// Last values written to the actuators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    pub speeds: [i8; NUM_MOTORS],
    pub lights: [Rgb; NUM_LIGHTS],
    pub digital_output: bool,
}

/// In-memory four-motor rover that remembers what it was told
///
/// Stands in for the motor/light bus in tests and in the simulator.
#[derive(Debug, Clone, Default)]
pub struct SimulatedRover {
    state: ActuatorState,
    writes: u64,
}

impl SimulatedRover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    /// Speed of motor `pos`; 0 for positions that do not exist
    pub fn speed(&self, pos: usize) -> i8 {
        self.state.speeds.get(pos).copied().unwrap_or(0)
    }

    /// Color of light `pos`; off for positions that do not exist
    pub fn color(&self, pos: usize) -> Rgb {
        self.state.lights.get(pos).copied().unwrap_or(Rgb::OFF)
    }

    pub fn digital_output(&self) -> bool {
        self.state.digital_output
    }

    /// Number of bus writes issued
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl Actuator for SimulatedRover {
    fn set_motor_speed(&mut self, position: usize, speed: i8) {
        if let Some(slot) = self.state.speeds.get_mut(position) {
            *slot = clamp_speed(speed);
            self.writes += 1;
        }
    }

    fn set_all_motor_speeds(&mut self, speeds: [i8; NUM_MOTORS]) {
        self.state.speeds = speeds.map(clamp_speed);
        self.writes += 1;
    }

    fn set_lights(&mut self, left: Rgb, right: Rgb) {
        self.state.lights = [left, right];
        self.writes += 1;
    }

    fn set_digital_output(&mut self, active: bool) {
        self.state.digital_output = active;
        self.writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speeds_clamped() {
        let mut rover = SimulatedRover::new();
        rover.set_all_motor_speeds([127, -128, 5, -5]);
        assert_eq!(rover.state().speeds, [100, -100, 5, -5]);

        rover.set_motor_speed(REAR_RIGHT_MOTOR, 110);
        assert_eq!(rover.speed(REAR_RIGHT_MOTOR), 100);
    }

    #[test]
    fn test_front_motors_come_first() {
        assert_eq!([FRONT_LEFT_MOTOR, FRONT_RIGHT_MOTOR], [0, 1]);
        assert_eq!([REAR_LEFT_MOTOR, REAR_RIGHT_MOTOR], [2, 3]);
        assert_eq!([LEFT_LIGHT, RIGHT_LIGHT], [0, 1]);

        let mut rover = SimulatedRover::new();
        rover.set_all_motor_speeds([10, 20, 30, 40]);
        assert_eq!(rover.speed(FRONT_RIGHT_MOTOR), 20);
        assert_eq!(rover.speed(REAR_LEFT_MOTOR), 30);
    }

    #[test]
    fn test_unknown_position_ignored() {
        let mut rover = SimulatedRover::new();
        rover.set_motor_speed(NUM_MOTORS, 50);
        assert_eq!(rover.writes(), 0);
        assert_eq!(rover.speed(NUM_MOTORS), 0);
        assert_eq!(rover.color(NUM_LIGHTS), Rgb::OFF);
    }

    #[test]
    fn test_halt_all() {
        let mut rover = SimulatedRover::new();
        rover.set_all_motor_speeds([50, 50, 50, 50]);
        rover.set_lights(Rgb::from_u32(0xFF0000), Rgb::from_u32(0x0000FF));

        rover.halt_all();

        assert_eq!(
            rover.state(),
            ActuatorState {
                speeds: [0; NUM_MOTORS],
                lights: [Rgb::OFF; NUM_LIGHTS],
                digital_output: true,
            }
        );
        assert_eq!(rover.color(LEFT_LIGHT), Rgb::OFF);
    }
}
