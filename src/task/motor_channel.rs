//! Motor command cells
//!
//! One cell per motor output, shared between the controller (State Machine
//! on core 0, Safety Monitor on core 1) and the task that actually drives
//! the hardware. Writers post a setpoint; the hardware task reads it every
//! control period and reports position back.
//!
//! The cell is a blocking critical-section mutex, which the RP2350 backs with
//! a hardware spinlock, so both cores see a consistent setpoint/position
//! pair. The lock is never held across an await.

use core::cell::Cell;

use courier_robot::system::sensors::Motor;
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

/// What the hardware task should do with the motor
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum Setpoint {
    /// Spin at degrees per second
    Velocity(f32),
    /// Hold this position, degrees from the current reference
    Position(f32),
}

#[derive(Clone, Copy)]
struct ChannelState {
    setpoint: Setpoint,
    position: f32,
    feedback: bool,
}

pub struct MotorChannel {
    state: Mutex<CriticalSectionRawMutex, Cell<ChannelState>>,
}

impl MotorChannel {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(ChannelState {
                setpoint: Setpoint::Velocity(0.0),
                position: 0.0,
                feedback: false,
            })),
        }
    }

    fn update(&self, f: impl FnOnce(&mut ChannelState)) {
        self.state.lock(|cell| {
            let mut state = cell.get();
            f(&mut state);
            cell.set(state);
        });
    }

    /// Current setpoint and position, read together
    pub fn snapshot(&self) -> (Setpoint, f32) {
        self.state.lock(|cell| {
            let state = cell.get();
            (state.setpoint, state.position)
        })
    }

    /// Report movement measured (or commanded, for open-loop outputs) since
    /// the last report
    pub fn advance(&self, delta_degrees: f32) {
        self.update(|state| {
            state.position += delta_degrees;
            state.feedback = true;
        });
    }
}

impl Motor for MotorChannel {
    fn set_angular_velocity(&self, deg_per_sec: f32) {
        self.update(|state| state.setpoint = Setpoint::Velocity(deg_per_sec));
    }

    fn set_position_relative(&self, delta_degrees: f32) {
        self.update(|state| state.setpoint = Setpoint::Position(state.position + delta_degrees));
    }

    fn reset_position_reference(&self) {
        self.update(|state| {
            if let Setpoint::Position(target) = state.setpoint {
                state.setpoint = Setpoint::Position(target - state.position);
            }
            state.position = 0.0;
        });
    }

    fn position_degrees(&self) -> Option<f32> {
        self.state.lock(|cell| {
            let state = cell.get();
            state.feedback.then_some(state.position)
        })
    }
}
