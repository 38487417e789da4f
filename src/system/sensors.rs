//! Hardware Capability Interfaces
//!
//! Everything the controller needs from the hardware, and nothing more.
//! The firmware binary implements these on the RP2350 board; tests use the
//! mocks in `system::mock`.
//!
//! # Contract
//! - Reads are best-effort single samples and do not block beyond the bus
//!   transfer they need
//! - "No reading" is `None`, a first-class result every caller branches on
//! - Motor commands are fire-and-forget and idempotent. They take `&self`
//!   so the State Machine and the Safety Monitor can both hold the outputs

use embassy_time::Duration;

use crate::system::color::{ColorLabel, ColorSample};

/// Ultrasonic distance sensor
#[allow(async_fn_in_trait)]
pub trait DistanceSensor {
    /// Distance to the nearest echo in centimeters, `None` if no echo
    async fn read_distance_cm(&mut self) -> Option<f32>;
}

/// Color sensor
#[allow(async_fn_in_trait)]
pub trait ColorSensor {
    /// Raw 3-channel sample, `None` if the sensor returned nothing
    async fn read_raw_sample(&mut self) -> Option<ColorSample>;

    /// Classified color of the surface below the sensor
    async fn read_color(&mut self) -> ColorLabel {
        match self.read_raw_sample().await {
            Some(sample) => sample.classify(),
            None => ColorLabel::Unknown,
        }
    }
}

/// Emergency-stop touch switch
pub trait TouchSensor {
    fn is_pressed(&mut self) -> bool;
}

/// A motor with encoder feedback
///
/// Wheel motors and the sensor turret share this interface. Positions are
/// in motor output degrees relative to the last position reference.
pub trait Motor {
    /// Spin continuously; `0.0` stops and cancels any position move
    fn set_angular_velocity(&self, deg_per_sec: f32);
    /// Start a move by `delta_degrees` from the current position
    fn set_position_relative(&self, delta_degrees: f32);
    /// Make the current position the new zero
    fn reset_position_reference(&self);
    /// Current position, `None` if the encoder has no reading
    fn position_degrees(&self) -> Option<f32>;
}

/// Notes the buzzer can play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Note {
    C5,
    G5,
}

impl Note {
    pub const fn frequency_hz(self) -> u32 {
        match self {
            Note::C5 => 523,
            Note::G5 => 784,
        }
    }
}

/// A single tone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tone {
    pub note: Note,
    pub duration: Duration,
    /// Loudness 0-100
    pub volume: u8,
}

impl Tone {
    pub const fn new(note: Note, duration: Duration, volume: u8) -> Self {
        Self {
            note,
            duration,
            volume,
        }
    }
}

/// Audio notifier
pub trait Notifier {
    /// Start playing; returns immediately
    fn play(&mut self, note: Note, duration: Duration, volume: u8);
}

/// The full set of capabilities the State Machine drives
///
/// Grouping the associated types keeps the controller generic over one
/// parameter instead of one per device.
pub trait Hardware {
    type Wheel: Motor;
    type Turret: Motor;
    type Distance: DistanceSensor;
    type Color: ColorSensor;
    type Notifier: Notifier;
}

/// Motor outputs shared by the State Machine and the Safety Monitor
pub struct MotorBank<W, T> {
    pub left: W,
    pub right: W,
    pub turret: T,
}

impl<W: Motor, T: Motor> MotorBank<W, T> {
    pub const fn new(left: W, right: W, turret: T) -> Self {
        Self {
            left,
            right,
            turret,
        }
    }

    /// Zero every output
    pub fn halt(&self) {
        self.left.set_angular_velocity(0.0);
        self.right.set_angular_velocity(0.0);
        self.turret.set_angular_velocity(0.0);
    }
}
