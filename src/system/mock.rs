//! Test doubles for the hardware capability traits
//!
//! Sensors replay a script and repeat their last entry once it runs out.
//! Motors record every velocity command and apply position moves instantly.
//! Interior state sits behind `std::sync::Mutex` so a `MotorBank` of mocks
//! can be shared with a Safety Monitor running on another thread.

use std::collections::VecDeque;
use std::sync::Mutex;

use embassy_time::Duration;

use crate::system::color::{ColorLabel, ColorSample};
use crate::system::sensors::{
    ColorSensor, DistanceSensor, Hardware, Motor, Note, Notifier, TouchSensor,
};

#[derive(Default)]
struct MotorState {
    velocity: f32,
    position: f32,
    velocity_history: Vec<f32>,
    moves: Vec<f32>,
}

pub struct MockMotor {
    state: Mutex<MotorState>,
    has_encoder: bool,
}

impl MockMotor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MotorState::default()),
            has_encoder: true,
        }
    }

    /// A motor whose encoder never reports a position
    pub fn without_encoder() -> Self {
        Self {
            has_encoder: false,
            ..Self::new()
        }
    }

    pub fn velocity(&self) -> f32 {
        self.state.lock().unwrap().velocity
    }

    /// Every velocity command, in order
    pub fn history(&self) -> Vec<f32> {
        self.state.lock().unwrap().velocity_history.clone()
    }

    /// Every relative position move, in order
    pub fn moves(&self) -> Vec<f32> {
        self.state.lock().unwrap().moves.clone()
    }
}

impl Motor for MockMotor {
    fn set_angular_velocity(&self, deg_per_sec: f32) {
        let mut state = self.state.lock().unwrap();
        state.velocity = deg_per_sec;
        state.velocity_history.push(deg_per_sec);
    }

    fn set_position_relative(&self, delta_degrees: f32) {
        let mut state = self.state.lock().unwrap();
        state.position += delta_degrees;
        state.moves.push(delta_degrees);
    }

    fn reset_position_reference(&self) {
        self.state.lock().unwrap().position = 0.0;
    }

    fn position_degrees(&self) -> Option<f32> {
        if self.has_encoder {
            Some(self.state.lock().unwrap().position)
        } else {
            None
        }
    }
}

/// Replays a script of distance readings
pub struct ScriptedDistance {
    script: VecDeque<Option<f32>>,
    last: Option<f32>,
    reads: usize,
}

impl ScriptedDistance {
    pub fn new(script: impl IntoIterator<Item = Option<f32>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
            reads: 0,
        }
    }

    pub fn constant(distance: f32) -> Self {
        Self::new([Some(distance)])
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl DistanceSensor for ScriptedDistance {
    async fn read_distance_cm(&mut self) -> Option<f32> {
        self.reads += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Replays a script of color labels
pub struct ScriptedColor {
    script: VecDeque<ColorLabel>,
    last: ColorLabel,
    reads: usize,
}

impl ScriptedColor {
    pub fn new(script: impl IntoIterator<Item = ColorLabel>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: ColorLabel::Unknown,
            reads: 0,
        }
    }

    pub fn constant(label: ColorLabel) -> Self {
        Self::new([label])
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl ColorSensor for ScriptedColor {
    async fn read_raw_sample(&mut self) -> Option<ColorSample> {
        self.read_color().await.reference_sample()
    }

    async fn read_color(&mut self) -> ColorLabel {
        self.reads += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Touch switch that closes after a number of polls
pub struct MockTouch {
    press_after: Option<usize>,
    polls: usize,
}

impl MockTouch {
    pub fn never() -> Self {
        Self {
            press_after: None,
            polls: 0,
        }
    }

    pub fn pressed_after(polls: usize) -> Self {
        Self {
            press_after: Some(polls),
            polls: 0,
        }
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl TouchSensor for MockTouch {
    fn is_pressed(&mut self) -> bool {
        self.polls += 1;
        self.press_after.is_some_and(|n| self.polls > n)
    }
}

#[derive(Default)]
pub struct MockNotifier {
    pub played: Vec<(Note, Duration, u8)>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for MockNotifier {
    fn play(&mut self, note: Note, duration: Duration, volume: u8) {
        self.played.push((note, duration, volume));
    }
}

pub struct MockHardware;

impl Hardware for MockHardware {
    type Wheel = MockMotor;
    type Turret = MockMotor;
    type Distance = ScriptedDistance;
    type Color = ScriptedColor;
    type Notifier = MockNotifier;
}
