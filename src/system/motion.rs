//! Motion Primitives
//!
//! The actuation layer every behavior is built on: stop, drive straight,
//! differential drift for wall-following, and relative turns.
//!
//! # Turns
//! Turns are encoder-position based. Both wheels get an opposite relative
//! position move of `degrees * turn_ratio` and the turn is complete once
//! both encoders report the target within `turn_tolerance_deg`. If an
//! encoder has no reading the turn falls back to its timeout, which is
//! scaled to the angle.
//!
//! # Emergency stop
//! Once the emergency flag is set every command collapses to zero, so a
//! routine that has not yet noticed the flag cannot restart the wheels
//! after the Safety Monitor halted them.

use embassy_time::{Duration, Instant, Timer};

use crate::system::config::{RobotConfig, WallSide};
use crate::system::emergency::{Aborted, EmergencyFlag, ABORT_POLL};
use crate::system::logging::log_debug;
use crate::system::sensors::{Motor, MotorBank};
use crate::system::wall_follow::Steering;

/// Differential drive built on the two wheel motors
pub struct Motion<'a, W> {
    left: &'a W,
    right: &'a W,
    emergency: &'a EmergencyFlag,
    config: &'a RobotConfig,
}

impl<'a, W: Motor> Motion<'a, W> {
    pub fn new<T>(
        motors: &'a MotorBank<W, T>,
        emergency: &'a EmergencyFlag,
        config: &'a RobotConfig,
    ) -> Self {
        Self {
            left: &motors.left,
            right: &motors.right,
            emergency,
            config,
        }
    }

    fn command(&self, left_dps: f32, right_dps: f32) {
        if self.emergency.is_set() {
            self.left.set_angular_velocity(0.0);
            self.right.set_angular_velocity(0.0);
            return;
        }
        self.left.set_angular_velocity(left_dps);
        self.right.set_angular_velocity(right_dps);
    }

    pub fn stop(&self) {
        self.command(0.0, 0.0);
    }

    pub fn forward(&self, dps: f32) {
        self.command(dps, dps);
    }

    /// Cruise while curving left
    pub fn drift_left(&self) {
        let speed = self.config.speed_dps;
        let drift = self.config.drift_dps;
        self.command(speed - drift, speed + drift);
    }

    /// Cruise while curving right
    pub fn drift_right(&self) {
        let speed = self.config.speed_dps;
        let drift = self.config.drift_dps;
        self.command(speed + drift, speed - drift);
    }

    /// Applies a wall-follower steering decision at cruise speed
    pub fn steer(&self, steering: Steering) {
        match (steering, self.config.wall_side) {
            (Steering::Straight, _) => self.forward(self.config.speed_dps),
            (Steering::TowardWall, WallSide::Right) | (Steering::AwayFromWall, WallSide::Left) => {
                self.drift_right()
            }
            (Steering::TowardWall, WallSide::Left) | (Steering::AwayFromWall, WallSide::Right) => {
                self.drift_left()
            }
        }
    }

    /// Drives at `dps` (negative reverses) for `duration`, then stops
    pub async fn drive_for(&self, dps: f32, duration: Duration) -> Result<(), Aborted> {
        self.command(dps, dps);
        let result = self.emergency.hold(duration).await;
        self.stop();
        result
    }

    /// Rotates the body in place; positive is clockwise (right)
    pub async fn turn(&self, degrees: f32) -> Result<(), Aborted> {
        self.stop();
        self.emergency.hold(self.config.turn_prepare).await?;

        let wheel_degrees = degrees * self.config.turn_ratio;
        let left_target = self.left.position_degrees().map(|p| p + wheel_degrees);
        let right_target = self.right.position_degrees().map(|p| p - wheel_degrees);

        self.emergency.check()?;
        self.left.set_position_relative(wheel_degrees);
        self.right.set_position_relative(-wheel_degrees);
        log_debug!("turn {} deg, wheels {} deg", degrees, wheel_degrees);

        let deadline = Instant::now() + self.config.turn_timeout(degrees);
        loop {
            if let Err(aborted) = self.emergency.check() {
                self.stop();
                return Err(aborted);
            }
            let reached = self.at_target(self.left, left_target)
                && self.at_target(self.right, right_target);
            if reached || Instant::now() >= deadline {
                break;
            }
            Timer::after(ABORT_POLL).await;
        }

        self.stop();
        self.emergency.hold(self.config.turn_settle).await
    }

    fn at_target(&self, motor: &W, target: Option<f32>) -> bool {
        match (motor.position_degrees(), target) {
            (Some(position), Some(target)) => {
                libm::fabsf(position - target) <= self.config.turn_tolerance_deg
            }
            _ => false,
        }
    }
}
