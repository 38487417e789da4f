//! Wall-Follower
//!
//! Holds a fixed lateral standoff from the boundary wall using ultrasonic
//! distance feedback. Drives the `FollowingLine` state.
//!
//! # Control law
//! Bang-bang with a deadband: the first valid reading is locked as the
//! target, afterwards `error = distance - target` picks one of three
//! outputs. Within the tolerance the robot drives straight, outside it one
//! of two fixed differential offsets is applied. No gain scaling, so sensor
//! noise inside the band never reaches the wheels.
//!
//! # Invalid readings
//! A missing echo, or one beyond the sensor range, counts as invalid. The
//! robot holds course while the run of invalid reads is shorter than the
//! limit and stops (fail-safe) once it reaches it. A single valid read
//! resets the run and resumes closed-loop control.

use embassy_time::{Duration, Instant};

use crate::system::logging::{log_info, log_warn};

/// Steering correction relative to the wall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Steering {
    Straight,
    /// Too far from the wall
    TowardWall,
    /// Too close to the wall
    AwayFromWall,
}

/// Per-tick output of the wall-follower
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WallCommand {
    Steer(Steering),
    /// Too many invalid reads in a row
    FailSafeStop,
}

/// Steering for a distance against a locked target
///
/// A pure function of `sign(distance - target)` against the tolerance band.
pub fn steering(distance: f32, target: f32, tolerance: f32) -> Steering {
    let error = distance - target;
    if error > tolerance {
        Steering::TowardWall
    } else if error < -tolerance {
        Steering::AwayFromWall
    } else {
        Steering::Straight
    }
}

/// Wall-following state, persistent across `FollowingLine` ticks
#[derive(Debug, Clone)]
pub struct WallFollower {
    target_distance: Option<f32>,
    consecutive_invalid_reads: u32,
    tolerance_cm: f32,
    max_range_cm: f32,
    bad_read_limit: u32,
}

impl WallFollower {
    pub fn new(tolerance_cm: f32, max_range_cm: f32, bad_read_limit: u32) -> Self {
        Self {
            target_distance: None,
            consecutive_invalid_reads: 0,
            tolerance_cm,
            max_range_cm,
            bad_read_limit,
        }
    }

    pub fn target_distance(&self) -> Option<f32> {
        self.target_distance
    }

    pub fn consecutive_invalid_reads(&self) -> u32 {
        self.consecutive_invalid_reads
    }

    /// Adopts `distance` as the standoff target
    pub fn lock(&mut self, distance: f32) {
        log_info!("wall target locked at {} cm", distance);
        self.target_distance = Some(distance);
    }

    /// Forgets the target; the next valid reading locks a new one
    pub fn clear_target(&mut self) {
        self.target_distance = None;
    }

    /// Feeds one distance reading and returns the command for this tick
    pub fn update(&mut self, reading: Option<f32>) -> WallCommand {
        let distance = match reading {
            Some(d) if d.is_finite() && d >= 0.0 && d <= self.max_range_cm => d,
            _ => return self.invalid_read(),
        };
        self.consecutive_invalid_reads = 0;

        match self.target_distance {
            None => {
                self.lock(distance);
                WallCommand::Steer(Steering::Straight)
            }
            Some(target) => WallCommand::Steer(steering(distance, target, self.tolerance_cm)),
        }
    }

    fn invalid_read(&mut self) -> WallCommand {
        self.consecutive_invalid_reads = self.consecutive_invalid_reads.saturating_add(1);
        if self.consecutive_invalid_reads >= self.bad_read_limit {
            if self.consecutive_invalid_reads == self.bad_read_limit {
                log_warn!(
                    "{} invalid distance reads in a row, stopping",
                    self.consecutive_invalid_reads
                );
            }
            WallCommand::FailSafeStop
        } else {
            WallCommand::Steer(Steering::Straight)
        }
    }
}

/// Rate limiter for the color check while wall-following
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// `true` at most once per interval; the first call always passes
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follower() -> WallFollower {
        WallFollower::new(2.0, 100.0, 10)
    }

    #[test]
    fn test_steering_is_sign_of_error_against_band() {
        assert_eq!(steering(42.0, 42.0, 2.0), Steering::Straight);
        assert_eq!(steering(44.0, 42.0, 2.0), Steering::Straight);
        assert_eq!(steering(40.0, 42.0, 2.0), Steering::Straight);
        assert_eq!(steering(44.5, 42.0, 2.0), Steering::TowardWall);
        assert_eq!(steering(39.5, 42.0, 2.0), Steering::AwayFromWall);
    }

    #[test]
    fn test_steering_never_both_directions() {
        let target = 30.0;
        let mut d = 0.0;
        while d <= 60.0 {
            let s = steering(d, target, 2.0);
            let error = d - target;
            match s {
                Steering::TowardWall => assert!(error > 2.0),
                Steering::AwayFromWall => assert!(error < -2.0),
                Steering::Straight => assert!(error.abs() <= 2.0),
            }
            d += 0.25;
        }
    }

    #[test]
    fn test_lock_then_correct_scenario() {
        let mut wall = follower();
        let stream = [None, Some(42.0), Some(42.0), Some(20.0), Some(20.0)];
        let commands: Vec<WallCommand> = stream.iter().map(|r| wall.update(*r)).collect();

        assert_eq!(commands[0], WallCommand::Steer(Steering::Straight));
        assert_eq!(commands[1], WallCommand::Steer(Steering::Straight));
        assert_eq!(wall.target_distance(), Some(42.0));
        assert_eq!(commands[2], WallCommand::Steer(Steering::Straight));
        assert_eq!(commands[3], WallCommand::Steer(Steering::AwayFromWall));
        assert_eq!(commands[4], WallCommand::Steer(Steering::AwayFromWall));
    }

    #[test]
    fn test_short_invalid_run_holds_course() {
        let mut wall = follower();
        wall.update(Some(30.0));
        for _ in 0..9 {
            assert_eq!(wall.update(None), WallCommand::Steer(Steering::Straight));
        }
        assert_eq!(wall.consecutive_invalid_reads(), 9);
    }

    #[test]
    fn test_invalid_run_at_limit_stops_and_valid_read_resumes() {
        let mut wall = follower();
        wall.update(Some(30.0));
        for _ in 0..9 {
            wall.update(None);
        }
        assert_eq!(wall.update(None), WallCommand::FailSafeStop);
        assert_eq!(wall.update(None), WallCommand::FailSafeStop);
        assert_eq!(wall.consecutive_invalid_reads(), 11);

        assert_eq!(wall.update(Some(36.0)), WallCommand::Steer(Steering::TowardWall));
        assert_eq!(wall.consecutive_invalid_reads(), 0);
        assert_eq!(wall.target_distance(), Some(30.0));
    }

    #[test]
    fn test_out_of_range_counts_as_invalid() {
        let mut wall = follower();
        wall.update(Some(30.0));
        assert_eq!(wall.update(Some(250.0)), WallCommand::Steer(Steering::Straight));
        assert_eq!(wall.update(Some(-1.0)), WallCommand::Steer(Steering::Straight));
        assert_eq!(wall.consecutive_invalid_reads(), 2);
        assert_eq!(wall.target_distance(), Some(30.0));
    }

    #[test]
    fn test_clear_target_forces_relock() {
        let mut wall = follower();
        wall.update(Some(30.0));
        wall.clear_target();
        assert_eq!(wall.target_distance(), None);
        wall.update(Some(12.0));
        assert_eq!(wall.target_distance(), Some(12.0));
    }

    #[test]
    fn test_throttle_passes_once_per_interval() {
        let mut throttle = Throttle::new(Duration::from_millis(150));
        let t0 = Instant::from_millis(1_000);
        assert!(throttle.ready(t0));
        assert!(!throttle.ready(t0 + Duration::from_millis(50)));
        assert!(!throttle.ready(t0 + Duration::from_millis(149)));
        assert!(throttle.ready(t0 + Duration::from_millis(150)));
        assert!(!throttle.ready(t0 + Duration::from_millis(200)));
    }
}
