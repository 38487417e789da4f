//! Robot Configuration
//!
//! Flat set of named tunables supplied once at startup. Values are the
//! tunings from the course runs: speeds in wheel degrees per second,
//! distances in centimeters, angles in robot-body degrees.
//!
//! # Tuning notes
//! - `turn_ratio` is the turning-circle radius over the wheel radius; it
//!   converts a body rotation into wheel rotation and must be re-measured
//!   whenever the chassis is rebuilt
//! - `wall_tolerance_cm` is the deadband of the wall-follower; too small and
//!   the robot weaves on sensor noise
//! - `corner_threshold_cm` separates "wall right after the turn" (outer
//!   corner) from "open space" (mail-room branch)

use embassy_time::Duration;

use crate::system::sensors::{Note, Tone};

/// Side of the robot the boundary wall is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WallSide {
    Left,
    Right,
}

/// What to do once a doorway turns out to be restricted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RestrictedDoorway {
    /// Drive on past the doorway and keep following the wall
    PassBy,
    /// Back away and take the detour maneuver
    Detour,
}

/// How the room scanner sweeps the color sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanMode {
    /// Independently actuated sensor turret
    Turret,
    /// Rotate the whole robot in place
    BodyRotation,
}

/// Room scanner tunables
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    pub mode: ScanMode,
    /// Wheel speed for the small forward step between sweeps
    pub step_dps: f32,
    /// Duration of the forward step (roughly one centimeter)
    pub step_duration: Duration,
    /// Half-angle swept to each side of center, turret degrees
    pub sweep_half_angle: f32,
    /// Turret position error at which a sweep leg counts as finished
    pub settle_tolerance_deg: f32,
    /// Upper bound for one sweep leg when the turret does not settle
    pub leg_timeout: Duration,
    /// Color polling period during a sweep
    pub poll_step: Duration,
    /// Body rotation per step in body-rotation mode
    pub body_step_deg: f32,
    /// Pause after each body step before sampling color
    pub body_settle: Duration,
    /// Give up after this many step-and-sweep cycles, `None` scans until found
    pub max_cycles: Option<u32>,
}

/// Static startup configuration
#[derive(Debug, Clone, Copy)]
pub struct RobotConfig {
    /// Delay between the State Machine loop iterations
    pub tick_period: Duration,
    /// Delay before the first tick
    pub start_delay: Duration,
    /// Touch sensor polling period of the Safety Monitor
    pub safety_poll_period: Duration,

    /// Cruise wheel speed
    pub speed_dps: f32,
    /// Reduced wheel speed for doorways and rooms
    pub slow_speed_dps: f32,
    /// Differential offset applied while drifting toward or away from the wall
    pub drift_dps: f32,

    pub wall_side: WallSide,
    pub wall_tolerance_cm: f32,
    /// Readings above this are treated as no reading
    pub max_range_cm: f32,
    /// Consecutive invalid reads before the fail-safe stop
    pub bad_read_limit: u32,
    /// Throttle for the color check while following the wall
    pub color_check_interval: Duration,

    /// Turning-circle radius over wheel radius
    pub turn_ratio: f32,
    /// Wheel position error at which a turn counts as complete
    pub turn_tolerance_deg: f32,
    /// Pause between stopping and starting a turn
    pub turn_prepare: Duration,
    /// Pause after a turn before driving on
    pub turn_settle: Duration,
    /// Upper bound for a turn, scaled per 90 body degrees
    pub turn_timeout_per_quarter: Duration,

    /// Body rotation toward a black-junction branch (90 or 270)
    pub junction_turn_deg: f32,
    /// Below this the branch is an outer corner, above it open space
    pub corner_threshold_cm: f32,
    /// Black markers are ignored for this long after one was handled
    pub junction_cooldown: Duration,
    /// Upper bound for driving off a black patch
    pub clear_black_timeout: Duration,

    /// Slow probe into a doorway, roughly half its depth
    pub doorway_probe: Duration,
    /// Color sampling period during the probe
    pub doorway_sample_step: Duration,
    /// Drive time to clear a restricted doorway
    pub doorway_clear: Duration,
    /// Orange markers are ignored for this long after leaving a doorway
    pub doorway_cooldown: Duration,
    pub restricted_doorway: RestrictedDoorway,

    /// Drive time through a doorway into the room
    pub enter_room_duration: Duration,
    /// Pause after entering a room
    pub room_settle: Duration,
    /// Drive time after turning around to leave a room
    pub exit_room_duration: Duration,
    /// Search time for the boundary line after leaving a room
    pub find_line_timeout: Duration,
    pub find_line_step: Duration,
    /// Fallback search turn when the line was not found
    pub find_line_turn_deg: f32,
    pub find_line_creep: Duration,

    /// Reverse time when detouring around a restricted room
    pub avoid_backup: Duration,
    /// Forward time between the two detour turns
    pub avoid_bypass: Duration,
    pub avoid_turn_deg: f32,

    pub delivery_tone: Tone,
    /// Pause after a delivery
    pub delivery_settle: Duration,
    pub mission_tone: Tone,

    pub scan: ScanConfig,
}

impl RobotConfig {
    pub const fn new() -> Self {
        Self {
            tick_period: Duration::from_millis(50),
            start_delay: Duration::from_secs(3),
            safety_poll_period: Duration::from_millis(100),

            speed_dps: 180.0,
            slow_speed_dps: 100.0,
            drift_dps: 10.0,

            wall_side: WallSide::Right,
            wall_tolerance_cm: 2.0,
            max_range_cm: 100.0,
            bad_read_limit: 10,
            color_check_interval: Duration::from_millis(150),

            turn_ratio: 7.0 / 2.0,
            turn_tolerance_deg: 5.0,
            turn_prepare: Duration::from_millis(100),
            turn_settle: Duration::from_millis(200),
            turn_timeout_per_quarter: Duration::from_millis(1500),

            junction_turn_deg: 90.0,
            corner_threshold_cm: 30.0,
            junction_cooldown: Duration::from_secs(10),
            clear_black_timeout: Duration::from_millis(1000),

            doorway_probe: Duration::from_millis(500),
            doorway_sample_step: Duration::from_millis(50),
            doorway_clear: Duration::from_millis(500),
            doorway_cooldown: Duration::from_secs(3),
            restricted_doorway: RestrictedDoorway::PassBy,

            enter_room_duration: Duration::from_millis(1200),
            room_settle: Duration::from_millis(300),
            exit_room_duration: Duration::from_millis(1500),
            find_line_timeout: Duration::from_secs(2),
            find_line_step: Duration::from_millis(100),
            find_line_turn_deg: -45.0,
            find_line_creep: Duration::from_millis(500),

            avoid_backup: Duration::from_millis(1000),
            avoid_bypass: Duration::from_millis(1000),
            avoid_turn_deg: 90.0,

            delivery_tone: Tone::new(Note::C5, Duration::from_millis(500), 80),
            delivery_settle: Duration::from_millis(500),
            mission_tone: Tone::new(Note::G5, Duration::from_secs(1), 80),

            scan: ScanConfig {
                mode: ScanMode::Turret,
                step_dps: 45.0,
                step_duration: Duration::from_millis(150),
                sweep_half_angle: 90.0,
                settle_tolerance_deg: 3.0,
                leg_timeout: Duration::from_secs(2),
                poll_step: Duration::from_millis(5),
                body_step_deg: 30.0,
                body_settle: Duration::from_millis(300),
                max_cycles: None,
            },
        }
    }

    /// Timeout for a turn of `degrees` body rotation
    pub fn turn_timeout(&self, degrees: f32) -> Duration {
        let quarters = libm::fabsf(degrees) / 90.0;
        let micros = self.turn_timeout_per_quarter.as_micros() as f32 * quarters;
        Duration::from_micros(micros as u64)
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_timeout_scales_with_angle() {
        let config = RobotConfig::default();
        assert_eq!(config.turn_timeout(90.0), Duration::from_millis(1500));
        assert_eq!(config.turn_timeout(-180.0), Duration::from_millis(3000));
        assert_eq!(config.turn_timeout(45.0), Duration::from_millis(750));
    }

    #[test]
    fn test_defaults_are_consistent() {
        let config = RobotConfig::default();
        assert!(config.slow_speed_dps < config.speed_dps);
        assert!(config.drift_dps < config.speed_dps);
        assert!(config.corner_threshold_cm < config.max_range_cm);
        assert!(config.doorway_sample_step < config.doorway_probe);
        assert!(config.junction_turn_deg == 90.0 || config.junction_turn_deg == 270.0);
    }
}
