//! Junction and Doorway Handling
//!
//! Short, time-bounded routines that interpret a color event seen while
//! wall-following.
//!
//! # Events
//! - Orange: doorway strip. Probed for a red restriction sticker before the
//!   robot commits to entering.
//! - Black: junction on the boundary line. The robot turns toward the branch
//!   and measures; a near wall is an outer corner, open space is the
//!   mail-room branch.
//! - Blue/purple: the mail-room tile itself.
//!
//! Doorway and mail-room events are gated on the delivery quota. Every
//! routine returns `Err(Aborted)` as soon as the emergency flag is seen.

use embassy_time::{Duration, Instant};

use crate::system::color::ColorLabel;
use crate::system::context::RobotContext;
use crate::system::emergency::{Aborted, ABORT_POLL};
use crate::system::logging::{log_debug, log_info};
use crate::system::sensors::{ColorSensor, DistanceSensor, Hardware};
use crate::system::state::DeliveryProgress;

/// A color reading that asks for a behavior change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorEvent {
    Doorway,
    BlackJunction,
    MailRoomTile,
}

/// Interprets a periodic color check; `None` is "no event"
pub fn color_event(label: ColorLabel, progress: &DeliveryProgress) -> Option<ColorEvent> {
    match label {
        ColorLabel::Orange if !progress.quota_met() => Some(ColorEvent::Doorway),
        ColorLabel::Black => Some(ColorEvent::BlackJunction),
        label if label.is_mail_room() && progress.quota_met() => Some(ColorEvent::MailRoomTile),
        _ => None,
    }
}

/// Suppresses re-handling an event for a fixed period after handling it
#[derive(Debug, Clone)]
pub struct Cooldown {
    period: Duration,
    until: Option<Instant>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            until: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.until = Some(now + self.period);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }
}

/// What the robot measured after turning toward a junction branch
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Branch {
    Unreadable,
    /// Wall close by: an outer corner of the boundary
    OuterCorner(f32),
    /// Nothing near: the mail-room branch
    OpenSpace,
}

pub fn classify_branch(reading: Option<f32>, corner_threshold_cm: f32) -> Branch {
    match reading {
        Some(d) if !d.is_finite() || d < 0.0 => Branch::Unreadable,
        Some(d) if d < corner_threshold_cm => Branch::OuterCorner(d),
        Some(_) => Branch::OpenSpace,
        None => Branch::Unreadable,
    }
}

/// Result of a doorway probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Doorway {
    Clear,
    Restricted,
}

/// How a black junction was resolved
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JunctionOutcome {
    /// No distance reading after the turn; the wall target must be relocked
    Unreadable,
    /// Turned the corner; follow the wall at this new standoff
    OuterCorner(f32),
    /// Turned back from the mail-room branch and left the black marker
    ReturnedToWall,
    /// Facing the mail-room branch with every package delivered
    MailRoomAhead,
}

/// Probes half a doorway at reduced speed looking for the red sticker
pub async fn check_doorway<H: Hardware>(ctx: &mut RobotContext<'_, H>) -> Result<Doorway, Aborted> {
    let config = ctx.config;
    log_info!("checking doorway");

    ctx.motion.forward(config.slow_speed_dps);
    let deadline = Instant::now() + config.doorway_probe;
    let doorway = loop {
        ctx.emergency.check()?;
        if ctx.color.read_color().await == ColorLabel::Red {
            break Doorway::Restricted;
        }
        if Instant::now() >= deadline {
            break Doorway::Clear;
        }
        ctx.emergency.hold(config.doorway_sample_step).await?;
    };
    ctx.motion.stop();

    log_info!("doorway {:?}", doorway);
    Ok(doorway)
}

/// Drives past a restricted doorway so its strip is not seen again
pub async fn pass_restricted<H: Hardware>(ctx: &mut RobotContext<'_, H>) -> Result<(), Aborted> {
    ctx.motion.stop();
    ctx.motion
        .drive_for(ctx.config.speed_dps, ctx.config.doorway_clear)
        .await
}

/// Backs off a restricted doorway and routes around it
pub async fn avoid_restricted<H: Hardware>(ctx: &mut RobotContext<'_, H>) -> Result<(), Aborted> {
    let config = ctx.config;
    log_info!("avoiding restricted room");
    ctx.motion.stop();
    ctx.motion
        .drive_for(-config.slow_speed_dps, config.avoid_backup)
        .await?;
    ctx.motion.turn(-config.avoid_turn_deg).await?;
    ctx.motion
        .drive_for(config.speed_dps, config.avoid_bypass)
        .await?;
    ctx.motion.turn(config.avoid_turn_deg).await
}

/// Turns toward the branch at a black junction and decides where to go
pub async fn handle_black_junction<H: Hardware>(
    ctx: &mut RobotContext<'_, H>,
    progress: &DeliveryProgress,
) -> Result<JunctionOutcome, Aborted> {
    let config = ctx.config;
    ctx.motion.stop();
    ctx.motion.turn(config.junction_turn_deg).await?;

    let reading = ctx.distance.read_distance_cm().await;
    let branch = classify_branch(reading, config.corner_threshold_cm);
    log_info!("black junction: {:?}", branch);

    match branch {
        Branch::Unreadable => Ok(JunctionOutcome::Unreadable),
        Branch::OuterCorner(distance) => Ok(JunctionOutcome::OuterCorner(distance)),
        Branch::OpenSpace if progress.quota_met() => Ok(JunctionOutcome::MailRoomAhead),
        Branch::OpenSpace => {
            ctx.motion.turn(-config.junction_turn_deg).await?;
            drive_off_black(ctx).await?;
            Ok(JunctionOutcome::ReturnedToWall)
        }
    }
}

/// Drives forward until the color sensor leaves the black marker, bounded
/// by `clear_black_timeout`
pub async fn drive_off_black<H: Hardware>(ctx: &mut RobotContext<'_, H>) -> Result<(), Aborted> {
    let config = ctx.config;
    ctx.motion.forward(config.speed_dps);
    let deadline = Instant::now() + config.clear_black_timeout;
    loop {
        ctx.emergency.check()?;
        if ctx.color.read_color().await != ColorLabel::Black {
            break;
        }
        if Instant::now() >= deadline {
            log_debug!("still on black after timeout");
            break;
        }
        ctx.emergency.hold(ABORT_POLL).await?;
    }
    ctx.motion.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::config::RobotConfig;
    use crate::system::emergency::EmergencyFlag;
    use crate::system::mock::{
        MockHardware, MockMotor, MockNotifier, ScriptedColor, ScriptedDistance,
    };
    use crate::system::sensors::{Motor, MotorBank};
    use embassy_futures::block_on;

    fn quick_config() -> RobotConfig {
        let mut config = RobotConfig::new();
        config.turn_prepare = Duration::from_millis(1);
        config.turn_settle = Duration::from_millis(1);
        config.doorway_probe = Duration::from_millis(40);
        config.doorway_sample_step = Duration::from_millis(5);
        config.doorway_clear = Duration::from_millis(5);
        config.clear_black_timeout = Duration::from_millis(30);
        config.avoid_backup = Duration::from_millis(5);
        config.avoid_bypass = Duration::from_millis(5);
        config
    }

    fn bank() -> MotorBank<MockMotor, MockMotor> {
        MotorBank::new(MockMotor::new(), MockMotor::new(), MockMotor::new())
    }

    fn delivered(count: u8) -> DeliveryProgress {
        let mut progress = DeliveryProgress::new();
        for _ in 0..count {
            progress.record_delivery();
        }
        progress
    }

    #[test]
    fn test_orange_is_doorway_only_before_quota() {
        assert_eq!(
            color_event(ColorLabel::Orange, &delivered(0)),
            Some(ColorEvent::Doorway)
        );
        assert_eq!(color_event(ColorLabel::Orange, &delivered(2)), None);
    }

    #[test]
    fn test_mail_room_tile_only_after_quota() {
        assert_eq!(color_event(ColorLabel::Blue, &delivered(1)), None);
        assert_eq!(
            color_event(ColorLabel::Blue, &delivered(2)),
            Some(ColorEvent::MailRoomTile)
        );
        assert_eq!(
            color_event(ColorLabel::Purple, &delivered(2)),
            Some(ColorEvent::MailRoomTile)
        );
    }

    #[test]
    fn test_black_is_always_a_junction_and_others_are_quiet() {
        assert_eq!(
            color_event(ColorLabel::Black, &delivered(0)),
            Some(ColorEvent::BlackJunction)
        );
        for label in [
            ColorLabel::Red,
            ColorLabel::Green,
            ColorLabel::White,
            ColorLabel::Yellow,
            ColorLabel::Unknown,
        ] {
            assert_eq!(color_event(label, &delivered(0)), None);
            assert_eq!(color_event(label, &delivered(2)), None);
        }
    }

    #[test]
    fn test_cooldown_window() {
        let mut cooldown = Cooldown::new(Duration::from_secs(10));
        let t0 = Instant::from_secs(100);
        assert!(!cooldown.is_active(t0));
        cooldown.start(t0);
        assert!(cooldown.is_active(t0 + Duration::from_secs(9)));
        assert!(!cooldown.is_active(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_branch_classification() {
        assert_eq!(classify_branch(None, 30.0), Branch::Unreadable);
        assert_eq!(classify_branch(Some(f32::NAN), 30.0), Branch::Unreadable);
        assert_eq!(classify_branch(Some(12.0), 30.0), Branch::OuterCorner(12.0));
        assert_eq!(classify_branch(Some(30.0), 30.0), Branch::OpenSpace);
        assert_eq!(classify_branch(Some(85.0), 30.0), Branch::OpenSpace);
    }

    #[test]
    fn test_doorway_with_red_is_restricted() {
        let config = quick_config();
        let flag = EmergencyFlag::new();
        let motors = bank();
        let mut distance = ScriptedDistance::constant(30.0);
        let mut color = ScriptedColor::new([ColorLabel::Orange, ColorLabel::White, ColorLabel::Red]);
        let mut notifier = MockNotifier::new();
        let mut ctx = RobotContext::<MockHardware>::new(
            &motors, &mut distance, &mut color, &mut notifier, &flag, &config,
        );

        assert_eq!(block_on(check_doorway(&mut ctx)), Ok(Doorway::Restricted));
        assert_eq!(motors.left.velocity(), 0.0);
        assert!(motors.left.history().contains(&config.slow_speed_dps));
    }

    #[test]
    fn test_doorway_without_red_is_clear_after_probe() {
        let config = quick_config();
        let flag = EmergencyFlag::new();
        let motors = bank();
        let mut distance = ScriptedDistance::constant(30.0);
        let mut color = ScriptedColor::constant(ColorLabel::Orange);
        let mut notifier = MockNotifier::new();
        let mut ctx = RobotContext::<MockHardware>::new(
            &motors, &mut distance, &mut color, &mut notifier, &flag, &config,
        );

        let start = Instant::now();
        assert_eq!(block_on(check_doorway(&mut ctx)), Ok(Doorway::Clear));
        assert!(start.elapsed() >= config.doorway_probe);
        drop(ctx);
        assert!(color.reads() > 1);
    }

    #[test]
    fn test_doorway_aborts_on_emergency() {
        let config = quick_config();
        let flag = EmergencyFlag::new();
        flag.trip();
        let motors = bank();
        let mut distance = ScriptedDistance::constant(30.0);
        let mut color = ScriptedColor::constant(ColorLabel::Orange);
        let mut notifier = MockNotifier::new();
        let mut ctx = RobotContext::<MockHardware>::new(
            &motors, &mut distance, &mut color, &mut notifier, &flag, &config,
        );

        assert_eq!(block_on(check_doorway(&mut ctx)), Err(Aborted));
        assert!(motors.left.history().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_junction_near_wall_is_outer_corner() {
        let config = quick_config();
        let flag = EmergencyFlag::new();
        let motors = bank();
        let mut distance = ScriptedDistance::constant(14.0);
        let mut color = ScriptedColor::constant(ColorLabel::Black);
        let mut notifier = MockNotifier::new();
        let mut ctx = RobotContext::<MockHardware>::new(
            &motors, &mut distance, &mut color, &mut notifier, &flag, &config,
        );

        let outcome = block_on(handle_black_junction(&mut ctx, &delivered(0)));
        assert_eq!(outcome, Ok(JunctionOutcome::OuterCorner(14.0)));
        assert_eq!(motors.left.moves(), vec![config.junction_turn_deg * config.turn_ratio]);
    }

    #[test]
    fn test_junction_open_space_before_quota_turns_back() {
        let config = quick_config();
        let flag = EmergencyFlag::new();
        let motors = bank();
        let mut distance = ScriptedDistance::constant(80.0);
        let mut color = ScriptedColor::new([ColorLabel::Black, ColorLabel::White]);
        let mut notifier = MockNotifier::new();
        let mut ctx = RobotContext::<MockHardware>::new(
            &motors, &mut distance, &mut color, &mut notifier, &flag, &config,
        );

        let outcome = block_on(handle_black_junction(&mut ctx, &delivered(1)));
        assert_eq!(outcome, Ok(JunctionOutcome::ReturnedToWall));
        assert_eq!(motors.left.moves().len(), 2);
        assert_eq!(motors.left.position_degrees(), Some(0.0));
        assert_eq!(motors.left.velocity(), 0.0);
    }

    #[test]
    fn test_junction_open_space_after_quota_is_mail_room() {
        let config = quick_config();
        let flag = EmergencyFlag::new();
        let motors = bank();
        let mut distance = ScriptedDistance::constant(80.0);
        let mut color = ScriptedColor::constant(ColorLabel::Black);
        let mut notifier = MockNotifier::new();
        let mut ctx = RobotContext::<MockHardware>::new(
            &motors, &mut distance, &mut color, &mut notifier, &flag, &config,
        );

        let outcome = block_on(handle_black_junction(&mut ctx, &delivered(2)));
        assert_eq!(outcome, Ok(JunctionOutcome::MailRoomAhead));
    }

    #[test]
    fn test_junction_without_reading_is_unreadable() {
        let config = quick_config();
        let flag = EmergencyFlag::new();
        let motors = bank();
        let mut distance = ScriptedDistance::new([None]);
        let mut color = ScriptedColor::constant(ColorLabel::Black);
        let mut notifier = MockNotifier::new();
        let mut ctx = RobotContext::<MockHardware>::new(
            &motors, &mut distance, &mut color, &mut notifier, &flag, &config,
        );

        let outcome = block_on(handle_black_junction(&mut ctx, &delivered(0)));
        assert_eq!(outcome, Ok(JunctionOutcome::Unreadable));
    }

    #[test]
    fn test_drive_off_black_gives_up_after_timeout() {
        let config = quick_config();
        let flag = EmergencyFlag::new();
        let motors = bank();
        let mut distance = ScriptedDistance::constant(30.0);
        let mut color = ScriptedColor::constant(ColorLabel::Black);
        let mut notifier = MockNotifier::new();
        let mut ctx = RobotContext::<MockHardware>::new(
            &motors, &mut distance, &mut color, &mut notifier, &flag, &config,
        );

        let start = Instant::now();
        assert_eq!(block_on(drive_off_black(&mut ctx)), Ok(()));
        assert!(start.elapsed() >= config.clear_black_timeout);
        assert_eq!(motors.left.velocity(), 0.0);
    }

    #[test]
    fn test_avoid_restricted_detour_sequence() {
        let config = quick_config();
        let flag = EmergencyFlag::new();
        let motors = bank();
        let mut distance = ScriptedDistance::constant(30.0);
        let mut color = ScriptedColor::constant(ColorLabel::White);
        let mut notifier = MockNotifier::new();
        let mut ctx = RobotContext::<MockHardware>::new(
            &motors, &mut distance, &mut color, &mut notifier, &flag, &config,
        );

        assert_eq!(block_on(avoid_restricted(&mut ctx)), Ok(()));
        let wheel = config.avoid_turn_deg * config.turn_ratio;
        assert_eq!(motors.left.moves(), vec![-wheel, wheel]);
        assert!(motors.left.history().contains(&-config.slow_speed_dps));
        assert!(motors.left.history().contains(&config.speed_dps));
    }
}
