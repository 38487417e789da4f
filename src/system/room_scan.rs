//! Room Scanner
//!
//! Searches a room for the green recipient sticker. Each cycle advances a
//! small step, then sweeps the color sensor across the room, testing for
//! green continuously and returning the moment it is seen.
//!
//! # Modes
//! - Turret: the sensor turret is centered once, then each cycle sweeps it
//!   right to `+half_angle`, across to `-half_angle` and back to center.
//!   A leg ends when the turret settles on its target or the leg times out.
//! - Body rotation: the whole robot turns through a full circle in fixed
//!   steps, sampling color after each step.
//!
//! Not-found means the scan was interrupted by an emergency stop or ran
//! into the optional cycle limit.

use embassy_time::{Instant, Timer};

use crate::system::color::ColorLabel;
use crate::system::config::{ScanConfig, ScanMode};
use crate::system::context::RobotContext;
use crate::system::emergency::Aborted;
use crate::system::logging::{log_debug, log_info, log_warn};
use crate::system::sensors::{ColorSensor, Hardware, Motor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanResult {
    Found,
    NotFound,
}

/// Sweeps the room until green is found, the flag is set or the cycle
/// limit is hit
pub async fn scan_room<H: Hardware>(ctx: &mut RobotContext<'_, H>) -> ScanResult {
    let scan = ctx.config.scan;
    log_info!("scanning room, {:?} mode", scan.mode);
    if scan.mode == ScanMode::Turret {
        ctx.turret().reset_position_reference();
    }

    let mut cycle: u32 = 0;
    let result = loop {
        if scan.max_cycles.is_some_and(|max| cycle >= max) {
            log_warn!("no recipient after {} cycles", cycle);
            break ScanResult::NotFound;
        }
        let found = match scan.mode {
            ScanMode::Turret => turret_cycle(ctx, &scan).await,
            ScanMode::BodyRotation => body_cycle(ctx, &scan).await,
        };
        match found {
            Ok(true) => break ScanResult::Found,
            Ok(false) => cycle += 1,
            Err(Aborted) => break ScanResult::NotFound,
        }
    };

    ctx.stop_turret();
    ctx.motion.stop();
    log_info!("scan finished: {:?}", result);
    result
}

async fn advance<H: Hardware>(ctx: &mut RobotContext<'_, H>, scan: &ScanConfig) -> Result<(), Aborted> {
    ctx.motion.drive_for(scan.step_dps, scan.step_duration).await
}

async fn turret_cycle<H: Hardware>(
    ctx: &mut RobotContext<'_, H>,
    scan: &ScanConfig,
) -> Result<bool, Aborted> {
    advance(ctx, scan).await?;

    let half = scan.sweep_half_angle;
    let mut target = 0.0;
    for delta in [half, -2.0 * half, half] {
        target += delta;
        ctx.turret().set_position_relative(delta);
        if sweep_leg(ctx, scan, target).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// One turret leg; `Ok(true)` if green was seen on the way
async fn sweep_leg<H: Hardware>(
    ctx: &mut RobotContext<'_, H>,
    scan: &ScanConfig,
    target: f32,
) -> Result<bool, Aborted> {
    let deadline = Instant::now() + scan.leg_timeout;
    loop {
        if let Err(aborted) = ctx.emergency.check() {
            ctx.stop_turret();
            return Err(aborted);
        }
        if ctx.color.read_color().await == ColorLabel::Green {
            ctx.stop_turret();
            log_info!("recipient found at turret {} deg", target);
            return Ok(true);
        }
        let settled = ctx
            .turret()
            .position_degrees()
            .is_some_and(|p| libm::fabsf(p - target) <= scan.settle_tolerance_deg);
        if settled {
            return Ok(false);
        }
        if Instant::now() >= deadline {
            log_debug!("turret leg to {} timed out", target);
            return Ok(false);
        }
        Timer::after(scan.poll_step).await;
    }
}

async fn body_cycle<H: Hardware>(
    ctx: &mut RobotContext<'_, H>,
    scan: &ScanConfig,
) -> Result<bool, Aborted> {
    advance(ctx, scan).await?;

    let steps = libm::ceilf(360.0 / scan.body_step_deg) as u32;
    for _ in 0..steps {
        ctx.motion.turn(scan.body_step_deg).await?;
        ctx.emergency.hold(scan.body_settle).await?;
        if ctx.color.read_color().await == ColorLabel::Green {
            log_info!("recipient found");
            return Ok(true);
        }
    }
    Ok(false)
}
