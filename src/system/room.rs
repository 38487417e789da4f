//! Room entry, package delivery and room exit
//!
//! Exiting ends with a short search for the boundary line: the robot drives
//! out slowly and watches for a black/white edge under the color sensor. If
//! none shows up in time it angles back toward the wall and creeps forward,
//! leaving the wall-follower to relock.

use embassy_time::Instant;

use crate::system::color::ColorLabel;
use crate::system::context::RobotContext;
use crate::system::emergency::Aborted;
use crate::system::logging::{log_info, log_warn};
use crate::system::sensors::{ColorSensor, Hardware, Notifier};
use crate::system::state::DeliveryProgress;

pub async fn enter_room<H: Hardware>(ctx: &mut RobotContext<'_, H>) -> Result<(), Aborted> {
    let config = ctx.config;
    log_info!("entering room");
    ctx.motion
        .drive_for(config.slow_speed_dps, config.enter_room_duration)
        .await?;
    ctx.emergency.hold(config.room_settle).await
}

/// Announces the drop and counts it; returns the new total
pub async fn deliver<H: Hardware>(
    ctx: &mut RobotContext<'_, H>,
    progress: &mut DeliveryProgress,
) -> Result<u8, Aborted> {
    let config = ctx.config;
    let tone = config.delivery_tone;
    ctx.motion.stop();
    ctx.notifier.play(tone.note, tone.duration, tone.volume);
    ctx.emergency.hold(tone.duration).await?;

    let delivered = progress.record_delivery();
    log_info!("package delivered, {} so far", delivered);
    ctx.emergency.hold(config.delivery_settle).await?;
    Ok(delivered)
}

pub async fn exit_room<H: Hardware>(ctx: &mut RobotContext<'_, H>) -> Result<(), Aborted> {
    let config = ctx.config;
    log_info!("exiting room");
    ctx.motion.turn(180.0).await?;
    ctx.motion
        .drive_for(config.slow_speed_dps, config.exit_room_duration)
        .await?;
    find_line(ctx).await.map(|_| ())
}

/// Looks for the boundary line; `Ok(true)` if the edge was seen
pub async fn find_line<H: Hardware>(ctx: &mut RobotContext<'_, H>) -> Result<bool, Aborted> {
    let config = ctx.config;
    ctx.motion.forward(config.slow_speed_dps);

    let deadline = Instant::now() + config.find_line_timeout;
    let mut previous = None;
    loop {
        ctx.emergency.check()?;
        let label = ctx.color.read_color().await;
        if is_line_edge(previous, label) {
            ctx.motion.stop();
            log_info!("line found");
            return Ok(true);
        }
        if matches!(label, ColorLabel::Black | ColorLabel::White) {
            previous = Some(label);
        }
        if Instant::now() >= deadline {
            break;
        }
        ctx.emergency.hold(config.find_line_step).await?;
    }

    log_warn!("line not found, searching");
    ctx.motion.stop();
    ctx.motion.turn(config.find_line_turn_deg).await?;
    ctx.motion
        .drive_for(config.slow_speed_dps, config.find_line_creep)
        .await?;
    Ok(false)
}

fn is_line_edge(previous: Option<ColorLabel>, current: ColorLabel) -> bool {
    matches!(
        (previous, current),
        (Some(ColorLabel::White), ColorLabel::Black) | (Some(ColorLabel::Black), ColorLabel::White)
    )
}
