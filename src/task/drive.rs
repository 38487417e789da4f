//! Drive Task
//!
//! Closes the loop between the wheel command cells and the TB6612FNG driver.
//!
//! # Control period
//! Every 20 ms the task:
//! 1. reads and resets the encoder pulse counters (PWM slices in input mode)
//! 2. reports the travelled wheel degrees to each cell
//! 3. turns each cell's setpoint into a signed duty cycle and applies it
//!
//! The encoders are single-channel, so the direction of travel is taken from
//! the sign of the duty cycle last applied to that wheel.
//!
//! # Setpoints
//! - Velocity: feed-forward duty plus a proportional correction on the
//!   measured wheel speed
//! - Position: proportional move toward the target, limited to the turn
//!   speed, braking inside the deadband
//!
//! Once the emergency flag is set the driver brakes and enters standby for
//! good.

use courier_robot::system::emergency::EmergencyFlag;
use defmt::{info, warn};
use embassy_rp::gpio::{self, Pull};
use embassy_rp::pwm::{self, InputMode, Pwm};
use embassy_time::{Duration, Instant, Ticker, Timer};
use tb6612fng::{DriveCommand, Motor, Tb6612fng};

use crate::task::error::DriverError;
use crate::task::motor_channel::{MotorChannel, Setpoint};
use crate::task::resources::{MotorDriverResources, MotorEncoderResources};

const CONTROL_PERIOD: Duration = Duration::from_millis(20);

/// PWM frequency for the motor driver; cheap DC motors run better slow
const MOTOR_PWM_HZ: u32 = 10_000;

/// Encoder pulses per output shaft revolution
const PULSES_PER_REV: f32 = 20.0 * 9.6;
const DEGREES_PER_PULSE: f32 = 360.0 / PULSES_PER_REV;

/// Wheel speed at full duty, degrees per second
const MAX_WHEEL_DPS: f32 = 900.0;
/// Duty correction per degree/second of speed error
const SPEED_GAIN: f32 = 0.02;
/// Speed command per degree of position error
const POSITION_GAIN: f32 = 4.0;
/// Speed limit while holding or reaching a position
const POSITION_MAX_DPS: f32 = 240.0;
/// Position error treated as on target
const POSITION_DEADBAND: f32 = 2.0;

/// Signed duty cycle for a setpoint given the measured state
fn duty_for(setpoint: Setpoint, position: f32, measured_dps: f32) -> i8 {
    let duty = match setpoint {
        Setpoint::Velocity(dps) if dps == 0.0 => 0.0,
        Setpoint::Velocity(dps) => dps / MAX_WHEEL_DPS * 100.0 + (dps - measured_dps) * SPEED_GAIN,
        Setpoint::Position(target) => {
            let error = target - position;
            if libm::fabsf(error) <= POSITION_DEADBAND {
                0.0
            } else {
                let dps = (error * POSITION_GAIN).clamp(-POSITION_MAX_DPS, POSITION_MAX_DPS);
                dps / MAX_WHEEL_DPS * 100.0
            }
        }
    };
    duty.clamp(-100.0, 100.0) as i8
}

fn drive_command(duty: i8) -> DriveCommand {
    match duty {
        0 => DriveCommand::Brake,
        d if d > 0 => DriveCommand::Forward(d as u8),
        d => DriveCommand::Backward(d.unsigned_abs()),
    }
}

/// Per-wheel bookkeeping inside the drive task
struct Wheel {
    channel: &'static MotorChannel,
    last_duty: i8,
}

impl Wheel {
    fn new(channel: &'static MotorChannel) -> Self {
        Self {
            channel,
            last_duty: 0,
        }
    }

    /// Books the pulses counted since the last period and returns the
    /// duty cycle for the next one
    fn update(&mut self, pulses: u16, elapsed: Duration) -> i8 {
        let magnitude = pulses as f32 * DEGREES_PER_PULSE;
        let delta = if self.last_duty < 0 { -magnitude } else { magnitude };
        self.channel.advance(delta);

        let seconds = elapsed.as_micros() as f32 / 1_000_000.0;
        let measured_dps = if seconds > 0.0 { delta / seconds } else { 0.0 };
        let (setpoint, position) = self.channel.snapshot();

        self.last_duty = duty_for(setpoint, position, measured_dps);
        self.last_duty
    }
}

#[embassy_executor::task]
pub async fn drive(
    r: MotorDriverResources,
    e: MotorEncoderResources,
    left: &'static MotorChannel,
    right: &'static MotorChannel,
    emergency: &'static EmergencyFlag,
) {
    let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();
    let divider = ((clock_freq_hz / MOTOR_PWM_HZ) / 65535 + 1) as u8;
    let period = (clock_freq_hz / (MOTOR_PWM_HZ * divider as u32)) as u16 - 1;

    let mut pwm_config = pwm::Config::default();
    pwm_config.divider = divider.into();
    pwm_config.top = period;

    let stby = gpio::Output::new(r.standby_pin, gpio::Level::Low);
    let left_fwd = gpio::Output::new(r.left_forward_pin, gpio::Level::Low);
    let left_bckw = gpio::Output::new(r.left_backward_pin, gpio::Level::Low);
    let left_pwm = pwm::Pwm::new_output_a(r.left_slice, r.left_pwm_pin, pwm_config.clone());
    let right_fwd = gpio::Output::new(r.right_forward_pin, gpio::Level::Low);
    let right_bckw = gpio::Output::new(r.right_backward_pin, gpio::Level::Low);
    let right_pwm = pwm::Pwm::new_output_b(r.right_slice, r.right_pwm_pin, pwm_config);

    let control = Motor::new(left_fwd, left_bckw, left_pwm)
        .and_then(|left_motor| {
            Motor::new(right_fwd, right_bckw, right_pwm).map(|right_motor| (left_motor, right_motor))
        })
        .map_err(|_| DriverError::Motor)
        .and_then(|(left_motor, right_motor)| {
            Tb6612fng::new(left_motor, right_motor, stby).map_err(|_| DriverError::Motor)
        });
    let mut control = match control {
        Ok(control) => control,
        Err(e) => {
            warn!("motor driver init failed: {:?}", e);
            return;
        }
    };
    if control.disable_standby().is_err() {
        warn!("motor driver did not leave standby");
    }

    let encoder_config = pwm::Config::default();
    let left_encoder = Pwm::new_input(
        e.left_encoder_slice,
        e.left_encoder_pin,
        Pull::None,
        InputMode::RisingEdge,
        encoder_config.clone(),
    );
    let right_encoder = Pwm::new_input(
        e.right_encoder_slice,
        e.right_encoder_pin,
        Pull::None,
        InputMode::RisingEdge,
        encoder_config,
    );

    let mut left_wheel = Wheel::new(left);
    let mut right_wheel = Wheel::new(right);
    let mut ticker = Ticker::every(CONTROL_PERIOD);
    let mut last_update = Instant::now();
    info!("drive ready");

    loop {
        ticker.next().await;

        if emergency.is_set() {
            let braked = control
                .motor_a
                .drive(DriveCommand::Brake)
                .and(control.motor_b.drive(DriveCommand::Brake));
            if braked.is_err() {
                warn!("emergency brake failed: {:?}", DriverError::Motor);
            }
            Timer::after(Duration::from_millis(100)).await;
            if control.enable_standby().is_err() {
                warn!("motor driver did not enter standby");
            }
            warn!("drive halted by emergency stop");
            return;
        }

        let now = Instant::now();
        let elapsed = now - last_update;
        last_update = now;

        let left_pulses = left_encoder.counter();
        left_encoder.set_counter(0);
        let right_pulses = right_encoder.counter();
        right_encoder.set_counter(0);

        let left_duty = left_wheel.update(left_pulses, elapsed);
        let right_duty = right_wheel.update(right_pulses, elapsed);

        let applied = control
            .motor_a
            .drive(drive_command(left_duty))
            .and(control.motor_b.drive(drive_command(right_duty)));
        if applied.is_err() {
            warn!("drive command failed: {:?}", DriverError::Motor);
        }
    }
}
