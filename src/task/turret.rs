//! Sensor turret
//!
//! The color sensor sits on a hobby servo driven from PIO, the Pico 2 being
//! out of hardware PWM slices. The servo has no feedback, so the task slews
//! the commanded angle toward the setpoint at a fixed rate and reports that
//! commanded motion as the turret position.

use courier_robot::system::emergency::EmergencyFlag;
use defmt::info;
use embassy_rp::pio::{Instance, Pio};
use embassy_rp::pio_programs::pwm::{PioPwm, PioPwmProgram};
use embassy_time::{Duration, Ticker};

use crate::task::motor_channel::{MotorChannel, Setpoint};
use crate::task::resources::{Irqs, TurretResources};

/// Servo frame; the PIO PWM program takes `core::time` durations
const SERVO_PERIOD: core::time::Duration = core::time::Duration::from_micros(20_000);
const UPDATE_PERIOD: Duration = Duration::from_millis(20);

/// Mechanical range of the servo; 0° reference is the middle
const SERVO_RANGE_DEG: f32 = 180.0;
const MIN_PULSE_US: f32 = 500.0;
const MAX_PULSE_US: f32 = 2400.0;

/// Slew rate used for position moves
const SLEW_DPS: f32 = 120.0;

pub struct Servo<'d, T: Instance, const SM: usize> {
    pwm: PioPwm<'d, T, SM>,
    /// Absolute servo angle, 0..=SERVO_RANGE_DEG
    angle: f32,
}

impl<'d, T: Instance, const SM: usize> Servo<'d, T, SM> {
    pub fn new(mut pwm: PioPwm<'d, T, SM>) -> Self {
        pwm.set_period(SERVO_PERIOD);
        pwm.start();
        let mut servo = Self { pwm, angle: 0.0 };
        servo.rotate(SERVO_RANGE_DEG / 2.0);
        servo
    }

    /// Moves to an absolute angle, clamped to the mechanical range;
    /// returns the angle actually commanded
    pub fn rotate(&mut self, degree: f32) -> f32 {
        self.angle = degree.clamp(0.0, SERVO_RANGE_DEG);
        let pulse_us = MIN_PULSE_US + self.angle / SERVO_RANGE_DEG * (MAX_PULSE_US - MIN_PULSE_US);
        self.pwm
            .write(core::time::Duration::from_micros(pulse_us as u64));
        self.angle
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }
}

/// Angle change for one update period
fn slew_step(setpoint: Setpoint, position: f32, dt_s: f32) -> f32 {
    let max_step = SLEW_DPS * dt_s;
    match setpoint {
        Setpoint::Velocity(dps) => dps * dt_s,
        Setpoint::Position(target) => (target - position).clamp(-max_step, max_step),
    }
}

#[embassy_executor::task]
pub async fn turret(
    r: TurretResources,
    channel: &'static MotorChannel,
    emergency: &'static EmergencyFlag,
) {
    let Pio {
        mut common, sm0, ..
    } = Pio::new(r.pio, Irqs);
    let program = PioPwmProgram::new(&mut common);
    let pwm = PioPwm::new(&mut common, sm0, r.pin, &program);
    let mut servo = Servo::new(pwm);
    channel.advance(0.0);
    info!("turret centered at {} deg", servo.angle());

    let dt_s = UPDATE_PERIOD.as_micros() as f32 / 1_000_000.0;
    let mut ticker = Ticker::every(UPDATE_PERIOD);
    loop {
        ticker.next().await;
        if emergency.is_set() {
            continue;
        }

        let (setpoint, position) = channel.snapshot();
        let step = slew_step(setpoint, position, dt_s);
        if step == 0.0 {
            continue;
        }
        let before = servo.angle();
        let after = servo.rotate(before + step);
        channel.advance(after - before);
    }
}
