//! Safety Monitor
//!
//! Polls the emergency touch switch independently of the State Machine. On
//! the first press it latches the emergency flag and zeroes every motor
//! output. Runs on its own executor so a long behavior routine on the other
//! core can never delay it.

use embassy_time::{Duration, Timer};

use crate::system::emergency::EmergencyFlag;
use crate::system::logging::log_warn;
use crate::system::sensors::{Motor, MotorBank, TouchSensor};

pub struct SafetyMonitor<'a, T, W, U> {
    touch: T,
    emergency: &'a EmergencyFlag,
    motors: &'a MotorBank<W, U>,
    period: Duration,
}

impl<'a, T, W, U> SafetyMonitor<'a, T, W, U>
where
    T: TouchSensor,
    W: Motor,
    U: Motor,
{
    pub fn new(
        touch: T,
        emergency: &'a EmergencyFlag,
        motors: &'a MotorBank<W, U>,
        period: Duration,
    ) -> Self {
        Self {
            touch,
            emergency,
            motors,
            period,
        }
    }

    /// One poll of the switch; `true` once the flag is set
    pub fn poll(&mut self) -> bool {
        if self.emergency.is_set() {
            return true;
        }
        if !self.touch.is_pressed() {
            return false;
        }
        if self.emergency.trip() {
            log_warn!("emergency stop pressed");
        }
        self.motors.halt();
        true
    }

    /// Polls until the flag is set, by this monitor or anyone else
    pub async fn run(&mut self) {
        while !self.poll() {
            Timer::after(self.period).await;
        }
    }
}
