//! Robot Context
//!
//! Borrowed view of everything a behavior routine may touch. The State
//! Machine owns the only instance; sub-routines take `&mut RobotContext`.

use crate::system::config::RobotConfig;
use crate::system::emergency::EmergencyFlag;
use crate::system::motion::Motion;
use crate::system::sensors::{Hardware, Motor, MotorBank};

pub struct RobotContext<'a, H: Hardware> {
    pub motors: &'a MotorBank<H::Wheel, H::Turret>,
    pub motion: Motion<'a, H::Wheel>,
    pub distance: &'a mut H::Distance,
    pub color: &'a mut H::Color,
    pub notifier: &'a mut H::Notifier,
    pub emergency: &'a EmergencyFlag,
    pub config: &'a RobotConfig,
}

impl<'a, H: Hardware> RobotContext<'a, H> {
    pub fn new(
        motors: &'a MotorBank<H::Wheel, H::Turret>,
        distance: &'a mut H::Distance,
        color: &'a mut H::Color,
        notifier: &'a mut H::Notifier,
        emergency: &'a EmergencyFlag,
        config: &'a RobotConfig,
    ) -> Self {
        Self {
            motors,
            motion: Motion::new(motors, emergency, config),
            distance,
            color,
            notifier,
            emergency,
            config,
        }
    }

    pub fn turret(&self) -> &'a H::Turret {
        &self.motors.turret
    }

    /// Zero every motor output
    pub fn halt(&self) {
        self.motors.halt();
    }

    /// Stop the turret, leaving the wheels alone
    pub fn stop_turret(&self) {
        self.motors.turret.set_angular_velocity(0.0);
    }
}
