//! Emergency-stop task
//!
//! Runs the Safety Monitor on core 1 against the touch switch. The switch
//! pulls the input high while pressed.

use courier_robot::system::config::RobotConfig;
use courier_robot::system::emergency::EmergencyFlag;
use courier_robot::system::safety::SafetyMonitor;
use courier_robot::system::sensors::{MotorBank, TouchSensor};
use defmt::warn;
use embassy_rp::gpio::{Input, Pull};

use crate::task::motor_channel::MotorChannel;
use crate::task::resources::TouchResources;

pub struct TouchSwitch {
    input: Input<'static>,
}

impl TouchSwitch {
    pub fn new(r: TouchResources) -> Self {
        Self {
            input: Input::new(r.pin, Pull::Down),
        }
    }
}

impl TouchSensor for TouchSwitch {
    fn is_pressed(&mut self) -> bool {
        self.input.is_high()
    }
}

#[embassy_executor::task]
pub async fn safety_monitor(
    r: TouchResources,
    emergency: &'static EmergencyFlag,
    motors: &'static MotorBank<MotorChannel, MotorChannel>,
    config: &'static RobotConfig,
) {
    let mut monitor = SafetyMonitor::new(
        TouchSwitch::new(r),
        emergency,
        motors,
        config.safety_poll_period,
    );
    monitor.run().await;
    warn!("emergency stop latched, restart to reset");
}
