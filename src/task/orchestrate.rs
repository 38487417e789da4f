//! Orchestration task
//!
//! Owns the sensors and the notifier, assembles the controller context and
//! runs the State Machine to completion. Afterwards the task idles; the
//! motors are already stopped and only a restart begins a new run.

use courier_robot::system::config::RobotConfig;
use courier_robot::system::context::RobotContext;
use courier_robot::system::emergency::EmergencyFlag;
use courier_robot::system::sensors::{Hardware, MotorBank};
use courier_robot::system::state_machine::{RunOutcome, StateMachine};
use defmt::info;
use embassy_time::{Duration, Timer};

use crate::task::buzzer::Buzzer;
use crate::task::color::Tcs34725;
use crate::task::distance::Ultrasonic;
use crate::task::motor_channel::MotorChannel;
use crate::task::resources::UltrasonicResources;
use crate::I2cBusShared;

/// The RP2350 courier board
pub struct Board;

impl Hardware for Board {
    type Wheel = MotorChannel;
    type Turret = MotorChannel;
    type Distance = Ultrasonic;
    type Color = Tcs34725;
    type Notifier = Buzzer;
}

#[embassy_executor::task]
pub async fn orchestrate(
    ultrasonic: UltrasonicResources,
    i2c_bus: &'static I2cBusShared,
    motors: &'static MotorBank<MotorChannel, MotorChannel>,
    emergency: &'static EmergencyFlag,
    config: &'static RobotConfig,
) {
    let mut distance = Ultrasonic::new(ultrasonic);
    let mut color = Tcs34725::new(i2c_bus);
    let mut notifier = Buzzer;

    let ctx = RobotContext::<Board>::new(
        motors,
        &mut distance,
        &mut color,
        &mut notifier,
        emergency,
        config,
    );
    let mut state_machine = StateMachine::new(ctx);

    let outcome = state_machine.run().await;
    match outcome {
        RunOutcome::MissionComplete => info!(
            "run finished, {} packages delivered",
            state_machine.progress().packages_delivered()
        ),
        RunOutcome::EmergencyStop => info!("run aborted in {:?}", state_machine.state()),
    }

    loop {
        Timer::after(Duration::from_secs(60)).await;
    }
}
