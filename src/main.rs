//! Courier robot firmware entry point
//!
//! Core 0 runs the State Machine together with the hardware tasks, core 1
//! runs only the Safety Monitor, so a long behavior routine can never delay
//! the emergency stop.

#![no_std]
#![no_main]

use core::ptr::addr_of_mut;

use courier_robot::system::config::RobotConfig;
use courier_robot::system::emergency::EmergencyFlag;
use courier_robot::system::sensors::MotorBank;
use embassy_executor::Executor;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use embassy_rp::i2c::{self, I2c};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::task::{
    buzzer::buzzer,
    drive::drive,
    motor_channel::MotorChannel,
    orchestrate::orchestrate,
    resources::{
        AssignedResources, BuzzerResources, ColorSensorResources, Irqs, MotorDriverResources,
        MotorEncoderResources, TouchResources, TurretResources, UltrasonicResources,
    },
    safety::safety_monitor,
    turret::turret,
};

/// Task implementations
mod task;

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// I2C bus shared between devices, one transaction at a time
pub type I2cBusShared = Mutex<CriticalSectionRawMutex, I2c<'static, I2C0, i2c::Async>>;

static CONFIG: RobotConfig = RobotConfig::new();
static EMERGENCY: EmergencyFlag = EmergencyFlag::new();
static MOTORS: MotorBank<MotorChannel, MotorChannel> =
    MotorBank::new(MotorChannel::new(), MotorChannel::new(), MotorChannel::new());

static I2C_BUS: StaticCell<I2cBusShared> = StaticCell::new();
static mut CORE1_STACK: Stack<4096> = Stack::new();
static EXECUTOR0: StaticCell<Executor> = StaticCell::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

#[cortex_m_rt::entry]
fn main() -> ! {
    let p = embassy_rp::init(Config::default());
    let r = split_resources!(p);

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = 400_000;
    let c = r.color_sensor;
    let i2c_bus: &'static I2cBusShared =
        I2C_BUS.init(Mutex::new(I2c::new_async(c.i2c, c.scl, c.sda, Irqs, i2c_config)));

    let touch = r.touch;
    spawn_core1(
        p.CORE1,
        // SAFETY: the stack is handed to core 1 exactly once, here
        unsafe { &mut *addr_of_mut!(CORE1_STACK) },
        move || {
            let executor1 = EXECUTOR1.init(Executor::new());
            executor1.run(|spawner| {
                spawner.spawn(safety_monitor(touch, &EMERGENCY, &MOTORS, &CONFIG).unwrap());
            });
        },
    );

    let executor0 = EXECUTOR0.init(Executor::new());
    executor0.run(|spawner| {
        spawner.spawn(
            drive(
                r.motor_driver,
                r.motor_encoders,
                &MOTORS.left,
                &MOTORS.right,
                &EMERGENCY,
            )
            .unwrap(),
        );
        spawner.spawn(turret(r.turret, &MOTORS.turret, &EMERGENCY).unwrap());
        spawner.spawn(buzzer(r.buzzer).unwrap());
        spawner.spawn(orchestrate(r.ultrasonic, i2c_bus, &MOTORS, &EMERGENCY, &CONFIG).unwrap());
    });
}
