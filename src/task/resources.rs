//! Hardware Resource Management
//!
//! Pin and peripheral ownership for every firmware task. Each group is moved
//! into exactly one task by `split_resources!`.
//!
//! # Resource Groups
//! - Motor Control: TB6612FNG driver pins and PWM channels
//! - Motor Encoders: PWM input slices counting encoder pulses
//! - Ultrasonic: HC-SR04 trigger/echo
//! - Color Sensor: TCS34725 on I2C0
//! - Turret: servo driven from PIO0
//! - Touch: emergency-stop switch
//! - Buzzer: PWM tone output

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::InterruptHandler as I2cInterruptHandler;
use embassy_rp::peripherals::{self, I2C0, PIO0};
use embassy_rp::pio::InterruptHandler as PioInterruptHandler;
use embassy_rp::Peri;

assign_resources! {
    /// TB6612FNG dual motor driver pins and PWM channels
    motor_driver: MotorDriverResources {
        standby_pin: PIN_22,
        left_slice: PWM_SLICE6,
        left_pwm_pin: PIN_28,
        left_forward_pin: PIN_21,
        left_backward_pin: PIN_20,
        right_slice: PWM_SLICE5,
        right_pwm_pin: PIN_27,
        right_forward_pin: PIN_19,
        right_backward_pin: PIN_18,
    },
    /// Motor encoder PWM input channels
    motor_encoders: MotorEncoderResources {
        left_encoder_slice: PWM_SLICE3,
        left_encoder_pin: PIN_7,
        right_encoder_slice: PWM_SLICE4,
        right_encoder_pin: PIN_9,
    },
    /// HC-SR04 ultrasonic distance sensor pins
    ultrasonic: UltrasonicResources {
        trigger_pin: PIN_15,
        echo_pin: PIN_14,
    },
    /// TCS34725 color sensor bus
    color_sensor: ColorSensorResources {
        i2c: I2C0,
        scl: PIN_13,
        sda: PIN_12,
    },
    /// Servo carrying the color sensor turret
    turret: TurretResources {
        pio: PIO0,
        pin: PIN_5,
    },
    /// Emergency-stop touch switch
    touch: TouchResources {
        pin: PIN_16,
    },
    /// Piezo buzzer
    buzzer: BuzzerResources {
        slice: PWM_SLICE1,
        pin: PIN_2,
    },
}

bind_interrupts!(pub struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
});
