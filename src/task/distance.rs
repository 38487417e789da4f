//! HC-SR04 ultrasonic distance sensor
//!
//! # Signal Processing
//! Every successful echo goes through a 3-sample moving median, which drops
//! single-shot spikes from the textured wall without adding much lag at the
//! wall-follower's tick rate. A failed measurement is "no reading" and does
//! not enter the filter.

use courier_robot::system::sensors::DistanceSensor;
use defmt::debug;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use hcsr04_async::{Config, DistanceUnit, Hcsr04, TemperatureUnit};
use moving_median::MovingMedian;

use crate::task::error::DriverError;
use crate::task::resources::UltrasonicResources;

/// Size of median filter window
const MEDIAN_WINDOW_SIZE: usize = 3;

/// Fixed ambient temperature for the speed of sound
const TEMPERATURE: f64 = 21.5;

pub struct Ultrasonic {
    sensor: Hcsr04<Output<'static>, Input<'static>>,
    median: MovingMedian<f64, MEDIAN_WINDOW_SIZE>,
}

impl Ultrasonic {
    pub fn new(r: UltrasonicResources) -> Self {
        let config = Config {
            distance_unit: DistanceUnit::Centimeters,
            temperature_unit: TemperatureUnit::Celsius,
        };
        let trigger = Output::new(r.trigger_pin, Level::Low);
        let echo = Input::new(r.echo_pin, Pull::None);
        Self {
            sensor: Hcsr04::new(trigger, echo, config),
            median: MovingMedian::new(),
        }
    }

    async fn measure(&mut self) -> Result<f32, DriverError> {
        let distance_cm = self
            .sensor
            .measure(TEMPERATURE)
            .await
            .map_err(|_| DriverError::NoEcho)?;
        self.median.add_value(distance_cm);
        Ok(self.median.median() as f32)
    }
}

impl DistanceSensor for Ultrasonic {
    async fn read_distance_cm(&mut self) -> Option<f32> {
        match self.measure().await {
            Ok(distance) => Some(distance),
            Err(e) => {
                debug!("distance measurement failed: {:?}", e);
                None
            }
        }
    }
}
