//! TCS34725 color sensor
//!
//! Small register-level driver on the shared I2C bus. The sensor runs
//! continuously once enabled; a read fetches the latest RGBC conversion and
//! scales the raw counts onto the calibration range of the classifier's
//! reference table.

use courier_robot::system::color::ColorSample;
use courier_robot::system::sensors::ColorSensor;
use defmt::{debug, info, warn};
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_rp::i2c::{Async, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c as _;

use crate::task::error::DriverError;
use crate::I2cBusShared;

const TCS34725_ADDR: u8 = 0x29;

/// Command bit, set on every register access
const CMD: u8 = 0x80;
/// Auto-increment protocol for multi-byte reads
const CMD_AUTO_INCREMENT: u8 = 0x20;

const REG_ENABLE: u8 = 0x00;
const REG_ATIME: u8 = 0x01;
const REG_CONTROL: u8 = 0x0F;
const REG_ID: u8 = 0x12;
const REG_STATUS: u8 = 0x13;
const REG_CDATAL: u8 = 0x14;

const ENABLE_PON: u8 = 0x01;
const ENABLE_AEN: u8 = 0x02;
const STATUS_AVALID: u8 = 0x01;

/// 24 ms integration time
const ATIME_24MS: u8 = 0xF6;
/// 4x analog gain
const GAIN_4X: u8 = 0x01;

/// TCS34725 and TCS34727 ID values
const KNOWN_IDS: [u8; 2] = [0x44, 0x4D];

/// Raw counts per reference unit at 24 ms / 4x, measured on the course tiles
const COUNTS_PER_UNIT: f32 = 16.0;

pub struct Tcs34725 {
    i2c: I2cDevice<'static, CriticalSectionRawMutex, I2c<'static, I2C0, Async>>,
    ready: bool,
}

impl Tcs34725 {
    pub fn new(i2c_bus: &'static I2cBusShared) -> Self {
        Self {
            i2c: I2cDevice::new(i2c_bus),
            ready: false,
        }
    }

    /// Powers the sensor up and starts continuous conversions
    pub async fn init(&mut self) -> Result<(), DriverError> {
        let id = self.read_register(REG_ID).await?;
        if !KNOWN_IDS.contains(&id) {
            return Err(DriverError::UnknownDevice(id));
        }

        self.write_register(REG_ATIME, ATIME_24MS).await?;
        self.write_register(REG_CONTROL, GAIN_4X).await?;
        self.write_register(REG_ENABLE, ENABLE_PON).await?;
        Timer::after(Duration::from_millis(3)).await;
        self.write_register(REG_ENABLE, ENABLE_PON | ENABLE_AEN).await?;
        Timer::after(Duration::from_millis(24)).await;

        self.ready = true;
        info!("TCS34725 initialized, id {:#x}", id);
        Ok(())
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), DriverError> {
        self.i2c
            .write(TCS34725_ADDR, &[CMD | register, value])
            .await
            .map_err(|_| DriverError::I2c)
    }

    async fn read_register(&mut self, register: u8) -> Result<u8, DriverError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(TCS34725_ADDR, &[CMD | register], &mut buf)
            .await
            .map_err(|_| DriverError::I2c)?;
        Ok(buf[0])
    }

    /// Latest conversion as (clear, red, green, blue) counts
    async fn read_rgbc(&mut self) -> Result<[u16; 4], DriverError> {
        let status = self.read_register(REG_STATUS).await?;
        if status & STATUS_AVALID == 0 {
            return Err(DriverError::NotReady);
        }

        let mut buf = [0u8; 8];
        self.i2c
            .write_read(
                TCS34725_ADDR,
                &[CMD | CMD_AUTO_INCREMENT | REG_CDATAL],
                &mut buf,
            )
            .await
            .map_err(|_| DriverError::I2c)?;

        let word = |i: usize| u16::from_le_bytes([buf[i], buf[i + 1]]);
        Ok([word(0), word(2), word(4), word(6)])
    }
}

impl ColorSensor for Tcs34725 {
    async fn read_raw_sample(&mut self) -> Option<ColorSample> {
        if !self.ready {
            if let Err(e) = self.init().await {
                warn!("color sensor init failed: {:?}", e);
                return None;
            }
        }

        match self.read_rgbc().await {
            Ok([_clear, red, green, blue]) => Some(ColorSample::new(
                red as f32 / COUNTS_PER_UNIT,
                green as f32 / COUNTS_PER_UNIT,
                blue as f32 / COUNTS_PER_UNIT,
            )),
            Err(e) => {
                debug!("color read failed: {:?}", e);
                if e == DriverError::I2c {
                    self.ready = false;
                }
                None
            }
        }
    }
}
