//! Driver-level errors
//!
//! These never cross into the controller: each capability implementation
//! logs them and reports "no reading" instead.

use defmt::Format;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum DriverError {
    /// I2C transfer failed
    I2c,
    /// Device answered with an unexpected ID register value
    UnknownDevice(u8),
    /// Conversion not finished yet
    NotReady,
    /// Ultrasonic echo missing or out of range
    NoEcho,
    /// Motor driver pin or PWM failure
    Motor,
}
