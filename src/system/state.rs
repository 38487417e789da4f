//! Robot State
//!
//! Behavioral state and delivery bookkeeping, both owned by the State
//! Machine task. Neither is shared: sensor code and the Safety Monitor never
//! touch them, so no lock is involved.
//!
//! # States
//! - FollowingLine: wall-following with periodic color checks
//! - CheckingDoorway: slow probe into an orange doorway looking for red
//! - EnteringRoom: drive through the doorway
//! - ScanningRoom: sweep for the green recipient sticker
//! - Delivering: announce the drop and count it
//! - ExitingRoom: turn around and find the boundary again
//! - AvoidingRestricted: back off and detour around a restricted room
//! - MissionComplete: terminal

/// Number of packages to deliver before the mail room may be entered
pub const PACKAGE_QUOTA: u8 = 2;

/// Behavioral state of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RobotState {
    FollowingLine,
    CheckingDoorway,
    EnteringRoom,
    ScanningRoom,
    Delivering,
    ExitingRoom,
    AvoidingRestricted,
    MissionComplete,
}

impl RobotState {
    pub fn is_terminal(self) -> bool {
        self == RobotState::MissionComplete
    }
}

/// Where the robot is heading when it enters a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Destination {
    /// An office with a possible recipient
    Office,
    /// The mail room, end of the mission
    MailRoom,
}

/// Packages delivered so far
///
/// Only ever counts up, and never past [`PACKAGE_QUOTA`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeliveryProgress {
    packages_delivered: u8,
}

impl DeliveryProgress {
    pub const fn new() -> Self {
        Self {
            packages_delivered: 0,
        }
    }

    pub fn packages_delivered(&self) -> u8 {
        self.packages_delivered
    }

    /// Whether every package is out and the mail room may be entered
    pub fn quota_met(&self) -> bool {
        self.packages_delivered >= PACKAGE_QUOTA
    }

    /// Counts one delivery; a no-op once the quota is met
    pub fn record_delivery(&mut self) -> u8 {
        if self.packages_delivered < PACKAGE_QUOTA {
            self.packages_delivered += 1;
        }
        self.packages_delivered
    }
}
