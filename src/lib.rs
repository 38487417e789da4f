//! Courier robot controller
//!
//! Hardware-independent behavior for a wall-following courier robot: the
//! behavioral state machine, wall-follower, doorway and junction handling,
//! room scanner and the emergency-stop safety monitor. Hardware is reached
//! only through the capability traits in [`system::sensors`]; the RP2350
//! firmware binary provides the real implementations.

#![cfg_attr(not(test), no_std)]

/// Behavior, control loops and shared-state contract
pub mod system;
