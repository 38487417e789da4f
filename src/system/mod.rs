//! Hardware-independent controller components
pub mod color;
pub mod config;
pub mod context;
pub mod emergency;
pub mod junction;
pub(crate) mod logging;
pub mod motion;
pub mod room;
pub mod room_scan;
pub mod safety;
pub mod sensors;
pub mod state;
pub mod state_machine;
pub mod wall_follow;

#[cfg(test)]
pub(crate) mod mock;
