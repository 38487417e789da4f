pub mod buzzer;
pub mod color;
pub mod distance;
pub mod drive;
pub mod error;
pub mod motor_channel;
pub mod orchestrate;
pub mod resources;
pub mod safety;
pub mod turret;
