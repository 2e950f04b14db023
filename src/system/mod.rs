pub mod controller;
pub mod power;
pub mod scheduler;
pub mod time;

#[cfg(feature = "firmware")]
pub mod config;
