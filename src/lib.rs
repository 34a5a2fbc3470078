//! Press a SwitchBot Bot over Bluetooth LE, keeping one connection alive
//! across several presses.

pub mod cli;
pub mod controller;
pub mod domain;
pub mod infrastructure;
pub mod scan;
pub mod scheduler;
pub mod session;
