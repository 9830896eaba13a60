//! Progress event distribution.

pub mod bus;

pub use bus::ProgressBus;
