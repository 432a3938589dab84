//! Platform-agnostic clock and CSV logging logic for field-tester firmware
//!
//! This crate contains the logic shared across boards: calendar math and the
//! RV-3028 clock driver on top of `embedded-hal` I2C, and the SD card CSV
//! logger on top of [`hal_abstractions::LogVolume`]. It has NO board
//! dependencies and its tests run on the host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod error;
pub mod measurement;
pub mod rtc;
pub mod storage;

pub use config::{FieldTestConfig, LocalTimeConfig, LoggerConfig, TestMode};
pub use error::{ClockError, LogError};
pub use hal_abstractions::DateTime;
pub use measurement::{Location, MeasurementResult};
