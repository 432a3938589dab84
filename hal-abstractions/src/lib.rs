//! Hardware abstraction traits for field-tester firmware
//!
//! This crate defines the seams between the platform-agnostic logging logic
//! and the peripherals a board provides. BSPs implement these traits.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod rtc;
pub mod storage;

pub use rtc::{DateTime, RealTimeClock};
pub use storage::{DirEntry, EntryName, LogVolume};
