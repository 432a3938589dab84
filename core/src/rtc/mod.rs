//! Clock access
//!
//! The RV-3028 driver provides calendar time across power cycles. Boards
//! without one derive calendar time from the MCU epoch clock through
//! [`from_epoch_local`].

pub mod calendar;
mod rv3028;

pub use calendar::{datetime_to_unix, from_epoch_local, is_leap_year, unix_to_datetime, weekday};
pub use rv3028::Rv3028;
