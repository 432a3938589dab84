//! Real-time clock seam

use core::fmt;

/// Calendar date and time as kept by a real-time clock
///
/// Plain value: fields are whatever the source reported, no range
/// validation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    /// Full year, e.g. 2024
    pub year: u16,
    /// Month 1-12
    pub month: u8,
    /// Day of week 0-6, 0 = Sunday
    pub weekday: u8,
    /// Day of month 1-31
    pub day: u8,
    /// Hour 0-23
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    pub const fn new(
        year: u16,
        month: u8,
        weekday: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Self {
        Self {
            year,
            month,
            weekday,
            day,
            hour,
            minute,
            second,
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}.{:02} {}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Battery-backed calendar clock
pub trait RealTimeClock {
    type Error;

    /// Read the current calendar date and time from the device
    fn datetime(&mut self) -> Result<DateTime, Self::Error>;

    /// Write a full calendar record, weekday included, to the device
    fn set_datetime(&mut self, datetime: &DateTime) -> Result<(), Self::Error>;

    /// Seconds counter kept by the device, if it has one
    fn unix_time(&mut self) -> Result<u32, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_fields() {
        let dt = DateTime::new(2024, 3, 2, 5, 7, 8, 9);
        assert_eq!(format!("{}", dt), "2024.03.05 7:08:09");
    }
}
