//! Result of one field test transmission

use hal_abstractions::DateTime;

/// GPS fix attached to a measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Location {
    pub lat: f32,
    pub lng: f32,
}

/// One measurement as filled in by the field test task
///
/// The logger only reads it. Which fields end up in the CSV row depends on
/// the active [`crate::TestMode`] and the location flag.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementResult {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    /// Raw [`crate::TestMode`] code the measurement was taken in
    pub mode: u8,
    /// Number of gateways that received the packet
    pub gw: u8,
    pub location: Option<Location>,
    pub rx_rssi: i16,
    pub rx_snr: i8,
    pub min_rssi: i16,
    pub max_rssi: i16,
    /// Distance to the nearest gateway, metres
    pub min_dst: u32,
    /// Distance to the farthest gateway, metres
    pub max_dst: u32,
    /// LinkCheck demodulation margin
    pub demod: u8,
    /// Packets lost since the last answer
    pub lost: u8,
}

impl MeasurementResult {
    /// Copy the calendar fields of a clock reading into the timestamp
    pub fn stamped(mut self, now: &DateTime) -> Self {
        self.year = now.year;
        self.month = now.month;
        self.day = now.day;
        self.hour = now.hour;
        self.min = now.minute;
        self
    }

    /// Latitude/longitude pair, zeros when there was no fix
    pub fn lat_lng(&self) -> (f32, f32) {
        self.location.map_or((0.0, 0.0), |l| (l.lat, l.lng))
    }
}
