//! Field-test configuration structures

/// I2C address of the RV-3028 real-time clock
pub const RV3028_ADDRESS: u8 = 0x52;

/// Clock readings past this year mean the RTC was never set (or is not there)
pub const MAX_PLAUSIBLE_YEAR: u16 = 2060;

/// Operating mode of the field tester
///
/// Discriminants are the mode codes the device stores in its settings and
/// reports in [`crate::MeasurementResult::mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TestMode {
    /// LoRaWAN LinkCheck requests, gateway count and margin from the network server
    LinkCheck = 0,
    /// Point-to-point LoRa, no network server
    P2p = 2,
    /// Field tester backend reporting RSSI and distance statistics
    FieldTester = 3,
    /// Second generation field tester backend
    FieldTesterV2 = 4,
}

impl TryFrom<u8> for TestMode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::LinkCheck),
            2 => Ok(Self::P2p),
            3 => Ok(Self::FieldTester),
            4 => Ok(Self::FieldTesterV2),
            other => Err(other),
        }
    }
}

/// Settings owned by the measurement subsystem that shape the log format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldTestConfig {
    pub test_mode: TestMode,
    /// Add latitude/longitude columns where the mode allows it
    pub location_on: bool,
}

impl Default for FieldTestConfig {
    fn default() -> Self {
        Self {
            test_mode: TestMode::LinkCheck,
            location_on: false,
        }
    }
}

/// SD card logger configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoggerConfig {
    /// Rows appended to a file before rolling over to the next one
    pub rows_per_file: u16,
    /// Wait after switching the storage power rail on, in milliseconds
    pub power_settle_ms: u32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            rows_per_file: 300,
            power_settle_ms: 50,
        }
    }
}

/// Correction applied when deriving local calendar time from the MCU clock
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalTimeConfig {
    /// GPS-UTC leap second difference removed from the epoch count
    pub leap_seconds: u32,
    /// Offset of local time from UTC in seconds
    pub utc_offset_secs: i32,
}

impl Default for LocalTimeConfig {
    fn default() -> Self {
        Self {
            leap_seconds: 18,
            utc_offset_secs: 8 * 60 * 60,
        }
    }
}
