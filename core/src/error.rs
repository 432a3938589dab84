//! Clock and logger error types

/// Real-time clock errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Nothing answered at the clock's bus address
    NotPresent,
    /// The clock answered but holds an implausible date
    InvalidReading,
    /// Date outside what the device can store
    OutOfRange,
    /// Bus transfer failed
    Bus,
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotPresent => write!(f, "No RTC present"),
            Self::InvalidReading => write!(f, "Invalid RTC reading"),
            Self::OutOfRange => write!(f, "Date out of RTC range"),
            Self::Bus => write!(f, "RTC bus error"),
        }
    }
}

impl core::error::Error for ClockError {}

/// SD card logging errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogError {
    /// Card missing or not formatted
    MediaMountFailed,
    /// New log file could not be created (card full or write protected)
    FileCreateFailed,
    /// Log file could not be opened or appended to
    FileWriteFailed,
    /// Fewer bytes reached the card than were formatted
    ShortWrite { expected: usize, written: usize },
    /// Log file could not be opened for reading
    FileOpenFailedForRead,
    /// File could not be deleted
    FileRemoveFailed,
    /// Every sequence number up to 9999 is taken
    SequenceExhausted,
    /// Formatted row did not fit the line buffer
    LineTooLong,
    /// Storage power rail could not be switched
    PowerRail,
    /// Writing a dump to the output sink failed
    Output,
}

impl core::fmt::Display for LogError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MediaMountFailed => write!(f, "SD card mount failed"),
            Self::FileCreateFailed => write!(f, "Log file create failed"),
            Self::FileWriteFailed => write!(f, "Log file write failed"),
            Self::ShortWrite { expected, written } => {
                write!(f, "Short write: {} of {} bytes", written, expected)
            }
            Self::FileOpenFailedForRead => write!(f, "Failed to open file for reading"),
            Self::FileRemoveFailed => write!(f, "File remove failed"),
            Self::SequenceExhausted => write!(f, "No free log file number"),
            Self::LineTooLong => write!(f, "Log line too long"),
            Self::PowerRail => write!(f, "Storage power rail error"),
            Self::Output => write!(f, "Dump output error"),
        }
    }
}

impl core::error::Error for LogError {}
