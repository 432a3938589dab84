//! Wall clock for log timestamps
//!
//! The RV-3028 on I2C1 is the primary clock. When it does not answer (or
//! holds an implausible date) the STM32 internal RTC is used instead: it
//! counts epoch seconds on the network time scale, which are shifted to local
//! time with [`from_epoch_local`].
//!
//! The last time read is kept in a static so the FAT layer can stamp the
//! files it touches without owning the clock.

use core::cell::{Cell, RefCell};
use critical_section::Mutex;
use defmt::{info, warn, Format};
use embassy_stm32::rtc::Rtc;
use embedded_hal::i2c::I2c;
use embedded_sdmmc::{TimeSource, Timestamp};

use fieldlog_core::rtc::{datetime_to_unix, from_epoch_local, Rv3028};
use fieldlog_core::{DateTime, LocalTimeConfig};

/// Global internal RTC instance
static RTC: Mutex<RefCell<Option<Rtc>>> = Mutex::new(RefCell::new(None));

/// Most recent local time handed out by [`Clock::now`]
static LAST_READ: Mutex<Cell<DateTime>> =
    Mutex::new(Cell::new(DateTime::new(2000, 1, 6, 1, 0, 0, 0)));

/// Internal RTC errors
#[derive(Debug, Clone, Copy, Format)]
pub enum RtcError {
    /// RTC not initialized
    NotInitialized,
    /// RTC hardware error
    HardwareError,
}

/// Hand the internal RTC over to this module
///
/// Must be called once during system initialization.
pub fn initialize_rtc(rtc: Rtc) {
    critical_section::with(|cs| {
        RTC.borrow(cs).replace(Some(rtc));
    });
    info!("Internal RTC initialized");
}

/// Epoch seconds counted by the internal RTC
pub fn read_epoch() -> Result<u64, RtcError> {
    critical_section::with(|cs| {
        let mut rtc = RTC.borrow(cs).borrow_mut();
        let rtc = rtc.as_mut().ok_or(RtcError::NotInitialized)?;
        let now = rtc.now().map_err(|_| RtcError::HardwareError)?;
        Ok(datetime_to_unix(&DateTime::new(
            now.year(),
            now.month(),
            0,
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
        )))
    })
}

fn remember(dt: DateTime) {
    critical_section::with(|cs| LAST_READ.borrow(cs).set(dt));
}

/// Where log timestamps come from
pub enum Clock<I2C> {
    External(Rv3028<I2C>),
    Epoch(LocalTimeConfig),
}

impl<I2C: I2c> Clock<I2C> {
    /// Probe the RV-3028, falling back to the internal RTC
    pub fn detect(i2c: I2C, local: LocalTimeConfig) -> Self {
        let mut rtc = Rv3028::new(i2c);
        match rtc.init() {
            Ok(dt) => {
                remember(dt);
                Self::External(rtc)
            }
            Err(e) => {
                warn!("RV-3028 unavailable ({}), using internal RTC", e);
                Self::Epoch(local)
            }
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }

    /// Current local time
    ///
    /// A failed read keeps the previous value.
    pub fn now(&mut self) -> DateTime {
        let dt = match self {
            Self::External(rtc) => match rtc.read() {
                Ok(dt) => dt,
                Err(e) => {
                    warn!("RV-3028 read failed: {}", e);
                    rtc.now()
                }
            },
            Self::Epoch(local) => match read_epoch() {
                Ok(secs) => from_epoch_local(secs, local),
                Err(e) => {
                    warn!("Internal RTC read failed: {}", e);
                    critical_section::with(|cs| LAST_READ.borrow(cs).get())
                }
            },
        };
        remember(dt);
        dt
    }
}

/// FAT directory entry timestamps from the last clock reading
pub struct FatClock;

impl TimeSource for FatClock {
    fn get_timestamp(&self) -> Timestamp {
        let dt = critical_section::with(|cs| LAST_READ.borrow(cs).get());
        Timestamp::from_calendar(dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second)
            .unwrap_or(Timestamp {
                year_since_1970: 30,
                zero_indexed_month: 0,
                zero_indexed_day: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
            })
    }
}
