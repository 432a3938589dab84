//! RV-3028-C7 real-time clock driver
//!
//! Talks to the clock over any `embedded-hal` 1.0 I2C bus. Only the time
//! keeping registers, the 12/24 hour switch, the EEPROM refresh control and
//! the battery switchover configuration are used.

use core::fmt::Write as _;

use embedded_hal::i2c::I2c;
use hal_abstractions::{DateTime, RealTimeClock};
use heapless::String;

use super::calendar;
use crate::config::{MAX_PLAUSIBLE_YEAR, RV3028_ADDRESS};
use crate::error::ClockError;

const REG_SECONDS: u8 = 0x00;
const REG_CONTROL1: u8 = 0x0F;
const REG_CONTROL2: u8 = 0x10;
const REG_UNIX_TIME0: u8 = 0x1B;
const REG_EEPROM_CLKOUT: u8 = 0x35;
const REG_EEPROM_BACKUP: u8 = 0x37;

/// Control 1: EEPROM memory refresh disable
const CONTROL1_EERD: u8 = 0x08;
/// Control 2: 12 hour mode when set
const CONTROL2_12_24: u8 = 0x02;
/// Backup register: trickle charger off, direct switching mode,
/// switch to VBACKUP as soon as VDD drops below it
const BACKUP_DIRECT_SWITCHING: u8 = 0xB4;

/// Calendar registers start counting years at 2000
const YEAR_BASE: u16 = 2000;

/// Value of the calendar registers after power-on reset
const RESET_DATETIME: DateTime = DateTime::new(2000, 1, 6, 1, 0, 0, 0);

fn bcd_to_bin(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

fn bin_to_bcd(bin: u8) -> u8 {
    ((bin / 10) << 4) | (bin % 10)
}

/// RV-3028 driver
///
/// Keeps the last reading in memory so callers that only need a recent
/// timestamp can use [`Rv3028::now`] without touching the bus.
pub struct Rv3028<I2C> {
    i2c: I2C,
    address: u8,
    now: DateTime,
}

impl<I2C: I2c> Rv3028<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: RV3028_ADDRESS,
            now: RESET_DATETIME,
        }
    }

    /// Give the bus back
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Probe for the clock, configure it and read the current time
    ///
    /// Fails with [`ClockError::NotPresent`] when nothing acknowledges the
    /// clock address and with [`ClockError::InvalidReading`] when the stored
    /// year is past [`MAX_PLAUSIBLE_YEAR`], which is what an unset or absent
    /// clock reads back as.
    pub fn init(&mut self) -> Result<DateTime, ClockError> {
        if !self.probe() {
            warn!("No RTC present");
            return Err(ClockError::NotPresent);
        }

        // EEPROM auto refresh on, backup switchover mirrored to EEPROM
        self.update_register(REG_CONTROL1, CONTROL1_EERD, 0)?;
        self.write_register(REG_EEPROM_CLKOUT, 0x00)?;
        self.write_register(REG_EEPROM_BACKUP, BACKUP_DIRECT_SWITCHING)?;
        self.update_register(REG_CONTROL2, CONTROL2_12_24, 0)?;

        let now = self.read()?;
        if now.year > MAX_PLAUSIBLE_YEAR {
            warn!("Invalid year {}, no RTC present", now.year);
            return Err(ClockError::InvalidReading);
        }

        let mut line: String<24> = String::new();
        if write!(line, "{}", now).is_ok() {
            info!("RTC {}", line.as_str());
        }
        Ok(now)
    }

    /// Scan the bus, logging every device that answers
    ///
    /// Stops as soon as the clock address responds.
    fn probe(&mut self) -> bool {
        let mut scratch = [0u8; 1];
        for address in 1..127u8 {
            if self.i2c.read(address, &mut scratch).is_ok() {
                info!("Found device on I2C {=u8:#x}", address);
                if address == self.address {
                    return true;
                }
            }
        }
        false
    }

    /// Last date and time read from or written to the device
    pub fn now(&self) -> DateTime {
        self.now
    }

    /// Refresh the cached date and time from the device
    pub fn read(&mut self) -> Result<DateTime, ClockError> {
        let mut regs = [0u8; 7];
        self.i2c
            .write_read(self.address, &[REG_SECONDS], &mut regs)
            .map_err(|_| ClockError::Bus)?;

        self.now = DateTime {
            second: bcd_to_bin(regs[0] & 0x7F),
            minute: bcd_to_bin(regs[1] & 0x7F),
            hour: bcd_to_bin(regs[2] & 0x3F),
            weekday: regs[3] & 0x07,
            day: bcd_to_bin(regs[4] & 0x3F),
            month: bcd_to_bin(regs[5] & 0x1F),
            year: YEAR_BASE + bcd_to_bin(regs[6]) as u16,
        };
        Ok(self.now)
    }

    /// Set date and time, seconds zeroed
    pub fn set(
        &mut self,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
    ) -> Result<(), ClockError> {
        self.set_with_seconds(year, month, day, hour, minute, 0)
    }

    /// Set date and time, the weekday is computed from the date
    pub fn set_with_seconds(
        &mut self,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<(), ClockError> {
        let weekday = calendar::weekday(year, month, day);
        debug!("Calculated weekday is {}", weekday);
        self.write_datetime(&DateTime::new(
            year, month, weekday, day, hour, minute, second,
        ))
    }

    /// Read the 32-bit UNIX time counter
    ///
    /// The counter runs independently of the calendar registers.
    pub fn unix_time(&mut self) -> Result<u32, ClockError> {
        let mut regs = [0u8; 4];
        self.i2c
            .write_read(self.address, &[REG_UNIX_TIME0], &mut regs)
            .map_err(|_| ClockError::Bus)?;
        Ok(u32::from_le_bytes(regs))
    }

    /// Load the 32-bit UNIX time counter
    pub fn set_unix_time(&mut self, secs: u32) -> Result<(), ClockError> {
        let [b0, b1, b2, b3] = secs.to_le_bytes();
        self.i2c
            .write(self.address, &[REG_UNIX_TIME0, b0, b1, b2, b3])
            .map_err(|_| ClockError::Bus)
    }

    fn write_datetime(&mut self, dt: &DateTime) -> Result<(), ClockError> {
        if !(YEAR_BASE..YEAR_BASE + 100).contains(&dt.year) {
            return Err(ClockError::OutOfRange);
        }

        let frame = [
            REG_SECONDS,
            bin_to_bcd(dt.second),
            bin_to_bcd(dt.minute),
            bin_to_bcd(dt.hour),
            dt.weekday & 0x07,
            bin_to_bcd(dt.day),
            bin_to_bcd(dt.month),
            bin_to_bcd((dt.year - YEAR_BASE) as u8),
        ];
        self.i2c
            .write(self.address, &frame)
            .map_err(|_| ClockError::Bus)?;
        self.now = *dt;
        Ok(())
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), ClockError> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(|_| ClockError::Bus)
    }

    /// Read-modify-write of the bits selected by `mask`
    fn update_register(&mut self, reg: u8, mask: u8, value: u8) -> Result<(), ClockError> {
        let mut current = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut current)
            .map_err(|_| ClockError::Bus)?;
        self.write_register(reg, (current[0] & !mask) | (value & mask))
    }
}

impl<I2C: I2c> RealTimeClock for Rv3028<I2C> {
    type Error = ClockError;

    fn datetime(&mut self) -> Result<DateTime, Self::Error> {
        self.read()
    }

    fn set_datetime(&mut self, datetime: &DateTime) -> Result<(), Self::Error> {
        self.write_datetime(datetime)
    }

    fn unix_time(&mut self) -> Result<u32, Self::Error> {
        Rv3028::unix_time(self)
    }
}
