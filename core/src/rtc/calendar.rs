//! Calendar date/time conversions using O(1) algorithms
//!
//! Implements Howard Hinnant's civil_from_days and days_from_civil algorithms
//! for epoch conversions and Zeller's congruence for the day of week.
//! Reference: http://howardhinnant.github.io/date_algorithms.html
//!
//! Valid for dates in the proleptic Gregorian calendar from 1970 up to the
//! `u16` year limit.

use hal_abstractions::DateTime;

use crate::config::LocalTimeConfig;

const SECONDS_PER_DAY: u64 = 86400;

/// 9999-12-31 23:59:59, the last second with a four digit year
pub const MAX_UNIX_SECS: u64 = 253_402_300_799;

/// Check if year is a leap year (Gregorian calendar)
///
/// - Divisible by 4: leap year
/// - EXCEPT divisible by 100: not a leap year
/// - EXCEPT divisible by 400: leap year
pub fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Day of week for a Gregorian date, 0 = Sunday .. 6 = Saturday
///
/// Zeller's congruence in the form used for clock chips: January and
/// February count as months 11 and 12 of the previous year so the leap day
/// falls at the end of the counting year.
pub fn weekday(year: u16, month: u8, day: u8) -> u8 {
    let (y, m) = if month < 3 {
        ((year as u32).saturating_sub(1), month as u32 + 10)
    } else {
        (year as u32, month as u32 - 2)
    };
    let d = day as u32;

    // floor(2.6 * m - 0.2) == (13 * m - 1) / 5
    ((d + (13 * m - 1) / 5 + y + y / 4 - y / 100 + y / 400) % 7) as u8
}

/// Day of week for a count of days since 1970-01-01 (a Thursday)
fn weekday_from_days(days_since_epoch: i32) -> u8 {
    (days_since_epoch + 4).rem_euclid(7) as u8
}

/// Convert Unix timestamp to calendar date and time, UTC
///
/// Saturates at [`MAX_UNIX_SECS`].
pub fn unix_to_datetime(unix_secs: u64) -> DateTime {
    let unix_secs = unix_secs.min(MAX_UNIX_SECS);
    let days_since_epoch = (unix_secs / SECONDS_PER_DAY) as i32;
    let secs_today = unix_secs % SECONDS_PER_DAY;

    let hour = (secs_today / 3600) as u8;
    let minute = ((secs_today % 3600) / 60) as u8;
    let second = (secs_today % 60) as u8;

    let (year, month, day) = civil_from_days(days_since_epoch);

    DateTime::new(
        year,
        month,
        weekday_from_days(days_since_epoch),
        day,
        hour,
        minute,
        second,
    )
}

/// Convert calendar date and time to Unix timestamp, UTC
///
/// The weekday field is ignored. Dates before 1970 map to 0.
pub fn datetime_to_unix(dt: &DateTime) -> u64 {
    let days_since_epoch = days_from_civil(dt.year, dt.month, dt.day);
    if days_since_epoch < 0 {
        return 0;
    }

    (days_since_epoch as u64) * SECONDS_PER_DAY
        + (dt.hour as u64) * 3600
        + (dt.minute as u64) * 60
        + (dt.second as u64)
}

/// Derive local calendar time from the MCU's epoch seconds
///
/// Used when no external RTC is fitted. The epoch count comes from a GPS or
/// network time source, so the leap second difference is removed before the
/// fixed UTC offset is applied.
pub fn from_epoch_local(epoch_secs: u64, local: &LocalTimeConfig) -> DateTime {
    let secs = (epoch_secs.min(i64::MAX as u64) as i64)
        .saturating_sub(local.leap_seconds as i64)
        .saturating_add(local.utc_offset_secs as i64);
    unix_to_datetime(secs.max(0) as u64)
}

/// Convert days since Unix epoch to civil date (year, month, day)
fn civil_from_days(days_since_epoch: i32) -> (u16, u8, u8) {
    // Shift epoch from 1970-01-01 to 0000-03-01 (March 1, year 0)
    let z = days_since_epoch + 719468;

    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32; // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // [0, 399]
    let y = (yoe as i32) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // March = 0
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = if m <= 2 { y + 1 } else { y };

    (year as u16, m, d)
}

/// Convert civil date (year, month, day) to days since Unix epoch
fn days_from_civil(year: u16, month: u8, day: u8) -> i32 {
    let y = year as i32;
    let m = month as i32;
    let d = day as i32;

    let (y, m) = if m <= 2 { (y - 1, m + 9) } else { (y, m - 3) };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u32;
    let doy = (153 * (m as u32) + 2) / 5 + (d as u32) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;

    era * 146097 + (doe as i32) - 719468
}
