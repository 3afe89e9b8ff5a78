//! UTC calendar time and Julian-day conversion.
//!
//! FITS `DATE-OBS` cards and the solar ephemeris both reason about time as
//! a Julian day number, so the conversion lives here rather than behind an
//! external time crate. The Gregorian algorithms are the standard
//! astronomical ones (Fliegel-Van Flandern for the forward direction, Meeus
//! for the inverse) and are exact over the range solar observations cover.

use crate::error::{Error, Result};

/// A calendar instant on the UTC timescale.
///
/// Seconds carry a fractional part; leap seconds are not modeled.
///
/// # Example
///
/// ```rust
/// use helio_core::UtcDateTime;
///
/// let t = UtcDateTime::new(2000, 1, 1, 12, 0, 0.0).unwrap();
/// assert_eq!(t.julian_day(), 2451545.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct UtcDateTime {
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u8,
    /// Day of month, 1-31.
    pub day: u8,
    /// Hour, 0-23.
    pub hour: u8,
    /// Minute, 0-59.
    pub minute: u8,
    /// Second with fraction, `0.0 <= s < 60.0`.
    pub second: f64,
}

impl UtcDateTime {
    /// Creates a new instant, validating the field ranges.
    pub fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: f64) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::invalid_parameter(format!("month out of range: {month}")));
        }
        if !(1..=31).contains(&day) {
            return Err(Error::invalid_parameter(format!("day out of range: {day}")));
        }
        if hour > 23 || minute > 59 || !(0.0..60.0).contains(&second) {
            return Err(Error::invalid_parameter(format!(
                "time out of range: {hour:02}:{minute:02}:{second}"
            )));
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Returns the Julian day, including the time-of-day fraction.
    pub fn julian_day(&self) -> f64 {
        let a = (14 - i64::from(self.month)) / 12;
        let y = i64::from(self.year) + 4800 - a;
        let m = i64::from(self.month) + 12 * a - 3;
        let jdn = i64::from(self.day)
            + (153 * m + 2) / 5
            + 365 * y
            + y / 4
            - y / 100
            + y / 400
            - 32045;
        jdn as f64
            + (f64::from(self.hour) - 12.0) / 24.0
            + f64::from(self.minute) / 1440.0
            + self.second / 86400.0
    }

    /// Builds an instant from a Julian day.
    pub fn from_julian_day(jd: f64) -> Self {
        let z = (jd + 0.5).floor();
        let f = jd + 0.5 - z;
        let a = if z < 2_299_161.0 {
            z
        } else {
            let alpha = ((z - 1_867_216.25) / 36524.25).floor();
            z + 1.0 + alpha - (alpha / 4.0).floor()
        };
        let b = a + 1524.0;
        let c = ((b - 122.1) / 365.25).floor();
        let d = (365.25 * c).floor();
        let e = ((b - d) / 30.6001).floor();

        let day_frac = b - d - (30.6001 * e).floor() + f;
        let day = day_frac.floor();
        let month = if e < 14.0 { e - 1.0 } else { e - 13.0 };
        let year = if month > 2.0 { c - 4716.0 } else { c - 4715.0 };

        let mut secs = (day_frac - day) * 86400.0;
        // Guard against 23:59:59.999... rounding into the next day.
        if secs >= 86399.999_999 {
            secs = 86399.999_999;
        }
        let hour = (secs / 3600.0).floor();
        secs -= hour * 3600.0;
        let minute = (secs / 60.0).floor();
        secs -= minute * 60.0;

        Self {
            year: year as i32,
            month: month as u8,
            day: day as u8,
            hour: hour as u8,
            minute: minute as u8,
            second: secs,
        }
    }

    /// Builds an instant from seconds since the Unix epoch.
    pub fn from_unix_seconds(secs: f64) -> Self {
        Self::from_julian_day(2_440_587.5 + secs / 86400.0)
    }

    /// Returns the current instant from the system clock.
    pub fn now() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self::from_unix_seconds(secs)
    }

    /// Formats as ISO-8601 with millisecond precision, e.g.
    /// `2024-03-01T12:34:56.789`.
    pub fn iso8601(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:06.3}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }

    /// Parses an ISO-8601 instant as produced by [`iso8601`](Self::iso8601).
    ///
    /// A trailing `Z` and a missing fractional part are both accepted.
    pub fn parse_iso8601(s: &str) -> Result<Self> {
        let s = s.trim().trim_end_matches('Z');
        let (date, clock) = s
            .split_once('T')
            .ok_or_else(|| Error::invalid_parameter(format!("not an ISO-8601 instant: {s}")))?;
        let mut date_parts = date.splitn(3, '-');
        let mut clock_parts = clock.splitn(3, ':');

        let mut next_num = |it: &mut dyn Iterator<Item = &str>, what: &str| -> Result<f64> {
            it.next()
                .ok_or_else(|| Error::invalid_parameter(format!("missing {what} in: {s}")))?
                .parse::<f64>()
                .map_err(|_| Error::invalid_parameter(format!("bad {what} in: {s}")))
        };

        let year = next_num(&mut date_parts, "year")? as i32;
        let month = next_num(&mut date_parts, "month")? as u8;
        let day = next_num(&mut date_parts, "day")? as u8;
        let hour = next_num(&mut clock_parts, "hour")? as u8;
        let minute = next_num(&mut clock_parts, "minute")? as u8;
        let second = next_num(&mut clock_parts, "second")?;
        Self::new(year, month, day, hour, minute, second)
    }
}
