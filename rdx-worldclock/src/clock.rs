//! Time-zone aware wall-clock math.
//!
//! Everything a clock face needs is derived from one primitive,
//! [`TimeParts::in_zone`]. Digital text and analog hands computed for the same
//! instant and zone therefore always agree.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Errors produced while resolving zones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("unknown time zone '{0}'")]
    UnknownZone(String),
}

/// Looks up an IANA zone identifier such as `"Europe/Stockholm"`.
pub fn resolve_zone(zone: &str) -> Result<Tz, ClockError> {
    zone.trim()
        .parse::<Tz>()
        .map_err(|_| ClockError::UnknownZone(zone.to_string()))
}

/// Wall-clock components as a local observer in some zone would read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeParts {
    /// Hour of the day, `0..=23`.
    pub hour24: u8,
    /// `0..=59`.
    pub minute: u8,
    /// `0..=59`. A leap second reads as 59.
    pub second: u8,
}

impl TimeParts {
    /// Builds parts from raw components, rejecting out-of-range values.
    pub fn from_hms(hour24: u8, minute: u8, second: u8) -> Option<Self> {
        (hour24 < 24 && minute < 60 && second < 60).then_some(Self {
            hour24,
            minute,
            second,
        })
    }

    /// Converts `instant` into wall-clock components in `tz`.
    pub fn in_zone(instant: DateTime<Utc>, tz: Tz) -> Self {
        let local = instant.with_timezone(&tz);
        Self {
            hour24: local.hour() as u8,
            minute: local.minute() as u8,
            // Leap seconds surface through the nanosecond field; clamp regardless.
            second: local.second().min(59) as u8,
        }
    }

    /// The hour on a 12-hour dial, `1..=12`.
    pub fn hour12(&self) -> u8 {
        match self.hour24 % 12 {
            0 => 12,
            h => h,
        }
    }

    pub fn is_pm(&self) -> bool {
        self.hour24 >= 12
    }

    /// Renders `HH:mm[:ss]` or `hh:mm[:ss] AM|PM`.
    pub fn format(&self, use_24h: bool, show_seconds: bool) -> String {
        let hour = if use_24h { self.hour24 } else { self.hour12() };
        let mut out = format!("{:02}:{:02}", hour, self.minute);
        if show_seconds {
            out.push_str(&format!(":{:02}", self.second));
        }
        if !use_24h {
            out.push_str(if self.is_pm() { " PM" } else { " AM" });
        }
        out
    }
}

/// Analog hand positions in degrees, 0° at 12 o'clock, increasing clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAngles {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

impl HandAngles {
    /// Hour and minute hands move continuously; the second hand jumps once per second.
    pub fn from_parts(parts: TimeParts) -> Self {
        let h = f64::from(parts.hour24 % 12);
        let m = f64::from(parts.minute);
        let s = f64::from(parts.second);
        Self {
            hour: h * 30.0 + m * 0.5 + s * (0.5 / 60.0),
            minute: m * 6.0 + s * 0.1,
            second: s * 6.0,
        }
    }
}

/// Wall-clock components of `instant` in the named zone.
pub fn time_parts(instant: DateTime<Utc>, zone: &str) -> Result<TimeParts, ClockError> {
    Ok(TimeParts::in_zone(instant, resolve_zone(zone)?))
}

/// Analog hand angles of `instant` in the named zone.
pub fn analog_angles(instant: DateTime<Utc>, zone: &str) -> Result<HandAngles, ClockError> {
    time_parts(instant, zone).map(HandAngles::from_parts)
}

/// Digital display text of `instant` in the named zone.
pub fn format_time(
    instant: DateTime<Utc>,
    zone: &str,
    use_24h: bool,
    show_seconds: bool,
) -> Result<String, ClockError> {
    time_parts(instant, zone).map(|parts| parts.format(use_24h, show_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn parts(h: u8, m: u8, s: u8) -> TimeParts {
        TimeParts::from_hms(h, m, s).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn three_oclock_points_right() {
        let a = HandAngles::from_parts(parts(3, 0, 0));
        assert_close(a.hour, 90.0);
        assert_close(a.minute, 0.0);
        assert_close(a.second, 0.0);
    }

    #[test]
    fn half_past_midnight_and_noon_share_a_dial_position() {
        let midnight = HandAngles::from_parts(parts(0, 30, 0));
        let noon = HandAngles::from_parts(parts(12, 30, 0));
        assert_close(midnight.hour, 15.0);
        assert_close(midnight.minute, 180.0);
        assert_eq!(midnight, noon);
    }

    #[test]
    fn half_past_five_hour_hand() {
        let a = HandAngles::from_parts(parts(5, 30, 0));
        assert_close(a.hour, 165.0);
        assert_close(a.minute, 180.0);
    }

    #[test]
    fn second_hand_is_discrete() {
        for h in [0, 7, 23] {
            assert_close(HandAngles::from_parts(parts(h, 12, 45)).second, 270.0);
        }
    }

    #[test]
    fn hands_creep_with_seconds() {
        let a = HandAngles::from_parts(parts(0, 0, 30));
        assert_close(a.hour, 0.25);
        assert_close(a.minute, 3.0);
    }

    #[test]
    fn formats_all_policies() {
        let p = parts(15, 5, 9);
        assert_eq!(p.format(true, true), "15:05:09");
        assert_eq!(p.format(true, false), "15:05");
        assert_eq!(p.format(false, true), "03:05:09 PM");
        assert_eq!(p.format(false, false), "03:05 PM");
    }

    #[test]
    fn twelve_hour_edges() {
        assert_eq!(parts(0, 0, 0).format(false, false), "12:00 AM");
        assert_eq!(parts(12, 0, 0).format(false, false), "12:00 PM");
        assert_eq!(parts(11, 59, 59).format(false, true), "11:59:59 AM");
    }

    #[test]
    fn converts_into_the_requested_zone() {
        // 2024-01-15 14:05:09 UTC is 15:05:09 in Stockholm (CET) and 23:05:09 in Tokyo.
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 14, 5, 9).unwrap();
        assert_eq!(
            format_time(instant, "Europe/Stockholm", true, true).unwrap(),
            "15:05:09"
        );
        assert_eq!(
            format_time(instant, "Europe/Stockholm", false, false).unwrap(),
            "03:05 PM"
        );
        assert_eq!(time_parts(instant, "Asia/Tokyo").unwrap(), parts(23, 5, 9));
    }

    #[test]
    fn follows_daylight_saving() {
        let summer = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(time_parts(summer, "Europe/Stockholm").unwrap().hour24, 14);
        assert_eq!(time_parts(summer, "America/New_York").unwrap().hour24, 8);
    }

    #[test]
    fn digital_and_analog_agree() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 6, 41, 17).unwrap();
        let p = time_parts(instant, "Asia/Kolkata").unwrap();
        assert_eq!(
            format_time(instant, "Asia/Kolkata", true, true).unwrap(),
            p.format(true, true)
        );
        assert_eq!(
            analog_angles(instant, "Asia/Kolkata").unwrap(),
            HandAngles::from_parts(p)
        );
    }

    #[test]
    fn unknown_zone_is_reported() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            format_time(instant, "Mars/Olympus_Mons", true, true),
            Err(ClockError::UnknownZone("Mars/Olympus_Mons".to_string()))
        );
        assert!(resolve_zone("").is_err());
    }

    #[test]
    fn rejects_out_of_range_parts() {
        assert!(TimeParts::from_hms(24, 0, 0).is_none());
        assert!(TimeParts::from_hms(0, 60, 0).is_none());
        assert!(TimeParts::from_hms(0, 0, 60).is_none());
    }

    proptest! {
        #[test]
        fn parts_stay_in_range(
            secs in -2_000_000_000i64..4_000_000_000i64,
            zone_idx in 0usize..crate::catalog::POPULAR.len(),
        ) {
            let instant = Utc.timestamp_opt(secs, 0).unwrap();
            let zone = crate::catalog::POPULAR[zone_idx].tz;
            let p = time_parts(instant, zone).unwrap();
            prop_assert!(p.hour24 <= 23);
            prop_assert!(p.minute <= 59);
            prop_assert!(p.second <= 59);
            let a = HandAngles::from_parts(p);
            prop_assert!((0.0..360.0).contains(&a.hour));
            prop_assert!((0.0..360.0).contains(&a.minute));
            prop_assert!((0.0..360.0).contains(&a.second));
        }
    }
}
