//! Shop-local time.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use super::error::ShopError;

/// Source of "now" in the shop's fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct ShopClock {
    offset: FixedOffset,
    frozen: Option<DateTime<Utc>>,
}

impl ShopClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            frozen: None,
        }
    }

    /// A clock stopped at `instant`.
    pub fn frozen_at(offset: FixedOffset, instant: DateTime<Utc>) -> Self {
        Self {
            offset,
            frozen: Some(instant),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        self.frozen.unwrap_or_else(Utc::now)
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Parse `+01:00`, `-05:30`, `+1`, `0` or `Z` into a fixed offset.
pub fn parse_utc_offset(text: &str) -> Result<FixedOffset, ShopError> {
    let invalid = || ShopError::ConfigInvalid {
        section: "shop".into(),
        key: "utc_offset".into(),
        reason: format!("'{text}' is not a UTC offset (expected e.g. +01:00)"),
    };

    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed == "0" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_common_offsets() {
        assert_eq!(parse_utc_offset("+01:00").unwrap().local_minus_utc(), 3600);
        assert_eq!(parse_utc_offset("+1").unwrap().local_minus_utc(), 3600);
        assert_eq!(parse_utc_offset("-05:30").unwrap().local_minus_utc(), -19800);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("0").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_bad_offsets() {
        for bad in ["", "01:00", "+25:00", "+01:75", "+ab"] {
            assert!(
                matches!(parse_utc_offset(bad), Err(ShopError::ConfigInvalid { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn frozen_clock_reports_local_day() {
        let instant = Utc.with_ymd_and_hms(2026, 10, 16, 23, 30, 0).unwrap();
        let clock = ShopClock::frozen_at(FixedOffset::east_opt(3600).unwrap(), instant);
        assert_eq!(clock.now_utc(), instant);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
    }
}
