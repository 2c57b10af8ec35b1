//! Effective-date resolution for admin entries
//!
//! Admin screens submit dates from an `<input type="date">` or
//! `datetime-local` control, so the value carries no offset. In `Legacy` mode
//! the normalizer applies a fixed shift so the entry lands on the intended
//! calendar day for the bank's customers, who read timestamps six hours behind
//! UTC. This is a heuristic: it is only right for that one audience.
//!
//! Inputs with an explicit offset (`Z` or `+hh:mm`) are taken as the exact
//! instant and never shifted, even in `Legacy` mode. This departs from the
//! legacy admin panel, which added six hours to every date-time it could
//! parse, offset or not.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Hour (UTC) a bare date is pinned to in legacy mode
const LEGACY_DATE_HOUR: u32 = 20;

/// Shift applied to naive date-times in legacy mode
const LEGACY_SHIFT_HOURS: i64 = 6;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    /// Dates pinned to 20:00 UTC, naive times shifted +6h
    #[default]
    Legacy,
    /// Dates at midnight UTC, naive times taken as UTC
    Utc,
}

impl DateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateMode::Legacy => "legacy",
            DateMode::Utc => "utc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Some(DateMode::Legacy),
            "utc" => Some(DateMode::Utc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateNormalizer {
    mode: DateMode,
}

impl DateNormalizer {
    pub fn new(mode: DateMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DateMode {
        self.mode
    }

    /// Resolve user input to an instant, falling back to the current time
    pub fn resolve(&self, raw: Option<&str>) -> DateTime<Utc> {
        self.resolve_at(raw, Utc::now())
    }

    /// [`resolve`](Self::resolve) with an explicit "now"
    pub fn resolve_at(&self, raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
        let Some(input) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return now;
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return dt.with_timezone(&Utc);
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            let hour = match self.mode {
                DateMode::Legacy => LEGACY_DATE_HOUR,
                DateMode::Utc => 0,
            };
            if let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) {
                return date.and_time(time).and_utc();
            }
        }

        if let Some(naive) = parse_naive_datetime(input) {
            let utc = naive.and_utc();
            return match self.mode {
                DateMode::Legacy => utc + Duration::hours(LEGACY_SHIFT_HOURS),
                DateMode::Utc => utc,
            };
        }

        tracing::warn!(input, "unparseable effective date, using current time");
        now
    }
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
    }

    fn legacy(raw: &str) -> DateTime<Utc> {
        DateNormalizer::new(DateMode::Legacy).resolve_at(Some(raw), now())
    }

    #[test]
    fn test_missing_or_blank_is_now() {
        let normalizer = DateNormalizer::default();
        assert_eq!(normalizer.resolve_at(None, now()), now());
        assert_eq!(normalizer.resolve_at(Some("   "), now()), now());
    }

    #[test]
    fn test_date_only_pins_to_twenty_hundred() {
        assert_eq!(
            legacy("2024-03-01"),
            Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_naive_datetime_shifts_six_hours() {
        assert_eq!(
            legacy("2024-03-01T02:00"),
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
        );
        assert_eq!(
            legacy("2024-03-01 22:15:30"),
            Utc.with_ymd_and_hms(2024, 3, 2, 4, 15, 30).unwrap()
        );
    }

    #[test]
    fn test_explicit_offset_is_exact() {
        assert_eq!(
            legacy("2024-03-01T02:00:00-05:00"),
            Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap()
        );
        assert_eq!(
            legacy("2024-03-01T02:00:00Z"),
            Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_malformed_falls_back_to_now() {
        assert_eq!(legacy("yesterday"), now());
        assert_eq!(legacy("2024-13-45"), now());
    }

    #[test]
    fn test_utc_mode_disables_shift() {
        let normalizer = DateNormalizer::new(DateMode::Utc);
        assert_eq!(
            normalizer.resolve_at(Some("2024-03-01"), now()),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            normalizer.resolve_at(Some("2024-03-01T02:00"), now()),
            Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_date_mode_parse() {
        assert_eq!(DateMode::parse("UTC"), Some(DateMode::Utc));
        assert_eq!(DateMode::parse("legacy"), Some(DateMode::Legacy));
        assert_eq!(DateMode::parse("local"), None);
    }
}
