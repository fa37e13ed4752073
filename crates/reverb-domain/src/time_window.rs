use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, TimeZone, Timelike, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `DayOfWeek` values.
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
            Self::Sun => "sun",
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
            Weekday::Sun => Self::Sun,
        }
    }

    pub const ALL: [DayOfWeek; 7] = [
        Self::Mon,
        Self::Tue,
        Self::Wed,
        Self::Thu,
        Self::Fri,
        Self::Sat,
        Self::Sun,
    ];
}

fn all_days() -> Vec<DayOfWeek> {
    DayOfWeek::ALL.to_vec()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Hour-of-day gate evaluated in the window's own timezone. The hour range is
/// half-open `[start_hour, end_hour)` and wraps past midnight when
/// `end_hour < start_hour`.
pub struct TimeWindow {
    pub start_hour: u8,
    pub end_hour: u8,
    pub timezone: String,
    #[serde(default = "all_days")]
    pub days_of_week: Vec<DayOfWeek>,
}

impl TimeWindow {
    /// Pure check of (window, instant): both the day-of-week set and the hour
    /// range are evaluated after converting the instant to the window's
    /// timezone.
    pub fn contains(&self, now_unix_ms: u64) -> Result<bool> {
        let tz: Tz = self
            .timezone
            .parse()
            .map_err(|_| anyhow!("invalid time window timezone '{}'", self.timezone))?;
        let local = tz
            .timestamp_millis_opt(i64::try_from(now_unix_ms).unwrap_or(i64::MAX))
            .single()
            .ok_or_else(|| anyhow!("time window instant {} is unrepresentable", now_unix_ms))?;

        let day = DayOfWeek::from_weekday(local.weekday());
        if !self.days_of_week.contains(&day) {
            return Ok(false);
        }

        let hour = u8::try_from(local.hour()).unwrap_or(u8::MAX);
        Ok(hour_in_wrapping_range(hour, self.start_hour, self.end_hour))
    }
}

fn hour_in_wrapping_range(hour: u8, start_hour: u8, end_hour: u8) -> bool {
    if start_hour < end_hour {
        hour >= start_hour && hour < end_hour
    } else {
        // Overnight range, e.g. 22 -> 6 covers hours 22..=23 and 0..=5.
        hour >= start_hour || hour < end_hour
    }
}

pub fn validate_time_window(window: &TimeWindow, label: &str) -> Result<()> {
    if window.start_hour > 23 {
        bail!("{label} time window start_hour {} exceeds 23", window.start_hour);
    }
    if window.end_hour > 23 {
        bail!("{label} time window end_hour {} exceeds 23", window.end_hour);
    }
    if window.start_hour == window.end_hour {
        bail!(
            "{label} time window start_hour and end_hour are both {} (empty window)",
            window.start_hour
        );
    }
    if window.days_of_week.is_empty() {
        bail!("{label} time window must include at least one day of week");
    }
    if window.timezone.parse::<Tz>().is_err() {
        bail!("{label} time window timezone '{}' is invalid", window.timezone);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overnight_window() -> TimeWindow {
        TimeWindow {
            start_hour: 22,
            end_hour: 6,
            timezone: "Asia/Tokyo".to_string(),
            days_of_week: all_days(),
        }
    }

    // 2024-01-15 is a Monday; 03:00 UTC is 12:00 in Asia/Tokyo.
    const MONDAY_NOON_TOKYO_UNIX_MS: u64 = 1_705_287_600_000;

    fn tokyo_unix_ms(hours_after_noon: i64) -> u64 {
        let offset_ms = hours_after_noon.saturating_mul(3_600_000);
        u64::try_from(MONDAY_NOON_TOKYO_UNIX_MS as i64 + offset_ms).expect("in range")
    }

    #[test]
    fn functional_overnight_window_accepts_late_night_and_early_morning() {
        let window = overnight_window();
        // 23:30 local.
        assert!(window.contains(tokyo_unix_ms(11) + 1_800_000).expect("eval"));
        // 02:00 local (next day).
        assert!(window.contains(tokyo_unix_ms(14)).expect("eval"));
        // 12:00 local.
        assert!(!window.contains(tokyo_unix_ms(0)).expect("eval"));
    }

    #[test]
    fn unit_hour_range_is_half_open() {
        let window = TimeWindow {
            start_hour: 9,
            end_hour: 17,
            timezone: "Asia/Tokyo".to_string(),
            days_of_week: all_days(),
        };
        // 09:00 local is included, 17:00 local is not.
        assert!(window.contains(tokyo_unix_ms(-3)).expect("eval"));
        assert!(!window.contains(tokyo_unix_ms(5)).expect("eval"));
    }

    #[test]
    fn unit_day_of_week_is_checked_in_the_window_timezone() {
        let window = TimeWindow {
            start_hour: 0,
            end_hour: 23,
            timezone: "Asia/Tokyo".to_string(),
            days_of_week: vec![DayOfWeek::Tue],
        };
        // Monday 23:00 UTC is already Tuesday 08:00 in Tokyo.
        let monday_late_utc = tokyo_unix_ms(11) + 3_600_000 * 9;
        assert!(window.contains(monday_late_utc).expect("eval"));
        // Monday noon Tokyo is still Monday.
        assert!(!window.contains(MONDAY_NOON_TOKYO_UNIX_MS).expect("eval"));
    }

    #[test]
    fn unit_validate_time_window_rejects_bad_bounds_and_timezone() {
        let mut window = overnight_window();
        window.start_hour = 24;
        assert!(validate_time_window(&window, "rule r-1").is_err());

        let mut window = overnight_window();
        window.end_hour = window.start_hour;
        let error = validate_time_window(&window, "rule r-1").expect_err("empty window");
        assert!(error.to_string().contains("empty window"));

        let mut window = overnight_window();
        window.timezone = "Mars/Olympus".to_string();
        assert!(validate_time_window(&window, "rule r-1").is_err());

        let mut window = overnight_window();
        window.days_of_week.clear();
        assert!(validate_time_window(&window, "rule r-1").is_err());
    }

    #[test]
    fn regression_days_of_week_default_to_all_days_when_omitted() {
        let decoded = serde_json::from_str::<TimeWindow>(
            r#"{"start_hour":22,"end_hour":6,"timezone":"Asia/Tokyo"}"#,
        )
        .expect("decode");
        assert_eq!(decoded.days_of_week.len(), 7);
    }
}
