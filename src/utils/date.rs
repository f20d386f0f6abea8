//! Relative, human-readable timestamps for the history list.

use std::fmt::Display;

use chrono::{DateTime, Datelike, Days, Local, TimeZone, Utc};

/// Format `date` relative to `now`, both interpreted in `now`'s timezone.
///
/// Rules, first match wins:
/// 1. same calendar day: `Today 3:05 PM`
/// 2. previous calendar day: `Yesterday 3:05 PM`
/// 3. later than `now - 7 days`: `Tuesday 3:05 PM`
/// 4. otherwise `Mar 4`, or `Mar 4, 2023` when the year differs from `now`
pub fn format_relative<Tz>(date: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let date = date.with_timezone(&now.timezone());
    let today = now.date_naive();

    if date.date_naive() == today {
        return format!("Today {}", format_time(&date));
    }

    if today.pred_opt() == Some(date.date_naive()) {
        return format!("Yesterday {}", format_time(&date));
    }

    let within_week = now
        .clone()
        .checked_sub_days(Days::new(7))
        .map_or(true, |week_ago| date > week_ago);
    if within_week {
        return format!("{} {}", date.format("%A"), format_time(&date));
    }

    if date.year() != now.year() {
        date.format("%b %-d, %Y").to_string()
    } else {
        date.format("%b %-d").to_string()
    }
}

/// Format epoch milliseconds in the local timezone relative to `now`.
///
/// Out-of-range timestamps render as an empty string.
pub fn format_timestamp_ms(timestamp_ms: i64, now: &DateTime<Local>) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(date) => format_relative(&date.with_timezone(&Local), now),
        None => String::new(),
    }
}

/// Current time truncated to the millisecond precision measurements are stored with.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}

fn format_time<Tz>(date: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    date.format("%-I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn reference() -> DateTime<Utc> {
        // Friday
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn same_day_is_today() {
        let now = reference();
        assert_eq!(format_relative(&now, &now), "Today 2:30 PM");
    }

    #[test]
    fn previous_day_is_yesterday() {
        let now = reference();
        let date = now - Duration::days(1);
        assert_eq!(format_relative(&date, &now), "Yesterday 2:30 PM");
    }

    #[test]
    fn yesterday_late_evening_just_after_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 30, 0).unwrap();
        let date = Utc.with_ymd_and_hms(2024, 3, 14, 23, 59, 0).unwrap();
        assert_eq!(format_relative(&date, &now), "Yesterday 11:59 PM");
    }

    #[test]
    fn same_week_uses_weekday_name() {
        let now = reference();
        let date = now - Duration::days(3);
        assert_eq!(format_relative(&date, &now), "Tuesday 2:30 PM");
    }

    #[test]
    fn exactly_seven_days_is_not_within_week() {
        let now = reference();
        let date = now - Duration::days(7);
        assert_eq!(format_relative(&date, &now), "Mar 8");
    }

    #[test]
    fn older_dates_use_month_and_day() {
        let now = reference();
        let date = now - Duration::days(40);
        assert_eq!(format_relative(&date, &now), "Feb 4");
    }

    #[test]
    fn different_year_appends_year() {
        let now = reference();
        let date = Utc.with_ymd_and_hms(2023, 12, 1, 9, 5, 0).unwrap();
        assert_eq!(format_relative(&date, &now), "Dec 1, 2023");
    }

    #[test]
    fn morning_times_use_am() {
        let now = reference();
        let date = Utc.with_ymd_and_hms(2024, 3, 15, 9, 5, 0).unwrap();
        assert_eq!(format_relative(&date, &now), "Today 9:05 AM");
    }

    #[test]
    fn calendar_day_follows_reference_timezone() {
        let tz = FixedOffset::east_opt(10 * 3600).unwrap();
        // 2024-03-15 23:00 UTC is already the 16th in UTC+10.
        let now = Utc
            .with_ymd_and_hms(2024, 3, 16, 1, 0, 0)
            .unwrap()
            .with_timezone(&tz);
        let date = Utc
            .with_ymd_and_hms(2024, 3, 15, 23, 0, 0)
            .unwrap()
            .with_timezone(&tz);
        assert_eq!(format_relative(&date, &now), "Today 9:00 AM");
    }

    #[test]
    fn now_millis_has_no_sub_millisecond_part() {
        assert_eq!(now_millis().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn millisecond_entry_point_handles_out_of_range() {
        let now = Local::now();
        assert!(format_timestamp_ms(i64::MAX, &now).is_empty());
        assert!(format_timestamp_ms(now.timestamp_millis(), &now).starts_with("Today "));
    }
}
