use chrono::{Days, NaiveDateTime, NaiveTime};
use std::time::Duration;

/// Next occurrence of `at`, strictly after `now`
/// If today's slot has already been reached, tomorrow's is returned
pub fn next_daily_run(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if now < today {
        today
    } else {
        // Start is tomorrow
        match now.date().checked_add_days(Days::new(1)) {
            Some(tomorrow) => tomorrow.and_time(at),
            None => today,
        }
    }
}

/// Time to sleep until the next occurrence of `at`
pub fn duration_until_next_daily_run(now: NaiveDateTime, at: NaiveTime) -> Duration {
    (next_daily_run(now, at) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Whole seconds until the coming midnight (86400 exactly at midnight)
pub fn seconds_until_midnight(now: NaiveDateTime) -> u64 {
    duration_until_next_daily_run(now, NaiveTime::MIN).as_secs()
}

/// Build a time of day, falling back to midnight for out-of-range input
pub fn time_of_day(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_next_daily_run_later_today() {
        let next = next_daily_run(at(1, 0, 0), time_of_day(3, 0));
        assert_eq!(next, at(3, 0, 0));
        assert_eq!(
            duration_until_next_daily_run(at(1, 0, 0), time_of_day(3, 0)),
            Duration::from_secs(2 * 3600)
        );
    }

    #[test]
    fn test_next_daily_run_rolls_over() {
        // Exactly at the slot counts as already passed
        let next = next_daily_run(at(3, 0, 0), time_of_day(3, 0));
        assert_eq!(next, at(3, 0, 0) + chrono::Duration::days(1));

        let next = next_daily_run(at(22, 30, 0), time_of_day(3, 0));
        assert_eq!(
            next,
            NaiveDate::from_ymd_opt(2026, 10, 16)
                .unwrap()
                .and_hms_opt(3, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_seconds_until_midnight() {
        assert_eq!(seconds_until_midnight(at(23, 50, 0)), 600);
        assert_eq!(seconds_until_midnight(at(23, 59, 59)), 1);
        assert_eq!(seconds_until_midnight(at(0, 0, 0)), 86400);
        assert_eq!(seconds_until_midnight(at(12, 0, 0)), 12 * 3600);
    }

    #[test]
    fn test_time_of_day_out_of_range() {
        assert_eq!(time_of_day(25, 0), NaiveTime::MIN);
        assert_eq!(time_of_day(23, 50), NaiveTime::from_hms_opt(23, 50, 0).unwrap());
    }
}
