use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};

use crate::error::{PatdError, PatdResult};

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

pub const MAX_BUSINESS_DAYS: u32 = 60;
pub const MAX_EXTRA_MINUTES: i64 = 24 * 60;

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn check_business_days(days: u32, what: &str) -> PatdResult<()> {
    if days > MAX_BUSINESS_DAYS {
        return Err(PatdError::validation(format!(
            "{what} cannot exceed {MAX_BUSINESS_DAYS} business days"
        )));
    }
    Ok(())
}

pub fn check_extra_minutes(minutes: i64) -> PatdResult<()> {
    if minutes.abs() > MAX_EXTRA_MINUTES {
        return Err(PatdError::validation(format!(
            "deadline offset must stay within {MAX_EXTRA_MINUTES} minutes"
        )));
    }
    Ok(())
}

pub fn add_business_days(start: NaiveDate, days: u32) -> PatdResult<NaiveDate> {
    check_business_days(days, "a deadline")?;
    let mut current = start;
    let mut remaining = days;
    while remaining > 0 {
        current = current
            .succ_opt()
            .ok_or_else(|| PatdError::validation(format!("no business day after {current}")))?;
        if is_business_day(current) {
            remaining -= 1;
        }
    }
    Ok(current)
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    date.and_time(last_second)
}

fn shift_minutes(at: NaiveDateTime, minutes: i64) -> PatdResult<NaiveDateTime> {
    check_extra_minutes(minutes)?;
    at.checked_add_signed(Duration::minutes(minutes))
        .ok_or_else(|| PatdError::validation(format!("deadline offset overflows {at}")))
}

/// Defense deadline: the n-th business day after notification at 23:59:59,
/// shifted by the configured minute offset.
pub fn defense_deadline(
    notified_at: NaiveDateTime,
    business_days: u32,
    extra_minutes: i64,
) -> PatdResult<NaiveDateTime> {
    let date = add_business_days(notified_at.date(), business_days)?;
    shift_minutes(end_of_day(date), extra_minutes)
}

/// Extensions count from the current deadline. The minute offset is taken
/// off first so a deadline pushed past midnight still counts from its own
/// business day.
pub fn extend_deadline(
    current: NaiveDateTime,
    business_days: u32,
    extra_minutes: i64,
) -> PatdResult<NaiveDateTime> {
    let base = shift_minutes(current, -extra_minutes)?;
    let date = add_business_days(base.date(), business_days)?;
    shift_minutes(date.and_time(base.time()), extra_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn friday_plus_one_lands_on_monday_end_of_day() {
        // 2026-10-16 is a Friday.
        let deadline = defense_deadline(at(2026, 10, 16, 14, 30), 1, 0).unwrap();
        assert_eq!(deadline, date(2026, 10, 19).and_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn minute_offset_is_applied_after_end_of_day() {
        let deadline = defense_deadline(at(2026, 10, 16, 14, 30), 1, 30).unwrap();
        assert_eq!(deadline, date(2026, 10, 20).and_hms_opt(0, 29, 59).unwrap());
    }

    #[test]
    fn five_business_days_skip_one_weekend() {
        // Monday notification, five business days later is the next Monday.
        let deadline = defense_deadline(at(2026, 10, 12, 9, 0), 5, 0).unwrap();
        assert_eq!(deadline.date(), date(2026, 10, 19));
    }

    #[test]
    fn weekend_notification_starts_counting_on_monday() {
        let deadline = defense_deadline(at(2026, 10, 17, 10, 0), 1, 0).unwrap();
        assert_eq!(deadline.date(), date(2026, 10, 19));
    }

    #[test]
    fn extension_counts_from_current_deadline() {
        let current = date(2026, 10, 19).and_hms_opt(23, 59, 59).unwrap();
        let extended = extend_deadline(current, 3, 0).unwrap();
        assert_eq!(extended, date(2026, 10, 22).and_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn zero_extension_keeps_deadline() {
        let current = date(2026, 10, 19).and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(extend_deadline(current, 0, 0).unwrap(), current);
    }

    #[test]
    fn extension_with_offset_counts_from_the_original_business_day() {
        // Friday notification, 5 days and +30 minutes: due Saturday 00:29:59.
        let notified = at(2026, 10, 9, 15, 0);
        let deadline = defense_deadline(notified, 5, 30).unwrap();
        assert_eq!(deadline, date(2026, 10, 17).and_hms_opt(0, 29, 59).unwrap());

        let extended = extend_deadline(deadline, 1, 30).unwrap();
        assert_eq!(extended, defense_deadline(notified, 6, 30).unwrap());
        assert_eq!(extended, date(2026, 10, 20).and_hms_opt(0, 29, 59).unwrap());
    }

    #[test]
    fn negative_offset_extends_within_the_same_day() {
        let deadline = defense_deadline(at(2026, 10, 12, 9, 0), 1, -60).unwrap();
        assert_eq!(deadline, date(2026, 10, 13).and_hms_opt(22, 59, 59).unwrap());
        let extended = extend_deadline(deadline, 4, -60).unwrap();
        assert_eq!(extended, date(2026, 10, 19).and_hms_opt(22, 59, 59).unwrap());
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        let notified = at(2026, 10, 9, 15, 0);
        assert!(matches!(
            defense_deadline(notified, 5, i64::MAX / 60),
            Err(PatdError::Validation(_))
        ));
        assert!(matches!(
            defense_deadline(notified, u32::MAX, 0),
            Err(PatdError::Validation(_))
        ));
        assert!(matches!(
            extend_deadline(end_of_day(notified.date()), MAX_BUSINESS_DAYS + 1, 0),
            Err(PatdError::Validation(_))
        ));
        assert!(defense_deadline(notified, MAX_BUSINESS_DAYS, MAX_EXTRA_MINUTES).is_ok());
    }

    #[test]
    fn running_off_the_calendar_is_an_error() {
        assert!(add_business_days(NaiveDate::MAX, 1).is_err());
    }
}
