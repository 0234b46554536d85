//! Business calendar: working days, holidays and working-day arithmetic.
//!
//! All arithmetic is in calendar days. A [`CalendarConfig`] is validated once
//! at construction and never changes afterwards; [`BusinessCalendar`] shares
//! it behind an `Arc` so a single calendar can serve many threads.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use thiserror::Error;

use crate::duration::{DurationValue, UnitScale, DEFAULT_HOURS_PER_DAY};

/// Format accepted for holiday strings.
pub const HOLIDAY_DATE_FORMAT: &str = "%Y-%m-%d";
/// Timezone label used by [`CalendarConfig::default`].
pub const DEFAULT_TIMEZONE: &str = "UTC";
/// Saturday and Sunday, as Monday-based weekday indices.
pub const DEFAULT_NON_WORKING_WEEKDAYS: [u8; 2] = [5, 6];

/// Errors raised while building a [`CalendarConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarConfigError {
    #[error("Malformed holiday date {0:?} (expected YYYY-MM-DD)")]
    MalformedHoliday(String),
    #[error("Invalid weekday index {0} (expected 0=Monday through 6=Sunday)")]
    InvalidWeekday(u8),
    #[error("Calendar has no working weekdays")]
    NoWorkingDays,
    #[error("Invalid hours per day {0} (expected 1 through 24)")]
    InvalidHoursPerDay(u32),
    #[error("Timezone identifier must not be empty")]
    EmptyTimezone,
}

/// Errors raised by calendar queries.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Date arithmetic left the supported calendar range")]
    DateOutOfRange,
}

/// Immutable calendar rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConfig {
    timezone: String,
    holidays: BTreeSet<NaiveDate>,
    /// Indexed by `Weekday::num_days_from_monday`.
    non_working: [bool; 7],
    hours_per_day: u32,
}

impl CalendarConfig {
    /// Build a calendar from already-parsed holidays and weekday indices
    /// (0 = Monday … 6 = Sunday). The weekday set is taken literally: an empty
    /// set means every weekday is a working day.
    pub fn new(
        timezone: impl Into<String>,
        holidays: impl IntoIterator<Item = NaiveDate>,
        non_working_weekdays: impl IntoIterator<Item = u8>,
    ) -> Result<Self, CalendarConfigError> {
        let timezone = timezone.into();
        if timezone.trim().is_empty() {
            return Err(CalendarConfigError::EmptyTimezone);
        }

        let mut non_working = [false; 7];
        for index in non_working_weekdays {
            let slot = non_working
                .get_mut(usize::from(index))
                .ok_or(CalendarConfigError::InvalidWeekday(index))?;
            *slot = true;
        }
        if non_working.iter().all(|&closed| closed) {
            return Err(CalendarConfigError::NoWorkingDays);
        }

        Ok(Self {
            timezone,
            holidays: holidays.into_iter().collect(),
            non_working,
            hours_per_day: DEFAULT_HOURS_PER_DAY,
        })
    }

    /// Build a calendar from `YYYY-MM-DD` holiday strings.
    pub fn from_strings<I, S>(
        timezone: impl Into<String>,
        holidays: I,
        non_working_weekdays: impl IntoIterator<Item = u8>,
    ) -> Result<Self, CalendarConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = holidays
            .into_iter()
            .map(|raw| {
                let raw = raw.as_ref();
                NaiveDate::parse_from_str(raw.trim(), HOLIDAY_DATE_FORMAT)
                    .map_err(|_| CalendarConfigError::MalformedHoliday(raw.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(timezone, parsed, non_working_weekdays)
    }

    /// Override the length of a working day used for unit conversion.
    pub fn with_hours_per_day(mut self, hours: u32) -> Result<Self, CalendarConfigError> {
        if UnitScale::with_hours_per_day(hours).is_none() {
            return Err(CalendarConfigError::InvalidHoursPerDay(hours));
        }
        self.hours_per_day = hours;
        Ok(self)
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// Holidays in ascending order.
    pub fn holidays(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.holidays.iter().copied()
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_non_working_weekday(&self, weekday: Weekday) -> bool {
        self.non_working[weekday.num_days_from_monday() as usize]
    }

    /// Monday-based indices of the non-working weekdays.
    pub fn non_working_weekdays(&self) -> Vec<u8> {
        (0u8..7)
            .filter(|&index| self.non_working[usize::from(index)])
            .collect()
    }

    pub fn hours_per_day(&self) -> u32 {
        self.hours_per_day
    }

    pub fn unit_scale(&self) -> UnitScale {
        UnitScale::with_hours_per_day(self.hours_per_day).unwrap_or_default()
    }

    /// Weekdays that are working days in an ordinary week (1 through 7).
    pub fn working_weekdays_per_week(&self) -> u64 {
        self.non_working.iter().filter(|&&closed| !closed).count() as u64
    }

    /// Holidays within `range` that fall on an otherwise working weekday.
    fn working_holidays_in(&self, range: (Bound<NaiveDate>, Bound<NaiveDate>)) -> u64 {
        self.holidays
            .range(range)
            .filter(|date| !self.is_non_working_weekday(date.weekday()))
            .count() as u64
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        let mut non_working = [false; 7];
        for index in DEFAULT_NON_WORKING_WEEKDAYS {
            non_working[usize::from(index)] = true;
        }
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            holidays: BTreeSet::new(),
            non_working,
            hours_per_day: DEFAULT_HOURS_PER_DAY,
        }
    }
}

/// Working-day queries over a shared [`CalendarConfig`].
#[derive(Debug, Clone, Default)]
pub struct BusinessCalendar {
    config: Arc<CalendarConfig>,
}

impl BusinessCalendar {
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn from_shared(config: Arc<CalendarConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    pub fn unit_scale(&self) -> UnitScale {
        self.config.unit_scale()
    }

    /// False on non-working weekdays and holidays.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.config.is_non_working_weekday(date.weekday()) && !self.config.is_holiday(date)
    }

    /// Move `n` working days away from `start`.
    ///
    /// `n == 0` returns `start` unchanged even when it is not a working day;
    /// use [`next_working_day`](Self::next_working_day) first when snapping is
    /// wanted. Negative `n` walks backward.
    pub fn add_working_days(&self, start: NaiveDate, n: i64) -> Result<NaiveDate, CalendarError> {
        match n.cmp(&0) {
            Ordering::Equal => Ok(start),
            Ordering::Greater => self.walk_forward(start, n.unsigned_abs()),
            Ordering::Less => self.walk_backward(start, n.unsigned_abs()),
        }
    }

    /// Smallest working day on or after `date`.
    pub fn next_working_day(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let mut current = date;
        while !self.is_working_day(current) {
            current = current.succ_opt().ok_or(CalendarError::DateOutOfRange)?;
        }
        Ok(current)
    }

    /// Greatest working day on or before `date`.
    pub fn previous_working_day(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let mut current = date;
        while !self.is_working_day(current) {
            current = current.pred_opt().ok_or(CalendarError::DateOutOfRange)?;
        }
        Ok(current)
    }

    /// Working days in `[start, end)`; zero when `end <= start`.
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end <= start {
            return 0;
        }

        let span_days = (end - start).num_days();
        let weeks = span_days / 7;
        let per_week = self.config.working_weekdays_per_week() as i64;
        let mut count = weeks * per_week;

        // At most six leftover days after the whole weeks
        let mut day = start
            .checked_add_days(Days::new((weeks * 7) as u64))
            .unwrap_or(end);
        while day < end {
            if !self.config.is_non_working_weekday(day.weekday()) {
                count += 1;
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        let holidays = self
            .config
            .working_holidays_in((Bound::Included(start), Bound::Excluded(end)));
        count - holidays as i64
    }

    /// Whole working days needed for `duration`, partial days rounded up.
    pub fn working_days_for(&self, duration: DurationValue) -> i64 {
        i64::try_from(duration.working_days(&self.unit_scale())).unwrap_or(i64::MAX)
    }

    fn walk_forward(&self, start: NaiveDate, count: u64) -> Result<NaiveDate, CalendarError> {
        let per_week = self.config.working_weekdays_per_week();
        let mut current = start;
        let mut remaining = count;

        // Jump whole weeks, leaving at least one day for the exact walk
        let weeks = (remaining - 1) / per_week;
        if weeks > 0 {
            let span = weeks.checked_mul(7).ok_or(CalendarError::DateOutOfRange)?;
            let jumped = current
                .checked_add_days(Days::new(span))
                .ok_or(CalendarError::DateOutOfRange)?;
            let skipped_holidays = self
                .config
                .working_holidays_in((Bound::Excluded(current), Bound::Included(jumped)));
            remaining = remaining - weeks * per_week + skipped_holidays;
            current = jumped;
        }

        while remaining > 0 {
            current = current.succ_opt().ok_or(CalendarError::DateOutOfRange)?;
            if self.is_working_day(current) {
                remaining -= 1;
            }
        }
        Ok(current)
    }

    fn walk_backward(&self, start: NaiveDate, count: u64) -> Result<NaiveDate, CalendarError> {
        let per_week = self.config.working_weekdays_per_week();
        let mut current = start;
        let mut remaining = count;

        let weeks = (remaining - 1) / per_week;
        if weeks > 0 {
            let span = weeks.checked_mul(7).ok_or(CalendarError::DateOutOfRange)?;
            let jumped = current
                .checked_sub_days(Days::new(span))
                .ok_or(CalendarError::DateOutOfRange)?;
            let skipped_holidays = self
                .config
                .working_holidays_in((Bound::Included(jumped), Bound::Excluded(current)));
            remaining = remaining - weeks * per_week + skipped_holidays;
            current = jumped;
        }

        while remaining > 0 {
            current = current.pred_opt().ok_or(CalendarError::DateOutOfRange)?;
            if self.is_working_day(current) {
                remaining -= 1;
            }
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn with_holidays(holidays: &[NaiveDate]) -> BusinessCalendar {
        BusinessCalendar::new(
            CalendarConfig::new("UTC", holidays.iter().copied(), DEFAULT_NON_WORKING_WEEKDAYS)
                .unwrap(),
        )
    }

    /// Day-by-day reference walk.
    fn naive_add(calendar: &BusinessCalendar, start: NaiveDate, n: i64) -> NaiveDate {
        let mut current = start;
        let mut remaining = n.abs();
        while remaining > 0 {
            current = if n > 0 {
                current.succ_opt().unwrap()
            } else {
                current.pred_opt().unwrap()
            };
            if calendar.is_working_day(current) {
                remaining -= 1;
            }
        }
        current
    }

    #[test]
    fn test_default_weekend() {
        let calendar = BusinessCalendar::default();
        assert!(calendar.is_working_day(make_date(2025, 1, 6))); // Monday
        assert!(calendar.is_working_day(make_date(2025, 1, 10))); // Friday
        assert!(!calendar.is_working_day(make_date(2025, 1, 11))); // Saturday
        assert!(!calendar.is_working_day(make_date(2025, 1, 12))); // Sunday
    }

    #[test]
    fn test_holiday_is_not_working() {
        let calendar = with_holidays(&[make_date(2025, 1, 1)]);
        assert!(!calendar.is_working_day(make_date(2025, 1, 1)));
        assert!(calendar.is_working_day(make_date(2025, 1, 2)));
    }

    #[test]
    fn test_friday_plus_one_is_monday() {
        let calendar = BusinessCalendar::default();
        let friday = make_date(2025, 1, 10);
        assert_eq!(
            calendar.add_working_days(friday, 1).unwrap(),
            make_date(2025, 1, 13)
        );
    }

    #[test]
    fn test_friday_plus_one_skips_monday_holiday() {
        let calendar = with_holidays(&[make_date(2025, 1, 13)]);
        let friday = make_date(2025, 1, 10);
        assert_eq!(
            calendar.add_working_days(friday, 1).unwrap(),
            make_date(2025, 1, 14)
        );
    }

    #[test]
    fn test_add_zero_does_not_snap() {
        let calendar = BusinessCalendar::default();
        let saturday = make_date(2025, 1, 11);
        assert_eq!(calendar.add_working_days(saturday, 0).unwrap(), saturday);
    }

    #[test]
    fn test_add_from_weekend() {
        let calendar = BusinessCalendar::default();
        let saturday = make_date(2025, 1, 11);
        assert_eq!(
            calendar.add_working_days(saturday, 1).unwrap(),
            make_date(2025, 1, 13)
        );
    }

    #[test]
    fn test_negative_walks_backward() {
        let calendar = BusinessCalendar::default();
        let monday = make_date(2025, 1, 13);
        assert_eq!(
            calendar.add_working_days(monday, -1).unwrap(),
            make_date(2025, 1, 10)
        );
        assert_eq!(
            calendar.add_working_days(monday, -5).unwrap(),
            make_date(2025, 1, 6)
        );
    }

    #[test]
    fn test_seven_day_week() {
        let config =
            CalendarConfig::new("UTC", Vec::<NaiveDate>::new(), Vec::<u8>::new()).unwrap();
        let calendar = BusinessCalendar::new(config);
        let start = make_date(2025, 1, 10);
        assert_eq!(
            calendar.add_working_days(start, 10).unwrap(),
            make_date(2025, 1, 20)
        );
        assert_eq!(calendar.working_days_between(start, make_date(2025, 1, 20)), 10);
    }

    #[test]
    fn test_next_working_day() {
        let calendar = with_holidays(&[make_date(2025, 1, 13)]);
        let saturday = make_date(2025, 1, 11);
        let next = calendar.next_working_day(saturday).unwrap();
        assert_eq!(next, make_date(2025, 1, 14));
        assert_eq!(calendar.next_working_day(next).unwrap(), next);

        let wednesday = make_date(2025, 1, 8);
        assert_eq!(calendar.next_working_day(wednesday).unwrap(), wednesday);
    }

    #[test]
    fn test_previous_working_day() {
        let calendar = BusinessCalendar::default();
        assert_eq!(
            calendar.previous_working_day(make_date(2025, 1, 12)).unwrap(),
            make_date(2025, 1, 10)
        );
    }

    #[test]
    fn test_working_days_between() {
        let calendar = with_holidays(&[make_date(2025, 1, 8)]);
        let monday = make_date(2025, 1, 6);
        assert_eq!(calendar.working_days_between(monday, monday), 0);
        assert_eq!(calendar.working_days_between(monday, make_date(2025, 1, 1)), 0);
        // Mon, Tue, (Wed holiday), Thu, Fri
        assert_eq!(calendar.working_days_between(monday, make_date(2025, 1, 13)), 4);
        assert_eq!(calendar.working_days_between(monday, make_date(2025, 1, 20)), 9);
    }

    #[test]
    fn test_working_days_for_rounds_up() {
        let calendar = BusinessCalendar::default();
        assert_eq!(calendar.working_days_for(DurationValue::ZERO), 0);
        assert_eq!(calendar.working_days_for(DurationValue::from_minutes(30)), 1);
        assert_eq!(calendar.working_days_for(DurationValue::from_minutes(960)), 2);
    }

    #[test]
    fn test_config_from_strings() {
        let holidays = ["2025-01-01", " 2025-12-25 "];
        let config = CalendarConfig::from_strings("America/Sao_Paulo", holidays, [5, 6]).unwrap();
        assert_eq!(config.timezone(), "America/Sao_Paulo");
        assert_eq!(
            config.holidays().collect::<Vec<_>>(),
            vec![make_date(2025, 1, 1), make_date(2025, 12, 25)]
        );
        assert_eq!(config.non_working_weekdays(), vec![5, 6]);
    }

    #[test]
    fn test_config_errors() {
        assert_eq!(
            CalendarConfig::from_strings("UTC", ["2025-13-01"], [5, 6]),
            Err(CalendarConfigError::MalformedHoliday("2025-13-01".to_string()))
        );
        assert_eq!(
            CalendarConfig::new("UTC", Vec::<NaiveDate>::new(), [7]),
            Err(CalendarConfigError::InvalidWeekday(7))
        );
        assert_eq!(
            CalendarConfig::new("UTC", Vec::<NaiveDate>::new(), 0..7),
            Err(CalendarConfigError::NoWorkingDays)
        );
        assert_eq!(
            CalendarConfig::new(" ", Vec::<NaiveDate>::new(), [5, 6]),
            Err(CalendarConfigError::EmptyTimezone)
        );
        assert_eq!(
            CalendarConfig::default().with_hours_per_day(0),
            Err(CalendarConfigError::InvalidHoursPerDay(0))
        );
    }

    #[test]
    fn test_hours_per_day_changes_unit_scale() {
        let config = CalendarConfig::default().with_hours_per_day(6).unwrap();
        let calendar = BusinessCalendar::new(config);
        assert_eq!(calendar.unit_scale().minutes_per_day(), 360);
        assert_eq!(calendar.working_days_for(DurationValue::from_minutes(480)), 2);
    }

    #[test]
    fn test_date_out_of_range() {
        let calendar = BusinessCalendar::default();
        assert_eq!(
            calendar.add_working_days(NaiveDate::MAX, 1),
            Err(CalendarError::DateOutOfRange)
        );
    }

    fn offset_date(days: u64) -> NaiveDate {
        make_date(2024, 1, 1).checked_add_days(Days::new(days)).unwrap()
    }

    /// Calendars with up to 60 holidays over three years and any non-working
    /// weekday set that leaves at least one working weekday.
    fn arb_calendar() -> impl Strategy<Value = BusinessCalendar> {
        (
            prop::collection::btree_set(0u64..1100, 0..60),
            prop::collection::btree_set(0u8..7, 0..7),
        )
            .prop_map(|(holiday_offsets, weekdays)| {
                let holidays = holiday_offsets.into_iter().map(offset_date);
                BusinessCalendar::new(CalendarConfig::new("UTC", holidays, weekdays).unwrap())
            })
    }

    proptest! {
        #[test]
        fn prop_next_working_day_is_idempotent(
            calendar in arb_calendar(),
            offset in 0u64..1100,
        ) {
            let date = offset_date(offset);
            let once = calendar.next_working_day(date).unwrap();
            prop_assert!(calendar.is_working_day(once));
            prop_assert_eq!(calendar.next_working_day(once).unwrap(), once);

            // Nothing between `date` and `once` was a working day
            let mut day = date;
            while day < once {
                prop_assert!(!calendar.is_working_day(day));
                day = day.succ_opt().unwrap();
            }
        }

        #[test]
        fn prop_add_working_days_matches_day_by_day_walk(
            calendar in arb_calendar(),
            offset in 0u64..1100,
            n in -400i64..=400,
        ) {
            let start = offset_date(offset);
            prop_assert_eq!(
                calendar.add_working_days(start, n).unwrap(),
                naive_add(&calendar, start, n),
                "start={} n={}", start, n
            );
        }

        #[test]
        fn prop_working_days_between_inverts_add(
            calendar in arb_calendar(),
            offset in 0u64..1100,
            n in 0i64..=300,
        ) {
            let start = calendar.next_working_day(offset_date(offset)).unwrap();
            let end = calendar.add_working_days(start, n).unwrap();
            prop_assert_eq!(calendar.working_days_between(start, end), n);
        }
    }
}
