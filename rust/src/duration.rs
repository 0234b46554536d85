//! Duration values and the human-readable duration grammar.
//!
//! A duration is stored as a whole number of working minutes. Text such as
//! `"1.5 dias"`, `"2 weeks"` or `"3h30m"` is converted using a [`UnitScale`],
//! which fixes how many minutes a working day holds (8 hours unless the
//! calendar says otherwise). Weeks are 5 working days and months 22.
//!
//! Grammar: `<number>\s*<unit>(\s*<number>\s*<unit>)*`, where `<number>` is
//! `\d+(\.\d+)?` or `\.\d+`. Each group is rounded half-up to the nearest
//! minute before groups are summed.

#![allow(clippy::expect_used)]

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Working hours in a day when the calendar does not override it.
pub const DEFAULT_HOURS_PER_DAY: u32 = 8;
/// Working days in a week.
pub const DAYS_PER_WEEK: u64 = 5;
/// Working days in a month.
pub const DAYS_PER_MONTH: u64 = 22;

/// Leading fraction digits used for the first rounding estimate.
const ESTIMATE_DIGITS: usize = 18;

/// One `<number><unit>` group at the start of the remaining input.
static GROUP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)?|\.[0-9]+)\s*(\p{L}+)")
        .expect("valid duration group regex (verified by tests)")
});

/// Span reported when no group matches: a run of number characters, or
/// else the next whitespace-delimited word.
static SPAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9.]+|\S+)").expect("valid duration span regex (verified by tests)")
});

/// Errors produced while parsing a duration expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty duration expression")]
    Empty,
    #[error("Invalid duration format near {0:?}")]
    InvalidFormat(String),
    #[error("Duration magnitude must not be negative")]
    NegativeMagnitude,
}

/// Unit of work accepted by the parser and used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl WorkUnit {
    /// Preference order when picking a display unit.
    pub const LARGEST_FIRST: [WorkUnit; 5] = [
        WorkUnit::Month,
        WorkUnit::Week,
        WorkUnit::Day,
        WorkUnit::Hour,
        WorkUnit::Minute,
    ];

    /// Look up a unit token. The token must already be lowercase.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "m" | "min" | "mins" | "minute" | "minutes" | "minuto" | "minutos" => {
                Some(WorkUnit::Minute)
            }
            "h" | "hr" | "hrs" | "hour" | "hours" | "hora" | "horas" => Some(WorkUnit::Hour),
            "d" | "day" | "days" | "dia" | "dias" => Some(WorkUnit::Day),
            "w" | "wk" | "wks" | "week" | "weeks" | "semana" | "semanas" => Some(WorkUnit::Week),
            "mo" | "month" | "months" | "mes" | "meses" | "mês" => Some(WorkUnit::Month),
            _ => None,
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            WorkUnit::Minute => "minute",
            WorkUnit::Hour => "hour",
            WorkUnit::Day => "day",
            WorkUnit::Week => "week",
            WorkUnit::Month => "month",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            WorkUnit::Minute => "minutes",
            WorkUnit::Hour => "hours",
            WorkUnit::Day => "days",
            WorkUnit::Week => "weeks",
            WorkUnit::Month => "months",
        }
    }

    /// Short token used by [`format_compact`].
    fn compact_token(&self) -> &'static str {
        match self {
            WorkUnit::Minute => "m",
            WorkUnit::Hour => "h",
            WorkUnit::Day => "d",
            WorkUnit::Week => "w",
            WorkUnit::Month => "mo",
        }
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

/// Minute conversion factors for each [`WorkUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitScale {
    minutes_per_day: u64,
}

impl UnitScale {
    /// Scale for a working day of `hours` hours (1 through 24).
    pub fn with_hours_per_day(hours: u32) -> Option<Self> {
        if (1..=24).contains(&hours) {
            Some(Self {
                minutes_per_day: u64::from(hours) * 60,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn minutes_per_day(&self) -> u64 {
        self.minutes_per_day
    }

    /// Number of minutes in one `unit`.
    pub fn minutes_per(&self, unit: WorkUnit) -> u64 {
        match unit {
            WorkUnit::Minute => 1,
            WorkUnit::Hour => 60,
            WorkUnit::Day => self.minutes_per_day,
            WorkUnit::Week => self.minutes_per_day * DAYS_PER_WEEK,
            WorkUnit::Month => self.minutes_per_day * DAYS_PER_MONTH,
        }
    }
}

impl Default for UnitScale {
    fn default() -> Self {
        Self {
            minutes_per_day: u64::from(DEFAULT_HOURS_PER_DAY) * 60,
        }
    }
}

/// An amount of work, in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DurationValue {
    minutes: u64,
}

impl DurationValue {
    pub const ZERO: Self = Self { minutes: 0 };

    pub const fn from_minutes(minutes: u64) -> Self {
        Self { minutes }
    }

    /// `magnitude` whole units, saturating at `u64::MAX` minutes.
    pub fn of(magnitude: u64, unit: WorkUnit, scale: &UnitScale) -> Self {
        Self {
            minutes: scale.minutes_per(unit).saturating_mul(magnitude),
        }
    }

    #[inline]
    pub const fn minutes(&self) -> u64 {
        self.minutes
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.minutes == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.minutes.checked_add(other.minutes).map(Self::from_minutes)
    }

    /// Whole working days needed to consume this much effort, rounding
    /// partial days up.
    pub fn working_days(&self, scale: &UnitScale) -> u64 {
        self.minutes.div_ceil(scale.minutes_per_day())
    }
}

impl FromStr for DurationValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(*self, None))
    }
}

/// Parse a duration expression with the default 8-hour day.
pub fn parse(text: &str) -> Result<DurationValue, ParseError> {
    parse_with(text, &UnitScale::default())
}

/// Parse a duration expression using `scale` for unit conversion.
///
/// Groups must follow each other with nothing but whitespace in between;
/// the first span that is not a group is reported as `InvalidFormat`.
pub fn parse_with(text: &str, scale: &UnitScale) -> Result<DurationValue, ParseError> {
    let mut rest = text.trim();
    if rest.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        if rest.starts_with('-') {
            return Err(ParseError::NegativeMagnitude);
        }

        let Some(group) = GROUP_REGEX.captures(rest) else {
            let span = SPAN_REGEX.find(rest).map_or(rest, |m| m.as_str());
            return Err(ParseError::InvalidFormat(span.to_string()));
        };
        let (matched, [number, token]) = group.extract();

        let unit = WorkUnit::from_token(&token.to_lowercase())
            .ok_or_else(|| ParseError::InvalidFormat(token.to_string()))?;
        let group_minutes = Magnitude::parse(number)?
            .to_minutes(scale.minutes_per(unit))
            .ok_or_else(|| ParseError::InvalidFormat(format!("{number}{token}")))?;
        total = total
            .checked_add(group_minutes)
            .ok_or_else(|| ParseError::InvalidFormat(text.trim().to_string()))?;

        rest = rest[matched.len()..].trim_start();
    }

    Ok(DurationValue::from_minutes(total))
}

/// A decimal magnitude kept as integer and fraction digits so conversion to
/// minutes is exact.
struct Magnitude<'a> {
    whole: u64,
    fraction: &'a str,
}

impl<'a> Magnitude<'a> {
    /// `number` has already matched `[0-9]+(\.[0-9]+)?|\.[0-9]+`.
    fn parse(number: &'a str) -> Result<Self, ParseError> {
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let whole = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u64>()
                .map_err(|_| ParseError::InvalidFormat(number.to_string()))?
        };
        Ok(Self { whole, fraction })
    }

    /// `self × factor`, rounded half-up. `None` on overflow.
    fn to_minutes(&self, factor: u64) -> Option<u64> {
        self.whole
            .checked_mul(factor)?
            .checked_add(round_fraction(self.fraction, factor))
    }
}

/// `0.<digits> × factor` rounded half-up, exact for any number of digits.
fn round_fraction(digits: &str, factor: u64) -> u64 {
    if digits.is_empty() {
        return 0;
    }

    // Floor of the truncated value; the exact product is never smaller
    let prefix = &digits[..digits.len().min(ESTIMATE_DIGITS)];
    let numerator = prefix.parse::<u128>().unwrap_or(0) * u128::from(factor);
    let mut minutes = (numerator / 10u128.pow(prefix.len() as u32)) as u64;

    let denominator = 2 * u128::from(factor);
    while fraction_at_least(digits, 2 * u128::from(minutes) + 1, denominator) {
        minutes += 1;
    }
    minutes
}

/// Whether `0.<digits>` is at least `numerator / denominator`.
///
/// Compares digit by digit against the long division of the bound, so no
/// intermediate value grows with the number of digits.
fn fraction_at_least(digits: &str, numerator: u128, denominator: u128) -> bool {
    if numerator >= denominator {
        return false;
    }

    let mut remainder = numerator;
    for digit in digits.bytes().map(|b| u128::from(b - b'0')) {
        if remainder == 0 {
            return true;
        }
        let scaled = remainder * 10;
        let bound_digit = scaled / denominator;
        if digit != bound_digit {
            return digit > bound_digit;
        }
        remainder = scaled % denominator;
    }
    remainder == 0
}

/// Format with the default 8-hour day.
pub fn format(value: DurationValue, target: Option<WorkUnit>) -> String {
    format_with(value, target, &UnitScale::default())
}

/// Render `value` for display.
///
/// Without a target unit, picks the largest unit whose magnitude is at least
/// one and can be written exactly with a single decimal place, so the output
/// always parses back to the same number of minutes. With a target unit, the
/// magnitude is rounded half-up to one decimal place.
pub fn format_with(value: DurationValue, target: Option<WorkUnit>, scale: &UnitScale) -> String {
    let minutes = u128::from(value.minutes());
    match target {
        Some(unit) => {
            let factor = u128::from(scale.minutes_per(unit));
            let tenths = (minutes * 20 + factor) / (factor * 2);
            render(tenths, unit)
        }
        None if minutes == 0 => render(0, WorkUnit::Minute),
        None => {
            let unit = WorkUnit::LARGEST_FIRST
                .iter()
                .copied()
                .find(|&unit| {
                    let factor = u128::from(scale.minutes_per(unit));
                    minutes >= factor && (minutes * 10) % factor == 0
                })
                .unwrap_or(WorkUnit::Minute);
            let factor = u128::from(scale.minutes_per(unit));
            render(minutes * 10 / factor, unit)
        }
    }
}

fn render(tenths: u128, unit: WorkUnit) -> String {
    let whole = tenths / 10;
    let fraction = tenths % 10;
    let label = if tenths == 10 {
        unit.singular()
    } else {
        unit.plural()
    };
    if fraction == 0 {
        format!("{whole} {label}")
    } else {
        format!("{whole}.{fraction} {label}")
    }
}

/// Lossless multi-unit rendering such as `"1w2d"` or `"3h30m"`.
///
/// Months are never used, so the result is independent of how months are
/// counted and always parses back to the same minute count.
pub fn format_compact(value: DurationValue, scale: &UnitScale) -> String {
    if value.is_zero() {
        return "0m".to_string();
    }

    let mut remaining = value.minutes();
    let mut out = String::new();
    for unit in [WorkUnit::Week, WorkUnit::Day, WorkUnit::Hour, WorkUnit::Minute] {
        let factor = scale.minutes_per(unit);
        let count = remaining / factor;
        if count > 0 {
            out.push_str(&count.to_string());
            out.push_str(unit.compact_token());
            remaining %= factor;
        }
    }
    out
}
