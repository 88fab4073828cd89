//! Date helpers for partitioning and labelling races.
//!
//! Dates arrive from the phone as ISO-like strings. They are parsed with
//! fixed-width digit reads (no locale or timezone handling) and compared by
//! day count since 1970-01-01.

use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::types::{Race, RaceSection};

/// Minimum output capacity for [`format_date_into`]
pub const DATE_LABEL_MIN: usize = 15;
/// Minimum output capacity for [`format_date_time_into`]
pub const DATETIME_LABEL_MIN: usize = 20;

const SECONDS_PER_DAY: u64 = 86_400;
const DAYS_BEFORE_MONTH: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const MONTH_ABBR: [&str; 12] =
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// Why a date string did not match the fixed-width layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("date text too short: {len} bytes, need {needed}")]
    TooShort { len: usize, needed: usize },

    #[error("unexpected byte {found:#04x} at position {position}")]
    UnexpectedByte { position: usize, found: u8 },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u32 },
}

/// Calendar date parsed from `YYYY-MM-DD`
///
/// Only built through [`IsoDate::new`] or [`IsoDate::parse`], so the month
/// and day are always valid for the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IsoDate {
    year: u32,
    month: u32,
    day: u32,
}

/// Date and time of day parsed from `YYYY-MM-DDTHH:MM`
///
/// Seconds and any zone suffix are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IsoDateTime {
    date: IsoDate,
    hour: u32,
    minute: u32,
}

/// Where a date falls relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrdering {
    Past,
    Present,
    Future,
}

impl DateOrdering {
    /// Upcoming means today or later
    pub fn is_upcoming(self) -> bool {
        !matches!(self, DateOrdering::Past)
    }
}

fn read_digits(bytes: &[u8], start: usize, width: usize) -> Result<u32, DateParseError> {
    let mut value = 0u32;
    for position in start..start + width {
        let found = bytes[position];
        if !found.is_ascii_digit() {
            return Err(DateParseError::UnexpectedByte { position, found });
        }
        value = value * 10 + u32::from(found - b'0');
    }
    Ok(value)
}

fn expect_byte(bytes: &[u8], position: usize, allowed: &[u8]) -> Result<(), DateParseError> {
    let found = bytes[position];
    if allowed.contains(&found) {
        Ok(())
    } else {
        Err(DateParseError::UnexpectedByte { position, found })
    }
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<u32, DateParseError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(DateParseError::OutOfRange { field, value })
    }
}

/// Gregorian leap year
pub fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Days in `month` (1..=12) of `year`, 0 for an invalid month
pub fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn leap_days_before(year: i64) -> i64 {
    let y = year - 1;
    y / 4 - y / 100 + y / 400
}

impl IsoDate {
    /// Validated calendar date
    pub fn new(year: u32, month: u32, day: u32) -> Result<Self, DateParseError> {
        let month = check_range("month", month, 1, 12)?;
        let day = check_range("day", day, 1, days_in_month(year, month))?;
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Parse the leading `YYYY-MM-DD` of `text`; trailing bytes are ignored
    pub fn parse(text: &str) -> Result<Self, DateParseError> {
        let bytes = text.as_bytes();
        if bytes.len() < 10 {
            return Err(DateParseError::TooShort { len: bytes.len(), needed: 10 });
        }

        let year = read_digits(bytes, 0, 4)?;
        expect_byte(bytes, 4, b"-")?;
        let month = read_digits(bytes, 5, 2)?;
        expect_byte(bytes, 7, b"-")?;
        let day = read_digits(bytes, 8, 2)?;

        Self::new(year, month, day)
    }

    /// Days since 1970-01-01 (negative before the epoch)
    pub fn days_since_epoch(&self) -> i64 {
        let year = i64::from(self.year);
        let mut days = (year - 1970) * 365 + leap_days_before(year) - leap_days_before(1970);
        days += (self.month as usize)
            .checked_sub(1)
            .and_then(|index| DAYS_BEFORE_MONTH.get(index))
            .copied()
            .unwrap_or(0);
        if self.month > 2 && is_leap_year(self.year) {
            days += 1;
        }
        days + i64::from(self.day) - 1
    }
}

impl IsoDateTime {
    pub fn date(&self) -> IsoDate {
        self.date
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Parse the leading `YYYY-MM-DDTHH:MM` of `text` (a space may replace `T`)
    pub fn parse(text: &str) -> Result<Self, DateParseError> {
        let bytes = text.as_bytes();
        if bytes.len() < 16 {
            return Err(DateParseError::TooShort { len: bytes.len(), needed: 16 });
        }

        let date = IsoDate::parse(text)?;
        expect_byte(bytes, 10, b"T ")?;
        let hour = check_range("hour", read_digits(bytes, 11, 2)?, 0, 23)?;
        expect_byte(bytes, 13, b":")?;
        let minute = check_range("minute", read_digits(bytes, 14, 2)?, 0, 59)?;

        Ok(Self { date, hour, minute })
    }
}

/// Three-letter month abbreviation, `"???"` outside 1..=12
pub fn month_abbr(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_ABBR[month as usize - 1],
        _ => "???",
    }
}

/// Current day count since 1970-01-01 from the wall clock
pub fn today() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| (elapsed.as_secs() / SECONDS_PER_DAY) as i64)
        .unwrap_or(0)
}

/// Compare an ISO date against a given day count
pub fn compare_date_to(iso_date: &str, today: i64) -> Result<DateOrdering, DateParseError> {
    let days = IsoDate::parse(iso_date)?.days_since_epoch();
    Ok(match days.cmp(&today) {
        std::cmp::Ordering::Less => DateOrdering::Past,
        std::cmp::Ordering::Equal => DateOrdering::Present,
        std::cmp::Ordering::Greater => DateOrdering::Future,
    })
}

/// Compare an ISO date against today's date
pub fn compare_date_to_now(iso_date: &str) -> Result<DateOrdering, DateParseError> {
    compare_date_to(iso_date, today())
}

/// Calendar section for a race date
///
/// Dates that do not parse are treated as upcoming.
pub fn section_for(iso_date: &str, today: i64) -> RaceSection {
    match compare_date_to(iso_date, today) {
        Ok(ordering) if !ordering.is_upcoming() => RaceSection::Previous,
        _ => RaceSection::Upcoming,
    }
}

/// Split races into (upcoming, previous) in one pass, keeping input order
pub fn partition_races<'a, I>(races: I, today: i64) -> (Vec<&'a Race>, Vec<&'a Race>)
where
    I: IntoIterator<Item = &'a Race>,
{
    races.into_iter().partition(|race| section_for(&race.date, today) == RaceSection::Upcoming)
}

/// Write `"Mar 14, 2025"` for `"2025-03-14"` into `out`
///
/// Returns `false` without touching `out` when its capacity is below
/// [`DATE_LABEL_MIN`] or the date does not parse.
pub fn format_date_into<const N: usize>(iso_date: &str, out: &mut heapless::String<N>) -> bool {
    if N < DATE_LABEL_MIN {
        return false;
    }
    match format_date(iso_date) {
        Some(label) => {
            out.clear();
            out.push_str(&label).is_ok()
        }
        None => false,
    }
}

/// Format `"2025-03-14"` as `"Mar 14, 2025"`
pub fn format_date(iso_date: &str) -> Option<heapless::String<DATE_LABEL_MIN>> {
    let date = IsoDate::parse(iso_date).ok()?;
    let mut label = heapless::String::new();
    write!(label, "{} {}, {:04}", month_abbr(date.month()), date.day(), date.year()).ok()?;
    Some(label)
}

/// Write `"Mar 14, 1:30 AM"` for `"2025-03-14T01:30:00Z"` into `out`
///
/// Returns `false` without touching `out` when its capacity is below
/// [`DATETIME_LABEL_MIN`] or the date-time does not parse.
pub fn format_date_time_into<const N: usize>(
    iso_datetime: &str,
    out: &mut heapless::String<N>,
) -> bool {
    if N < DATETIME_LABEL_MIN {
        return false;
    }
    match format_date_time(iso_datetime) {
        Some(label) => {
            out.clear();
            out.push_str(&label).is_ok()
        }
        None => false,
    }
}

/// Format `"2025-03-14T01:30:00Z"` as `"Mar 14, 1:30 AM"` (12-hour clock)
pub fn format_date_time(iso_datetime: &str) -> Option<heapless::String<DATETIME_LABEL_MIN>> {
    let parsed = IsoDateTime::parse(iso_datetime).ok()?;
    let am_pm = if parsed.hour() >= 12 { "PM" } else { "AM" };
    let display_hour = match parsed.hour() % 12 {
        0 => 12,
        hour => hour,
    };

    let mut label = heapless::String::new();
    write!(
        label,
        "{} {}, {}:{:02} {}",
        month_abbr(parsed.date().month()),
        parsed.date().day(),
        display_hour,
        parsed.minute(),
        am_pm
    )
    .ok()?;
    Some(label)
}
