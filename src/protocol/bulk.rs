//! Bulk-text payload decoding
//!
//! A bulk payload carries a whole list in one string: records separated by
//! newlines, fields separated by `|`, no escaping. Field order per category:
//!
//! | category         | line                               |
//! |------------------|------------------------------------|
//! | overview         | `round|name|location`              |
//! | race details     | `label|datetime`                   |
//! | driver standings | `position|name|code|points`        |
//! | team standings   | `position|name|points`             |
//!
//! The last field takes the rest of the line. Integer fields read their
//! leading digits, so `"25 pts"` reads as 25. Lines with a missing separator
//! or a missing integer are skipped; empty lines are ignored.

use tracing::{debug, trace};

use crate::types::{Category, ConstructorStanding, DriverStanding, Race, RaceEvent, Record};

/// Leading decimal digits of `field`, after leading whitespace
fn leading_int(field: &str) -> Option<u32> {
    let trimmed = field.trim_start();
    let end = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// Split `line` into exactly `N` pipe-separated fields
fn fields<const N: usize>(line: &str) -> Option<[&str; N]> {
    let mut parts = line.splitn(N, '|');
    let mut out = [""; N];
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim();
    }
    Some(out)
}

/// `round|name|location`
pub fn parse_race_line(line: &str, index: usize) -> Option<Race> {
    let [round, name, location] = fields::<3>(line)?;
    let round = leading_int(round).filter(|round| *round >= 1)?;
    Some(Race::new(index, round, name, location, ""))
}

/// `label|datetime`
pub fn parse_event_line(line: &str, index: usize) -> Option<RaceEvent> {
    let [label, datetime] = fields::<2>(line)?;
    Some(RaceEvent::new(index, label, datetime))
}

/// `position|name|code|points`
pub fn parse_driver_line(line: &str, index: usize) -> Option<DriverStanding> {
    let [position, name, code, points] = fields::<4>(line)?;
    let position = leading_int(position).filter(|position| *position >= 1)?;
    let points = leading_int(points)?;
    Some(DriverStanding::new(index, position, name, code, points))
}

/// `position|name|points`
pub fn parse_team_line(line: &str, index: usize) -> Option<ConstructorStanding> {
    let [position, name, points] = fields::<3>(line)?;
    let position = leading_int(position).filter(|position| *position >= 1)?;
    let points = leading_int(points)?;
    Some(ConstructorStanding::new(index, position, name, points))
}

/// Parse one line for `category`, assigning it cache slot `index`
pub fn parse_line(category: Category, line: &str, index: usize) -> Option<Record> {
    match category {
        Category::Overview => parse_race_line(line, index).map(Record::Race),
        Category::RaceDetails => parse_event_line(line, index).map(Record::Event),
        Category::DriverStandings => parse_driver_line(line, index).map(Record::Driver),
        Category::TeamStandings => parse_team_line(line, index).map(Record::Team),
    }
}

/// Iterator over the records of one bulk payload
///
/// Valid lines get consecutive indices starting at 0.
#[derive(Debug, Clone)]
pub struct BulkRecords<'a> {
    category: Category,
    lines: std::str::Lines<'a>,
    next_index: usize,
    skipped: usize,
}

impl<'a> BulkRecords<'a> {
    pub fn new(category: Category, text: &'a str) -> Self {
        Self { category, lines: text.lines(), next_index: 0, skipped: 0 }
    }

    /// Malformed lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Records yielded so far
    pub fn decoded(&self) -> usize {
        self.next_index
    }
}

impl Iterator for BulkRecords<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        for line in self.lines.by_ref() {
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(self.category, line, self.next_index) {
                Some(record) => {
                    trace!(category = %self.category, index = self.next_index, "Decoded bulk line");
                    self.next_index += 1;
                    return Some(record);
                }
                None => {
                    self.skipped += 1;
                    debug!(category = %self.category, line, "Skipping malformed bulk line");
                }
            }
        }
        None
    }
}
