//! Cached record types
//!
//! All text fields are fixed-capacity strings. Constructors truncate their
//! input, so a record can never hold more than its field limits.

use serde::{Deserialize, Serialize};

use super::Category;
use super::bounded::truncated;

/// Capacity of race, driver and team names (bytes)
pub const NAME_CAPACITY: usize = 64;
/// Capacity of race locations (bytes)
pub const LOCATION_CAPACITY: usize = 64;
/// Capacity of race dates (bytes)
pub const DATE_CAPACITY: usize = 32;
/// Capacity of session labels (bytes)
pub const LABEL_CAPACITY: usize = 64;
/// Capacity of session date-times (bytes)
pub const DATETIME_CAPACITY: usize = 64;
/// Capacity of driver codes (bytes)
pub const CODE_CAPACITY: usize = 4;

pub type Name = heapless::String<NAME_CAPACITY>;
pub type Location = heapless::String<LOCATION_CAPACITY>;
pub type DateText = heapless::String<DATE_CAPACITY>;
pub type Label = heapless::String<LABEL_CAPACITY>;
pub type DateTimeText = heapless::String<DATETIME_CAPACITY>;
pub type DriverCode = heapless::String<CODE_CAPACITY>;

/// One race of the season calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub name: Name,
    pub location: Location,
    /// ISO date (`YYYY-MM-DD`), empty when the phone sent the bulk encoding
    pub date: DateText,
    /// Round in the season, 0 when the phone did not send one
    pub round: u32,
    /// Cache slot
    pub index: usize,
}

impl Race {
    pub fn new(index: usize, round: u32, name: &str, location: &str, date: &str) -> Self {
        Self {
            name: truncated(name),
            location: truncated(location),
            date: truncated(date),
            round,
            index,
        }
    }
}

/// One session (practice, qualifying, race...) of a race weekend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceEvent {
    pub label: Label,
    /// ISO date-time (`YYYY-MM-DDTHH:MM:SSZ`)
    pub datetime: DateTimeText,
    pub index: usize,
}

impl RaceEvent {
    pub fn new(index: usize, label: &str, datetime: &str) -> Self {
        Self { label: truncated(label), datetime: truncated(datetime), index }
    }
}

/// Drivers' championship entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverStanding {
    pub name: Name,
    /// Three-letter code, e.g. `VER`
    pub code: DriverCode,
    pub points: u32,
    pub position: u32,
    pub index: usize,
}

impl DriverStanding {
    pub fn new(index: usize, position: u32, name: &str, code: &str, points: u32) -> Self {
        Self { name: truncated(name), code: truncated(code), points, position, index }
    }
}

/// Constructors' championship entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorStanding {
    pub name: Name,
    pub points: u32,
    pub position: u32,
    pub index: usize,
}

impl ConstructorStanding {
    pub fn new(index: usize, position: u32, name: &str, points: u32) -> Self {
        Self { name: truncated(name), points, position, index }
    }
}

/// A single decoded record, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    Race(Race),
    Event(RaceEvent),
    Driver(DriverStanding),
    Team(ConstructorStanding),
}

impl Record {
    /// Category this record is cached under
    pub fn category(&self) -> Category {
        match self {
            Record::Race(_) => Category::Overview,
            Record::Event(_) => Category::RaceDetails,
            Record::Driver(_) => Category::DriverStandings,
            Record::Team(_) => Category::TeamStandings,
        }
    }

    /// Cache slot of this record
    pub fn index(&self) -> usize {
        match self {
            Record::Race(race) => race.index,
            Record::Event(event) => event.index,
            Record::Driver(driver) => driver.index,
            Record::Team(team) => team.index,
        }
    }
}
