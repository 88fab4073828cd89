//! Data categories and their wire request kinds

use serde::{Deserialize, Serialize};

/// A kind of data the watch can request from the phone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Season calendar (list of races)
    Overview,

    /// Session schedule of one race
    RaceDetails,

    /// Drivers' championship
    DriverStandings,

    /// Constructors' championship
    TeamStandings,
}

impl Category {
    /// Every category, in request-kind order
    pub const ALL: [Category; 4] = [
        Category::Overview,
        Category::RaceDetails,
        Category::DriverStandings,
        Category::TeamStandings,
    ];

    /// Request kind written under `REQUEST_TYPE`
    ///
    /// The numbering is 1-based and shared with the phone companion:
    /// Overview=1, RaceDetails=2, DriverStandings=3, TeamStandings=4.
    pub fn request_kind(self) -> u8 {
        match self {
            Category::Overview => 1,
            Category::RaceDetails => 2,
            Category::DriverStandings => 3,
            Category::TeamStandings => 4,
        }
    }

    /// Map a `REQUEST_TYPE` value back to a category
    pub fn from_request_kind(kind: i32) -> Option<Self> {
        match kind {
            1 => Some(Category::Overview),
            2 => Some(Category::RaceDetails),
            3 => Some(Category::DriverStandings),
            4 => Some(Category::TeamStandings),
            _ => None,
        }
    }

    /// Position of this category in per-category tables
    pub(crate) fn slot(self) -> usize {
        self.request_kind() as usize - 1
    }

    /// Human-readable name for logs
    pub fn name(self) -> &'static str {
        match self {
            Category::Overview => "overview",
            Category::RaceDetails => "race details",
            Category::DriverStandings => "driver standings",
            Category::TeamStandings => "team standings",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Section of the race calendar
///
/// Bulk overview payloads name their section in `DATA_INDEX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaceSection {
    /// Races today or later
    Upcoming,
    /// Races strictly before today
    Previous,
}

impl RaceSection {
    /// Map a `DATA_INDEX` value to a section (0 = upcoming, 1 = previous)
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(RaceSection::Upcoming),
            1 => Some(RaceSection::Previous),
            _ => None,
        }
    }

    /// Wire index of this section
    pub fn index(self) -> i32 {
        match self {
            RaceSection::Upcoming => 0,
            RaceSection::Previous => 1,
        }
    }
}
