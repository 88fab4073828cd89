//! Season calendar split into upcoming and previous races

use tracing::debug;

use super::list::CategoryList;
use crate::dates;
use crate::types::{Race, RaceSection};

/// Races held per calendar section
pub const RACE_CAPACITY: usize = 30;

pub type RaceList = CategoryList<Race, RACE_CAPACITY>;

/// The overview category: two race lists and a combined loaded state
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    upcoming: RaceList,
    previous: RaceList,
    expected: Option<usize>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upcoming(&self) -> &RaceList {
        &self.upcoming
    }

    pub fn previous(&self) -> &RaceList {
        &self.previous
    }

    pub fn section(&self, section: RaceSection) -> &RaceList {
        match section {
            RaceSection::Upcoming => &self.upcoming,
            RaceSection::Previous => &self.previous,
        }
    }

    fn section_mut(&mut self, section: RaceSection) -> &mut RaceList {
        match section {
            RaceSection::Upcoming => &mut self.upcoming,
            RaceSection::Previous => &mut self.previous,
        }
    }

    /// Every cached race, upcoming first
    pub fn races(&self) -> impl Iterator<Item = &Race> {
        self.upcoming.items().chain(self.previous.items())
    }

    /// Find a race by its round
    pub fn race_by_round(&self, round: u32) -> Option<&Race> {
        self.races().find(|race| race.round == round)
    }

    /// Loaded after a count, or after both sections' bulk payloads
    pub fn is_loaded(&self) -> bool {
        self.upcoming.is_loaded() && self.previous.is_loaded()
    }

    /// Announced race count, otherwise the number of cached races
    pub fn count(&self) -> usize {
        self.expected.unwrap_or_else(|| self.upcoming.len() + self.previous.len())
    }

    /// Store an item-stream race in the section its date belongs to
    ///
    /// Any race previously held at the same index in the other section is
    /// removed. Returns `false` when the index is out of range.
    pub fn add_race(&mut self, race: Race, today: i64) -> bool {
        let section = dates::section_for(&race.date, today);
        let other = match section {
            RaceSection::Upcoming => RaceSection::Previous,
            RaceSection::Previous => RaceSection::Upcoming,
        };

        let index = race.index;
        if !self.section_mut(section).set(index, race) {
            return false;
        }
        self.section_mut(other).remove(index);
        true
    }

    /// Record the announced race count; both sections become loaded
    pub fn set_count(&mut self, count: usize) -> usize {
        let clamped = count.min(RACE_CAPACITY);
        self.expected = Some(clamped);
        self.upcoming.mark_loaded();
        self.previous.mark_loaded();
        clamped
    }

    /// Replace one section wholesale; returns (stored, dropped)
    pub fn load_section<I>(&mut self, section: RaceSection, races: I) -> (usize, usize)
    where
        I: IntoIterator<Item = Race>,
    {
        let outcome = self.section_mut(section).replace_all(races);
        debug!(?section, stored = outcome.0, dropped = outcome.1, "Calendar section loaded");
        outcome
    }

    pub fn reset(&mut self) {
        self.upcoming.reset();
        self.previous.reset();
        self.expected = None;
    }
}
