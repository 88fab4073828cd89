//! Bounded storage for everything the phone has sent
//!
//! [`DataCache`] holds one fixed-capacity list per [`Category`]. Writes are
//! addressed by the index the phone assigned; anything past a list's capacity
//! is dropped. Mutating methods return whether the visible contents changed so
//! the caller knows when to notify.
//!
//! ```rust
//! use flashback::cache::DataCache;
//! use flashback::types::{Category, RaceSection};
//!
//! let mut cache = DataCache::new();
//! let outcome = cache.load_bulk(
//!     Category::Overview,
//!     Some(RaceSection::Upcoming),
//!     "1|Bahrain Grand Prix|Sakhir\n2|Saudi Arabian Grand Prix|Jeddah",
//! );
//! assert_eq!(outcome.stored, 2);
//! assert_eq!(cache.calendar().upcoming().count(), 2);
//! ```

mod calendar;
mod list;

pub use calendar::{Calendar, RACE_CAPACITY, RaceList};
pub use list::CategoryList;

use serde::Serialize;
use tracing::{debug, warn};

use crate::dates;
use crate::protocol::RaceRound;
use crate::protocol::bulk::BulkRecords;
use crate::types::{
    Category, ConstructorStanding, DriverStanding, RaceEvent, RaceSection, Record,
};

/// Session events held for the selected race
pub const EVENT_CAPACITY: usize = 16;

/// Drivers' championship entries
pub const DRIVER_CAPACITY: usize = 30;

/// Constructors' championship entries
pub const TEAM_CAPACITY: usize = 15;

pub type EventList = CategoryList<RaceEvent, EVENT_CAPACITY>;
pub type DriverList = CategoryList<DriverStanding, DRIVER_CAPACITY>;
pub type TeamList = CategoryList<ConstructorStanding, TEAM_CAPACITY>;

/// Source of "today" as a day count since 1970-01-01
pub type Clock = fn() -> i64;

/// Result of applying one bulk payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    /// Records written to the cache
    pub stored: usize,
    /// Malformed lines
    pub skipped: usize,
    /// Well-formed records past capacity
    pub dropped: usize,
}

/// Count and loaded flag of one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListStatus {
    pub count: usize,
    pub loaded: bool,
}

/// Cached data for every category
#[derive(Debug, Clone)]
pub struct DataCache {
    calendar: Calendar,
    events: EventList,
    event_round: Option<RaceRound>,
    drivers: DriverList,
    teams: TeamList,
    clock: Clock,
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCache {
    pub fn new() -> Self {
        Self::with_clock(dates::today)
    }

    /// Cache whose race placement uses `clock` for today's date
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            calendar: Calendar::new(),
            events: EventList::new(),
            event_round: None,
            drivers: DriverList::new(),
            teams: TeamList::new(),
            clock,
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn events(&self) -> &EventList {
        &self.events
    }

    /// Round whose events are cached, if any
    pub fn event_round(&self) -> Option<RaceRound> {
        self.event_round
    }

    pub fn driver_standings(&self) -> &DriverList {
        &self.drivers
    }

    pub fn team_standings(&self) -> &TeamList {
        &self.teams
    }

    pub fn status(&self, category: Category) -> ListStatus {
        let (count, loaded) = match category {
            Category::Overview => (self.calendar.count(), self.calendar.is_loaded()),
            Category::RaceDetails => (self.events.count(), self.events.is_loaded()),
            Category::DriverStandings => (self.drivers.count(), self.drivers.is_loaded()),
            Category::TeamStandings => (self.teams.count(), self.teams.is_loaded()),
        };
        ListStatus { count, loaded }
    }

    pub fn is_loaded(&self, category: Category) -> bool {
        self.status(category).loaded
    }

    /// Record a count message; the category becomes loaded
    ///
    /// Returns the stored count, clamped to the category's capacity.
    pub fn set_count(&mut self, category: Category, count: usize) -> usize {
        let stored = match category {
            Category::Overview => self.calendar.set_count(count),
            Category::RaceDetails => self.events.set_count(count),
            Category::DriverStandings => self.drivers.set_count(count),
            Category::TeamStandings => self.teams.set_count(count),
        };
        debug!(%category, count = stored, "Count received");
        stored
    }

    /// Write one item-stream record at its index
    ///
    /// Returns `false` when the index is past capacity; nothing is stored.
    pub fn add_item(&mut self, record: Record) -> bool {
        let category = record.category();
        let index = record.index();
        let stored = match record {
            Record::Race(race) => self.calendar.add_race(race, (self.clock)()),
            Record::Event(event) => self.events.set(index, event),
            Record::Driver(driver) => self.drivers.set(index, driver),
            Record::Team(team) => self.teams.set(index, team),
        };

        if !stored {
            warn!(%category, index, "Item index out of range, dropped");
        }
        stored
    }

    /// Replace a category's contents with a bulk payload
    ///
    /// Overview payloads fill the given section; other categories ignore it.
    /// Records decoded before a malformed line are kept.
    pub fn load_bulk(
        &mut self,
        category: Category,
        section: Option<RaceSection>,
        text: &str,
    ) -> BulkOutcome {
        let mut records = BulkRecords::new(category, text);
        let (stored, dropped) = match category {
            Category::Overview => {
                let section = section.unwrap_or(RaceSection::Upcoming);
                let races = records.by_ref().filter_map(|record| match record {
                    Record::Race(race) => Some(race),
                    _ => None,
                });
                self.calendar.load_section(section, races)
            }
            Category::RaceDetails => self.events.replace_all(records.by_ref().filter_map(
                |record| match record {
                    Record::Event(event) => Some(event),
                    _ => None,
                },
            )),
            Category::DriverStandings => self.drivers.replace_all(records.by_ref().filter_map(
                |record| match record {
                    Record::Driver(driver) => Some(driver),
                    _ => None,
                },
            )),
            Category::TeamStandings => self.teams.replace_all(records.by_ref().filter_map(
                |record| match record {
                    Record::Team(team) => Some(team),
                    _ => None,
                },
            )),
        };

        let outcome = BulkOutcome { stored, skipped: records.skipped(), dropped };
        if dropped > 0 {
            warn!(%category, dropped, "Bulk payload exceeds capacity, extra records dropped");
        }
        debug!(%category, stored, skipped = outcome.skipped, "Bulk payload applied");
        outcome
    }

    /// Clear a category before a fresh request
    pub fn reset(&mut self, category: Category) {
        match category {
            Category::Overview => self.calendar.reset(),
            Category::RaceDetails => {
                self.events.reset();
                self.event_round = None;
            }
            Category::DriverStandings => self.drivers.reset(),
            Category::TeamStandings => self.teams.reset(),
        }
    }

    /// Clear the events and scope them to `round`
    pub fn begin_race_details(&mut self, round: RaceRound) {
        if self.event_round != Some(round) {
            debug!(round = round.get(), "Switching race details");
        }
        self.reset(Category::RaceDetails);
        self.event_round = Some(round);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::IsoDate;
    use crate::types::Race;

    fn june_first() -> i64 {
        IsoDate::parse("2025-06-01").map(|date| date.days_since_epoch()).unwrap_or(0)
    }

    #[test]
    fn fresh_cache_is_unloaded() {
        let cache = DataCache::new();
        for category in Category::ALL {
            assert_eq!(cache.status(category), ListStatus { count: 0, loaded: false });
        }
    }

    #[test]
    fn item_round_trip() {
        let mut cache = DataCache::new();
        let driver = DriverStanding::new(2, 3, "Charles Leclerc", "LEC", 356);
        assert!(cache.add_item(Record::Driver(driver.clone())));
        assert_eq!(cache.driver_standings().get(2), Some(&driver));
        assert!(!cache.is_loaded(Category::DriverStandings));

        assert_eq!(cache.set_count(Category::DriverStandings, 3), 3);
        assert_eq!(cache.status(Category::DriverStandings), ListStatus { count: 3, loaded: true });
    }

    #[test]
    fn count_is_clamped_to_capacity() {
        let mut cache = DataCache::new();
        assert_eq!(cache.set_count(Category::TeamStandings, 40), TEAM_CAPACITY);
        assert_eq!(cache.status(Category::TeamStandings).count, TEAM_CAPACITY);
        assert_eq!(cache.set_count(Category::RaceDetails, 0), 0);
        assert!(cache.is_loaded(Category::RaceDetails));
    }

    #[test]
    fn out_of_range_item_is_a_no_op() {
        let mut cache = DataCache::new();
        let team = ConstructorStanding::new(TEAM_CAPACITY, 16, "Nobody", 0);
        assert!(!cache.add_item(Record::Team(team)));
        assert!(cache.team_standings().is_empty());
    }

    #[test]
    fn item_races_use_the_clock() {
        let mut cache = DataCache::with_clock(june_first);
        cache.add_item(Record::Race(Race::new(0, 1, "Australian Grand Prix", "Melbourne", "2025-03-16")));
        cache.add_item(Record::Race(Race::new(1, 22, "Las Vegas Grand Prix", "Las Vegas", "2025-11-22")));

        assert_eq!(cache.calendar().previous().len(), 1);
        assert_eq!(cache.calendar().upcoming().len(), 1);
    }

    #[test]
    fn bulk_calendar_sections() {
        let mut cache = DataCache::new();
        let outcome = cache.load_bulk(
            Category::Overview,
            Some(RaceSection::Upcoming),
            "1|Bahrain Grand Prix|Sakhir\n2|Saudi Arabian Grand Prix|Jeddah",
        );
        assert_eq!(outcome, BulkOutcome { stored: 2, skipped: 0, dropped: 0 });

        let upcoming: Vec<_> = cache.calendar().upcoming().items().collect();
        assert_eq!(upcoming[0].round, 1);
        assert_eq!(upcoming[0].name.as_str(), "Bahrain Grand Prix");
        assert_eq!(upcoming[0].location.as_str(), "Sakhir");
        assert_eq!(upcoming[1].round, 2);
        assert_eq!(upcoming[1].location.as_str(), "Jeddah");
        assert!(!cache.is_loaded(Category::Overview));

        cache.load_bulk(Category::Overview, Some(RaceSection::Previous), "");
        assert!(cache.is_loaded(Category::Overview));
        assert_eq!(cache.status(Category::Overview).count, 2);
    }

    #[test]
    fn bulk_keeps_records_around_garbage() {
        let mut cache = DataCache::new();
        let outcome = cache.load_bulk(
            Category::Overview,
            Some(RaceSection::Upcoming),
            "garbage line\n1|Bahrain Grand Prix|Sakhir",
        );
        assert_eq!(outcome.stored, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(cache.calendar().upcoming().get(0).map(|race| race.round), Some(1));
    }

    #[test]
    fn bulk_past_capacity_is_dropped() {
        let text: String = (1..=20).map(|i| format!("{}|Team {}|{} pts\n", i, i, 100 - i)).collect();
        let mut cache = DataCache::new();
        let outcome = cache.load_bulk(Category::TeamStandings, None, &text);
        assert_eq!(outcome, BulkOutcome { stored: TEAM_CAPACITY, skipped: 0, dropped: 5 });
        assert_eq!(cache.status(Category::TeamStandings).count, TEAM_CAPACITY);
    }

    #[test]
    fn bulk_replaces_previous_contents() {
        let mut cache = DataCache::new();
        cache.load_bulk(Category::DriverStandings, None, "1|A|AAA|10\n2|B|BBB|5\n3|C|CCC|1");
        cache.load_bulk(Category::DriverStandings, None, "1|B|BBB|20");
        let names: Vec<&str> =
            cache.driver_standings().items().map(|driver| driver.name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
    }

    #[test]
    fn reset_clears_loaded_state() {
        let mut cache = DataCache::new();
        cache.load_bulk(Category::TeamStandings, None, "1|McLaren|666");
        cache.reset(Category::TeamStandings);
        assert_eq!(cache.status(Category::TeamStandings), ListStatus { count: 0, loaded: false });
    }

    #[test]
    fn switching_race_clears_events() {
        let mut cache = DataCache::new();
        let first = RaceRound::new(1).unwrap();
        let second = RaceRound::new(2).unwrap();

        cache.begin_race_details(first);
        cache.load_bulk(Category::RaceDetails, None, "FP1|2025-03-14T01:30:00Z\nRace|2025-03-16T04:00:00Z");
        assert_eq!(cache.events().len(), 2);
        assert_eq!(cache.event_round(), Some(first));

        cache.begin_race_details(second);
        assert!(cache.events().is_empty());
        assert_eq!(cache.event_round(), Some(second));
    }
}
