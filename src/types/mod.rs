//! Core types for cached F1 data.
//!
//! - [`Category`] names the four kinds of data the watch can request and maps
//!   them to the wire request kinds
//! - [`RaceSection`] splits the calendar into upcoming and previous races
//! - [`Race`], [`RaceEvent`], [`DriverStanding`] and [`ConstructorStanding`] are
//!   the cached records, with fixed-capacity text fields
//! - [`Record`] tags a single decoded record by kind
//!
//! ```rust
//! use flashback::types::{Category, Race};
//!
//! let race = Race::new(0, 1, "Bahrain Grand Prix", "Sakhir", "2025-03-02");
//! assert_eq!(race.name.as_str(), "Bahrain Grand Prix");
//! assert_eq!(Category::Overview.request_kind(), 1);
//! ```

mod bounded;
mod category;
mod records;

pub use bounded::truncated;
pub use category::{Category, RaceSection};
pub use records::{
    CODE_CAPACITY, ConstructorStanding, DATE_CAPACITY, DATETIME_CAPACITY, DateText, DateTimeText,
    DriverCode, DriverStanding, LABEL_CAPACITY, LOCATION_CAPACITY, Label, Location, NAME_CAPACITY,
    Name, Race, RaceEvent, Record,
};
