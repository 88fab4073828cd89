//! Request/response protocol between watch and phone.
//!
//! ## Requests
//!
//! A request is one message with `REQUEST_TYPE` set to the category's request
//! kind (Overview=1, RaceDetails=2, DriverStandings=3, TeamStandings=4). Race
//! details requests add the race round under `DATA_INDEX`. Every request
//! carries `DATA_GENERATION` so the phone can echo it back.
//!
//! ## Responses
//!
//! Every response names its category in `REQUEST_TYPE`, then carries one of:
//! - `DATA_COUNT`: the list is complete with that many items
//! - an item: `DATA_INDEX`, `DATA_TITLE` and typed fields for one record
//!   (see [`item`])
//! - a bulk payload: the whole list as delimited text in `DATA_TITLE`
//!   (see [`bulk`]); overview payloads name their section in `DATA_INDEX`
//!
//! ```rust
//! use flashback::protocol::{Request, Response, ResponseBody};
//! use flashback::transport::{Message, keys};
//!
//! let request = Request::Overview.encode(Some(1));
//! assert_eq!(request.int(keys::REQUEST_TYPE), Some(1));
//!
//! let reply = Message::new()
//!     .with_int(keys::REQUEST_TYPE, 1)
//!     .with_int(keys::DATA_INDEX, 0)
//!     .with_str(keys::DATA_TITLE, "1|Bahrain Grand Prix|Sakhir");
//! let response = Response::decode(&reply).unwrap();
//! assert!(matches!(response.body, ResponseBody::Bulk { .. }));
//! ```

pub mod bulk;
pub mod item;

use thiserror::Error;

use crate::transport::{Message, Value, keys};
use crate::types::{Category, RaceSection, Record};
use crate::{Result, SyncError};

/// Highest race round accepted in a race details request
pub const MAX_ROUND: u32 = 30;

/// Why an inbound message was ignored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("message has no REQUEST_TYPE")]
    MissingRequestType,

    #[error("unknown request type {0}")]
    UnknownRequestType(i32),

    #[error("{category} message is missing {key}")]
    MissingField { category: Category, key: &'static str },

    #[error("{category} item has negative index {index}")]
    NegativeIndex { category: Category, index: i32 },

    #[error("{category} count is negative: {count}")]
    NegativeCount { category: Category, count: i32 },

    #[error("unknown calendar section {0}")]
    UnknownSection(i32),

    #[error("invalid race round {0}")]
    InvalidRound(i32),
}

impl From<DecodeError> for SyncError {
    fn from(err: DecodeError) -> Self {
        SyncError::parse("message", err.to_string())
    }
}

/// Race identifier used by race details requests: the season round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RaceRound(u32);

impl RaceRound {
    /// Validate a round number (1..=[`MAX_ROUND`])
    pub fn new(round: u32) -> Result<Self> {
        if (1..=MAX_ROUND).contains(&round) {
            Ok(Self(round))
        } else {
            Err(SyncError::invalid_request(format!(
                "race round {} outside 1..={}",
                round, MAX_ROUND
            )))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// An outbound data request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Overview,
    RaceDetails { round: RaceRound },
    DriverStandings,
    TeamStandings,
}

impl Request {
    /// Request for a list category; race details need [`Request::RaceDetails`]
    pub fn for_category(category: Category) -> Option<Self> {
        match category {
            Category::Overview => Some(Request::Overview),
            Category::DriverStandings => Some(Request::DriverStandings),
            Category::TeamStandings => Some(Request::TeamStandings),
            Category::RaceDetails => None,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Request::Overview => Category::Overview,
            Request::RaceDetails { .. } => Category::RaceDetails,
            Request::DriverStandings => Category::DriverStandings,
            Request::TeamStandings => Category::TeamStandings,
        }
    }

    /// Build the outbound message
    ///
    /// The generation is bit-cast to a signed 32-bit wire integer.
    pub fn encode(&self, generation: Option<u32>) -> Message {
        let mut message = Message::new().with_u8(keys::REQUEST_TYPE, self.category().request_kind());
        if let Request::RaceDetails { round } = self {
            message.insert(keys::DATA_INDEX, Value::Int(round.get() as i32));
        }
        if let Some(generation) = generation {
            message.insert(keys::DATA_GENERATION, Value::Int(generation as i32));
        }
        message
    }

    /// Read a request message (phone side)
    pub fn decode(message: &Message) -> Result<(Self, Option<u32>), DecodeError> {
        let kind = message.int(keys::REQUEST_TYPE).ok_or(DecodeError::MissingRequestType)?;
        let category = Category::from_request_kind(kind).ok_or(DecodeError::UnknownRequestType(kind))?;
        let generation = message.int(keys::DATA_GENERATION).map(|g| g as u32);

        let request = match Request::for_category(category) {
            Some(request) => request,
            None => {
                let round = message
                    .int(keys::DATA_INDEX)
                    .ok_or(DecodeError::MissingField { category, key: "DATA_INDEX" })?;
                let round = u32::try_from(round)
                    .ok()
                    .and_then(|round| RaceRound::new(round).ok())
                    .ok_or(DecodeError::InvalidRound(round))?;
                Request::RaceDetails { round }
            }
        };

        Ok((request, generation))
    }
}

/// Payload of a decoded response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody<'a> {
    /// List complete with this many items
    Count(usize),
    /// One record of an item stream
    Item(Record),
    /// Whole list as delimited text; overview payloads name their section
    Bulk { section: Option<RaceSection>, text: &'a str },
}

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<'a> {
    pub category: Category,
    /// Echoed request generation, if the phone sent one
    pub generation: Option<u32>,
    pub body: ResponseBody<'a>,
}

impl<'a> Response<'a> {
    /// Decode an inbound message, borrowing bulk text from it
    pub fn decode(message: &'a Message) -> Result<Self, DecodeError> {
        let kind = message.int(keys::REQUEST_TYPE).ok_or(DecodeError::MissingRequestType)?;
        let category = Category::from_request_kind(kind).ok_or(DecodeError::UnknownRequestType(kind))?;
        let generation = message.int(keys::DATA_GENERATION).map(|g| g as u32);

        let body = if let Some(count) = message.int(keys::DATA_COUNT) {
            let count =
                usize::try_from(count).map_err(|_| DecodeError::NegativeCount { category, count })?;
            ResponseBody::Count(count)
        } else if item::is_item(category, message) {
            ResponseBody::Item(item::decode_item(category, message)?)
        } else if let Some(text) = message.str(keys::DATA_TITLE) {
            let section = match category {
                Category::Overview => {
                    let index = message
                        .int(keys::DATA_INDEX)
                        .ok_or(DecodeError::MissingField { category, key: "DATA_INDEX" })?;
                    Some(RaceSection::from_index(index).ok_or(DecodeError::UnknownSection(index))?)
                }
                _ => None,
            };
            ResponseBody::Bulk { section, text }
        } else {
            return Err(DecodeError::MissingField { category, key: "DATA_TITLE" });
        };

        Ok(Self { category, generation, body })
    }
}

fn reply(category: Category, generation: Option<u32>) -> Message {
    let message = Message::new().with_u8(keys::REQUEST_TYPE, category.request_kind());
    match generation {
        Some(generation) => message.with_int(keys::DATA_GENERATION, generation as i32),
        None => message,
    }
}

/// Build a count response (phone side)
pub fn encode_count(category: Category, count: usize, generation: Option<u32>) -> Message {
    reply(category, generation).with_int(keys::DATA_COUNT, count as i32)
}

/// Build a bulk-text response (phone side)
pub fn encode_bulk(
    category: Category,
    section: Option<RaceSection>,
    text: impl Into<String>,
    generation: Option<u32>,
) -> Message {
    let message = reply(category, generation).with_str(keys::DATA_TITLE, text);
    match section {
        Some(section) => message.with_int(keys::DATA_INDEX, section.index()),
        None => message,
    }
}

/// Build an item response for one record (phone side)
pub fn encode_item(record: &Record, generation: Option<u32>) -> Message {
    let message = reply(record.category(), generation).with_int(keys::DATA_INDEX, record.index() as i32);
    match record {
        Record::Race(race) => message
            .with_str(keys::DATA_TITLE, race.name.as_str())
            .with_str(keys::DATA_SUBTITLE, race.location.as_str())
            .with_str(keys::DATA_EXTRA, race.date.as_str())
            .with_int(keys::DATA_ROUND, race.round as i32),
        Record::Event(event) => message
            .with_str(keys::DATA_TITLE, event.label.as_str())
            .with_str(keys::DATA_SUBTITLE, event.datetime.as_str()),
        Record::Driver(driver) => message
            .with_str(keys::DATA_TITLE, driver.name.as_str())
            .with_str(keys::DATA_SUBTITLE, driver.code.as_str())
            .with_int(keys::DATA_POINTS, driver.points as i32)
            .with_int(keys::DATA_POSITION, driver.position as i32),
        Record::Team(team) => message
            .with_str(keys::DATA_TITLE, team.name.as_str())
            .with_int(keys::DATA_POINTS, team.points as i32)
            .with_int(keys::DATA_POSITION, team.position as i32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConstructorStanding, DriverStanding, Race};

    #[test]
    fn list_requests_carry_kind_and_generation() {
        let message = Request::DriverStandings.encode(Some(7));
        assert_eq!(message.int(keys::REQUEST_TYPE), Some(3));
        assert_eq!(message.int(keys::DATA_GENERATION), Some(7));
        assert!(!message.contains(keys::DATA_INDEX));

        let untagged = Request::TeamStandings.encode(None);
        assert_eq!(untagged.int(keys::REQUEST_TYPE), Some(4));
        assert!(!untagged.contains(keys::DATA_GENERATION));
    }

    #[test]
    fn race_details_request_carries_round() {
        let round = RaceRound::new(5).unwrap();
        let message = Request::RaceDetails { round }.encode(Some(1));
        assert_eq!(message.int(keys::REQUEST_TYPE), Some(2));
        assert_eq!(message.int(keys::DATA_INDEX), Some(5));

        let (decoded, generation) = Request::decode(&message).unwrap();
        assert_eq!(decoded, Request::RaceDetails { round });
        assert_eq!(generation, Some(1));
    }

    #[test]
    fn race_round_is_validated() {
        assert!(RaceRound::new(0).is_err());
        assert!(RaceRound::new(MAX_ROUND + 1).is_err());
        assert_eq!(RaceRound::new(24).unwrap().get(), 24);
    }

    #[test]
    fn decode_errors_convert_to_parse_errors() {
        let err: SyncError = DecodeError::UnknownRequestType(9).into();
        assert!(matches!(err, SyncError::Parse { .. }));
        assert!(err.to_string().contains("unknown request type 9"));
    }

    #[test]
    fn for_category_skips_race_details() {
        assert_eq!(Request::for_category(Category::Overview), Some(Request::Overview));
        assert_eq!(Request::for_category(Category::RaceDetails), None);
    }

    #[test]
    fn count_response() {
        let message = encode_count(Category::TeamStandings, 10, Some(2));
        let response = Response::decode(&message).unwrap();
        assert_eq!(response.category, Category::TeamStandings);
        assert_eq!(response.generation, Some(2));
        assert_eq!(response.body, ResponseBody::Count(10));
    }

    #[test]
    fn overview_bulk_needs_a_section() {
        let message = encode_bulk(
            Category::Overview,
            Some(RaceSection::Previous),
            "1|Bahrain Grand Prix|Sakhir",
            None,
        );
        let response = Response::decode(&message).unwrap();
        assert_eq!(
            response.body,
            ResponseBody::Bulk {
                section: Some(RaceSection::Previous),
                text: "1|Bahrain Grand Prix|Sakhir"
            }
        );

        let missing = encode_bulk(Category::Overview, None, "1|Bahrain Grand Prix|Sakhir", None);
        assert_eq!(
            Response::decode(&missing).unwrap_err(),
            DecodeError::MissingField { category: Category::Overview, key: "DATA_INDEX" }
        );

        let bad = Message::new()
            .with_int(keys::REQUEST_TYPE, 1)
            .with_int(keys::DATA_INDEX, 7)
            .with_str(keys::DATA_TITLE, "");
        assert_eq!(Response::decode(&bad).unwrap_err(), DecodeError::UnknownSection(7));
    }

    #[test]
    fn standings_bulk_has_no_section() {
        let message =
            encode_bulk(Category::DriverStandings, None, "1|Lando Norris|NOR|423 pts", Some(4));
        let response = Response::decode(&message).unwrap();
        assert_eq!(
            response.body,
            ResponseBody::Bulk { section: None, text: "1|Lando Norris|NOR|423 pts" }
        );
    }

    #[test]
    fn items_survive_encode_decode() {
        let records = vec![
            Record::Race(Race::new(2, 3, "Japanese Grand Prix", "Suzuka", "2025-04-06")),
            Record::Driver(DriverStanding::new(0, 1, "Lando Norris", "NOR", 423)),
            Record::Team(ConstructorStanding::new(1, 2, "Ferrari", 398)),
        ];

        for record in records {
            let message = encode_item(&record, None);
            let response = Response::decode(&message).unwrap();
            assert_eq!(response.body, ResponseBody::Item(record));
        }
    }

    #[test]
    fn structural_failures() {
        assert_eq!(
            Response::decode(&Message::new()).unwrap_err(),
            DecodeError::MissingRequestType
        );
        assert_eq!(
            Response::decode(&Message::new().with_int(keys::REQUEST_TYPE, 9)).unwrap_err(),
            DecodeError::UnknownRequestType(9)
        );
        assert_eq!(
            Response::decode(&Message::new().with_int(keys::REQUEST_TYPE, 3)).unwrap_err(),
            DecodeError::MissingField { category: Category::DriverStandings, key: "DATA_TITLE" }
        );
        assert_eq!(
            Response::decode(&encode_count(Category::Overview, 0, None).with_int(keys::DATA_COUNT, -2))
                .unwrap_err(),
            DecodeError::NegativeCount { category: Category::Overview, count: -2 }
        );
    }
}
