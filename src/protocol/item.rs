//! Item-stream decoding: one record per message

use super::DecodeError;
use crate::transport::{Message, keys};
use crate::types::{Category, ConstructorStanding, DriverStanding, Race, RaceEvent, Record};

fn required_str(message: &Message, category: Category, key: u32) -> Result<&str, DecodeError> {
    message.str(key).ok_or(DecodeError::MissingField { category, key: keys::name(key) })
}

fn non_negative(value: Option<i32>) -> u32 {
    value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
}

/// Position from the message, or `index + 1` when absent or not positive
fn position_or_rank(message: &Message, index: usize) -> u32 {
    match message.int(keys::DATA_POSITION) {
        Some(position) if position >= 1 => position as u32,
        _ => index as u32 + 1,
    }
}

/// Whether `message` carries an item of `category` rather than a bulk payload
///
/// Items always carry `DATA_INDEX` and `DATA_TITLE` plus a category-specific
/// field: `DATA_SUBTITLE` for races, events and drivers, `DATA_POINTS` or
/// `DATA_POSITION` for teams.
pub fn is_item(category: Category, message: &Message) -> bool {
    if !message.contains(keys::DATA_INDEX) || !message.contains(keys::DATA_TITLE) {
        return false;
    }
    match category {
        Category::TeamStandings => {
            message.contains(keys::DATA_POINTS) || message.contains(keys::DATA_POSITION)
        }
        _ => message.contains(keys::DATA_SUBTITLE),
    }
}

/// Decode one item message of `category`
pub fn decode_item(category: Category, message: &Message) -> Result<Record, DecodeError> {
    let raw_index = message
        .int(keys::DATA_INDEX)
        .ok_or(DecodeError::MissingField { category, key: "DATA_INDEX" })?;
    let index = usize::try_from(raw_index)
        .map_err(|_| DecodeError::NegativeIndex { category, index: raw_index })?;
    let title = required_str(message, category, keys::DATA_TITLE)?;

    let record = match category {
        Category::Overview => {
            let location = required_str(message, category, keys::DATA_SUBTITLE)?;
            let date = message.str(keys::DATA_EXTRA).unwrap_or("");
            let round = non_negative(message.int(keys::DATA_ROUND));
            Record::Race(Race::new(index, round, title, location, date))
        }
        Category::RaceDetails => {
            let datetime = required_str(message, category, keys::DATA_SUBTITLE)?;
            Record::Event(RaceEvent::new(index, title, datetime))
        }
        Category::DriverStandings => {
            let code = required_str(message, category, keys::DATA_SUBTITLE)?;
            let points = non_negative(message.int(keys::DATA_POINTS));
            let position = position_or_rank(message, index);
            Record::Driver(DriverStanding::new(index, position, title, code, points))
        }
        Category::TeamStandings => {
            let points = non_negative(message.int(keys::DATA_POINTS));
            let position = position_or_rank(message, index);
            Record::Team(ConstructorStanding::new(index, position, title, points))
        }
    };

    Ok(record)
}
