//! Key/value messages exchanged with the phone

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire keys shared with the phone companion
pub mod keys {
    pub const REQUEST_TYPE: u32 = 0;
    pub const DATA_INDEX: u32 = 1;
    pub const DATA_COUNT: u32 = 2;
    pub const DATA_TITLE: u32 = 3;
    pub const DATA_SUBTITLE: u32 = 4;
    pub const DATA_EXTRA: u32 = 5;
    pub const DATA_ROUND: u32 = 6;
    pub const DATA_POINTS: u32 = 7;
    pub const DATA_POSITION: u32 = 8;
    pub const DATA_GENERATION: u32 = 9;

    /// Name of a key for logs
    pub fn name(key: u32) -> &'static str {
        match key {
            REQUEST_TYPE => "REQUEST_TYPE",
            DATA_INDEX => "DATA_INDEX",
            DATA_COUNT => "DATA_COUNT",
            DATA_TITLE => "DATA_TITLE",
            DATA_SUBTITLE => "DATA_SUBTITLE",
            DATA_EXTRA => "DATA_EXTRA",
            DATA_ROUND => "DATA_ROUND",
            DATA_POINTS => "DATA_POINTS",
            DATA_POSITION => "DATA_POSITION",
            DATA_GENERATION => "DATA_GENERATION",
            _ => "UNKNOWN",
        }
    }
}

// Dictionary layout: one count byte, then key(4) + type(1) + length(2) per entry
const HEADER_LEN: usize = 1;
const ENTRY_OVERHEAD: usize = 7;

/// A typed message value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    U8(u8),
    Int(i32),
    /// Null-terminated on the wire
    Str(String),
}

impl Value {
    /// Bytes this value occupies on the wire
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::U8(_) => 1,
            Value::Int(_) => 4,
            Value::Str(text) => text.len() + 1,
        }
    }
}

/// One message: a mapping of small integer keys to typed values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    entries: BTreeMap<u32, Value>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style integer entry
    pub fn with_int(mut self, key: u32, value: i32) -> Self {
        self.insert(key, Value::Int(value));
        self
    }

    /// Builder-style 8-bit entry
    pub fn with_u8(mut self, key: u32, value: u8) -> Self {
        self.insert(key, Value::U8(value));
        self
    }

    /// Builder-style string entry
    pub fn with_str(mut self, key: u32, value: impl Into<String>) -> Self {
        self.insert(key, Value::Str(value.into()));
        self
    }

    pub fn insert(&mut self, key: u32, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: u32) -> Option<&Value> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: u32) -> bool {
        self.entries.contains_key(&key)
    }

    /// Integer value under `key`; strings read as absent
    pub fn int(&self, key: u32) -> Option<i32> {
        match self.entries.get(&key)? {
            Value::U8(value) => Some(i32::from(*value)),
            Value::Int(value) => Some(*value),
            Value::Str(_) => None,
        }
    }

    /// String value under `key`; integers read as absent
    pub fn str(&self, key: u32) -> Option<&str> {
        match self.entries.get(&key)? {
            Value::Str(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Value)> {
        self.entries.iter().map(|(key, value)| (*key, value))
    }

    /// Size of this message in the watch's dictionary encoding
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + self.entries.values().map(|value| ENTRY_OVERHEAD + value.encoded_len()).sum::<usize>()
    }
}
