//! Shared fixtures for unit tests and benchmarks
//!
//! Payloads mirror what the companion app sends for the 2025 season.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;

use crate::transport::{Message, MessageSource, Transport};
use crate::{Result, SyncError};

/// Upcoming races as a bulk payload (section 0)
pub const CALENDAR_UPCOMING: &str = "\
21|São Paulo Grand Prix|São Paulo
22|Las Vegas Grand Prix|Las Vegas
23|Qatar Grand Prix|Lusail
24|Abu Dhabi Grand Prix|Yas Marina";

/// Previous races as a bulk payload (section 1)
pub const CALENDAR_PREVIOUS: &str = "\
1|Australian Grand Prix|Melbourne
2|Chinese Grand Prix|Shanghai
3|Japanese Grand Prix|Suzuka
4|Bahrain Grand Prix|Sakhir
5|Saudi Arabian Grand Prix|Jeddah
6|Miami Grand Prix|Miami, United States";

/// Sprint weekend schedule for one race
pub const RACE_EVENTS: &str = "\
Practice 1|2025-05-02T16:30:00Z
Sprint Qualifying|2025-05-02T20:30:00Z
Sprint|2025-05-03T16:00:00Z
Qualifying|2025-05-03T20:00:00Z
Race|2025-05-04T20:00:00Z";

pub const DRIVER_STANDINGS: &str = "\
1|Oscar Piastri|PIA|346 pts
2|Lando Norris|NOR|332 pts
3|Max Verstappen|VER|306 pts
4|George Russell|RUS|252 pts
5|Charles Leclerc|LEC|192 pts";

pub const TEAM_STANDINGS: &str = "\
1|McLaren|678 pts
2|Mercedes|341 pts
3|Ferrari|334 pts
4|Red Bull Racing|320 pts";

/// Driver standings payload with `drivers` lines, for sizing benchmarks
pub fn driver_standings_payload(drivers: usize) -> String {
    (0..drivers)
        .map(|i| format!("{}|Driver Number {}|D{:02}|{} pts\n", i + 1, i, i % 100, 500 - i.min(500)))
        .collect()
}

/// Transport that records outbound messages
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub opened: Option<(usize, usize)>,
    pub sent: Vec<Message>,
    /// Refuse sends with [`SyncError::Busy`]
    pub busy: bool,
}

impl Transport for RecordingTransport {
    fn open(&mut self, inbox_capacity: usize, outbox_capacity: usize) -> Result<()> {
        self.opened = Some((inbox_capacity, outbox_capacity));
        Ok(())
    }

    fn send(&mut self, message: Message) -> Result<()> {
        if self.opened.is_none() {
            return Err(SyncError::NotOpen);
        }
        if self.busy {
            return Err(SyncError::busy());
        }
        self.sent.push(message);
        Ok(())
    }
}

/// Message source that replays a fixed script
///
/// Once the script runs out it either ends the stream or, when `hold_open`
/// is set, never yields again.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<Option<Message>>>,
    hold_open: bool,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: Message) -> Self {
        self.script.push_back(Ok(Some(message)));
        self
    }

    pub fn error(mut self, error: SyncError) -> Self {
        self.script.push_back(Err(error));
        self
    }

    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait::async_trait]
impl MessageSource for ScriptedSource {
    async fn next_message(&mut self) -> Result<Option<Message>> {
        match self.script.pop_front() {
            Some(step) => step,
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }
}
