//! The sync session: request state, cache and listeners in one place
//!
//! A [`SyncSession`] is what the UI talks to. It sends requests through a
//! [`Transport`], applies decoded responses to its [`DataCache`] and notifies
//! the affected category's listener.
//!
//! Per category the session moves through
//! `Idle → Requested → PartiallyLoaded → Loaded`. A new request always goes
//! back to `Requested` with a cleared list and a fresh generation.
//!
//! Listeners run while the session is borrowed. A listener that needs to
//! start another request queues it on a [`Requester`]; the session sends it
//! once the current notification returns.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::cache::{DataCache, ListStatus};
use crate::config::SyncConfig;
use crate::notify::{ChangeKind, DataChange, ListenerRegistry};
use crate::protocol::{DecodeError, RaceRound, Request, Response, ResponseBody};
use crate::transport::{Message, Transport};
use crate::types::Category;
use crate::{Result, SyncError};

/// Most queued requests sent after a single notification
const MAX_DEFERRED_PER_FLUSH: usize = 8;

/// Request progress of one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum RequestState {
    /// Never requested; responses are ignored
    #[default]
    Idle,
    /// Request sent, nothing received yet
    Requested,
    /// Some records received
    PartiallyLoaded,
    /// Count received or every bulk payload applied
    Loaded,
}

/// Why an inbound message changed nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The message did not decode
    Malformed(DecodeError),
    /// The category was never requested
    NotRequested(Category),
    /// The reply belongs to an earlier request
    Stale { category: Category, generation: u32, current: u32 },
    /// The item's index is past the list's capacity
    OutOfRange { category: Category, index: usize },
}

/// Outcome of [`SyncSession::handle_message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Applied(DataChange),
    Dropped(DropReason),
}

impl Dispatch {
    pub fn is_applied(&self) -> bool {
        matches!(self, Dispatch::Applied(_))
    }
}

/// Message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub requests_sent: u64,
    pub send_failures: u64,
    pub received: u64,
    pub applied: u64,
    pub malformed: u64,
    pub ignored: u64,
    pub stale: u64,
}

/// Queue of requests raised from inside change listeners
///
/// Cloned into listeners via [`SyncSession::requester`]. Queued requests go
/// out in order after the notification that queued them.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    queue: Rc<RefCell<VecDeque<Request>>>,
}

impl Requester {
    pub fn request(&self, request: Request) {
        self.queue.borrow_mut().push_back(request);
    }

    /// Queue a list category; race details need a round
    pub fn request_category(&self, category: Category) -> Result<()> {
        let request = Request::for_category(category).ok_or_else(|| {
            SyncError::invalid_request("race details must be requested with a round")
        })?;
        self.request(request);
        Ok(())
    }

    pub fn request_race_details(&self, round: u32) -> Result<()> {
        let round = RaceRound::new(round)?;
        self.request(Request::RaceDetails { round });
        Ok(())
    }

    /// Requests waiting to be sent
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    fn pop(&self) -> Option<Request> {
        self.queue.borrow_mut().pop_front()
    }
}

/// Watch-side sync state
pub struct SyncSession<T> {
    transport: T,
    config: SyncConfig,
    cache: DataCache,
    listeners: ListenerRegistry,
    states: [RequestState; 4],
    generations: [u32; 4],
    stats: SessionStats,
    pending: Requester,
}

impl<T> std::fmt::Debug for SyncSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("config", &self.config)
            .field("states", &self.states)
            .field("generations", &self.generations)
            .field("stats", &self.stats)
            .field("listeners", &self.listeners)
            .field("pending", &self.pending.pending())
            .finish()
    }
}

impl<T: Transport> SyncSession<T> {
    /// Validate `config` and open `transport` with its buffer sizes
    pub fn new(transport: T, config: SyncConfig) -> Result<Self> {
        Self::with_cache(transport, config, DataCache::new())
    }

    /// Like [`SyncSession::new`] with a caller-built cache
    pub fn with_cache(mut transport: T, config: SyncConfig, cache: DataCache) -> Result<Self> {
        config.validate()?;
        transport.open(config.inbox_capacity, config.outbox_capacity)?;
        info!(
            inbox = config.inbox_capacity,
            outbox = config.outbox_capacity,
            "Sync session opened"
        );

        Ok(Self {
            transport,
            config,
            cache,
            listeners: ListenerRegistry::new(),
            states: [RequestState::Idle; 4],
            generations: [0; 4],
            stats: SessionStats::default(),
            pending: Requester::default(),
        })
    }

    /// Reset the request's category and send it to the phone
    ///
    /// The category is cleared and its listener notified before the send, so
    /// a failed send leaves it in `Requested` with an empty list. Send
    /// failures are logged and returned; retrying is up to the caller.
    pub fn request(&mut self, request: Request) -> Result<()> {
        let result = self.send_request(request);
        self.flush_pending();
        result
    }

    fn send_request(&mut self, request: Request) -> Result<()> {
        let category = request.category();
        let slot = category.slot();
        let generation = self.generations[slot].wrapping_add(1);
        self.generations[slot] = generation;

        match request {
            Request::RaceDetails { round } => self.cache.begin_race_details(round),
            _ => self.cache.reset(category),
        }
        self.states[slot] = RequestState::Requested;
        let change = DataChange::new(category, ChangeKind::Reset);
        self.listeners.notify(&change, &self.cache);

        let message = request.encode(self.config.generation_tagging.then_some(generation));
        match self.transport.send(message) {
            Ok(()) => {
                self.stats.requests_sent += 1;
                debug!(%category, generation, "Request sent");
                Ok(())
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!(%category, error = %e, "Request send failed");
                Err(e)
            }
        }
    }

    /// Request a list category
    ///
    /// Race details need a round; use [`SyncSession::request_race_details`].
    pub fn request_category(&mut self, category: Category) -> Result<()> {
        let request = Request::for_category(category).ok_or_else(|| {
            SyncError::invalid_request("race details must be requested with a round")
        })?;
        self.request(request)
    }

    /// Request the session schedule of the race with this round
    pub fn request_race_details(&mut self, round: u32) -> Result<()> {
        let round = RaceRound::new(round)?;
        self.request(Request::RaceDetails { round })
    }

    /// Send requests queued on the [`Requester`] during a notification
    ///
    /// Requests queued by the notifications of these sends are picked up in
    /// the same pass, up to [`MAX_DEFERRED_PER_FLUSH`]; the rest wait for
    /// the next change.
    fn flush_pending(&mut self) {
        for _ in 0..MAX_DEFERRED_PER_FLUSH {
            let Some(request) = self.pending.pop() else {
                return;
            };
            // Failures are counted and logged by send_request
            let _ = self.send_request(request);
        }
        if self.pending.pending() > 0 {
            warn!(pending = self.pending.pending(), "Deferred requests left queued");
        }
    }

    /// Apply one inbound message
    ///
    /// Exactly one listener call follows every applied change; dropped
    /// messages notify nobody. Requests the listener queued are sent before
    /// returning.
    pub fn handle_message(&mut self, message: &Message) -> Dispatch {
        self.stats.received += 1;

        let response = match Response::decode(message) {
            Ok(response) => response,
            Err(e) => {
                self.stats.malformed += 1;
                debug!(error = %e, "Ignoring malformed message");
                return Dispatch::Dropped(DropReason::Malformed(e));
            }
        };

        let category = response.category;
        let slot = category.slot();

        if self.states[slot] == RequestState::Idle {
            self.stats.ignored += 1;
            debug!(%category, "Ignoring response for a category never requested");
            return Dispatch::Dropped(DropReason::NotRequested(category));
        }

        let current = self.generations[slot];
        match response.generation {
            Some(generation) if self.config.generation_tagging && generation != current => {
                self.stats.stale += 1;
                debug!(%category, generation, current, "Dropping stale response");
                return Dispatch::Dropped(DropReason::Stale { category, generation, current });
            }
            _ => {}
        }

        let kind = match response.body {
            ResponseBody::Count(count) => {
                let stored = self.cache.set_count(category, count);
                self.states[slot] = RequestState::Loaded;
                ChangeKind::Count(stored)
            }
            ResponseBody::Item(record) => {
                let index = record.index();
                if !self.cache.add_item(record) {
                    self.stats.ignored += 1;
                    return Dispatch::Dropped(DropReason::OutOfRange { category, index });
                }
                if self.states[slot] != RequestState::Loaded {
                    self.states[slot] = RequestState::PartiallyLoaded;
                }
                trace!(%category, index, "Item stored");
                ChangeKind::Item(index)
            }
            ResponseBody::Bulk { section, text } => {
                let outcome = self.cache.load_bulk(category, section, text);
                self.states[slot] = if self.cache.is_loaded(category) {
                    RequestState::Loaded
                } else {
                    RequestState::PartiallyLoaded
                };
                ChangeKind::Bulk(outcome)
            }
        };

        self.stats.applied += 1;
        let change = DataChange::new(category, kind);
        self.listeners.notify(&change, &self.cache);
        self.flush_pending();
        Dispatch::Applied(change)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T> SyncSession<T> {
    /// Read-only view of the cached data
    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub fn state(&self, category: Category) -> RequestState {
        self.states[category.slot()]
    }

    pub fn status(&self, category: Category) -> ListStatus {
        self.cache.status(category)
    }

    /// Generation of the category's latest request, 0 before the first one
    pub fn generation(&self, category: Category) -> u32 {
        self.generations[category.slot()]
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Install the change listener for `category`, replacing any previous one
    ///
    /// The listener runs while the session is mutably borrowed. To start a
    /// follow-up request from it, queue one on [`SyncSession::requester`].
    pub fn set_changed_handler<F>(&mut self, category: Category, handler: F)
    where
        F: FnMut(&DataChange, &DataCache) + 'static,
    {
        self.listeners.set_changed_handler(category, handler);
    }

    /// Handle for queuing requests from inside listeners
    pub fn requester(&self) -> Requester {
        self.pending.clone()
    }

    pub fn clear_changed_handler(&mut self, category: Category) {
        self.listeners.clear(category);
    }

    /// Latest change of any category, for async consumers
    pub fn subscribe(&self) -> watch::Receiver<Option<DataChange>> {
        self.listeners.subscribe()
    }
}
