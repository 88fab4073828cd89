//! Watch-side data sync for a Formula 1 companion app.
//!
//! Flashback keeps a small, bounded cache of the season calendar, race
//! schedules and championship standings on the watch, filled on demand from
//! a paired phone over a constrained message channel.
//!
//! # Features
//!
//! - **Request protocol**: one request per category, answered by an item
//!   stream or a single delimited-text payload
//! - **Bounded cache**: fixed-capacity lists, truncated strings, no growth
//! - **Listeners**: one change callback per category, with read-only cache access
//!   and a [`Requester`] for follow-up requests
//! - **Date helpers**: fixed-width ISO parsing and watch-sized labels
//!
//! # Quick Start
//!
//! ```rust
//! use flashback::{Flashback, SyncConfig};
//! use flashback::protocol::encode_count;
//! use flashback::types::Category;
//!
//! # fn main() -> flashback::Result<()> {
//! let (session, _inbox, mut phone) = Flashback::in_memory(SyncConfig::default())?;
//!
//! session.borrow_mut().set_changed_handler(Category::TeamStandings, |change, cache| {
//!     println!("{:?}: {} teams", change.kind, cache.team_standings().count());
//! });
//! session.borrow_mut().request_category(Category::TeamStandings)?;
//! assert!(phone.try_recv().is_some());
//!
//! // Normally the driver feeds inbound messages; see `Driver::spawn_local`.
//! let reply = encode_count(Category::TeamStandings, 10, None);
//! session.borrow_mut().handle_message(&reply);
//! assert!(session.borrow().cache().is_loaded(Category::TeamStandings));
//! # Ok(())
//! # }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub mod cache;
pub mod config;
pub mod dates;
pub mod driver;
pub mod notify;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::*;

pub use cache::DataCache;
pub use config::SyncConfig;
pub use driver::{Driver, DriverHandle, DriverReport, StopReason};
pub use notify::{ChangeKind, DataChange};
pub use protocol::{RaceRound, Request};
pub use session::{Dispatch, RequestState, Requester, SyncSession};
pub use transport::{Message, MessageSource, Transport};

use transport::link::{self, PhoneLink, WatchInbox, WatchSender};

/// Session shared between the driver and UI code on one thread
pub type SharedSession<T> = Rc<RefCell<SyncSession<T>>>;

/// Install a `tracing` subscriber for the process
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Fails if a global
/// subscriber is already set.
pub fn init_logging() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| SyncError::config(format!("logging already initialised: {}", e)))
}

/// Entry point for opening sync sessions
pub struct Flashback;

impl Flashback {
    /// Open a session over any transport
    pub fn open<T: Transport>(transport: T, config: SyncConfig) -> Result<SharedSession<T>> {
        let session = SyncSession::new(transport, config)?;
        Ok(Rc::new(RefCell::new(session)))
    }

    /// Open a session over an in-memory link
    ///
    /// Returns the session, the inbox to hand to [`Driver::spawn_local`] and
    /// the phone end of the link.
    pub fn in_memory(
        config: SyncConfig,
    ) -> Result<(SharedSession<WatchSender>, WatchInbox, PhoneLink)> {
        let (sender, inbox, phone) = link::pair(config.queue_depth);
        let session = Self::open(sender, config)?;
        Ok((session, inbox, phone))
    }
}
