//! Message channel between watch and phone.
//!
//! The channel is split in two seams:
//! - [`Transport`] sends outbound messages; sending never blocks and reports a
//!   busy or oversize outbox as an error value
//! - [`MessageSource`] yields inbound messages; the driver pulls from it and
//!   hands each message to the sync session
//!
//! [`link`] provides an in-memory implementation of both sides.

pub mod link;
mod message;

pub use message::{Message, Value, keys};

use crate::Result;

/// Outbound half of the message channel
pub trait Transport {
    /// Configure inbox and outbox buffer sizes in bytes
    fn open(&mut self, inbox_capacity: usize, outbox_capacity: usize) -> Result<()>;

    /// Queue one message for delivery
    ///
    /// Returns immediately. Errors:
    /// - `Busy` - the outbox queue is full, retry later
    /// - `MessageTooLarge` - the message exceeds the outbox capacity
    /// - `ChannelClosed` - the peer is gone
    fn send(&mut self, message: Message) -> Result<()>;
}

/// Inbound half of the message channel
#[async_trait::async_trait]
pub trait MessageSource: Send + 'static {
    /// Get the next inbound message
    ///
    /// Returns:
    /// - `Ok(Some(message))` - Message received
    /// - `Ok(None)` - Channel ended (normal termination)
    /// - `Err(e)` - Transient receive failure
    async fn next_message(&mut self) -> Result<Option<Message>>;
}
