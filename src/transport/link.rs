//! In-memory message link
//!
//! [`pair`] builds both ends of a bounded channel: the watch side
//! ([`WatchSender`] + [`WatchInbox`]) and a [`PhoneLink`] that plays the
//! companion app in tests, demos and benchmarks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace, warn};

use super::{Message, MessageSource, Transport};
use crate::{Result, SyncError};

/// Byte capacities set by `open()`, zero until then
#[derive(Debug, Default)]
struct Capacities {
    inbox: AtomicUsize,
    outbox: AtomicUsize,
}

/// Build a linked watch/phone pair with `queue_depth` messages per direction
pub fn pair(queue_depth: usize) -> (WatchSender, WatchInbox, PhoneLink) {
    let depth = queue_depth.max(1);
    let (to_phone, from_watch) = mpsc::channel(depth);
    let (to_watch, watch_rx) = mpsc::channel(depth);
    let capacities = Arc::new(Capacities::default());

    debug!("Created message link (queue depth {})", depth);

    (
        WatchSender { tx: to_phone, capacities: Arc::clone(&capacities) },
        WatchInbox { stream: ReceiverStream::new(watch_rx), capacities, dropped: 0 },
        PhoneLink { to_watch, from_watch },
    )
}

/// Watch-side outbound half
#[derive(Debug)]
pub struct WatchSender {
    tx: mpsc::Sender<Message>,
    capacities: Arc<Capacities>,
}

impl Transport for WatchSender {
    fn open(&mut self, inbox_capacity: usize, outbox_capacity: usize) -> Result<()> {
        if inbox_capacity == 0 || outbox_capacity == 0 {
            return Err(SyncError::config(format!(
                "buffer sizes must be positive (inbox {}, outbox {})",
                inbox_capacity, outbox_capacity
            )));
        }

        self.capacities.inbox.store(inbox_capacity, Ordering::Relaxed);
        self.capacities.outbox.store(outbox_capacity, Ordering::Relaxed);
        debug!(inbox = inbox_capacity, outbox = outbox_capacity, "Message link opened");
        Ok(())
    }

    fn send(&mut self, message: Message) -> Result<()> {
        let capacity = self.capacities.outbox.load(Ordering::Relaxed);
        if capacity == 0 {
            return Err(SyncError::NotOpen);
        }

        let size = message.encoded_len();
        if size > capacity {
            warn!(size, capacity, "Outbound message exceeds outbox");
            return Err(SyncError::MessageTooLarge { size, capacity, direction: "outbox" });
        }

        match self.tx.try_send(message) {
            Ok(()) => {
                trace!(size, "Outbound message queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(SyncError::busy()),
            Err(TrySendError::Closed(_)) => Err(SyncError::ChannelClosed),
        }
    }
}

/// Watch-side inbound half
///
/// Messages larger than the inbox capacity, or arriving before `open()`, are
/// dropped and counted.
#[derive(Debug)]
pub struct WatchInbox {
    stream: ReceiverStream<Message>,
    capacities: Arc<Capacities>,
    dropped: u64,
}

impl WatchInbox {
    /// Number of inbound messages dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[async_trait::async_trait]
impl MessageSource for WatchInbox {
    async fn next_message(&mut self) -> Result<Option<Message>> {
        while let Some(message) = self.stream.next().await {
            let capacity = self.capacities.inbox.load(Ordering::Relaxed);
            let size = message.encoded_len();

            if capacity == 0 {
                self.dropped += 1;
                warn!(size, "Inbound message dropped: link not open");
                continue;
            }

            if size > capacity {
                self.dropped += 1;
                warn!(size, capacity, "Inbound message dropped: exceeds inbox");
                continue;
            }

            trace!(size, "Inbound message received");
            return Ok(Some(message));
        }

        debug!("Inbound channel closed");
        Ok(None)
    }
}

/// Phone-side endpoint
#[derive(Debug)]
pub struct PhoneLink {
    to_watch: mpsc::Sender<Message>,
    from_watch: mpsc::Receiver<Message>,
}

impl PhoneLink {
    /// Deliver a message to the watch, waiting for queue space
    pub async fn send(&self, message: Message) -> Result<()> {
        self.to_watch.send(message).await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Deliver a message to the watch without waiting
    pub fn try_send(&self, message: Message) -> Result<()> {
        self.to_watch.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => SyncError::busy(),
            TrySendError::Closed(_) => SyncError::ChannelClosed,
        })
    }

    /// Wait for the next request from the watch
    pub async fn recv(&mut self) -> Option<Message> {
        self.from_watch.recv().await
    }

    /// Take a pending request from the watch, if any
    pub fn try_recv(&mut self) -> Option<Message> {
        self.from_watch.try_recv().ok()
    }
}
