//! Driver pumps inbound messages into a session

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::session::SyncSession;
use crate::transport::{MessageSource, Transport};
use crate::{Result, SyncError};

/// Why the driver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Cancelled,
    /// The source reported end of stream
    SourceClosed,
    /// The configured number of consecutive source errors was reached
    TooManyErrors,
}

/// Summary returned when the driver task ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverReport {
    pub messages: u64,
    pub applied: u64,
    pub errors: u64,
    pub stop: StopReason,
}

/// Handle to a running driver task
#[derive(Debug)]
pub struct DriverHandle {
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    task: JoinHandle<DriverReport>,
}

impl DriverHandle {
    /// Wait for the driver to stop on its own
    pub async fn join(self) -> Result<DriverReport> {
        self.task
            .await
            .map_err(|e| SyncError::transport_with_source("driver task failed", Box::new(e)))
    }

    /// Cancel the driver and wait for it
    pub async fn shutdown(self) -> Result<DriverReport> {
        self.cancel.cancel();
        self.join().await
    }
}

/// Driver owns the message source and feeds the session
///
/// The session lives on one thread behind `Rc<RefCell<_>>`; the driver only
/// borrows it while handling a message, so UI code on the same `LocalSet`
/// can read the cache and send requests between messages. A borrow held
/// across an await makes the driver yield until it is released.
pub struct Driver;

impl Driver {
    /// Spawn the driver on the current `LocalSet`
    ///
    /// # Panics
    ///
    /// Panics when called outside a `LocalSet`, like `tokio::task::spawn_local`.
    pub fn spawn_local<S, T>(source: S, session: Rc<RefCell<SyncSession<T>>>) -> DriverHandle
    where
        S: MessageSource,
        T: Transport + 'static,
    {
        let cancel = CancellationToken::new();
        let cancel_reader = cancel.clone();

        let task = tokio::task::spawn_local(async move {
            Self::message_reader_task(source, session, cancel_reader).await
        });

        DriverHandle { cancel, task }
    }

    async fn message_reader_task<S, T>(
        mut source: S,
        session: Rc<RefCell<SyncSession<T>>>,
        cancel: CancellationToken,
    ) -> DriverReport
    where
        S: MessageSource,
        T: Transport,
    {
        info!("Message reader task started");
        let config = session.borrow().config().clone();
        let max_errors = config.max_driver_errors;

        let mut messages = 0u64;
        let mut applied = 0u64;
        let mut errors = 0u64;
        let mut error_count = 0u32;

        let stop = loop {
            if cancel.is_cancelled() {
                info!("Message reader cancelled");
                break StopReason::Cancelled;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Message reader cancelled while waiting");
                    break StopReason::Cancelled;
                }
                result = source.next_message() => result,
            };

            match result {
                Ok(Some(message)) => {
                    messages += 1;
                    error_count = 0;

                    let dispatch = loop {
                        match session.try_borrow_mut() {
                            Ok(mut session) => break session.handle_message(&message),
                            Err(_) => {
                                trace!("Session borrowed elsewhere, yielding");
                                tokio::task::yield_now().await;
                            }
                        }
                    };
                    if dispatch.is_applied() {
                        applied += 1;
                    }
                    trace!("Message {}: {:?}", messages, dispatch);
                }
                Ok(None) => {
                    info!("Message source ended after {} messages", messages);
                    break StopReason::SourceClosed;
                }
                Err(e) => {
                    errors += 1;
                    error_count += 1;
                    error!("Message source error ({}/{}): {}", error_count, max_errors, e);

                    if error_count >= max_errors {
                        error!("Too many message source errors, shutting down");
                        break StopReason::TooManyErrors;
                    }

                    let backoff = config.backoff(error_count);
                    debug!("Retrying message source in {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                }
            }
        };

        info!("Message reader task ended (processed {} messages)", messages);
        DriverReport { messages, applied, errors, stop }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::notify::ChangeKind;
    use crate::protocol::{encode_bulk, encode_count};
    use crate::test_utils::{RecordingTransport, ScriptedSource, TEAM_STANDINGS};
    use crate::types::Category;
    use tokio::task::LocalSet;

    fn shared_session(config: SyncConfig) -> Rc<RefCell<SyncSession<RecordingTransport>>> {
        let session = SyncSession::new(RecordingTransport::default(), config).unwrap();
        Rc::new(RefCell::new(session))
    }

    #[tokio::test]
    async fn applies_messages_until_source_closes() {
        LocalSet::new()
            .run_until(async {
                let session = shared_session(SyncConfig::default());
                session.borrow_mut().request_category(Category::TeamStandings).unwrap();

                let source = ScriptedSource::new()
                    .message(encode_bulk(Category::TeamStandings, None, TEAM_STANDINGS, Some(1)))
                    .message(encode_count(Category::DriverStandings, 3, None));

                let report = Driver::spawn_local(source, Rc::clone(&session)).join().await.unwrap();
                assert_eq!(report.stop, StopReason::SourceClosed);
                assert_eq!((report.messages, report.applied), (2, 1));

                let session = session.borrow();
                assert_eq!(session.cache().team_standings().len(), 4);
                assert!(!session.cache().is_loaded(Category::DriverStandings));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn survives_transient_errors() {
        LocalSet::new()
            .run_until(async {
                let session = shared_session(SyncConfig::default());
                session.borrow_mut().request_category(Category::TeamStandings).unwrap();

                let source = ScriptedSource::new()
                    .error(SyncError::transport("link hiccup"))
                    .error(SyncError::transport("link hiccup"))
                    .message(encode_count(Category::TeamStandings, 0, None));

                let report = Driver::spawn_local(source, Rc::clone(&session)).join().await.unwrap();
                assert_eq!(report.stop, StopReason::SourceClosed);
                assert_eq!(report.errors, 2);
                assert!(session.borrow().cache().is_loaded(Category::TeamStandings));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_error_budget() {
        LocalSet::new()
            .run_until(async {
                let config = SyncConfig { max_driver_errors: 3, ..SyncConfig::default() };
                let session = shared_session(config);

                let source = (0..5).fold(ScriptedSource::new(), |source, _| {
                    source.error(SyncError::transport("link down"))
                });

                let report = Driver::spawn_local(source, session).join().await.unwrap();
                assert_eq!(report.stop, StopReason::TooManyErrors);
                assert_eq!(report.errors, 3);
            })
            .await;
    }

    #[tokio::test]
    async fn listener_requests_go_out_between_messages() {
        LocalSet::new()
            .run_until(async {
                let session = shared_session(SyncConfig::default());
                let requester = session.borrow().requester();
                session.borrow_mut().set_changed_handler(Category::TeamStandings, move |change, _| {
                    if let ChangeKind::Bulk(_) = change.kind {
                        requester.request_category(Category::DriverStandings).unwrap();
                    }
                });
                session.borrow_mut().request_category(Category::TeamStandings).unwrap();

                let source = ScriptedSource::new()
                    .message(encode_bulk(Category::TeamStandings, None, TEAM_STANDINGS, Some(1)))
                    .message(encode_count(Category::DriverStandings, 0, Some(1)));

                let report = Driver::spawn_local(source, Rc::clone(&session)).join().await.unwrap();
                assert_eq!((report.messages, report.applied), (2, 2));

                let session = session.borrow();
                assert_eq!(session.transport().sent.len(), 2);
                assert!(session.cache().is_loaded(Category::DriverStandings));
            })
            .await;
    }

    #[tokio::test]
    async fn waits_for_a_borrow_held_across_an_await() {
        LocalSet::new()
            .run_until(async {
                let session = shared_session(SyncConfig::default());
                session.borrow_mut().request_category(Category::TeamStandings).unwrap();

                let source = ScriptedSource::new()
                    .message(encode_count(Category::TeamStandings, 2, None));
                let handle = Driver::spawn_local(source, Rc::clone(&session));

                let reader = session.borrow();
                for _ in 0..3 {
                    tokio::task::yield_now().await;
                }
                assert!(!reader.cache().is_loaded(Category::TeamStandings));
                drop(reader);

                let report = handle.join().await.unwrap();
                assert_eq!(report.applied, 1);
                assert!(session.borrow().cache().is_loaded(Category::TeamStandings));
            })
            .await;
    }

    #[tokio::test]
    async fn cancellation_stops_an_idle_driver() {
        LocalSet::new()
            .run_until(async {
                let session = shared_session(SyncConfig::default());
                let handle = Driver::spawn_local(ScriptedSource::new().hold_open(), session);

                tokio::task::yield_now().await;
                let report = handle.shutdown().await.unwrap();
                assert_eq!(report.stop, StopReason::Cancelled);
                assert_eq!(report.messages, 0);
            })
            .await;
    }
}
