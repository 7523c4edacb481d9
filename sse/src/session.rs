//! A single long-lived stream: one queue, one client.
//!
//! The session registers its queue on open and emits `connected`, then forwards
//! queued events, sends a `ping` after every idle heartbeat interval and ends
//! with `reconnect` once the connection has been open for the configured
//! maximum, or as soon as the server queues a `reconnect` of its own. The queue is unregistered exactly once on every exit path: normal
//! end, eviction, the stream being dropped by the server when the client goes
//! away, or a panic unwinding through the task that owns it.

use crate::broadcaster::Broadcaster;
use crate::connection::{ConnectionId, UserId};
use crate::message::{EventKind, Frame, StreamKind};
use futures::Stream;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::time::{timeout, Instant};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// Stays under the ~10 minute idle-connection limit of common reverse proxies.
pub const DEFAULT_MAX_CONNECTION_AGE: Duration = Duration::from_secs(9 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub heartbeat_interval: Duration,
    pub max_connection_age: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            max_connection_age: DEFAULT_MAX_CONNECTION_AGE,
        }
    }
}

/// Unregisters its connection when released or dropped, whichever comes first.
struct ConnectionGuard {
    broadcaster: Arc<Broadcaster>,
    connection_id: Option<ConnectionId>,
}

impl ConnectionGuard {
    fn release(&mut self) {
        if let Some(connection_id) = self.connection_id.take() {
            self.broadcaster.disconnect(&connection_id);
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct StreamSession {
    user_id: UserId,
    stream: StreamKind,
    receiver: Receiver<Frame>,
    guard: ConnectionGuard,
    config: SessionConfig,
}

impl StreamSession {
    pub fn open(
        broadcaster: Arc<Broadcaster>,
        user_id: UserId,
        stream: StreamKind,
        config: SessionConfig,
    ) -> Self {
        let (connection_id, receiver) = broadcaster.connect(user_id.clone(), stream);

        Self {
            user_id,
            stream,
            receiver,
            guard: ConnectionGuard {
                broadcaster,
                connection_id: Some(connection_id),
            },
            config,
        }
    }

    pub fn connection_id(&self) -> Option<&ConnectionId> {
        self.guard.connection_id.as_ref()
    }

    /// Turns the session into the stream of frames to send to the client.
    pub fn into_stream(self) -> impl Stream<Item = Frame> + Send + 'static {
        let StreamSession {
            user_id,
            stream,
            mut receiver,
            mut guard,
            config,
        } = self;

        async_stream::stream! {
            let started = Instant::now();
            yield Frame::connected(&user_id);

            loop {
                let elapsed = started.elapsed();
                if elapsed >= config.max_connection_age {
                    info!("Closing {stream} stream for user {user_id} after {elapsed:?}, asking client to reconnect");
                    yield Frame::reconnect("max_connection_time");
                    break;
                }

                let wait = config
                    .heartbeat_interval
                    .min(config.max_connection_age - elapsed);

                match timeout(wait, receiver.recv()).await {
                    Ok(Some(frame)) if *frame.kind() == EventKind::Reconnect => {
                        info!("Server asked {stream} stream of user {user_id} to reconnect, closing");
                        yield frame;
                        break;
                    }
                    Ok(Some(frame)) => yield frame,
                    Ok(None) => {
                        warn!("{stream} stream for user {user_id} was evicted, closing");
                        break;
                    }
                    Err(_) => {
                        if started.elapsed() < config.max_connection_age {
                            trace!("Heartbeat for {stream} stream of user {user_id}");
                            yield Frame::ping();
                        }
                    }
                }
            }

            guard.release();
            debug!("{stream} stream closed for user {user_id}");
        }
    }
}
