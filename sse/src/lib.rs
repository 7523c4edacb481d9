//! Server-Sent Events (SSE) infrastructure for real-time updates.
//!
//! This crate pushes direct messages, group messages and notifications from the
//! backend to connected users as they happen.
//!
//! # Architecture
//!
//! - **Queue per connection**: every open stream owns a bounded queue. A user
//!   may have any number of streams open (tabs, devices).
//! - **Dual-index registry**: O(1) lookups for both connection management and
//!   user-scoped routing via separate DashMap indices.
//! - **Stream variants**: connections are opened either on the message stream or
//!   on the notification stream, and each event kind is only queued for the
//!   variants it targets.
//! - **Ephemeral events**: if a user is offline, or their queue is full, they
//!   miss the event and see fresh data on next load. A full queue is treated as a
//!   stuck consumer and evicted.
//! - **Bounded sessions**: sessions send heartbeats while idle and ask the client
//!   to reconnect before proxies would cut the connection.
//!
//! # Event Flow
//!
//! 1. Client opens `/messages/stream` or `/notifications/stream`
//! 2. Web layer resolves the bearer token to a user and opens a `StreamSession`
//! 3. The session registers its queue with the `Broadcaster`
//! 4. A producer commits a write and dispatches a `DomainEvent`
//! 5. `SseDomainEventHandler` calls `broadcast_to_user` for each recipient
//! 6. The session forwards the event to its client
//!
//! # Example: Sending an event
//!
//! ```rust,ignore
//! app_state
//!     .broadcaster
//!     .broadcast_to_user(&recipient_id.to_string(), "notification", &payload);
//! ```
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry with dual-index architecture and type-safe ConnectionId
//! - `broadcaster`: connect/disconnect and best-effort fan-out
//! - `message`: event kinds, stream kinds and queued frames
//! - `session`: the per-request stream protocol
//! - `domain_event_handler`: bridge from domain events to broadcasts

pub mod broadcaster;
pub mod connection;
pub mod domain_event_handler;
pub mod message;
pub mod session;

pub use broadcaster::Broadcaster;
pub use domain_event_handler::SseDomainEventHandler;
pub use message::{EventKind, Frame, StreamKind};
pub use session::{SessionConfig, StreamSession};
