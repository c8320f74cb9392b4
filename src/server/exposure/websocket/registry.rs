//! Connection registry for WebSocket clients
//!
//! The `ConnectionRegistry` tracks every open WebSocket session and delivers
//! [`ServerMessage`]s to one of them or to all of them.
//!
//! # Architecture
//!
//! ```text
//! session task ──register──▶ ConnectionRegistry ◀──deregister── session task
//!                                   │
//!                        broadcast(message)
//!                                   │
//!                      snapshot membership (read lock)
//!                                   │
//!               for each connection: try_send on its bounded channel
//!                                   │
//!                    ──closed──▶ deregister
//!                    ──full────▶ count drop, evict past the threshold
//! ```
//!
//! The registry never owns a socket. A [`Connection`] is the sending half of
//! the channel that the session's writer task drains, so closing the socket
//! stays the session's job. Hand-off never waits: a slow peer loses messages
//! instead of stalling everyone else. A peer evicted for falling behind is
//! signalled through [`Connection::evicted`] so its session can close the
//! socket.

use super::protocol::ServerMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{Notify, RwLock, mpsc};
use uuid::Uuid;

/// Unique id of a connection (`conn_<uuid>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh id
    pub fn generate() -> Self {
        Self(format!("conn_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a message could not be handed to a connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The session's writer is gone (client disconnected)
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    /// The peer is not draining its queue
    #[error("connection {connection_id} is not keeping up ({dropped} messages dropped)")]
    Backpressure {
        connection_id: ConnectionId,
        dropped: u64,
    },
}

/// A handle to a single live WebSocket session
///
/// Cloning the handle does not clone the session: every clone feeds the same
/// outbound queue and shares the same drop counter and eviction signal.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::Sender<ServerMessage>,
    dropped: Arc<AtomicU64>,
    evicted: Arc<Notify>,
}

impl Connection {
    /// Create a connection whose outbound queue holds `capacity` messages
    ///
    /// The receiver goes to the session's writer task.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let connection = Self {
            id: ConnectionId::generate(),
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            evicted: Arc::new(Notify::new()),
        };
        (connection, rx)
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Consecutive messages dropped because the queue was full
    ///
    /// Reset by the next successful hand-off.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Whether the session's writer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the registry has evicted this connection as too slow
    ///
    /// The signal is latched, so a session that starts waiting after the
    /// eviction still sees it.
    pub async fn evicted(&self) {
        self.evicted.notified().await;
    }
}

/// Manages all active WebSocket connections
///
/// Thread-safe via `RwLock`. Broadcasts only hold the read lock long enough
/// to copy the membership; hand-offs happen with no lock held.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    max_dropped: u64,
}

impl ConnectionRegistry {
    /// Create a registry that evicts a connection after `max_dropped`
    /// consecutive drops
    pub fn new(max_dropped: u64) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            max_dropped: max_dropped.max(1),
        }
    }

    /// Add a connection to the active set
    ///
    /// Returns `false` if it was already registered; the set is unchanged in
    /// that case.
    pub async fn register(&self, connection: &Connection) -> bool {
        let mut connections = self.connections.write().await;
        if connections.contains_key(connection.id()) {
            return false;
        }
        connections.insert(connection.id().clone(), connection.clone());

        tracing::debug!(
            connection_id = %connection.id(),
            active = connections.len(),
            "WebSocket connection registered"
        );
        true
    }

    /// Remove a connection from the active set
    ///
    /// Returns `true` only for the call that actually removed it, so a session
    /// racing with a broadcast eviction can tell who cleaned up.
    pub async fn deregister(&self, connection_id: &ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(connection_id).is_some();

        if removed {
            tracing::debug!(
                connection_id = %connection_id,
                active = connections.len(),
                "WebSocket connection deregistered"
            );
        }
        removed
    }

    /// Deliver a message to exactly one connection
    ///
    /// A closed connection is deregistered, and so is one that has dropped
    /// too many messages. Either way the error is for the caller to log; it
    /// never affects other connections.
    pub async fn send_to(
        &self,
        connection: &Connection,
        message: ServerMessage,
    ) -> Result<(), DeliveryError> {
        match self.hand_off(connection, message) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.evict_if_needed(connection, &err).await;
                Err(err)
            }
        }
    }

    /// Deliver a message to every registered connection
    ///
    /// Best-effort: failures are logged and the failing connections are
    /// handled as in [`send_to`](Self::send_to). Returns how many connections
    /// accepted the message.
    pub async fn broadcast(&self, message: ServerMessage) -> usize {
        let snapshot: Vec<Connection> = {
            let connections = self.connections.read().await;
            connections.values().cloned().collect()
        };

        let mut delivered = 0;
        let mut failed = Vec::new();

        for connection in &snapshot {
            match self.hand_off(connection, message.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => failed.push((connection, err)),
            }
        }

        for (connection, err) in &failed {
            self.evict_if_needed(connection, err).await;
        }

        tracing::trace!(
            recipients = snapshot.len(),
            delivered,
            failed = failed.len(),
            "broadcast"
        );
        delivered
    }

    /// Get the number of active connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Check whether a connection is in the active set
    pub async fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(connection_id)
    }

    /// Non-blocking hand-off to the connection's outbound queue
    fn hand_off(
        &self,
        connection: &Connection,
        message: ServerMessage,
    ) -> Result<(), DeliveryError> {
        match connection.tx.try_send(message) {
            Ok(()) => {
                connection.dropped.store(0, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(DeliveryError::Closed(connection.id().clone()))
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = connection.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                Err(DeliveryError::Backpressure {
                    connection_id: connection.id().clone(),
                    dropped,
                })
            }
        }
    }

    async fn evict_if_needed(&self, connection: &Connection, err: &DeliveryError) {
        match err {
            DeliveryError::Closed(_) => {
                if self.deregister(connection.id()).await {
                    tracing::debug!(
                        connection_id = %connection.id(),
                        "Removed closed connection"
                    );
                }
            }
            DeliveryError::Backpressure { dropped, .. } if *dropped >= self.max_dropped => {
                if self.deregister(connection.id()).await {
                    connection.evicted.notify_one();
                    tracing::warn!(
                        connection_id = %connection.id(),
                        dropped,
                        "Removed slow connection"
                    );
                }
            }
            DeliveryError::Backpressure { dropped, .. } => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    dropped,
                    "Connection queue full, message dropped"
                );
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(100)
    }
}
