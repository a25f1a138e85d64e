//! Connection hub: fan-out to every socket plus one direct channel per socket

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Buffered messages per connection before a slow client starts losing them
pub const CHANNEL_CAPACITY: usize = 64;

/// Receiving ends handed to a connection's writer task
pub struct Connection {
    pub direct_rx: mpsc::Receiver<ServerMsg>,
    pub broadcast_rx: broadcast::Receiver<ServerMsg>,
}

/// Routes outbound messages. Sending never waits on a socket: a full or
/// closed receiver only affects that receiver.
#[derive(Clone)]
pub struct Hub {
    all_tx: broadcast::Sender<ServerMsg>,
    direct: Arc<DashMap<Uuid, mpsc::Sender<ServerMsg>>>,
}

impl Hub {
    pub fn new() -> Self {
        let (all_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            all_tx,
            direct: Arc::new(DashMap::new()),
        }
    }

    /// Register a connection and get its receiving ends
    pub fn register(&self, session_id: Uuid) -> Connection {
        let (direct_tx, direct_rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.direct.insert(session_id, direct_tx);

        Connection {
            direct_rx,
            broadcast_rx: self.all_tx.subscribe(),
        }
    }

    pub fn unregister(&self, session_id: &Uuid) {
        self.direct.remove(session_id);
    }

    /// Send to one connection. Returns false if the message was dropped.
    pub fn send_to(&self, session_id: &Uuid, msg: ServerMsg) -> bool {
        let Some(tx) = self.direct.get(session_id).map(|r| r.value().clone()) else {
            debug!(session_id = %session_id, "No direct channel for session");
            return false;
        };

        match tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session_id = %session_id, "Direct channel full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session_id = %session_id, "Direct channel closed");
                false
            }
        }
    }

    /// Send to every connection. Returns how many receivers were subscribed.
    pub fn broadcast(&self, msg: ServerMsg) -> usize {
        // Err only means nobody is connected
        self.all_tx.send(msg).unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.direct.len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(score: u32) -> ServerMsg {
        ServerMsg::ScoreUpdate { score }
    }

    #[tokio::test]
    async fn test_direct_message_reaches_only_target() {
        let hub = Hub::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut conn_a = hub.register(a);
        let mut conn_b = hub.register(b);

        assert!(hub.send_to(&a, score(10)));

        assert_eq!(conn_a.direct_rx.recv().await, Some(score(10)));
        assert!(conn_b.direct_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let hub = Hub::new();
        let mut conns: Vec<Connection> = (0..3).map(|_| hub.register(Uuid::new_v4())).collect();

        assert_eq!(hub.broadcast(score(1)), 3);
        for conn in &mut conns {
            assert_eq!(conn.broadcast_rx.recv().await.unwrap(), score(1));
        }
    }

    #[test]
    fn test_broadcast_without_connections_is_harmless() {
        let hub = Hub::new();
        assert_eq!(hub.broadcast(score(1)), 0);
    }

    #[test]
    fn test_full_direct_channel_drops_without_blocking() {
        let hub = Hub::new();
        let id = Uuid::new_v4();
        let _conn = hub.register(id);

        for _ in 0..CHANNEL_CAPACITY {
            assert!(hub.send_to(&id, score(0)));
        }
        assert!(!hub.send_to(&id, score(0)));
    }

    #[tokio::test]
    async fn test_slow_receiver_lags_instead_of_blocking() {
        let hub = Hub::new();
        let mut slow = hub.register(Uuid::new_v4());

        for i in 0..(CHANNEL_CAPACITY as u32 + 5) {
            hub.broadcast(score(i));
        }

        assert!(matches!(
            slow.broadcast_rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(5))
        ));
    }

    #[test]
    fn test_unregister_stops_direct_delivery() {
        let hub = Hub::new();
        let id = Uuid::new_v4();
        let _conn = hub.register(id);
        assert_eq!(hub.connection_count(), 1);

        hub.unregister(&id);
        assert_eq!(hub.connection_count(), 0);
        assert!(!hub.send_to(&id, score(0)));
    }
}
