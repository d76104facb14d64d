use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{Money, SessionId};

const CHANNEL_CAPACITY: usize = 64;

/// What changed in a session's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// Local copy replaced by the authoritative cart.
    Replaced { items: usize, total: Money },
    Cleared,
}

/// Broadcast hub for cart changes, one channel per session.
pub struct NotifyHub {
    channels: DashMap<SessionId, broadcast::Sender<CartEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a session's cart. Creates the channel if needed.
    pub fn subscribe(&self, session: SessionId) -> broadcast::Receiver<CartEvent> {
        let sender = self
            .channels
            .entry(session)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, session: SessionId, event: &CartEvent) {
        if let Some(sender) = self.channels.get(&session) {
            let _ = sender.send(event.clone());
        }
    }

    /// Drop a session's channel (e.g. when the tab closes).
    pub fn remove(&self, session: &SessionId) {
        self.channels.remove(session);
    }
}
