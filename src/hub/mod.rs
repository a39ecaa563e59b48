//! Topic hub: per-topic fan-out of notifications to live listeners
//!
//! Publishers call [`TopicHub::publish`]; every listener currently subscribed
//! to that topic gets a [`Notification`] on its own unbounded queue. Removing
//! a listener's sender (through [`TopicHub::release`] or
//! [`TopicHub::close_all`]) closes its queue, which is how a waiting consumer
//! learns the source is gone.

use std::fmt;
use std::str::FromStr;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Categories of events a display can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// Arena status changed; consumers fetch a fresh snapshot.
    Status,
    /// Displays should reload themselves. Carries no data.
    Reload,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Status, Topic::Reload];

    /// Wire name, also used as the outbound message type
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Status => "status",
            Topic::Reload => "reload",
        }
    }

    /// Whether a message for this topic carries a full snapshot
    pub fn carries_snapshot(&self) -> bool {
        matches!(self, Topic::Status)
    }

}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(Topic::Status),
            "reload" => Ok(Topic::Reload),
            other => Err(format!("unknown topic: {other}")),
        }
    }
}

/// A single delivery to a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub topic: Topic,
    /// Per-topic publish counter, starting at 1
    pub sequence: u64,
}

/// Identifies a registration inside the hub; used to release it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    id: Uuid,
    topic: Topic,
}

impl ListenerKey {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

/// Live subscription to one topic
#[derive(Debug)]
pub struct Listener {
    key: ListenerKey,
    queue: mpsc::UnboundedReceiver<Notification>,
}

impl Listener {
    pub fn key(&self) -> ListenerKey {
        self.key
    }

    pub fn topic(&self) -> Topic {
        self.key.topic
    }

    /// Wait for the next notification. `None` means the hub closed this
    /// listener and nothing more will arrive.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.queue.recv().await
    }

    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<Notification> {
        self.queue.try_recv().ok()
    }
}

/// Owns every listener registration, per topic
pub struct TopicHub {
    listeners: DashMap<ListenerKey, mpsc::UnboundedSender<Notification>>,
    // Entry held across fan-out so per-topic sequence order matches enqueue order.
    sequences: DashMap<Topic, u64>,
}

impl TopicHub {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            sequences: DashMap::new(),
        }
    }

    /// Register a new listener on `topic`.
    pub fn subscribe(&self, topic: Topic) -> Listener {
        let (tx, queue) = mpsc::unbounded_channel();
        let key = ListenerKey {
            id: Uuid::new_v4(),
            topic,
        };
        self.listeners.insert(key, tx);
        trace!(listener = %key.id, %topic, "listener subscribed");
        Listener { key, queue }
    }

    /// Drop a registration. Returns `false` if it was already gone, which is
    /// not an error: teardown may race an administrative close.
    pub fn release(&self, key: &ListenerKey) -> bool {
        let removed = self.listeners.remove(key).is_some();
        if removed {
            trace!(listener = %key.id, topic = %key.topic, "listener released");
        }
        removed
    }

    /// Deliver a notification to every listener of `topic`. Returns how many
    /// listeners received it.
    pub fn publish(&self, topic: Topic) -> usize {
        let mut sequence = self.sequences.entry(topic).or_insert(0);
        *sequence += 1;
        let notification = Notification {
            topic,
            sequence: *sequence,
        };

        let mut delivered = 0;
        let mut stale = Vec::new();
        for entry in self.listeners.iter() {
            if entry.key().topic != topic {
                continue;
            }
            if entry.value().send(notification).is_ok() {
                delivered += 1;
            } else {
                stale.push(*entry.key());
            }
        }
        for key in stale {
            self.listeners.remove(&key);
        }

        trace!(%topic, sequence = notification.sequence, delivered, "published");
        delivered
    }

    /// Close every listener on every topic (disconnect-all). Returns how many
    /// were closed.
    pub fn close_all(&self) -> usize {
        let count = self.listeners.len();
        self.listeners.clear();
        debug!(count, "closed all listeners");
        count
    }

    /// Number of live registrations on `topic`.
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.listeners
            .iter()
            .filter(|entry| entry.key().topic == topic)
            .count()
    }
}

impl Default for TopicHub {
    fn default() -> Self {
        Self::new()
    }
}
