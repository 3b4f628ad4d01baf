// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Event bus
//!
//! In-memory pub/sub for [`MonitorEvent`]s using tokio broadcast channels.
//! The deployment pipeline and the runtime containers publish here; host
//! monitor layers subscribe and render. In-memory only: events published with
//! no subscribers are dropped, and a slow subscriber that falls behind the
//! channel capacity loses the oldest events.

use crate::domain::events::MonitorEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<MonitorEvent>>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publishes an event to all subscribers. Never fails; an event with no
    /// listeners is simply dropped.
    pub fn publish(&self, event: MonitorEvent) {
        debug!(?event, "publishing monitor event");
        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("no subscribers listening");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<MonitorEvent>,
}

impl EventReceiver {
    /// Receives the next event, waiting until one is published.
    pub async fn recv(&mut self) -> Result<MonitorEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Receives an already-buffered event without waiting.
    pub fn try_recv(&mut self) -> Result<MonitorEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("event bus is closed")]
    Closed,

    #[error("no events available")]
    Empty,

    #[error("receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::uri::QName;

    #[tokio::test]
    async fn publish_subscribe_roundtrip() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();

        bus.publish(MonitorEvent::deployed(QName::new("urn:test", "app")));

        match receiver.recv().await.unwrap() {
            MonitorEvent::Deployed { deployable, .. } => {
                assert_eq!(deployable, QName::new("urn:test", "app"));
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(MonitorEvent::leadership_changed(true));

        assert!(matches!(
            first.recv().await.unwrap(),
            MonitorEvent::LeadershipChanged { leader: true, .. }
        ));
        assert!(matches!(
            second.recv().await.unwrap(),
            MonitorEvent::LeadershipChanged { leader: true, .. }
        ));
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::new(4);
        bus.publish(MonitorEvent::leadership_changed(false));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
