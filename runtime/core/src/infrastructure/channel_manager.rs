// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Channel manager
//!
//! Owns the physical channels realized on this runtime. Channels are keyed by
//! `(uri, side)` so the producer-facing and consumer-facing halves of a bound
//! channel coexist; collocated channels occupy a single entry. Entries are
//! reference-counted by attached connections: registration is idempotent per
//! key via the count, and unregistration of a channel that still has users is
//! rejected rather than silently deferred.

use crate::domain::events::MonitorEvent;
use crate::domain::physical::ChannelSide;
use crate::domain::uri::{QName, Uri};
use crate::infrastructure::event_bus::EventBus;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    #[error("channel {uri} already registered for side {side:?}")]
    Duplicate { uri: Uri, side: ChannelSide },
    #[error("channel {uri} not found for side {side:?}")]
    NotFound { uri: Uri, side: ChannelSide },
    #[error("channel {uri} has {count} attached connection(s) and cannot be unregistered")]
    InUse { uri: Uri, count: usize },
    #[error("channel {0} is not started")]
    NotStarted(Uri),
}

/// A live channel: an in-process broadcast fan-out from producers to
/// consumers. Durable delivery is a binding concern; the local channel is
/// always fire-and-forget.
#[derive(Debug)]
pub struct Channel {
    uri: Uri,
    deployable: QName,
    side: ChannelSide,
    active: AtomicBool,
    sender: broadcast::Sender<Value>,
}

impl Channel {
    pub fn new(uri: Uri, deployable: QName, side: ChannelSide) -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self {
            uri,
            deployable,
            side,
            active: AtomicBool::new(false),
            sender,
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn deployable(&self) -> &QName {
        &self.deployable
    }

    pub fn side(&self) -> ChannelSide {
        self.side
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Publishes an event to current subscribers. Events published before the
    /// channel's context started are rejected, not buffered.
    pub fn publish(&self, event: Value) -> Result<(), ChannelError> {
        if !self.is_active() {
            return Err(ChannelError::NotStarted(self.uri.clone()));
        }
        // no subscribers is a legal steady state
        let _ = self.sender.send(event);
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.sender.subscribe()
    }

    fn start(&self) {
        self.active.store(true, Ordering::Release);
    }

    fn stop(&self) {
        self.active.store(false, Ordering::Release);
    }
}

struct ChannelEntry {
    channel: Arc<Channel>,
    /// Number of attached connections using this channel.
    count: AtomicUsize,
}

/// Registry of channels on this runtime.
pub struct ChannelManager {
    channels: DashMap<(Uri, ChannelSide), ChannelEntry>,
    events: Arc<EventBus>,
}

impl ChannelManager {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            channels: DashMap::new(),
            events,
        }
    }

    pub fn register(&self, channel: Channel) -> Result<(), ChannelError> {
        let key = (channel.uri.clone(), channel.side);
        match self.channels.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ChannelError::Duplicate {
                uri: channel.uri.clone(),
                side: channel.side,
            }),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let uri = channel.uri.clone();
                debug!(channel = %uri, side = ?channel.side, "registering channel");
                vacant.insert(ChannelEntry {
                    channel: Arc::new(channel),
                    count: AtomicUsize::new(0),
                });
                self.events.publish(MonitorEvent::channel_registered(uri));
                Ok(())
            }
        }
    }

    /// Removes a channel with no attached connections. Connections must be
    /// detached first; an in-use channel is a typed error.
    pub fn unregister(&self, uri: &Uri, side: ChannelSide) -> Result<Arc<Channel>, ChannelError> {
        let key = (uri.clone(), side);
        loop {
            // remove_if holds the shard lock, so a concurrent attach cannot
            // slip in between the count check and the removal
            if let Some((_, entry)) = self
                .channels
                .remove_if(&key, |_, entry| entry.count.load(Ordering::Acquire) == 0)
            {
                debug!(channel = %uri, ?side, "unregistered channel");
                self.events
                    .publish(MonitorEvent::channel_unregistered(uri.clone()));
                return Ok(entry.channel);
            }
            let count = match self.channels.get(&key) {
                Some(entry) => entry.count.load(Ordering::Acquire),
                None => {
                    return Err(ChannelError::NotFound {
                        uri: uri.clone(),
                        side,
                    })
                }
            };
            if count > 0 {
                return Err(ChannelError::InUse {
                    uri: uri.clone(),
                    count,
                });
            }
            // count dropped to zero between the removal attempt and the
            // re-read; try again
        }
    }

    pub fn get_channel(&self, uri: &Uri, side: ChannelSide) -> Option<Arc<Channel>> {
        self.channels
            .get(&(uri.clone(), side))
            .map(|entry| Arc::clone(&entry.channel))
    }

    /// Looks up a channel and records one more attached connection.
    pub fn get_and_increment(
        &self,
        uri: &Uri,
        side: ChannelSide,
    ) -> Result<Arc<Channel>, ChannelError> {
        let entry = self
            .channels
            .get(&(uri.clone(), side))
            .ok_or_else(|| ChannelError::NotFound {
                uri: uri.clone(),
                side,
            })?;
        entry.count.fetch_add(1, Ordering::AcqRel);
        Ok(Arc::clone(&entry.channel))
    }

    /// Records one fewer attached connection and returns the channel.
    pub fn get_and_decrement(
        &self,
        uri: &Uri,
        side: ChannelSide,
    ) -> Result<Arc<Channel>, ChannelError> {
        let entry = self
            .channels
            .get(&(uri.clone(), side))
            .ok_or_else(|| ChannelError::NotFound {
                uri: uri.clone(),
                side,
            })?;
        // saturating: a detach without a matching attach stays at zero
        entry
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(1))
            })
            .ok();
        Ok(Arc::clone(&entry.channel))
    }

    /// Attached-connection count, or `None` for an unknown channel.
    pub fn get_count(&self, uri: &Uri, side: ChannelSide) -> Option<usize> {
        self.channels
            .get(&(uri.clone(), side))
            .map(|entry| entry.count.load(Ordering::Acquire))
    }

    /// Starts every channel contributed by `deployable`.
    pub fn start_context(&self, deployable: &QName) {
        for entry in self.channels.iter() {
            if entry.channel.deployable() == deployable {
                entry.channel.start();
            }
        }
    }

    /// Stops every channel contributed by `deployable`.
    pub fn stop_context(&self, deployable: &QName) {
        for entry in self.channels.iter() {
            if entry.channel.deployable() == deployable {
                entry.channel.stop();
            }
        }
    }
}
