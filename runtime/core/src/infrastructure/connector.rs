// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Connector
//!
//! Attaches and detaches physical wires and channel connections on this
//! runtime. Attacher strategies are registered per kind tag; wire targets
//! create the terminal invokers, wire sources install the chains. Channel
//! connections are memoized by `(source_id, target_id)` and user-counted so
//! bindings that require a single transport endpoint per runtime attach it
//! exactly once; the physical attach happens on first use and the detach on
//! last release.

use crate::domain::physical::{
    PhysicalChannelConnection, PhysicalWire, PhysicalWireSource, PhysicalWireTarget,
};
use crate::domain::uri::Uri;
use crate::infrastructure::builder::BuilderError;
use crate::infrastructure::channel_manager::ChannelManager;
use crate::infrastructure::wire::{InterceptorChain, Invoker, RuntimeWire};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Creates terminal invokers for a wire target.
#[async_trait]
pub trait TargetWireAttacher: Send + Sync {
    async fn create_invoker(
        &self,
        target: &PhysicalWireTarget,
        operation: &str,
    ) -> Result<Arc<dyn Invoker>, BuilderError>;

    async fn detach(&self, _target: &PhysicalWireTarget) -> Result<(), BuilderError> {
        Ok(())
    }
}

/// Installs an assembled wire on its source.
#[async_trait]
pub trait SourceWireAttacher: Send + Sync {
    async fn attach(
        &self,
        source: &PhysicalWireSource,
        target: &PhysicalWireTarget,
        wire: Arc<RuntimeWire>,
    ) -> Result<(), BuilderError>;

    async fn detach(
        &self,
        source: &PhysicalWireSource,
        target: &PhysicalWireTarget,
    ) -> Result<(), BuilderError>;
}

/// Attaches the source end of a channel connection.
#[async_trait]
pub trait SourceConnectionAttacher: Send + Sync {
    async fn attach(&self, connection: &PhysicalChannelConnection) -> Result<(), BuilderError>;

    async fn detach(&self, connection: &PhysicalChannelConnection) -> Result<(), BuilderError>;
}

/// Attaches the target end of a channel connection.
#[async_trait]
pub trait TargetConnectionAttacher: Send + Sync {
    async fn attach(&self, connection: &PhysicalChannelConnection) -> Result<(), BuilderError>;

    async fn detach(&self, connection: &PhysicalChannelConnection) -> Result<(), BuilderError>;
}

/// A live, user-counted channel connection on this runtime.
#[derive(Debug)]
pub struct ChannelConnection {
    pub definition: PhysicalChannelConnection,
}

struct ConnectionEntry {
    connection: Arc<ChannelConnection>,
    users: AtomicUsize,
}

#[derive(Default)]
pub struct Connector {
    wire_sources: HashMap<String, Arc<dyn SourceWireAttacher>>,
    wire_targets: HashMap<String, Arc<dyn TargetWireAttacher>>,
    connection_sources: HashMap<String, Arc<dyn SourceConnectionAttacher>>,
    connection_targets: HashMap<String, Arc<dyn TargetConnectionAttacher>>,
    wires: DashMap<(Uri, Uri), Arc<RuntimeWire>>,
    connections: DashMap<(String, String), ConnectionEntry>,
}

impl Connector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_source_wire_attacher(
        &mut self,
        kind: impl Into<String>,
        attacher: Arc<dyn SourceWireAttacher>,
    ) {
        self.wire_sources.insert(kind.into(), attacher);
    }

    pub fn register_target_wire_attacher(
        &mut self,
        kind: impl Into<String>,
        attacher: Arc<dyn TargetWireAttacher>,
    ) {
        self.wire_targets.insert(kind.into(), attacher);
    }

    pub fn register_source_connection_attacher(
        &mut self,
        kind: impl Into<String>,
        attacher: Arc<dyn SourceConnectionAttacher>,
    ) {
        self.connection_sources.insert(kind.into(), attacher);
    }

    pub fn register_target_connection_attacher(
        &mut self,
        kind: impl Into<String>,
        attacher: Arc<dyn TargetConnectionAttacher>,
    ) {
        self.connection_targets.insert(kind.into(), attacher);
    }

    /// Assembles and attaches a wire: the target attacher supplies one
    /// terminal invoker per operation, the source attacher installs the
    /// resulting chains.
    pub async fn connect(&self, physical: &PhysicalWire) -> Result<(), BuilderError> {
        let source_attacher = self
            .wire_sources
            .get(&physical.source.kind.0)
            .ok_or_else(|| BuilderError::NoAttacher(physical.source.kind.0.clone()))?;
        let target_attacher = self
            .wire_targets
            .get(&physical.target.kind.0)
            .ok_or_else(|| BuilderError::NoAttacher(physical.target.kind.0.clone()))?;

        let mut wire = RuntimeWire::new();
        for operation in &physical.operations {
            let invoker = target_attacher
                .create_invoker(&physical.target, &operation.name)
                .await?;
            wire.add_chain(InterceptorChain::new(operation.name.clone(), invoker));
        }
        let wire = Arc::new(wire);

        debug!(source = %physical.source.uri, target = %physical.target.uri, "attaching wire");
        source_attacher
            .attach(&physical.source, &physical.target, Arc::clone(&wire))
            .await?;
        self.wires.insert(
            (physical.source.uri.clone(), physical.target.uri.clone()),
            wire,
        );
        Ok(())
    }

    pub async fn disconnect(&self, physical: &PhysicalWire) -> Result<(), BuilderError> {
        let source_attacher = self
            .wire_sources
            .get(&physical.source.kind.0)
            .ok_or_else(|| BuilderError::NoAttacher(physical.source.kind.0.clone()))?;
        let target_attacher = self
            .wire_targets
            .get(&physical.target.kind.0)
            .ok_or_else(|| BuilderError::NoAttacher(physical.target.kind.0.clone()))?;

        debug!(source = %physical.source.uri, target = %physical.target.uri, "detaching wire");
        source_attacher
            .detach(&physical.source, &physical.target)
            .await?;
        target_attacher.detach(&physical.target).await?;
        self.wires
            .remove(&(physical.source.uri.clone(), physical.target.uri.clone()));
        Ok(())
    }

    /// The assembled wire between a source and target, if attached.
    pub fn wire(&self, source: &Uri, target: &Uri) -> Option<Arc<RuntimeWire>> {
        self.wires
            .get(&(source.clone(), target.clone()))
            .map(|w| Arc::clone(&w))
    }

    /// Attaches a channel connection, reusing an existing one with the same
    /// source and target ids.
    pub async fn connect_channel(
        &self,
        physical: &PhysicalChannelConnection,
    ) -> Result<Arc<ChannelConnection>, BuilderError> {
        let key = (physical.source.source_id(), physical.target.target_id());
        if let Some(entry) = self.connections.get(&key) {
            entry.users.fetch_add(1, Ordering::AcqRel);
            debug!(source = %key.0, target = %key.1, "reusing channel connection");
            return Ok(Arc::clone(&entry.connection));
        }

        let source_attacher = self
            .connection_sources
            .get(&physical.source.kind.0)
            .ok_or_else(|| BuilderError::NoAttacher(physical.source.kind.0.clone()))?;
        let target_attacher = self
            .connection_targets
            .get(&physical.target.kind.0)
            .ok_or_else(|| BuilderError::NoAttacher(physical.target.kind.0.clone()))?;

        debug!(source = %key.0, target = %key.1, "attaching channel connection");
        source_attacher.attach(physical).await?;
        target_attacher.attach(physical).await?;

        let connection = Arc::new(ChannelConnection {
            definition: physical.clone(),
        });
        self.connections.insert(
            key,
            ConnectionEntry {
                connection: Arc::clone(&connection),
                users: AtomicUsize::new(1),
            },
        );
        Ok(connection)
    }

    /// Releases one user of a channel connection; the physical detach runs
    /// when the last user releases.
    pub async fn disconnect_channel(
        &self,
        physical: &PhysicalChannelConnection,
    ) -> Result<(), BuilderError> {
        let key = (physical.source.source_id(), physical.target.target_id());
        let remaining = {
            let entry = match self.connections.get(&key) {
                Some(entry) => entry,
                None => return Ok(()),
            };
            let previous = entry
                .users
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    Some(current.saturating_sub(1))
                })
                .unwrap_or(0);
            previous.saturating_sub(1)
        };
        if remaining > 0 {
            return Ok(());
        }

        self.connections.remove(&key);
        let source_attacher = self
            .connection_sources
            .get(&physical.source.kind.0)
            .ok_or_else(|| BuilderError::NoAttacher(physical.source.kind.0.clone()))?;
        let target_attacher = self
            .connection_targets
            .get(&physical.target.kind.0)
            .ok_or_else(|| BuilderError::NoAttacher(physical.target.kind.0.clone()))?;
        debug!(source = %key.0, target = %key.1, "detaching channel connection");
        source_attacher.detach(physical).await?;
        target_attacher.detach(physical).await?;
        Ok(())
    }

    pub fn connection_users(&self, physical: &PhysicalChannelConnection) -> usize {
        let key = (physical.source.source_id(), physical.target.target_id());
        self.connections
            .get(&key)
            .map(|entry| entry.users.load(Ordering::Acquire))
            .unwrap_or(0)
    }
}

/// Local in-process connection attacher: binds connection endpoints to the
/// channel manager and maintains the channel's user count.
pub struct LocalConnectionAttacher {
    channels: Arc<ChannelManager>,
}

impl LocalConnectionAttacher {
    pub fn new(channels: Arc<ChannelManager>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl SourceConnectionAttacher for LocalConnectionAttacher {
    async fn attach(&self, connection: &PhysicalChannelConnection) -> Result<(), BuilderError> {
        // the channel's user count tracks connections, not endpoints: only
        // the endpoint that is the channel itself bumps it
        if connection.source.uri != connection.channel {
            self.channels
                .get_and_increment(&connection.channel, connection.side)?;
        }
        Ok(())
    }

    async fn detach(&self, connection: &PhysicalChannelConnection) -> Result<(), BuilderError> {
        if connection.source.uri != connection.channel {
            self.channels
                .get_and_decrement(&connection.channel, connection.side)?;
        }
        Ok(())
    }
}

#[async_trait]
impl TargetConnectionAttacher for LocalConnectionAttacher {
    async fn attach(&self, connection: &PhysicalChannelConnection) -> Result<(), BuilderError> {
        if connection.target.uri != connection.channel {
            self.channels
                .get_and_increment(&connection.channel, connection.side)?;
        }
        Ok(())
    }

    async fn detach(&self, connection: &PhysicalChannelConnection) -> Result<(), BuilderError> {
        if connection.target.uri != connection.channel {
            self.channels
                .get_and_decrement(&connection.channel, connection.side)?;
        }
        Ok(())
    }
}
