// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Physical deployment model
//!
//! Serializable descriptors produced by the generator pipeline, 1:1 from
//! logical nodes, immutable once produced and consumed exactly once by the
//! builder/attacher pipeline on the hosting runtime. Binding- and
//! implementation-specific state travels as opaque `serde_json` config that
//! the core never inspects.

use crate::domain::contract::Operation;
use crate::domain::definition::{BindingKind, ChannelIntent, ImplementationKind};
use crate::domain::uri::{QName, Uri};
use serde::{Deserialize, Serialize};

/// Distinguishes the producer-facing and consumer-facing connection points of
/// the same logical channel on a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSide {
    Producer,
    Consumer,
    /// Producer and consumer collocated on the same runtime.
    Collocated,
}

/// An invokable operation on a physical wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalOperation {
    pub name: String,
    #[serde(default)]
    pub one_way: bool,
}

impl From<&Operation> for PhysicalOperation {
    fn from(operation: &Operation) -> Self {
        PhysicalOperation {
            name: operation.name.clone(),
            one_way: operation.output.is_none() && operation.inputs.is_empty(),
        }
    }
}

/// An executable component definition targeted at one runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalComponent {
    pub uri: Uri,
    pub kind: ImplementationKind,
    pub deployable: QName,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Source side of a physical wire (a reference or a binding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalWireSource {
    pub uri: Uri,
    pub kind: ImplementationKind,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Target side of a physical wire (a service or a binding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalWireTarget {
    pub uri: Uri,
    pub kind: ImplementationKind,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// A fully generated wire: source, target and the operation set snapshotted
/// from the logical contract at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalWire {
    pub source: PhysicalWireSource,
    pub target: PhysicalWireTarget,
    pub operations: Vec<PhysicalOperation>,
}

/// A channel realized on a runtime, one definition per side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalChannel {
    pub uri: Uri,
    pub side: ChannelSide,
    pub deployable: QName,
    #[serde(default)]
    pub intents: Vec<ChannelIntent>,
}

impl PhysicalChannel {
    pub fn is_durable(&self) -> bool {
        self.intents.contains(&ChannelIntent::Durable)
    }
}

/// Source side of a channel connection: a producer, channel binding or the
/// channel itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConnectionSource {
    pub uri: Uri,
    pub kind: BindingKind,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub topic: Option<String>,
}

impl PhysicalConnectionSource {
    /// Connections are memoized and reused when their source and target ids
    /// match; bindings that must guarantee a single transport endpoint per
    /// runtime rely on this id being stable across generations.
    pub fn source_id(&self) -> String {
        format!("{}_source_{}", self.uri, self.kind.0)
    }
}

/// Target side of a channel connection: a consumer, channel binding or the
/// channel itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConnectionTarget {
    pub uri: Uri,
    pub kind: BindingKind,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub sequence: i32,
}

impl PhysicalConnectionTarget {
    pub fn target_id(&self) -> String {
        format!("{}_target_{}", self.uri, self.kind.0)
    }
}

/// A generated channel connection between a source and a target through a
/// channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalChannelConnection {
    pub channel: Uri,
    pub side: ChannelSide,
    pub source: PhysicalConnectionSource,
    pub target: PhysicalConnectionTarget,
}

/// One step of a deployment plan, dispatched by kind through the command
/// executor registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DeploymentCommand {
    BuildChannel(PhysicalChannel),
    DisposeChannel(PhysicalChannel),
    BuildComponent(PhysicalComponent),
    DisposeComponent(PhysicalComponent),
    AttachWire(PhysicalWire),
    DetachWire(PhysicalWire),
    AttachConnection(PhysicalChannelConnection),
    DetachConnection(PhysicalChannelConnection),
    StartContext(QName),
    StopContext(QName),
}

impl DeploymentCommand {
    /// The registry key used for executor dispatch.
    pub fn kind(&self) -> CommandKind {
        match self {
            DeploymentCommand::BuildChannel(_) => CommandKind::BuildChannel,
            DeploymentCommand::DisposeChannel(_) => CommandKind::DisposeChannel,
            DeploymentCommand::BuildComponent(_) => CommandKind::BuildComponent,
            DeploymentCommand::DisposeComponent(_) => CommandKind::DisposeComponent,
            DeploymentCommand::AttachWire(_) => CommandKind::AttachWire,
            DeploymentCommand::DetachWire(_) => CommandKind::DetachWire,
            DeploymentCommand::AttachConnection(_) => CommandKind::AttachConnection,
            DeploymentCommand::DetachConnection(_) => CommandKind::DetachConnection,
            DeploymentCommand::StartContext(_) => CommandKind::StartContext,
            DeploymentCommand::StopContext(_) => CommandKind::StopContext,
        }
    }
}

/// Closed set of command kinds; the executor registry maps each to a
/// registered executor and rejects unregistered kinds with a typed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    BuildChannel,
    DisposeChannel,
    BuildComponent,
    DisposeComponent,
    AttachWire,
    DetachWire,
    AttachConnection,
    DetachConnection,
    StartContext,
    StopContext,
}

/// Ordered list of commands realizing one deployment operation on a runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub deployable: Option<QName>,
    pub commands: Vec<DeploymentCommand>,
}

impl DeploymentPlan {
    pub fn new(deployable: QName) -> Self {
        Self {
            deployable: Some(deployable),
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DeploymentCommand) {
        self.commands.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
