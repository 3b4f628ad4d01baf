// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Logical assembly model
//!
//! The in-memory graph the deployment pipeline operates on. Each node tracks
//! the deployable unit that contributed it and a [`LogicalState`]:
//!
//! - `New` — instantiated logically, not yet realized physically.
//! - `Provisioned` — live on a runtime.
//! - `Marked` — flagged for removal by the collector's mark phase.
//!
//! Ownership is arena-style: the whole tree is owned by the root
//! [`LogicalComposite`] held inside the deployment coordinator
//! (`DomainAssembly`); there are no parent back-pointers. Wires are owned by
//! the composite that scopes them, keyed by source reference URI, so a wire
//! contributed by one deployable can decorate components owned by another.

use crate::domain::contract::ServiceContract;
use crate::domain::definition::{
    BindingDefinition, ChannelIntent, ImplementationKind, Multiplicity, ResourceDefinition,
};
use crate::domain::uri::{QName, Uri};
use std::collections::BTreeMap;

/// Lifecycle state shared by every logical node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalState {
    New,
    Provisioned,
    Marked,
}

/// A binding attached to a service, reference or channel. Bindings carry
/// their own deployable tag: they can be added in deployments separate from
/// the node they decorate, and are collected independently.
#[derive(Debug, Clone)]
pub struct LogicalBinding {
    pub definition: BindingDefinition,
    pub deployable: Option<QName>,
    pub state: LogicalState,
    pub callback: bool,
}

impl LogicalBinding {
    pub fn new(definition: BindingDefinition, deployable: Option<QName>) -> Self {
        Self {
            definition,
            deployable,
            state: LogicalState::New,
            callback: false,
        }
    }

    pub fn callback(definition: BindingDefinition, deployable: Option<QName>) -> Self {
        Self {
            callback: true,
            ..Self::new(definition, deployable)
        }
    }
}

/// A typed endpoint offered by a component.
#[derive(Debug, Clone)]
pub struct LogicalService {
    pub uri: Uri,
    pub contract: ServiceContract,
    pub bindings: Vec<LogicalBinding>,
    pub callback_bindings: Vec<LogicalBinding>,
}

impl LogicalService {
    pub fn new(uri: Uri, contract: ServiceContract) -> Self {
        Self {
            uri,
            contract,
            bindings: Vec::new(),
            callback_bindings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.uri.fragment_name().unwrap_or_default()
    }
}

/// A typed dependency declared by a component.
#[derive(Debug, Clone)]
pub struct LogicalReference {
    pub uri: Uri,
    pub contract: ServiceContract,
    pub multiplicity: Multiplicity,
    /// Set once the reference has at least one wire or binding. Multiplicity
    /// references are reset and re-resolved on every autowire pass.
    pub resolved: bool,
    /// Explicit target service URIs; non-empty targets disable autowire.
    pub targets: Vec<Uri>,
    pub bindings: Vec<LogicalBinding>,
    pub callback_bindings: Vec<LogicalBinding>,
}

impl LogicalReference {
    pub fn new(uri: Uri, contract: ServiceContract, multiplicity: Multiplicity) -> Self {
        Self {
            uri,
            contract,
            multiplicity,
            resolved: false,
            targets: Vec::new(),
            bindings: Vec::new(),
            callback_bindings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.uri.fragment_name().unwrap_or_default()
    }

    /// A reference with a transport binding is not autowired.
    pub fn is_bound(&self) -> bool {
        !self.bindings.is_empty()
    }
}

/// Directed edge from a source reference to a target service.
///
/// For autowired references the wire is tagged with the *target's* deployable
/// so it is removed when the target is undeployed.
#[derive(Debug, Clone)]
pub struct LogicalWire {
    pub source: Uri,
    pub target: Uri,
    pub deployable: Option<QName>,
    pub state: LogicalState,
}

impl LogicalWire {
    pub fn new(source: Uri, target: Uri, deployable: Option<QName>) -> Self {
        Self {
            source,
            target,
            deployable,
            state: LogicalState::New,
        }
    }
}

/// A producer endpoint pushing events to channels.
#[derive(Debug, Clone)]
pub struct LogicalProducer {
    pub uri: Uri,
    /// Channel URIs this producer publishes to.
    pub targets: Vec<Uri>,
}

/// A consumer endpoint receiving events from channels.
#[derive(Debug, Clone)]
pub struct LogicalConsumer {
    pub uri: Uri,
    /// Channel URIs this consumer subscribes to.
    pub sources: Vec<Uri>,
    pub sequence: i32,
}

/// A named pub/sub channel. Channels may be shared by producers and
/// consumers contributed by different deployable units; the runtime-side
/// channel manager reference-counts the physical channel.
#[derive(Debug, Clone)]
pub struct LogicalChannel {
    pub uri: Uri,
    pub deployable: Option<QName>,
    pub state: LogicalState,
    pub bindings: Vec<LogicalBinding>,
    pub intents: Vec<ChannelIntent>,
}

impl LogicalChannel {
    pub fn new(uri: Uri, deployable: Option<QName>) -> Self {
        Self {
            uri,
            deployable,
            state: LogicalState::New,
            bindings: Vec::new(),
            intents: Vec::new(),
        }
    }
}

/// A resource contributed by a composite.
#[derive(Debug, Clone)]
pub struct LogicalResource {
    pub definition: ResourceDefinition,
    pub deployable: Option<QName>,
    pub state: LogicalState,
}

impl LogicalResource {
    pub fn new(definition: ResourceDefinition, deployable: Option<QName>) -> Self {
        Self {
            definition,
            deployable,
            state: LogicalState::New,
        }
    }
}

/// Implementation side of a logical component.
#[derive(Debug, Clone)]
pub enum LogicalImplementation {
    Composite(LogicalComposite),
    Leaf {
        kind: ImplementationKind,
        config: serde_json::Value,
    },
}

/// A deployed instance of a component type, uniquely addressed by URI and
/// owned exclusively by its parent composite.
#[derive(Debug, Clone)]
pub struct LogicalComponent {
    pub uri: Uri,
    pub deployable: Option<QName>,
    pub state: LogicalState,
    pub properties: BTreeMap<String, serde_json::Value>,
    pub services: Vec<LogicalService>,
    pub references: Vec<LogicalReference>,
    pub producers: Vec<LogicalProducer>,
    pub consumers: Vec<LogicalConsumer>,
    pub implementation: LogicalImplementation,
}

impl LogicalComponent {
    pub fn new(uri: Uri, deployable: Option<QName>, implementation: LogicalImplementation) -> Self {
        Self {
            uri,
            deployable,
            state: LogicalState::New,
            properties: BTreeMap::new(),
            services: Vec::new(),
            references: Vec::new(),
            producers: Vec::new(),
            consumers: Vec::new(),
            implementation,
        }
    }

    pub fn service(&self, name: &str) -> Option<&LogicalService> {
        self.services.iter().find(|s| s.name() == name)
    }

    pub fn reference(&self, name: &str) -> Option<&LogicalReference> {
        self.references.iter().find(|r| r.name() == name)
    }

    pub fn reference_mut(&mut self, name: &str) -> Option<&mut LogicalReference> {
        self.references.iter_mut().find(|r| r.name() == name)
    }

    pub fn as_composite(&self) -> Option<&LogicalComposite> {
        match &self.implementation {
            LogicalImplementation::Composite(composite) => Some(composite),
            LogicalImplementation::Leaf { .. } => None,
        }
    }

    pub fn as_composite_mut(&mut self) -> Option<&mut LogicalComposite> {
        match &mut self.implementation {
            LogicalImplementation::Composite(composite) => Some(composite),
            LogicalImplementation::Leaf { .. } => None,
        }
    }

    /// The implementation kind tag for generator dispatch; `None` for
    /// composites, which are structural and never generated directly.
    pub fn implementation_kind(&self) -> Option<&ImplementationKind> {
        match &self.implementation {
            LogicalImplementation::Leaf { kind, .. } => Some(kind),
            LogicalImplementation::Composite(_) => None,
        }
    }
}

/// The contents of a composite: child components, channels, resources, and
/// the wires scoped to this composite.
#[derive(Debug, Clone, Default)]
pub struct LogicalComposite {
    pub components: Vec<LogicalComponent>,
    pub channels: Vec<LogicalChannel>,
    pub resources: Vec<LogicalResource>,
    /// Wires keyed by source reference URI, in creation order.
    pub wires: BTreeMap<Uri, Vec<LogicalWire>>,
}

impl LogicalComposite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(&self, uri: &Uri) -> Option<&LogicalComponent> {
        self.components.iter().find(|c| &c.uri == uri)
    }

    pub fn component_mut(&mut self, uri: &Uri) -> Option<&mut LogicalComponent> {
        self.components.iter_mut().find(|c| &c.uri == uri)
    }

    pub fn channel(&self, uri: &Uri) -> Option<&LogicalChannel> {
        self.channels.iter().find(|c| &c.uri == uri)
    }

    pub fn add_wire(&mut self, wire: LogicalWire) {
        self.wires.entry(wire.source.clone()).or_default().push(wire);
    }

    pub fn wires_for(&self, reference: &Uri) -> &[LogicalWire] {
        self.wires.get(reference).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Recursive lookup across nested composites.
    pub fn find_component(&self, uri: &Uri) -> Option<&LogicalComponent> {
        for component in &self.components {
            if &component.uri == uri {
                return Some(component);
            }
            if let Some(child) = component.as_composite() {
                if let Some(found) = child.find_component(uri) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Recursive lookup of a service endpoint by its fragment URI.
    pub fn find_service(&self, uri: &Uri) -> Option<&LogicalService> {
        let component = self.find_component(&uri.defragmented())?;
        component.service(uri.fragment_name()?)
    }
}
