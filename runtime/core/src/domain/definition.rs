// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Declarative assembly definitions
//!
//! The input to the deployment pipeline: a fully populated declarative tree
//! produced by an introspection front-end (XML, annotations, programmatic).
//! This core never parses a serialized form itself; the types are plain serde
//! data so any front-end can construct them.
//!
//! [`CompositeBuilder`] and [`ComponentBuilder`] provide the programmatic
//! front-end used throughout the test suite.

use crate::domain::contract::ServiceContract;
use crate::domain::uri::QName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag selecting the implementation-type generator for a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImplementationKind(pub String);

impl From<&str> for ImplementationKind {
    fn from(value: &str) -> Self {
        ImplementationKind(value.to_string())
    }
}

/// Tag selecting the binding generator/attacher strategies for a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingKind(pub String);

impl From<&str> for BindingKind {
    fn from(value: &str) -> Self {
        BindingKind(value.to_string())
    }
}

/// Reference multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Multiplicity {
    #[serde(rename = "0..1")]
    ZeroOne,
    #[serde(rename = "1..1")]
    One,
    #[serde(rename = "0..n")]
    ZeroN,
    #[serde(rename = "1..n")]
    OneN,
}

impl Multiplicity {
    /// True for `0..n` and `1..n`: the reference may be extended by later
    /// deployments and is re-resolved on every autowire pass.
    pub fn is_many(&self) -> bool {
        matches!(self, Multiplicity::ZeroN | Multiplicity::OneN)
    }

    /// True for `1..1` and `1..n`: at least one wire or binding must resolve
    /// before the component is deployable.
    pub fn is_required(&self) -> bool {
        matches!(self, Multiplicity::One | Multiplicity::OneN)
    }
}

/// Protocol-specific binding declaration; the core treats the config as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingDefinition {
    pub kind: BindingKind,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl BindingDefinition {
    pub fn new(kind: impl Into<BindingKind>, config: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            config,
        }
    }
}

/// Channel delivery policy flags, snapshotted into physical definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelIntent {
    Durable,
    NonPersistent,
}

/// A property value: either set inline or sourced from the parent composite's
/// property document via a JSON pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Inline(serde_json::Value),
    /// JSON pointer evaluated against the parent composite's properties.
    Source(String),
}

/// A service offered by a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub contract: ServiceContract,
    #[serde(default)]
    pub bindings: Vec<BindingDefinition>,
    #[serde(default)]
    pub callback_bindings: Vec<BindingDefinition>,
}

/// A reference required (or optionally consumed) by a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDefinition {
    pub name: String,
    pub contract: ServiceContract,
    pub multiplicity: Multiplicity,
    /// Explicit targets (`component` or `component#service`), relative to the
    /// parent composite. Non-empty targets disable autowire for this reference.
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub bindings: Vec<BindingDefinition>,
    #[serde(default)]
    pub callback_bindings: Vec<BindingDefinition>,
}

/// A producer pushing events to one or more channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerDefinition {
    pub name: String,
    /// Channel names, relative to the parent composite.
    pub targets: Vec<String>,
}

/// A consumer receiving events from one or more channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerDefinition {
    pub name: String,
    /// Channel names, relative to the parent composite.
    pub sources: Vec<String>,
    #[serde(default)]
    pub sequence: i32,
}

/// A pub/sub channel declared in a composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDefinition {
    pub name: String,
    #[serde(default)]
    pub bindings: Vec<BindingDefinition>,
    #[serde(default)]
    pub intents: Vec<ChannelIntent>,
}

/// A resource contributed by a composite (data sources, thread pools, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Component implementation: either a nested composite or a leaf
/// implementation handled by a registered generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Implementation {
    Composite(Box<Composite>),
    Leaf {
        kind: ImplementationKind,
        #[serde(default)]
        config: serde_json::Value,
    },
}

/// A component declaration inside a composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub name: String,
    pub implementation: Implementation,
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
    #[serde(default)]
    pub references: Vec<ReferenceDefinition>,
    #[serde(default)]
    pub producers: Vec<ProducerDefinition>,
    #[serde(default)]
    pub consumers: Vec<ConsumerDefinition>,
    #[serde(default)]
    pub property_values: BTreeMap<String, PropertyValue>,
}

/// A deployable composite: the unit handed to the instantiator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composite {
    pub name: QName,
    #[serde(default)]
    pub components: Vec<ComponentDefinition>,
    #[serde(default)]
    pub channels: Vec<ChannelDefinition>,
    #[serde(default)]
    pub resources: Vec<ResourceDefinition>,
    /// Composite-level property document available to `PropertyValue::Source`
    /// pointers.
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// Fluent builder for [`Composite`] definitions.
pub struct CompositeBuilder {
    composite: Composite,
}

impl CompositeBuilder {
    pub fn new(name: QName) -> Self {
        Self {
            composite: Composite {
                name,
                components: Vec::new(),
                channels: Vec::new(),
                resources: Vec::new(),
                properties: serde_json::Value::Null,
            },
        }
    }

    pub fn component(mut self, component: ComponentDefinition) -> Self {
        self.composite.components.push(component);
        self
    }

    pub fn channel(mut self, channel: ChannelDefinition) -> Self {
        self.composite.channels.push(channel);
        self
    }

    pub fn resource(mut self, resource: ResourceDefinition) -> Self {
        self.composite.resources.push(resource);
        self
    }

    pub fn properties(mut self, properties: serde_json::Value) -> Self {
        self.composite.properties = properties;
        self
    }

    pub fn build(self) -> Composite {
        self.composite
    }
}

/// Fluent builder for [`ComponentDefinition`]s.
pub struct ComponentBuilder {
    component: ComponentDefinition,
}

impl ComponentBuilder {
    pub fn new(name: impl Into<String>, implementation: Implementation) -> Self {
        Self {
            component: ComponentDefinition {
                name: name.into(),
                implementation,
                services: Vec::new(),
                references: Vec::new(),
                producers: Vec::new(),
                consumers: Vec::new(),
                property_values: BTreeMap::new(),
            },
        }
    }

    /// Leaf implementation shortcut.
    pub fn leaf(name: impl Into<String>, kind: impl Into<ImplementationKind>) -> Self {
        Self::new(
            name,
            Implementation::Leaf {
                kind: kind.into(),
                config: serde_json::Value::Null,
            },
        )
    }

    pub fn service(mut self, service: ServiceDefinition) -> Self {
        self.component.services.push(service);
        self
    }

    pub fn reference(mut self, reference: ReferenceDefinition) -> Self {
        self.component.references.push(reference);
        self
    }

    pub fn producer(mut self, producer: ProducerDefinition) -> Self {
        self.component.producers.push(producer);
        self
    }

    pub fn consumer(mut self, consumer: ConsumerDefinition) -> Self {
        self.component.consumers.push(consumer);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.component.property_values.insert(name.into(), value);
        self
    }

    pub fn build(self) -> ComponentDefinition {
        self.component
    }
}
