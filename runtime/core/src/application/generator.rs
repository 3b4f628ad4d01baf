// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Generator pipeline
//!
//! Transforms logical nodes into physical definitions. Strategy objects are
//! selected from a registry keyed on the node's kind tag; an unregistered tag
//! is a typed [`GenerationError::GeneratorNotFound`], never a panic.
//! Generators are pure functions over a frozen snapshot of the logical node:
//! everything a physical definition needs is cloned at generation time so
//! later logical-model mutation cannot leak into an already-generated
//! artifact.
//!
//! Generation errors for one deployable are collected into a single
//! [`GenerationFailure`] batch so one attempt reports every broken node.

use crate::domain::definition::{BindingKind, ImplementationKind};
use crate::domain::logical::{
    LogicalBinding, LogicalChannel, LogicalComponent, LogicalComposite, LogicalConsumer,
    LogicalProducer, LogicalReference, LogicalService, LogicalState, LogicalWire,
};
use crate::domain::physical::{
    ChannelSide, DeploymentCommand, DeploymentPlan, PhysicalChannel, PhysicalChannelConnection,
    PhysicalConnectionSource, PhysicalConnectionTarget, PhysicalOperation, PhysicalWire,
    PhysicalWireSource, PhysicalWireTarget,
};
use crate::domain::physical::PhysicalComponent;
use crate::domain::uri::{QName, Uri};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Kind tag for connections realized in-process against the local channel
/// manager rather than through a transport binding.
pub const LOCAL_BINDING: &str = "channel.local";

/// Ambient state available to every generator.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub domain: Uri,
    pub zone: String,
}

/// A single generation error, carrying enough context for a host log layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("no generator registered for kind '{kind}' (node {uri})")]
    GeneratorNotFound { kind: String, uri: Uri },
    #[error("interface of {uri} cannot be used with binding '{kind}': {reason}")]
    IncompatibleContract {
        uri: Uri,
        kind: String,
        reason: String,
    },
    #[error("component {0} has no implementation kind and cannot be generated")]
    NotGeneratable(Uri),
    #[error("wire source {origin} refers to missing component {component}")]
    DanglingWire { origin: Uri, component: Uri },
    #[error("generation failed for {uri}: {reason}")]
    Other { uri: Uri, reason: String },
}

/// Batch of generation errors for one deployable unit.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("generation of {deployable} failed with {} error(s)", errors.len())]
pub struct GenerationFailure {
    pub deployable: QName,
    pub errors: Vec<GenerationError>,
}

/// Generates physical definitions for a leaf implementation type.
pub trait ComponentGenerator: Send + Sync {
    fn generate(
        &self,
        component: &LogicalComponent,
        context: &GenerationContext,
    ) -> Result<PhysicalComponent, GenerationError>;

    fn generate_wire_source(
        &self,
        component: &LogicalComponent,
        reference: &LogicalReference,
        context: &GenerationContext,
    ) -> Result<PhysicalWireSource, GenerationError>;

    fn generate_wire_target(
        &self,
        component: &LogicalComponent,
        service: &LogicalService,
        context: &GenerationContext,
    ) -> Result<PhysicalWireTarget, GenerationError>;

    /// Producer-side connection endpoint; the default is a local in-process
    /// connection.
    fn generate_connection_source(
        &self,
        _component: &LogicalComponent,
        producer: &LogicalProducer,
        _context: &GenerationContext,
    ) -> Result<PhysicalConnectionSource, GenerationError> {
        Ok(PhysicalConnectionSource {
            uri: producer.uri.clone(),
            kind: BindingKind(LOCAL_BINDING.to_string()),
            config: serde_json::Value::Null,
            topic: None,
        })
    }

    /// Consumer-side connection endpoint; the default is a local in-process
    /// connection.
    fn generate_connection_target(
        &self,
        _component: &LogicalComponent,
        consumer: &LogicalConsumer,
        _context: &GenerationContext,
    ) -> Result<PhysicalConnectionTarget, GenerationError> {
        Ok(PhysicalConnectionTarget {
            uri: consumer.uri.clone(),
            kind: BindingKind(LOCAL_BINDING.to_string()),
            config: serde_json::Value::Null,
            sequence: consumer.sequence,
        })
    }
}

/// Generates the transport side of a bound service or reference wire.
pub trait WireBindingGenerator: Send + Sync {
    fn generate_source(
        &self,
        binding: &LogicalBinding,
        service: &LogicalService,
        context: &GenerationContext,
    ) -> Result<PhysicalWireSource, GenerationError>;

    fn generate_target(
        &self,
        binding: &LogicalBinding,
        reference: &LogicalReference,
        context: &GenerationContext,
    ) -> Result<PhysicalWireTarget, GenerationError>;
}

/// Generates transport connection endpoints for a bound channel.
pub trait ConnectionBindingGenerator: Send + Sync {
    fn generate_connection_source(
        &self,
        binding: &LogicalBinding,
        channel: &LogicalChannel,
        context: &GenerationContext,
    ) -> Result<PhysicalConnectionSource, GenerationError>;

    fn generate_connection_target(
        &self,
        binding: &LogicalBinding,
        channel: &LogicalChannel,
        context: &GenerationContext,
    ) -> Result<PhysicalConnectionTarget, GenerationError>;
}

/// Registry of generator strategies keyed by kind tag.
#[derive(Default)]
pub struct GeneratorRegistry {
    components: HashMap<ImplementationKind, Arc<dyn ComponentGenerator>>,
    wire_bindings: HashMap<BindingKind, Arc<dyn WireBindingGenerator>>,
    connection_bindings: HashMap<BindingKind, Arc<dyn ConnectionBindingGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_component_generator(
        &mut self,
        kind: impl Into<ImplementationKind>,
        generator: Arc<dyn ComponentGenerator>,
    ) {
        self.components.insert(kind.into(), generator);
    }

    pub fn register_wire_binding_generator(
        &mut self,
        kind: impl Into<BindingKind>,
        generator: Arc<dyn WireBindingGenerator>,
    ) {
        self.wire_bindings.insert(kind.into(), generator);
    }

    pub fn register_connection_binding_generator(
        &mut self,
        kind: impl Into<BindingKind>,
        generator: Arc<dyn ConnectionBindingGenerator>,
    ) {
        self.connection_bindings.insert(kind.into(), generator);
    }

    fn component_generator(
        &self,
        component: &LogicalComponent,
    ) -> Result<&Arc<dyn ComponentGenerator>, GenerationError> {
        let kind = component
            .implementation_kind()
            .ok_or_else(|| GenerationError::NotGeneratable(component.uri.clone()))?;
        self.components
            .get(kind)
            .ok_or_else(|| GenerationError::GeneratorNotFound {
                kind: kind.0.clone(),
                uri: component.uri.clone(),
            })
    }

    fn wire_binding_generator(
        &self,
        binding: &LogicalBinding,
        uri: &Uri,
    ) -> Result<&Arc<dyn WireBindingGenerator>, GenerationError> {
        self.wire_bindings
            .get(&binding.definition.kind)
            .ok_or_else(|| GenerationError::GeneratorNotFound {
                kind: binding.definition.kind.0.clone(),
                uri: uri.clone(),
            })
    }

    fn connection_binding_generator(
        &self,
        binding: &LogicalBinding,
        uri: &Uri,
    ) -> Result<&Arc<dyn ConnectionBindingGenerator>, GenerationError> {
        self.connection_bindings
            .get(&binding.definition.kind)
            .ok_or_else(|| GenerationError::GeneratorNotFound {
                kind: binding.definition.kind.0.clone(),
                uri: uri.clone(),
            })
    }
}

/// Walks the logical tree and produces an ordered [`DeploymentPlan`] for one
/// deployment operation, selecting nodes by lifecycle state: `New` nodes for
/// deploy, `Marked` nodes for undeploy.
pub struct DeploymentGenerator {
    registry: Arc<GeneratorRegistry>,
    context: GenerationContext,
}

impl DeploymentGenerator {
    pub fn new(registry: Arc<GeneratorRegistry>, context: GenerationContext) -> Self {
        Self { registry, context }
    }

    /// Generates the forward plan: build channels, build components, attach
    /// wires, attach connections, start the deployable context.
    pub fn generate_deploy(
        &self,
        root: &LogicalComposite,
        deployable: &QName,
    ) -> Result<DeploymentPlan, GenerationFailure> {
        let mut plan = DeploymentPlan::new(deployable.clone());
        let mut errors = Vec::new();

        self.generate_composite(root, LogicalState::New, &mut plan, &mut errors);
        plan.push(DeploymentCommand::StartContext(deployable.clone()));

        if errors.is_empty() {
            Ok(plan)
        } else {
            Err(GenerationFailure {
                deployable: deployable.clone(),
                errors,
            })
        }
    }

    /// Generates the reverse plan against a fully-marked, still-navigable
    /// graph: stop context, detach connections and wires, dispose components
    /// and channels. Must run before the collector sweep.
    pub fn generate_undeploy(
        &self,
        root: &LogicalComposite,
        deployable: &QName,
    ) -> Result<DeploymentPlan, GenerationFailure> {
        let mut forward = DeploymentPlan::new(deployable.clone());
        let mut errors = Vec::new();
        self.generate_composite(root, LogicalState::Marked, &mut forward, &mut errors);

        if !errors.is_empty() {
            return Err(GenerationFailure {
                deployable: deployable.clone(),
                errors,
            });
        }

        // Detach before destroy: reverse the forward ordering and invert each
        // command.
        let mut plan = DeploymentPlan::new(deployable.clone());
        plan.push(DeploymentCommand::StopContext(deployable.clone()));
        for command in forward.commands.into_iter().rev() {
            plan.push(Self::invert(command));
        }
        Ok(plan)
    }

    fn invert(command: DeploymentCommand) -> DeploymentCommand {
        match command {
            DeploymentCommand::BuildChannel(channel) => DeploymentCommand::DisposeChannel(channel),
            DeploymentCommand::BuildComponent(component) => {
                DeploymentCommand::DisposeComponent(component)
            }
            DeploymentCommand::AttachWire(wire) => DeploymentCommand::DetachWire(wire),
            DeploymentCommand::AttachConnection(connection) => {
                DeploymentCommand::DetachConnection(connection)
            }
            other => other,
        }
    }

    /// Emits commands for every node in `state` within one composite scope,
    /// recursing into nested composites first so leaf dependencies build
    /// bottom-up.
    fn generate_composite(
        &self,
        composite: &LogicalComposite,
        state: LogicalState,
        plan: &mut DeploymentPlan,
        errors: &mut Vec<GenerationError>,
    ) {
        for component in &composite.components {
            if let Some(child) = component.as_composite() {
                self.generate_composite(child, state, plan, errors);
            }
        }

        for channel in &composite.channels {
            self.generate_channel(channel, state, plan, errors);
        }

        for component in &composite.components {
            if component.as_composite().is_some() {
                continue;
            }
            if component.state == state {
                match self
                    .registry
                    .component_generator(component)
                    .and_then(|generator| generator.generate(component, &self.context))
                {
                    Ok(physical) => plan.push(DeploymentCommand::BuildComponent(physical)),
                    Err(error) => errors.push(error),
                }
            }
            self.generate_bound_services(component, state, plan, errors);
            self.generate_bound_references(component, state, plan, errors);
        }

        self.generate_wires(composite, state, plan, errors);

        // Connections attach last: both the component and the channel must be
        // built before a connection joins them.
        for component in &composite.components {
            if component.as_composite().is_none() && component.state == state {
                self.generate_component_connections(composite, component, plan, errors);
            }
        }
    }

    fn generate_channel(
        &self,
        channel: &LogicalChannel,
        state: LogicalState,
        plan: &mut DeploymentPlan,
        errors: &mut Vec<GenerationError>,
    ) {
        if channel.state == state {
            let sides: &[ChannelSide] = if channel.bindings.is_empty() {
                &[ChannelSide::Collocated]
            } else {
                &[ChannelSide::Producer, ChannelSide::Consumer]
            };
            for side in sides {
                plan.push(DeploymentCommand::BuildChannel(PhysicalChannel {
                    uri: channel.uri.clone(),
                    side: *side,
                    deployable: channel
                        .deployable
                        .clone()
                        .unwrap_or_else(|| QName::new("urn:weft", "synthetic")),
                    intents: channel.intents.clone(),
                }));
            }
        }

        // Channel bindings attach transports on both sides of the channel;
        // bindings carry their own deployable tag and may be in `state` even
        // when the channel is not.
        for binding in &channel.bindings {
            if binding.state != state {
                continue;
            }
            let generator = match self.registry.connection_binding_generator(binding, &channel.uri) {
                Ok(generator) => generator,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };
            // Transport feeds the channel on the producer side.
            match generator.generate_connection_source(binding, channel, &self.context) {
                Ok(source) => plan.push(DeploymentCommand::AttachConnection(
                    PhysicalChannelConnection {
                        channel: channel.uri.clone(),
                        side: ChannelSide::Producer,
                        source,
                        target: Self::local_connection_target(&channel.uri, 0),
                    },
                )),
                Err(error) => errors.push(error),
            }
            // Channel feeds the transport on the consumer side.
            match generator.generate_connection_target(binding, channel, &self.context) {
                Ok(target) => plan.push(DeploymentCommand::AttachConnection(
                    PhysicalChannelConnection {
                        channel: channel.uri.clone(),
                        side: ChannelSide::Consumer,
                        source: Self::local_connection_source(&channel.uri),
                        target,
                    },
                )),
                Err(error) => errors.push(error),
            }
        }
    }

    fn local_connection_source(uri: &Uri) -> PhysicalConnectionSource {
        PhysicalConnectionSource {
            uri: uri.clone(),
            kind: BindingKind(LOCAL_BINDING.to_string()),
            config: serde_json::Value::Null,
            topic: None,
        }
    }

    fn local_connection_target(uri: &Uri, sequence: i32) -> PhysicalConnectionTarget {
        PhysicalConnectionTarget {
            uri: uri.clone(),
            kind: BindingKind(LOCAL_BINDING.to_string()),
            config: serde_json::Value::Null,
            sequence,
        }
    }

    /// Wires from transports to services: one physical wire per new binding.
    fn generate_bound_services(
        &self,
        component: &LogicalComponent,
        state: LogicalState,
        plan: &mut DeploymentPlan,
        errors: &mut Vec<GenerationError>,
    ) {
        for service in &component.services {
            for binding in &service.bindings {
                if binding.state != state {
                    continue;
                }
                let result = self
                    .registry
                    .wire_binding_generator(binding, &service.uri)
                    .and_then(|generator| {
                        let source = generator.generate_source(binding, service, &self.context)?;
                        let target = self
                            .registry
                            .component_generator(component)?
                            .generate_wire_target(component, service, &self.context)?;
                        Ok(PhysicalWire {
                            source,
                            target,
                            operations: Self::operations(&service.contract.operations),
                        })
                    });
                match result {
                    Ok(wire) => plan.push(DeploymentCommand::AttachWire(wire)),
                    Err(error) => errors.push(error),
                }
            }
        }
    }

    /// Wires from references to transports: one physical wire per new binding.
    fn generate_bound_references(
        &self,
        component: &LogicalComponent,
        state: LogicalState,
        plan: &mut DeploymentPlan,
        errors: &mut Vec<GenerationError>,
    ) {
        for reference in &component.references {
            for binding in &reference.bindings {
                if binding.state != state {
                    continue;
                }
                let result = self
                    .registry
                    .wire_binding_generator(binding, &reference.uri)
                    .and_then(|generator| {
                        let target = generator.generate_target(binding, reference, &self.context)?;
                        let source = self
                            .registry
                            .component_generator(component)?
                            .generate_wire_source(component, reference, &self.context)?;
                        Ok(PhysicalWire {
                            source,
                            target,
                            operations: Self::operations(&reference.contract.operations),
                        })
                    });
                match result {
                    Ok(wire) => plan.push(DeploymentCommand::AttachWire(wire)),
                    Err(error) => errors.push(error),
                }
            }
        }
    }

    /// Local producer/consumer connections for a component being (re)built.
    fn generate_component_connections(
        &self,
        composite: &LogicalComposite,
        component: &LogicalComponent,
        plan: &mut DeploymentPlan,
        errors: &mut Vec<GenerationError>,
    ) {
        let generator = match self.registry.component_generator(component) {
            Ok(generator) => generator,
            Err(error) => {
                // already reported by the component build pass
                let _ = error;
                return;
            }
        };

        for producer in &component.producers {
            for channel_uri in &producer.targets {
                if composite.channel(channel_uri).is_none() {
                    errors.push(GenerationError::Other {
                        uri: producer.uri.clone(),
                        reason: format!("target channel {channel_uri} not found"),
                    });
                    continue;
                }
                match generator.generate_connection_source(component, producer, &self.context) {
                    Ok(source) => plan.push(DeploymentCommand::AttachConnection(
                        PhysicalChannelConnection {
                            channel: channel_uri.clone(),
                            side: ChannelSide::Collocated,
                            source,
                            target: Self::local_connection_target(channel_uri, 0),
                        },
                    )),
                    Err(error) => errors.push(error),
                }
            }
        }

        for consumer in &component.consumers {
            for channel_uri in &consumer.sources {
                if composite.channel(channel_uri).is_none() {
                    errors.push(GenerationError::Other {
                        uri: consumer.uri.clone(),
                        reason: format!("source channel {channel_uri} not found"),
                    });
                    continue;
                }
                match generator.generate_connection_target(component, consumer, &self.context) {
                    Ok(target) => plan.push(DeploymentCommand::AttachConnection(
                        PhysicalChannelConnection {
                            channel: channel_uri.clone(),
                            side: ChannelSide::Collocated,
                            source: Self::local_connection_source(channel_uri),
                            target,
                        },
                    )),
                    Err(error) => errors.push(error),
                }
            }
        }
    }

    /// Reference-to-service wires in `state` within this composite scope.
    fn generate_wires(
        &self,
        composite: &LogicalComposite,
        state: LogicalState,
        plan: &mut DeploymentPlan,
        errors: &mut Vec<GenerationError>,
    ) {
        for wires in composite.wires.values() {
            for wire in wires {
                if wire.state != state {
                    continue;
                }
                match self.generate_wire(composite, wire) {
                    Ok(physical) => plan.push(DeploymentCommand::AttachWire(physical)),
                    Err(error) => errors.push(error),
                }
            }
        }
    }

    fn generate_wire(
        &self,
        composite: &LogicalComposite,
        wire: &LogicalWire,
    ) -> Result<PhysicalWire, GenerationError> {
        let source_component = composite
            .component(&wire.source.defragmented())
            .ok_or_else(|| GenerationError::DanglingWire {
                origin: wire.source.clone(),
                component: wire.source.defragmented(),
            })?;
        let reference = wire
            .source
            .fragment_name()
            .and_then(|name| source_component.reference(name))
            .ok_or_else(|| GenerationError::DanglingWire {
                origin: wire.source.clone(),
                component: wire.source.defragmented(),
            })?;

        let target_component = composite
            .component(&wire.target.defragmented())
            .ok_or_else(|| GenerationError::DanglingWire {
                origin: wire.source.clone(),
                component: wire.target.defragmented(),
            })?;
        let service = wire
            .target
            .fragment_name()
            .and_then(|name| target_component.service(name))
            .ok_or_else(|| GenerationError::DanglingWire {
                origin: wire.source.clone(),
                component: wire.target.defragmented(),
            })?;

        let source = self
            .registry
            .component_generator(source_component)?
            .generate_wire_source(source_component, reference, &self.context)?;
        let target = self
            .registry
            .component_generator(target_component)?
            .generate_wire_target(target_component, service, &self.context)?;

        Ok(PhysicalWire {
            source,
            target,
            operations: Self::operations(&reference.contract.operations),
        })
    }

    fn operations(operations: &[crate::domain::contract::Operation]) -> Vec<PhysicalOperation> {
        operations.iter().map(PhysicalOperation::from).collect()
    }
}
