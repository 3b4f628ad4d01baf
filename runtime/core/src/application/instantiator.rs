// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Composite instantiator
//!
//! Walks a declarative [`Composite`] and creates or extends the logical
//! subtree for it. Non-fatal issues (unresolvable explicit targets, missing
//! property sources, duplicates) accumulate in the [`InstantiationContext`]
//! so one deployment attempt reports every broken declaration; only
//! model-breaking input (a malformed property source pointer) fails fast.

use crate::domain::definition::{
    ComponentDefinition, Composite, Implementation, PropertyValue,
};
use crate::domain::logical::{
    LogicalBinding, LogicalChannel, LogicalComponent, LogicalComposite, LogicalConsumer,
    LogicalImplementation, LogicalProducer, LogicalReference, LogicalResource, LogicalService,
    LogicalWire,
};
use crate::domain::uri::{QName, Uri};
use thiserror::Error;

/// Accumulated, non-fatal assembly errors. The caller decides whether any of
/// them is fatal to the whole deployment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("unable to resolve reference {uri}")]
    ReferenceNotFound { uri: Uri },
    #[error("target {target} specified on reference {reference} not found")]
    TargetNotFound { reference: Uri, target: String },
    #[error("duplicate component {uri}")]
    DuplicateComponent { uri: Uri },
    #[error("duplicate channel {uri}")]
    DuplicateChannel { uri: Uri },
    #[error("property source {pointer} for property {name} on {component} resolved to no value")]
    PropertySourceNotFound {
        component: Uri,
        name: String,
        pointer: String,
    },
}

/// Model-breaking instantiation failure; aborts the whole operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstantiationError {
    #[error("malformed property source pointer '{pointer}' for property {name} on {component}")]
    MalformedPropertySource {
        component: Uri,
        name: String,
        pointer: String,
    },
}

/// Collects structured errors across one instantiation batch.
#[derive(Debug, Default)]
pub struct InstantiationContext {
    errors: Vec<AssemblyError>,
}

impl InstantiationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: AssemblyError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[AssemblyError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<AssemblyError> {
        self.errors
    }
}

/// Instantiates declarative composites into the logical tree.
#[derive(Debug, Default)]
pub struct CompositeInstantiator;

impl CompositeInstantiator {
    pub fn new() -> Self {
        Self
    }

    /// Creates logical nodes for `definition` under `scope` (the domain root
    /// for top-level deployments). Every created node is tagged with the
    /// deployed composite's qualified name as its deployable unit; nested
    /// composite contents carry the tag of the top-level deployable, not
    /// their own name, so context start and collection reach them.
    pub fn instantiate(
        &self,
        definition: &Composite,
        scope_uri: &Uri,
        scope: &mut LogicalComposite,
        context: &mut InstantiationContext,
    ) -> Result<(), InstantiationError> {
        self.instantiate_scoped(definition, scope_uri, scope, &definition.name, context)
    }

    fn instantiate_scoped(
        &self,
        definition: &Composite,
        scope_uri: &Uri,
        scope: &mut LogicalComposite,
        deployable: &QName,
        context: &mut InstantiationContext,
    ) -> Result<(), InstantiationError> {
        for channel in &definition.channels {
            let uri = scope_uri.child(&channel.name);
            if scope.channel(&uri).is_some() {
                context.add_error(AssemblyError::DuplicateChannel { uri });
                continue;
            }
            let mut logical = LogicalChannel::new(uri, Some(deployable.clone()));
            logical.intents = channel.intents.clone();
            for binding in &channel.bindings {
                logical
                    .bindings
                    .push(LogicalBinding::new(binding.clone(), Some(deployable.clone())));
            }
            scope.channels.push(logical);
        }

        for resource in &definition.resources {
            scope
                .resources
                .push(LogicalResource::new(resource.clone(), Some(deployable.clone())));
        }

        let mut created = Vec::new();
        for component in &definition.components {
            let uri = scope_uri.child(&component.name);
            if scope.component(&uri).is_some() {
                context.add_error(AssemblyError::DuplicateComponent { uri });
                continue;
            }
            let logical =
                self.instantiate_component(component, uri, deployable, definition, context)?;
            created.push(logical.uri.clone());
            scope.components.push(logical);
        }

        self.wire_explicit_targets(&created, scope_uri, scope, deployable, context);
        Ok(())
    }

    fn instantiate_component(
        &self,
        definition: &ComponentDefinition,
        uri: Uri,
        deployable: &QName,
        composite: &Composite,
        context: &mut InstantiationContext,
    ) -> Result<LogicalComponent, InstantiationError> {
        let implementation = match &definition.implementation {
            Implementation::Leaf { kind, config } => LogicalImplementation::Leaf {
                kind: kind.clone(),
                config: config.clone(),
            },
            Implementation::Composite(nested) => {
                let mut child_scope = LogicalComposite::new();
                // Nested composite contents are scoped under the component URI
                // and keep the enclosing deployable tag.
                self.instantiate_scoped(nested, &uri, &mut child_scope, deployable, context)?;
                LogicalImplementation::Composite(child_scope)
            }
        };

        let mut component = LogicalComponent::new(uri, Some(deployable.clone()), implementation);

        for service in &definition.services {
            let mut logical =
                LogicalService::new(component.uri.fragment(&service.name), service.contract.clone());
            for binding in &service.bindings {
                logical
                    .bindings
                    .push(LogicalBinding::new(binding.clone(), Some(deployable.clone())));
            }
            for binding in &service.callback_bindings {
                logical
                    .callback_bindings
                    .push(LogicalBinding::callback(binding.clone(), Some(deployable.clone())));
            }
            component.services.push(logical);
        }

        let scope_uri = component
            .uri
            .0
            .rsplit_once('/')
            .map(|(parent, _)| Uri::new(parent))
            .unwrap_or_else(|| component.uri.clone());

        for reference in &definition.references {
            let mut logical = LogicalReference::new(
                component.uri.fragment(&reference.name),
                reference.contract.clone(),
                reference.multiplicity,
            );
            // Explicit targets are kept as URIs relative to the declaring
            // scope; `component` or `component#service` forms are both legal.
            logical.targets = reference
                .targets
                .iter()
                .map(|target| match target.split_once('#') {
                    Some((component_name, service)) => {
                        scope_uri.child(component_name).fragment(service)
                    }
                    None => scope_uri.child(target),
                })
                .collect();
            for binding in &reference.bindings {
                logical
                    .bindings
                    .push(LogicalBinding::new(binding.clone(), Some(deployable.clone())));
            }
            for binding in &reference.callback_bindings {
                logical
                    .callback_bindings
                    .push(LogicalBinding::callback(binding.clone(), Some(deployable.clone())));
            }
            component.references.push(logical);
        }

        for producer in &definition.producers {
            component.producers.push(LogicalProducer {
                uri: component.uri.fragment(&producer.name),
                targets: producer
                    .targets
                    .iter()
                    .map(|target| scope_uri.child(target))
                    .collect(),
            });
        }

        for consumer in &definition.consumers {
            component.consumers.push(LogicalConsumer {
                uri: component.uri.fragment(&consumer.name),
                sources: consumer.sources.iter().map(|s| scope_uri.child(s)).collect(),
                sequence: consumer.sequence,
            });
        }

        self.initialize_properties(&mut component, definition, composite, context)?;
        Ok(component)
    }

    /// Sets the initial property values of a component: inline values win;
    /// sourced values are resolved with a JSON pointer against the parent
    /// composite's property document.
    fn initialize_properties(
        &self,
        component: &mut LogicalComponent,
        definition: &ComponentDefinition,
        composite: &Composite,
        context: &mut InstantiationContext,
    ) -> Result<(), InstantiationError> {
        for (name, value) in &definition.property_values {
            match value {
                PropertyValue::Inline(value) => {
                    component.properties.insert(name.clone(), value.clone());
                }
                PropertyValue::Source(pointer) => {
                    if !pointer.is_empty() && !pointer.starts_with('/') {
                        return Err(InstantiationError::MalformedPropertySource {
                            component: component.uri.clone(),
                            name: name.clone(),
                            pointer: pointer.clone(),
                        });
                    }
                    match composite.properties.pointer(pointer) {
                        Some(resolved) => {
                            component.properties.insert(name.clone(), resolved.clone());
                        }
                        None => context.add_error(AssemblyError::PropertySourceNotFound {
                            component: component.uri.clone(),
                            name: name.clone(),
                            pointer: pointer.clone(),
                        }),
                    }
                }
            }
        }
        Ok(())
    }

    /// Static wiring: creates wires for references with explicit targets.
    /// Explicitly targeted references are never autowired. Targets are
    /// resolved after all sibling components exist, so forward declarations
    /// work in either order.
    fn wire_explicit_targets(
        &self,
        created: &[Uri],
        _scope_uri: &Uri,
        scope: &mut LogicalComposite,
        deployable: &QName,
        context: &mut InstantiationContext,
    ) {
        // Read-only pass: resolve every target to a concrete service URI.
        let mut wires = Vec::new();
        let mut resolved_refs = Vec::new();
        for component_uri in created {
            let Some(component) = scope.component(component_uri) else {
                continue;
            };
            for reference in &component.references {
                if reference.targets.is_empty() {
                    continue;
                }
                let mut targeted = false;
                for target in &reference.targets {
                    match self.resolve_target(reference, target, scope) {
                        Some(service_uri) => {
                            wires.push(LogicalWire::new(
                                reference.uri.clone(),
                                service_uri,
                                Some(deployable.clone()),
                            ));
                            targeted = true;
                        }
                        None => context.add_error(AssemblyError::TargetNotFound {
                            reference: reference.uri.clone(),
                            target: target.to_string(),
                        }),
                    }
                }
                if targeted {
                    resolved_refs.push((component_uri.clone(), reference.name().to_string()));
                }
            }
        }

        for wire in wires {
            scope.add_wire(wire);
        }
        for (component_uri, reference_name) in resolved_refs {
            if let Some(component) = scope.component_mut(&component_uri) {
                if let Some(reference) = component.reference_mut(&reference_name) {
                    reference.resolved = true;
                }
            }
        }
    }

    /// Resolves an explicit target URI to a service endpoint. A target with
    /// a fragment names the service directly; a bare component target
    /// resolves to its single service, or the first contract-compatible one.
    fn resolve_target(
        &self,
        reference: &LogicalReference,
        target: &Uri,
        scope: &LogicalComposite,
    ) -> Option<Uri> {
        let component = scope.component(&target.defragmented())?;
        if let Some(service_name) = target.fragment_name() {
            return component.service(service_name).map(|s| s.uri.clone());
        }
        if component.services.len() == 1 {
            return component.services.first().map(|s| s.uri.clone());
        }
        component
            .services
            .iter()
            .find(|s| s.contract.is_assignable_from(&reference.contract))
            .map(|s| s.uri.clone())
    }
}
