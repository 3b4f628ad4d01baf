// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Collector
//!
//! Two-phase mark-and-sweep over the logical graph, keyed by deployable unit
//! identity. The mark phase walks the entire domain tree so reverse builder
//! calls can run against a fully-marked but still-navigable graph; the sweep
//! phase performs the structural removal. Wires and bindings are collected by
//! their *own* deployable tag, never the tag of the node they decorate; a
//! wire is additionally collected with its source component's unit, since a
//! swept source leaves nothing to detach the wire from.

use crate::domain::logical::{
    LogicalBinding, LogicalComponent, LogicalComposite, LogicalState,
};
use crate::domain::uri::{QName, Uri};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Collector;

impl Collector {
    pub fn new() -> Self {
        Self
    }

    /// Transitions every `New` node in the tree to `Provisioned`. Run by the
    /// deployer after a successful build.
    pub fn mark_as_provisioned(&self, composite: &mut LogicalComposite) {
        for component in &mut composite.components {
            Self::provision(&mut component.state);
            for service in &mut component.services {
                Self::provision_bindings(&mut service.bindings);
                Self::provision_bindings(&mut service.callback_bindings);
            }
            for reference in &mut component.references {
                Self::provision_bindings(&mut reference.bindings);
                Self::provision_bindings(&mut reference.callback_bindings);
            }
            if let Some(child) = component.as_composite_mut() {
                self.mark_as_provisioned(child);
            }
        }
        for channel in &mut composite.channels {
            Self::provision(&mut channel.state);
            Self::provision_bindings(&mut channel.bindings);
        }
        for wires in composite.wires.values_mut() {
            for wire in wires {
                Self::provision(&mut wire.state);
            }
        }
        for resource in &mut composite.resources {
            Self::provision(&mut resource.state);
        }
    }

    /// Mark phase: flags every provisioned node whose deployable tag equals
    /// `deployable` as `Marked`. Matching nodes still in `New` state were
    /// never realized and are deleted immediately instead of being marked.
    pub fn mark_for_collection(&self, deployable: &QName, composite: &mut LogicalComposite) {
        composite.components.retain(|component| {
            !(component.state == LogicalState::New && component.deployable.as_ref() == Some(deployable))
        });
        for component in &mut composite.components {
            if component.deployable.as_ref() == Some(deployable)
                && component.state == LogicalState::Provisioned
            {
                component.state = LogicalState::Marked;
            }
            for service in &mut component.services {
                Self::mark_bindings(deployable, &mut service.bindings);
                Self::mark_bindings(deployable, &mut service.callback_bindings);
            }
            for reference in &mut component.references {
                Self::mark_bindings(deployable, &mut reference.bindings);
                Self::mark_bindings(deployable, &mut reference.callback_bindings);
            }
            if let Some(child) = component.as_composite_mut() {
                self.mark_for_collection(deployable, child);
            }
        }

        composite.channels.retain(|channel| {
            !(channel.state == LogicalState::New && channel.deployable.as_ref() == Some(deployable))
        });
        for channel in &mut composite.channels {
            if channel.deployable.as_ref() == Some(deployable)
                && channel.state == LogicalState::Provisioned
            {
                channel.state = LogicalState::Marked;
            }
            Self::mark_bindings(deployable, &mut channel.bindings);
        }

        // A wire is marked by its own tag, and also when its source component
        // is going away: a cross-unit wire must be detached with whichever
        // unit leaves first, or its source vanishes in the sweep and the wire
        // can never be generated again.
        let live_sources: HashSet<Uri> = composite
            .components
            .iter()
            .map(|component| component.uri.clone())
            .collect();
        let marked_sources: HashSet<Uri> = composite
            .components
            .iter()
            .filter(|component| component.state == LogicalState::Marked)
            .map(|component| component.uri.clone())
            .collect();
        for wires in composite.wires.values_mut() {
            wires.retain(|wire| {
                wire.state != LogicalState::New
                    || (wire.deployable.as_ref() != Some(deployable)
                        && live_sources.contains(&wire.source.defragmented()))
            });
            for wire in wires {
                if wire.state == LogicalState::Provisioned
                    && (wire.deployable.as_ref() == Some(deployable)
                        || marked_sources.contains(&wire.source.defragmented()))
                {
                    wire.state = LogicalState::Marked;
                }
            }
        }

        composite.resources.retain(|resource| {
            !(resource.state == LogicalState::New && resource.deployable.as_ref() == Some(deployable))
        });
        for resource in &mut composite.resources {
            if resource.deployable.as_ref() == Some(deployable)
                && resource.state == LogicalState::Provisioned
            {
                resource.state = LogicalState::Marked;
            }
        }
    }

    /// Sweep phase: removes every `Marked` node and detaches it from parent
    /// collections. A surviving component whose wire was collected out from
    /// under it transitions back to `New` so it is re-provisioned on the next
    /// deployment cycle.
    pub fn collect(&self, composite: &mut LogicalComposite) {
        // Note surviving sources of collected wires before removal.
        let mut orphaned_sources: Vec<Uri> = Vec::new();
        for wires in composite.wires.values() {
            for wire in wires {
                if wire.state == LogicalState::Marked {
                    orphaned_sources.push(wire.source.clone());
                }
            }
        }

        for wires in composite.wires.values_mut() {
            wires.retain(|wire| wire.state != LogicalState::Marked);
        }
        composite.wires.retain(|_, wires| !wires.is_empty());

        composite
            .components
            .retain(|component| component.state != LogicalState::Marked);

        // Wires whose source was swept have no owner left to detach them.
        let live_sources: HashSet<Uri> = composite
            .components
            .iter()
            .map(|component| component.uri.clone())
            .collect();
        for wires in composite.wires.values_mut() {
            wires.retain(|wire| live_sources.contains(&wire.source.defragmented()));
        }
        composite.wires.retain(|_, wires| !wires.is_empty());

        for component in &mut composite.components {
            for service in &mut component.services {
                Self::sweep_bindings(&mut service.bindings);
                Self::sweep_bindings(&mut service.callback_bindings);
            }
            for reference in &mut component.references {
                Self::sweep_bindings(&mut reference.bindings);
                Self::sweep_bindings(&mut reference.callback_bindings);
            }
            if let Some(child) = component.as_composite_mut() {
                self.collect(child);
            }
        }

        composite
            .channels
            .retain(|channel| channel.state != LogicalState::Marked);
        for channel in &mut composite.channels {
            Self::sweep_bindings(&mut channel.bindings);
        }

        composite
            .resources
            .retain(|resource| resource.state != LogicalState::Marked);

        for source in orphaned_sources {
            Self::reopen_source(composite, &source);
        }
    }

    /// Cross-unit rule: a provisioned component that lost a wire to a
    /// collected target is rolled back to `New` (and its reference to
    /// unresolved) so the next autowire/deploy pass re-provisions it.
    fn reopen_source(composite: &mut LogicalComposite, source: &Uri) {
        let component_uri = source.defragmented();
        let Some(component) = composite.component_mut(&component_uri) else {
            return;
        };
        if component.state != LogicalState::Provisioned {
            return;
        }
        component.state = LogicalState::New;
        Self::unresolve_reference(component, source);
    }

    fn unresolve_reference(component: &mut LogicalComponent, reference_uri: &Uri) {
        if let Some(name) = reference_uri.fragment_name().map(str::to_string) {
            if let Some(reference) = component.reference_mut(&name) {
                reference.resolved = false;
            }
        }
    }

    fn provision(state: &mut LogicalState) {
        if *state == LogicalState::New {
            *state = LogicalState::Provisioned;
        }
    }

    fn provision_bindings(bindings: &mut [LogicalBinding]) {
        for binding in bindings {
            Self::provision(&mut binding.state);
        }
    }

    fn mark_bindings(deployable: &QName, bindings: &mut Vec<LogicalBinding>) {
        bindings.retain(|binding| {
            !(binding.state == LogicalState::New && binding.deployable.as_ref() == Some(deployable))
        });
        for binding in bindings {
            if binding.deployable.as_ref() == Some(deployable)
                && binding.state == LogicalState::Provisioned
            {
                binding.state = LogicalState::Marked;
            }
        }
    }

    fn sweep_bindings(bindings: &mut Vec<LogicalBinding>) {
        bindings.retain(|binding| binding.state != LogicalState::Marked);
    }
}
