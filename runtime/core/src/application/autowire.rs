// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Autowire resolution
//!
//! Resolves unbound references by structural contract matching against the
//! candidate services of the enclosing composite. Candidate order is the
//! composite's component declaration order; for a 1-ary multiplicity the
//! first match wins. Resolution is idempotent and safely re-runnable:
//! multiplicity references are re-resolved on every pass (they may be
//! extended by later deployments) and a duplicate wire to an already-wired
//! target is never created.

use crate::domain::contract::ServiceContract;
use crate::domain::logical::{LogicalComposite, LogicalState, LogicalWire};
use crate::domain::uri::{QName, Uri};
use crate::application::instantiator::{AssemblyError, InstantiationContext};
use std::collections::BTreeMap;

/// One autowire candidate: a service in scope, snapshotted with its owning
/// component's deployable tag and state.
#[derive(Debug, Clone)]
struct Candidate {
    service: Uri,
    contract: ServiceContract,
    deployable: Option<QName>,
    component_state: LogicalState,
}

/// Resolves unspecified reference targets, creating [`LogicalWire`]s for
/// matches and recording a `ReferenceNotFound` error for every required
/// reference left without a target.
#[derive(Debug, Default)]
pub struct AutowireInstantiator;

impl AutowireInstantiator {
    pub fn new() -> Self {
        Self
    }

    /// Runs autowire over the composite and every nested composite.
    pub fn instantiate(&self, composite: &mut LogicalComposite, context: &mut InstantiationContext) {
        self.resolve_composite(composite, context);
        for index in 0..composite.components.len() {
            if let Some(child) = composite.components[index].as_composite_mut() {
                self.instantiate(child, context);
            }
        }
    }

    fn resolve_composite(&self, composite: &mut LogicalComposite, context: &mut InstantiationContext) {
        // Snapshot candidates in declaration order; the snapshot also serves
        // as the component-state lookup for reinjection marking.
        let candidates: Vec<Candidate> = composite
            .components
            .iter()
            .flat_map(|component| {
                component.services.iter().map(|service| Candidate {
                    service: service.uri.clone(),
                    contract: service.contract.clone(),
                    deployable: component.deployable.clone(),
                    component_state: component.state,
                })
            })
            .collect();
        let states: BTreeMap<Uri, LogicalState> = candidates
            .iter()
            .map(|c| (c.service.clone(), c.component_state))
            .collect();

        for component_index in 0..composite.components.len() {
            for reference_index in 0..composite.components[component_index].references.len() {
                let (uri, contract, multiplicity, bound, explicit, resolved) = {
                    let reference = &composite.components[component_index].references[reference_index];
                    (
                        reference.uri.clone(),
                        reference.contract.clone(),
                        reference.multiplicity,
                        reference.is_bound(),
                        !reference.targets.is_empty(),
                        reference.resolved,
                    )
                };
                if bound || explicit {
                    // statically targeted or bound via a transport binding
                    continue;
                }
                if !multiplicity.is_many() && resolved {
                    continue;
                }
                // Multiplicity references may have been resolved previously;
                // reset so this pass decides afresh.
                composite.components[component_index].references[reference_index].resolved = false;

                let mut matches: Vec<&Candidate> = candidates
                    .iter()
                    .filter(|candidate| candidate.contract.is_assignable_from(&contract))
                    .collect();
                if !multiplicity.is_many() {
                    matches.truncate(1);
                }

                for candidate in matches {
                    let duplicate = composite
                        .wires_for(&uri)
                        .iter()
                        .any(|wire| wire.target == candidate.service);
                    if duplicate {
                        continue;
                    }
                    // Existing wires to still-provisioned targets are marked
                    // new again so the source is reinjected with the extended
                    // target set.
                    if let Some(existing) = composite.wires.get_mut(&uri) {
                        for wire in existing.iter_mut() {
                            if states.get(&wire.target) == Some(&LogicalState::Provisioned) {
                                wire.state = LogicalState::New;
                            }
                        }
                    }
                    // The wire is tagged with the target's deployable: it must
                    // be removed when the target is undeployed.
                    composite.add_wire(LogicalWire::new(
                        uri.clone(),
                        candidate.service.clone(),
                        candidate.deployable.clone(),
                    ));
                }

                let targeted = !composite.wires_for(&uri).is_empty();
                if targeted {
                    composite.components[component_index].references[reference_index].resolved = true;
                } else if multiplicity.is_required() {
                    context.add_error(AssemblyError::ReferenceNotFound { uri });
                }
            }
        }
    }
}
