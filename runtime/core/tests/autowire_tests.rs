// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! Autowire resolution against instantiated composites.

use weft_core::application::autowire::AutowireInstantiator;
use weft_core::application::instantiator::{
    AssemblyError, CompositeInstantiator, InstantiationContext,
};
use weft_core::domain::contract::{DataType, Operation, ServiceContract};
use weft_core::domain::definition::{
    ComponentBuilder, Composite, CompositeBuilder, Multiplicity, ReferenceDefinition,
    ServiceDefinition,
};
use weft_core::domain::logical::{LogicalComposite, LogicalState};
use weft_core::domain::uri::{QName, Uri};

fn billing_contract() -> ServiceContract {
    ServiceContract::new(
        "Billing",
        vec![Operation::new(
            "charge",
            vec![DataType::from("Order")],
            Some(DataType::from("Receipt")),
        )],
    )
}

fn service(name: &str, contract: ServiceContract) -> ServiceDefinition {
    ServiceDefinition {
        name: name.to_string(),
        contract,
        bindings: Vec::new(),
        callback_bindings: Vec::new(),
    }
}

fn reference(name: &str, contract: ServiceContract, multiplicity: Multiplicity) -> ReferenceDefinition {
    ReferenceDefinition {
        name: name.to_string(),
        contract,
        multiplicity,
        targets: Vec::new(),
        bindings: Vec::new(),
        callback_bindings: Vec::new(),
    }
}

fn deploy(composite: &Composite, root: &mut LogicalComposite) -> InstantiationContext {
    let mut context = InstantiationContext::new();
    CompositeInstantiator::new()
        .instantiate(composite, &Uri::new("domain"), root, &mut context)
        .expect("instantiation");
    AutowireInstantiator::new().instantiate(root, &mut context);
    context
}

#[test]
fn resolves_single_reference_to_first_declared_match() {
    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .component(
            ComponentBuilder::leaf("first", "test")
                .service(service("billing", billing_contract()))
                .build(),
        )
        .component(
            ComponentBuilder::leaf("second", "test")
                .service(service("billing", billing_contract()))
                .build(),
        )
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(reference("backend", billing_contract(), Multiplicity::One))
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    let context = deploy(&composite, &mut root);
    assert!(!context.has_errors(), "{:?}", context.errors());

    let wires = root.wires_for(&Uri::new("domain/client#backend"));
    assert_eq!(wires.len(), 1);
    assert_eq!(wires[0].target, Uri::new("domain/first#billing"));

    let client = root.component(&Uri::new("domain/client")).unwrap();
    assert!(client.reference("backend").unwrap().resolved);
}

#[test]
fn multiplicity_reference_wires_every_match() {
    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .component(
            ComponentBuilder::leaf("a", "test")
                .service(service("billing", billing_contract()))
                .build(),
        )
        .component(
            ComponentBuilder::leaf("b", "test")
                .service(service("billing", billing_contract()))
                .build(),
        )
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(reference("backends", billing_contract(), Multiplicity::OneN))
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    let context = deploy(&composite, &mut root);
    assert!(!context.has_errors());

    let wires = root.wires_for(&Uri::new("domain/client#backends"));
    let targets: Vec<&str> = wires.iter().map(|w| w.target.as_str()).collect();
    assert_eq!(targets, vec!["domain/a#billing", "domain/b#billing"]);
}

#[test]
fn required_reference_without_candidate_is_an_error() {
    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(reference("backend", billing_contract(), Multiplicity::One))
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    let context = deploy(&composite, &mut root);

    assert_eq!(
        context.errors(),
        &[AssemblyError::ReferenceNotFound {
            uri: Uri::new("domain/client#backend")
        }]
    );
}

#[test]
fn optional_reference_without_candidate_is_fine() {
    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(reference("backend", billing_contract(), Multiplicity::ZeroOne))
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    let context = deploy(&composite, &mut root);
    assert!(!context.has_errors());
    assert!(root.wires_for(&Uri::new("domain/client#backend")).is_empty());
}

#[test]
fn explicit_target_disables_autowire() {
    let mut target = reference("backend", billing_contract(), Multiplicity::One);
    target.targets = vec!["second#billing".to_string()];

    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .component(
            ComponentBuilder::leaf("first", "test")
                .service(service("billing", billing_contract()))
                .build(),
        )
        .component(
            ComponentBuilder::leaf("second", "test")
                .service(service("billing", billing_contract()))
                .build(),
        )
        .component(ComponentBuilder::leaf("client", "test").reference(target).build())
        .build();

    let mut root = LogicalComposite::new();
    let context = deploy(&composite, &mut root);
    assert!(!context.has_errors(), "{:?}", context.errors());

    // the explicit wire to `second` stands; autowire must not add `first`
    let wires = root.wires_for(&Uri::new("domain/client#backend"));
    assert_eq!(wires.len(), 1);
    assert_eq!(wires[0].target, Uri::new("domain/second#billing"));
}

#[test]
fn later_deployment_extends_multiplicity_reference() {
    let first = CompositeBuilder::new(QName::new("urn:test", "unit1"))
        .component(
            ComponentBuilder::leaf("a", "test")
                .service(service("billing", billing_contract()))
                .build(),
        )
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(reference("backends", billing_contract(), Multiplicity::OneN))
                .build(),
        )
        .build();
    let second = CompositeBuilder::new(QName::new("urn:test", "unit2"))
        .component(
            ComponentBuilder::leaf("b", "test")
                .service(service("billing", billing_contract()))
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    let context = deploy(&first, &mut root);
    assert!(!context.has_errors());
    assert_eq!(root.wires_for(&Uri::new("domain/client#backends")).len(), 1);
    weft_core::application::collector::Collector::new().mark_as_provisioned(&mut root);

    let context = deploy(&second, &mut root);
    assert!(!context.has_errors());

    let wires = root.wires_for(&Uri::new("domain/client#backends"));
    assert_eq!(wires.len(), 2);
    // the new wire belongs to the target's deployable
    assert_eq!(
        wires[1].deployable,
        Some(QName::new("urn:test", "unit2"))
    );
    // every wire is new: the source must be reinjected with the extended set
    assert!(wires.iter().all(|w| w.state == LogicalState::New));
}

#[test]
fn rerun_does_not_duplicate_wires() {
    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .component(
            ComponentBuilder::leaf("a", "test")
                .service(service("billing", billing_contract()))
                .build(),
        )
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(reference("backends", billing_contract(), Multiplicity::OneN))
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    deploy(&composite, &mut root);
    let mut context = InstantiationContext::new();
    AutowireInstantiator::new().instantiate(&mut root, &mut context);

    assert_eq!(root.wires_for(&Uri::new("domain/client#backends")).len(), 1);
}
