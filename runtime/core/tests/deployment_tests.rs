// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! End-to-end deployment through the runtime facade, with a minimal "test"
//! implementation kind registered the way a host extension would.

use async_trait::async_trait;
use serde_json::Value;
use tokio_test::assert_ok;
use std::any::Any;
use std::sync::Arc;
use weft_core::application::generator::{
    ComponentGenerator, GenerationContext, GenerationError, GeneratorRegistry,
};
use weft_core::domain::contract::{Operation, ServiceContract};
use parking_lot::Mutex;
use weft_core::domain::definition::{
    ChannelDefinition, ComponentBuilder, Composite, CompositeBuilder, ConsumerDefinition,
    Implementation, Multiplicity, ProducerDefinition, ReferenceDefinition, ServiceDefinition,
};
use weft_core::domain::events::MonitorEvent;
use weft_core::domain::logical::{LogicalComponent, LogicalReference, LogicalService, LogicalState};
use weft_core::domain::physical::{
    ChannelSide, PhysicalComponent, PhysicalWireSource, PhysicalWireTarget,
};
use weft_core::domain::uri::{QName, Uri};
use weft_core::infrastructure::builder::{
    BuilderError, ComponentBuilder as RuntimeComponentBuilder, ComponentBuilderRegistry,
};
use weft_core::infrastructure::connector::{Connector, SourceWireAttacher, TargetWireAttacher};
use weft_core::infrastructure::scope::ScopedComponent;
use weft_core::infrastructure::wire::{Invoker, Message, RuntimeWire};
use weft_core::{DeploymentError, HostInfo, WeftRuntime};

struct TestGenerator;

impl ComponentGenerator for TestGenerator {
    fn generate(
        &self,
        component: &LogicalComponent,
        _context: &GenerationContext,
    ) -> Result<PhysicalComponent, GenerationError> {
        Ok(PhysicalComponent {
            uri: component.uri.clone(),
            kind: "test".into(),
            deployable: component.deployable.clone().expect("deployable"),
            config: Value::Null,
        })
    }

    fn generate_wire_source(
        &self,
        _component: &LogicalComponent,
        reference: &LogicalReference,
        _context: &GenerationContext,
    ) -> Result<PhysicalWireSource, GenerationError> {
        Ok(PhysicalWireSource {
            uri: reference.uri.clone(),
            kind: "test".into(),
            config: Value::Null,
        })
    }

    fn generate_wire_target(
        &self,
        _component: &LogicalComponent,
        service: &LogicalService,
        _context: &GenerationContext,
    ) -> Result<PhysicalWireTarget, GenerationError> {
        Ok(PhysicalWireTarget {
            uri: service.uri.clone(),
            kind: "test".into(),
            config: Value::Null,
        })
    }
}

struct TestScoped {
    uri: Uri,
    deployable: QName,
}

impl ScopedComponent for TestScoped {
    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn deployable(&self) -> &QName {
        &self.deployable
    }

    fn create_instance(&self) -> anyhow::Result<Arc<dyn Any + Send + Sync>> {
        Ok(Arc::new(()))
    }
}

struct TestBuilder;

#[async_trait]
impl RuntimeComponentBuilder for TestBuilder {
    async fn build(
        &self,
        definition: &PhysicalComponent,
    ) -> Result<Arc<dyn ScopedComponent>, BuilderError> {
        Ok(Arc::new(TestScoped {
            uri: definition.uri.clone(),
            deployable: definition.deployable.clone(),
        }))
    }
}

struct EchoInvoker;

impl Invoker for EchoInvoker {
    fn invoke(&self, message: Message) -> Result<Message, weft_core::infrastructure::wire::InvocationError> {
        Ok(message)
    }
}

struct TestTargetAttacher;

#[async_trait]
impl TargetWireAttacher for TestTargetAttacher {
    async fn create_invoker(
        &self,
        _target: &PhysicalWireTarget,
        _operation: &str,
    ) -> Result<Arc<dyn Invoker>, BuilderError> {
        Ok(Arc::new(EchoInvoker))
    }
}

struct TestSourceAttacher;

#[async_trait]
impl SourceWireAttacher for TestSourceAttacher {
    async fn attach(
        &self,
        _source: &PhysicalWireSource,
        _target: &PhysicalWireTarget,
        _wire: Arc<RuntimeWire>,
    ) -> Result<(), BuilderError> {
        Ok(())
    }

    async fn detach(
        &self,
        _source: &PhysicalWireSource,
        _target: &PhysicalWireTarget,
    ) -> Result<(), BuilderError> {
        Ok(())
    }
}

struct RecordingScoped {
    uri: Uri,
    deployable: QName,
    started: Arc<Mutex<Vec<Uri>>>,
}

impl ScopedComponent for RecordingScoped {
    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn deployable(&self) -> &QName {
        &self.deployable
    }

    fn create_instance(&self) -> anyhow::Result<Arc<dyn Any + Send + Sync>> {
        self.started.lock().push(self.uri.clone());
        Ok(Arc::new(()))
    }
}

struct RecordingBuilder {
    started: Arc<Mutex<Vec<Uri>>>,
}

#[async_trait]
impl RuntimeComponentBuilder for RecordingBuilder {
    async fn build(
        &self,
        definition: &PhysicalComponent,
    ) -> Result<Arc<dyn ScopedComponent>, BuilderError> {
        Ok(Arc::new(RecordingScoped {
            uri: definition.uri.clone(),
            deployable: definition.deployable.clone(),
            started: Arc::clone(&self.started),
        }))
    }
}

fn runtime_with_builder(builder: Arc<dyn RuntimeComponentBuilder>) -> WeftRuntime {
    let mut builders = ComponentBuilderRegistry::new();
    builders.register("test", builder);

    let mut generators = GeneratorRegistry::new();
    generators.register_component_generator("test", Arc::new(TestGenerator));

    let mut connector = Connector::new();
    connector.register_source_wire_attacher("test", Arc::new(TestSourceAttacher));
    connector.register_target_wire_attacher("test", Arc::new(TestTargetAttacher));

    WeftRuntime::new(
        HostInfo::vm(Uri::new("domain")),
        None,
        builders,
        generators,
        connector,
    )
}

fn test_runtime() -> WeftRuntime {
    runtime_with_builder(Arc::new(TestBuilder))
}

fn contract() -> ServiceContract {
    ServiceContract::new("Billing", vec![Operation::new("charge", vec![], None)])
}

fn wired_composite() -> Composite {
    CompositeBuilder::new(QName::new("urn:test", "app"))
        .component(
            ComponentBuilder::leaf("server", "test")
                .service(ServiceDefinition {
                    name: "billing".to_string(),
                    contract: contract(),
                    bindings: Vec::new(),
                    callback_bindings: Vec::new(),
                })
                .build(),
        )
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(ReferenceDefinition {
                    name: "backend".to_string(),
                    contract: contract(),
                    multiplicity: Multiplicity::One,
                    targets: Vec::new(),
                    bindings: Vec::new(),
                    callback_bindings: Vec::new(),
                })
                .build(),
        )
        .build()
}

#[tokio::test]
async fn deploys_and_wires_components() {
    let runtime = test_runtime();
    let mut events = runtime.events().subscribe();

    assert_ok!(runtime.deployer().deploy(&wired_composite()).await);

    runtime.assembly().read(|root| {
        assert!(root
            .components
            .iter()
            .all(|c| c.state == LogicalState::Provisioned));
    });

    let wire = runtime
        .connector()
        .wire(
            &Uri::new("domain/client#backend"),
            &Uri::new("domain/server#billing"),
        )
        .expect("wire attached");
    let reply = wire
        .invoke("charge", Message::new(serde_json::json!({"order": 7})))
        .unwrap();
    assert_eq!(reply.body["order"], 7);

    assert!(matches!(
        events.recv().await.unwrap(),
        MonitorEvent::Deployed { .. }
    ));
}

#[tokio::test]
async fn undeploy_detaches_and_sweeps() {
    let runtime = test_runtime();
    let deployable = QName::new("urn:test", "app");

    runtime.deployer().deploy(&wired_composite()).await.unwrap();
    assert_ok!(runtime.deployer().undeploy(&deployable).await);

    runtime.assembly().read(|root| {
        assert!(root.components.is_empty());
        assert!(root.wires.is_empty());
    });
    assert!(runtime
        .connector()
        .wire(
            &Uri::new("domain/client#backend"),
            &Uri::new("domain/server#billing"),
        )
        .is_none());
}

#[tokio::test]
async fn rejected_deployment_leaves_the_tree_untouched() {
    let runtime = test_runtime();

    // unsatisfiable 1..1 reference
    let broken = CompositeBuilder::new(QName::new("urn:test", "broken"))
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(ReferenceDefinition {
                    name: "backend".to_string(),
                    contract: contract(),
                    multiplicity: Multiplicity::One,
                    targets: Vec::new(),
                    bindings: Vec::new(),
                    callback_bindings: Vec::new(),
                })
                .build(),
        )
        .build();

    let error = runtime.deployer().deploy(&broken).await.unwrap_err();
    assert!(matches!(error, DeploymentError::Assembly { .. }));
    runtime.assembly().read(|root| assert!(root.components.is_empty()));
}

#[tokio::test]
async fn unknown_implementation_kind_fails_generation() {
    let runtime = test_runtime();
    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .component(ComponentBuilder::leaf("mystery", "unknown").build())
        .build();

    let error = runtime.deployer().deploy(&composite).await.unwrap_err();
    assert!(matches!(error, DeploymentError::Generation(_)));
    runtime.assembly().read(|root| assert!(root.components.is_empty()));
}

#[test]
fn deploy_plan_orders_commands_by_dependency() {
    use weft_core::application::autowire::AutowireInstantiator;
    use weft_core::application::generator::DeploymentGenerator;
    use weft_core::application::instantiator::{CompositeInstantiator, InstantiationContext};
    use weft_core::domain::logical::LogicalComposite;
    use weft_core::domain::physical::CommandKind;

    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .channel(ChannelDefinition {
            name: "orders".to_string(),
            bindings: Vec::new(),
            intents: Vec::new(),
        })
        .component(
            ComponentBuilder::leaf("server", "test")
                .service(ServiceDefinition {
                    name: "billing".to_string(),
                    contract: contract(),
                    bindings: Vec::new(),
                    callback_bindings: Vec::new(),
                })
                .consumer(ConsumerDefinition {
                    name: "in".to_string(),
                    sources: vec!["orders".to_string()],
                    sequence: 0,
                })
                .build(),
        )
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(ReferenceDefinition {
                    name: "backend".to_string(),
                    contract: contract(),
                    multiplicity: Multiplicity::One,
                    targets: Vec::new(),
                    bindings: Vec::new(),
                    callback_bindings: Vec::new(),
                })
                .producer(ProducerDefinition {
                    name: "out".to_string(),
                    targets: vec!["orders".to_string()],
                })
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    let mut context = InstantiationContext::new();
    CompositeInstantiator::new()
        .instantiate(&composite, &Uri::new("domain"), &mut root, &mut context)
        .unwrap();
    AutowireInstantiator::new().instantiate(&mut root, &mut context);
    assert!(!context.has_errors());

    let mut generators = GeneratorRegistry::new();
    generators.register_component_generator("test", Arc::new(TestGenerator));
    let generator = DeploymentGenerator::new(
        Arc::new(generators),
        GenerationContext {
            domain: Uri::new("domain"),
            zone: "default.zone".to_string(),
        },
    );

    let plan = generator
        .generate_deploy(&root, &QName::new("urn:test", "app"))
        .unwrap();
    let kinds: Vec<CommandKind> = plan.commands.iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            CommandKind::BuildChannel,
            CommandKind::BuildComponent,
            CommandKind::BuildComponent,
            CommandKind::AttachWire,
            CommandKind::AttachConnection,
            CommandKind::AttachConnection,
            CommandKind::StartContext,
        ]
    );

    // the reverse plan stops the context first, then inverts in reverse order
    let mut marked = root.clone();
    weft_core::application::collector::Collector::new().mark_as_provisioned(&mut marked);
    weft_core::application::collector::Collector::new()
        .mark_for_collection(&QName::new("urn:test", "app"), &mut marked);
    let undeploy = generator
        .generate_undeploy(&marked, &QName::new("urn:test", "app"))
        .unwrap();
    let kinds: Vec<CommandKind> = undeploy.commands.iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            CommandKind::StopContext,
            CommandKind::DetachConnection,
            CommandKind::DetachConnection,
            CommandKind::DetachWire,
            CommandKind::DisposeComponent,
            CommandKind::DisposeComponent,
            CommandKind::DisposeChannel,
        ]
    );
}

#[tokio::test]
async fn nested_composite_components_deploy_with_the_enclosing_unit() {
    let started = Arc::new(Mutex::new(Vec::new()));
    let runtime = runtime_with_builder(Arc::new(RecordingBuilder {
        started: Arc::clone(&started),
    }));
    let deployable = QName::new("urn:test", "app");

    let inner = CompositeBuilder::new(QName::new("urn:test", "inner"))
        .component(
            ComponentBuilder::leaf("worker", "test")
                .service(ServiceDefinition {
                    name: "jobs".to_string(),
                    contract: contract(),
                    bindings: Vec::new(),
                    callback_bindings: Vec::new(),
                })
                .build(),
        )
        .component(
            ComponentBuilder::leaf("helper", "test")
                .reference(ReferenceDefinition {
                    name: "jobs".to_string(),
                    contract: contract(),
                    multiplicity: Multiplicity::One,
                    targets: vec!["worker".to_string()],
                    bindings: Vec::new(),
                    callback_bindings: Vec::new(),
                })
                .build(),
        )
        .build();
    let composite = CompositeBuilder::new(deployable.clone())
        .component(ComponentBuilder::new("outer", Implementation::Composite(Box::new(inner))).build())
        .build();

    assert_ok!(runtime.deployer().deploy(&composite).await);

    // nested contents carry the top-level deployable, not the inner name
    runtime.assembly().read(|root| {
        let outer = root.component(&Uri::new("domain/outer")).expect("outer");
        assert_eq!(outer.deployable, Some(deployable.clone()));
        let child = outer.as_composite().expect("nested composite");
        let worker = child
            .component(&Uri::new("domain/outer/worker"))
            .expect("worker");
        assert_eq!(worker.deployable, Some(deployable.clone()));
        assert_eq!(worker.state, LogicalState::Provisioned);
    });

    // StartContext reached the nested instances
    {
        let started = started.lock();
        assert!(started.contains(&Uri::new("domain/outer/worker")));
        assert!(started.contains(&Uri::new("domain/outer/helper")));
    }

    assert_ok!(runtime.deployer().undeploy(&deployable).await);
    runtime.assembly().read(|root| assert!(root.components.is_empty()));
}

#[tokio::test]
async fn cross_unit_autowire_allows_undeploy_of_the_source_unit_first() {
    let runtime = test_runtime();
    let backend = CompositeBuilder::new(QName::new("urn:test", "backend"))
        .component(
            ComponentBuilder::leaf("server", "test")
                .service(ServiceDefinition {
                    name: "billing".to_string(),
                    contract: contract(),
                    bindings: Vec::new(),
                    callback_bindings: Vec::new(),
                })
                .build(),
        )
        .build();
    let frontend = CompositeBuilder::new(QName::new("urn:test", "frontend"))
        .component(
            ComponentBuilder::leaf("client", "test")
                .reference(ReferenceDefinition {
                    name: "backend".to_string(),
                    contract: contract(),
                    multiplicity: Multiplicity::One,
                    targets: Vec::new(),
                    bindings: Vec::new(),
                    callback_bindings: Vec::new(),
                })
                .build(),
        )
        .build();

    runtime.deployer().deploy(&backend).await.unwrap();
    runtime.deployer().deploy(&frontend).await.unwrap();

    let source = Uri::new("domain/client#backend");
    let target = Uri::new("domain/server#billing");
    assert!(runtime.connector().wire(&source, &target).is_some());

    // the autowire wire is tagged with the target's unit, but it must be
    // detached with its source's unit, whichever leaves first
    assert_ok!(
        runtime
            .deployer()
            .undeploy(&QName::new("urn:test", "frontend"))
            .await
    );
    assert!(runtime.connector().wire(&source, &target).is_none());

    assert_ok!(
        runtime
            .deployer()
            .undeploy(&QName::new("urn:test", "backend"))
            .await
    );
    runtime.assembly().read(|root| {
        assert!(root.components.is_empty());
        assert!(root.wires.is_empty());
    });
}

#[tokio::test]
async fn channel_connections_are_counted_per_endpoint() {
    let runtime = test_runtime();
    let composite = CompositeBuilder::new(QName::new("urn:test", "events"))
        .channel(ChannelDefinition {
            name: "orders".to_string(),
            bindings: Vec::new(),
            intents: Vec::new(),
        })
        .component(
            ComponentBuilder::leaf("emitter", "test")
                .producer(ProducerDefinition {
                    name: "out".to_string(),
                    targets: vec!["orders".to_string()],
                })
                .build(),
        )
        .component(
            ComponentBuilder::leaf("listener", "test")
                .consumer(ConsumerDefinition {
                    name: "in".to_string(),
                    sources: vec!["orders".to_string()],
                    sequence: 0,
                })
                .build(),
        )
        .build();

    runtime.deployer().deploy(&composite).await.unwrap();

    let orders = Uri::new("domain/orders");
    let channel = runtime
        .channels()
        .get_channel(&orders, ChannelSide::Collocated)
        .expect("channel registered");
    assert!(channel.is_active());
    assert_eq!(
        runtime.channels().get_count(&orders, ChannelSide::Collocated),
        Some(2)
    );

    runtime
        .deployer()
        .undeploy(&QName::new("urn:test", "events"))
        .await
        .unwrap();
    assert!(runtime
        .channels()
        .get_channel(&orders, ChannelSide::Collocated)
        .is_none());
}
