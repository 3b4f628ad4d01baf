// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Runtime facade
//!
//! Wires the core services together for a hosting process: event bus,
//! channel manager, connector, scope containers, command executors and the
//! deployment coordinator. Hosts register their implementation-kind and
//! binding-kind extensions on the registries before construction; the facade
//! installs the local channel attacher and the default command executors
//! itself.

use crate::application::assembly::DomainAssembly;
use crate::application::deployer::Deployer;
use crate::application::generator::{
    DeploymentGenerator, GenerationContext, GeneratorRegistry, LOCAL_BINDING,
};
use crate::domain::host::{HostInfo, LeaderElection};
use crate::domain::physical::CommandKind;
use crate::infrastructure::builder::ComponentBuilderRegistry;
use crate::infrastructure::channel_manager::ChannelManager;
use crate::infrastructure::connector::{Connector, LocalConnectionAttacher};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::executor::{
    ChannelCommandExecutor, CommandExecutorRegistry, ComponentCommandExecutor,
    ConnectionCommandExecutor, ContextCommandExecutor, WireCommandExecutor,
};
use crate::infrastructure::proxy::ProxyFactory;
use crate::infrastructure::scope::domain::DomainScopeContainer;
use crate::infrastructure::scope::singleton::SingletonScopeContainer;
use crate::infrastructure::scope::ScopeContainer;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct WeftRuntime {
    host: HostInfo,
    events: Arc<EventBus>,
    channels: Arc<ChannelManager>,
    connector: Arc<Connector>,
    proxies: Arc<ProxyFactory>,
    assembly: Arc<DomainAssembly>,
    domain_scope: Arc<DomainScopeContainer>,
    deployer: Deployer,
    leadership_listener: Option<JoinHandle<()>>,
}

impl WeftRuntime {
    /// Assembles a runtime. `builders` and `generators` carry the host's
    /// extension registrations; `connector` carries its wire and connection
    /// attachers.
    pub fn new(
        host: HostInfo,
        election: Option<Arc<dyn LeaderElection>>,
        builders: ComponentBuilderRegistry,
        generators: GeneratorRegistry,
        mut connector: Connector,
    ) -> Self {
        let events = Arc::new(EventBus::with_default_capacity());
        let channels = Arc::new(ChannelManager::new(Arc::clone(&events)));

        let local = Arc::new(LocalConnectionAttacher::new(Arc::clone(&channels)));
        connector.register_source_connection_attacher(LOCAL_BINDING, local.clone());
        connector.register_target_connection_attacher(LOCAL_BINDING, local);
        let connector = Arc::new(connector);

        let composite_scope: Arc<SingletonScopeContainer> =
            Arc::new(SingletonScopeContainer::new());
        let domain_scope = Arc::new(DomainScopeContainer::new(
            Arc::new(SingletonScopeContainer::new()),
            host.clone(),
            election,
            Arc::clone(&events),
        ));
        let leadership_listener = domain_scope.spawn_leadership_listener();

        let builders = Arc::new(builders);
        let mut executors = CommandExecutorRegistry::new();
        let channel_executor = Arc::new(ChannelCommandExecutor::new(Arc::clone(&channels)));
        executors.register(CommandKind::BuildChannel, channel_executor.clone());
        executors.register(CommandKind::DisposeChannel, channel_executor);
        let component_executor = Arc::new(ComponentCommandExecutor::new(
            Arc::clone(&builders),
            Arc::clone(&composite_scope) as Arc<dyn ScopeContainer>,
            Arc::clone(&domain_scope) as Arc<dyn ScopeContainer>,
        ));
        executors.register(CommandKind::BuildComponent, component_executor.clone());
        executors.register(CommandKind::DisposeComponent, component_executor);
        let wire_executor = Arc::new(WireCommandExecutor::new(Arc::clone(&connector)));
        executors.register(CommandKind::AttachWire, wire_executor.clone());
        executors.register(CommandKind::DetachWire, wire_executor);
        let connection_executor =
            Arc::new(ConnectionCommandExecutor::new(Arc::clone(&connector)));
        executors.register(CommandKind::AttachConnection, connection_executor.clone());
        executors.register(CommandKind::DetachConnection, connection_executor);
        let context_executor = Arc::new(ContextCommandExecutor::new(
            Arc::clone(&channels),
            Arc::clone(&composite_scope) as Arc<dyn ScopeContainer>,
            Arc::clone(&domain_scope) as Arc<dyn ScopeContainer>,
        ));
        executors.register(CommandKind::StartContext, context_executor.clone());
        executors.register(CommandKind::StopContext, context_executor);

        let assembly = Arc::new(DomainAssembly::new(host.domain.clone()));
        let generator = DeploymentGenerator::new(
            Arc::new(generators),
            GenerationContext {
                domain: host.domain.clone(),
                zone: host.zone.clone(),
            },
        );
        let deployer = Deployer::new(
            Arc::clone(&assembly),
            generator,
            Arc::new(executors),
            Arc::clone(&events),
        );

        Self {
            host,
            events,
            channels,
            connector,
            proxies: Arc::new(ProxyFactory::new()),
            assembly,
            domain_scope,
            deployer,
            leadership_listener,
        }
    }

    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    pub fn deployer(&self) -> &Deployer {
        &self.deployer
    }

    pub fn assembly(&self) -> &Arc<DomainAssembly> {
        &self.assembly
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn channels(&self) -> &Arc<ChannelManager> {
        &self.channels
    }

    pub fn connector(&self) -> &Arc<Connector> {
        &self.connector
    }

    pub fn proxies(&self) -> &Arc<ProxyFactory> {
        &self.proxies
    }

    pub fn domain_scope(&self) -> &Arc<DomainScopeContainer> {
        &self.domain_scope
    }
}

impl Drop for WeftRuntime {
    fn drop(&mut self) {
        if let Some(listener) = self.leadership_listener.take() {
            listener.abort();
        }
    }
}
