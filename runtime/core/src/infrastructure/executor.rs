// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Command executors
//!
//! Runtime-side dispatch of deployment plan commands. Each command kind maps
//! to exactly one registered executor; dispatch of an unregistered kind is a
//! typed [`BuilderError::NoExecutor`]. Commands execute strictly in plan
//! order and the first failure aborts the plan, leaving rollback to the
//! deployment coordinator.

use crate::application::deployer::PlanExecutor;
use crate::domain::physical::{CommandKind, DeploymentCommand, DeploymentPlan};
use crate::infrastructure::builder::{BuilderError, ComponentBuilderRegistry};
use crate::infrastructure::channel_manager::{Channel, ChannelManager};
use crate::infrastructure::connector::Connector;
use crate::infrastructure::scope::ScopeContainer;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &DeploymentCommand) -> Result<(), BuilderError>;
}

/// Maps command kinds to executors.
#[derive(Default)]
pub struct CommandExecutorRegistry {
    executors: HashMap<CommandKind, Arc<dyn CommandExecutor>>,
}

impl CommandExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: CommandKind, executor: Arc<dyn CommandExecutor>) {
        self.executors.insert(kind, executor);
    }

    pub async fn execute(&self, command: &DeploymentCommand) -> Result<(), BuilderError> {
        let executor = self
            .executors
            .get(&command.kind())
            .ok_or(BuilderError::NoExecutor(command.kind()))?;
        executor.execute(command).await
    }
}

#[async_trait]
impl PlanExecutor for CommandExecutorRegistry {
    async fn execute(&self, plan: DeploymentPlan) -> anyhow::Result<()> {
        debug!(
            deployable = ?plan.deployable,
            commands = plan.commands.len(),
            "executing deployment plan"
        );
        for command in &plan.commands {
            CommandExecutorRegistry::execute(self, command).await?;
        }
        Ok(())
    }
}

/// Registers and unregisters physical channels.
pub struct ChannelCommandExecutor {
    channels: Arc<ChannelManager>,
}

impl ChannelCommandExecutor {
    pub fn new(channels: Arc<ChannelManager>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl CommandExecutor for ChannelCommandExecutor {
    async fn execute(&self, command: &DeploymentCommand) -> Result<(), BuilderError> {
        match command {
            DeploymentCommand::BuildChannel(definition) => {
                let channel = Channel::new(
                    definition.uri.clone(),
                    definition.deployable.clone(),
                    definition.side,
                );
                self.channels.register(channel)?;
                Ok(())
            }
            DeploymentCommand::DisposeChannel(definition) => {
                self.channels.unregister(&definition.uri, definition.side)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Builds components through the builder registry and registers them with
/// their scope container.
pub struct ComponentCommandExecutor {
    builders: Arc<ComponentBuilderRegistry>,
    composite_scope: Arc<dyn ScopeContainer>,
    domain_scope: Arc<dyn ScopeContainer>,
}

impl ComponentCommandExecutor {
    pub fn new(
        builders: Arc<ComponentBuilderRegistry>,
        composite_scope: Arc<dyn ScopeContainer>,
        domain_scope: Arc<dyn ScopeContainer>,
    ) -> Self {
        Self {
            builders,
            composite_scope,
            domain_scope,
        }
    }

    fn scope_for(&self, config: &serde_json::Value) -> &Arc<dyn ScopeContainer> {
        if config.get("scope").and_then(|s| s.as_str()) == Some("domain") {
            &self.domain_scope
        } else {
            &self.composite_scope
        }
    }
}

#[async_trait]
impl CommandExecutor for ComponentCommandExecutor {
    async fn execute(&self, command: &DeploymentCommand) -> Result<(), BuilderError> {
        match command {
            DeploymentCommand::BuildComponent(definition) => {
                let builder = self.builders.get(&definition.kind.0)?;
                let component = builder.build(definition).await?;
                self.scope_for(&definition.config).register(component);
                Ok(())
            }
            DeploymentCommand::DisposeComponent(definition) => {
                self.scope_for(&definition.config).unregister(&definition.uri);
                let builder = self.builders.get(&definition.kind.0)?;
                builder.dispose(definition).await
            }
            _ => Ok(()),
        }
    }
}

/// Attaches and detaches wires through the connector.
pub struct WireCommandExecutor {
    connector: Arc<Connector>,
}

impl WireCommandExecutor {
    pub fn new(connector: Arc<Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl CommandExecutor for WireCommandExecutor {
    async fn execute(&self, command: &DeploymentCommand) -> Result<(), BuilderError> {
        match command {
            DeploymentCommand::AttachWire(wire) => self.connector.connect(wire).await,
            DeploymentCommand::DetachWire(wire) => self.connector.disconnect(wire).await,
            _ => Ok(()),
        }
    }
}

/// Attaches and detaches channel connections through the connector.
pub struct ConnectionCommandExecutor {
    connector: Arc<Connector>,
}

impl ConnectionCommandExecutor {
    pub fn new(connector: Arc<Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl CommandExecutor for ConnectionCommandExecutor {
    async fn execute(&self, command: &DeploymentCommand) -> Result<(), BuilderError> {
        match command {
            DeploymentCommand::AttachConnection(connection) => {
                self.connector.connect_channel(connection).await?;
                Ok(())
            }
            DeploymentCommand::DetachConnection(connection) => {
                self.connector.disconnect_channel(connection).await
            }
            _ => Ok(()),
        }
    }
}

/// Starts and stops deployable contexts: channels first on start, last on
/// stop; composite scope before domain scope.
pub struct ContextCommandExecutor {
    channels: Arc<ChannelManager>,
    composite_scope: Arc<dyn ScopeContainer>,
    domain_scope: Arc<dyn ScopeContainer>,
}

impl ContextCommandExecutor {
    pub fn new(
        channels: Arc<ChannelManager>,
        composite_scope: Arc<dyn ScopeContainer>,
        domain_scope: Arc<dyn ScopeContainer>,
    ) -> Self {
        Self {
            channels,
            composite_scope,
            domain_scope,
        }
    }
}

#[async_trait]
impl CommandExecutor for ContextCommandExecutor {
    async fn execute(&self, command: &DeploymentCommand) -> Result<(), BuilderError> {
        match command {
            DeploymentCommand::StartContext(deployable) => {
                self.channels.start_context(deployable);
                self.composite_scope.start_context(deployable)?;
                self.domain_scope.start_context(deployable)?;
                Ok(())
            }
            DeploymentCommand::StopContext(deployable) => {
                self.domain_scope.stop_context(deployable)?;
                self.composite_scope.stop_context(deployable)?;
                self.channels.stop_context(deployable);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
