// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Deployer
//!
//! Coordinates the deployment pipeline: instantiate, autowire, generate,
//! execute, then commit the logical state transition. Logical mutation runs
//! inside the assembly lock; plan execution runs outside it so long-running
//! builds never block concurrent reads of the tree.
//!
//! A failed instantiation or autowire pass rolls the logical changes back
//! before returning, so a rejected deployment leaves the tree exactly as it
//! found it.

use crate::application::assembly::DomainAssembly;
use crate::application::autowire::AutowireInstantiator;
use crate::application::collector::Collector;
use crate::application::generator::{DeploymentGenerator, GenerationFailure};
use crate::application::instantiator::{
    AssemblyError, CompositeInstantiator, InstantiationContext, InstantiationError,
};
use crate::domain::definition::Composite;
use crate::domain::events::MonitorEvent;
use crate::domain::physical::DeploymentPlan;
use crate::domain::uri::QName;
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Executes a generated plan against the hosting runtime. The default
/// implementation is the command executor registry; tests substitute
/// recording executors.
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    async fn execute(&self, plan: DeploymentPlan) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("deployment of {deployable} rejected with {} assembly error(s)", errors.len())]
    Assembly {
        deployable: QName,
        errors: Vec<AssemblyError>,
    },
    #[error(transparent)]
    Instantiation(#[from] InstantiationError),
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
    #[error("plan execution for {deployable} failed")]
    Execution {
        deployable: QName,
        #[source]
        source: anyhow::Error,
    },
}

pub struct Deployer {
    assembly: Arc<DomainAssembly>,
    instantiator: CompositeInstantiator,
    autowire: AutowireInstantiator,
    collector: Collector,
    generator: DeploymentGenerator,
    executor: Arc<dyn PlanExecutor>,
    events: Arc<EventBus>,
}

impl Deployer {
    pub fn new(
        assembly: Arc<DomainAssembly>,
        generator: DeploymentGenerator,
        executor: Arc<dyn PlanExecutor>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            assembly,
            instantiator: CompositeInstantiator::new(),
            autowire: AutowireInstantiator::new(),
            collector: Collector::new(),
            generator,
            executor,
            events,
        }
    }

    /// Deploys one composite as a deployable unit: instantiates its logical
    /// nodes, autowires the whole domain, generates and executes the plan,
    /// and finally transitions the new nodes to provisioned.
    pub async fn deploy(&self, definition: &Composite) -> Result<(), DeploymentError> {
        let deployable = definition.name.clone();
        debug!(deployable = %deployable, "deploying");

        let plan = {
            let domain = self.assembly.domain_uri().clone();
            let instantiator = &self.instantiator;
            let autowire = &self.autowire;
            let collector = &self.collector;
            let generator = &self.generator;
            self.assembly.mutate(|root| {
                let mut context = InstantiationContext::new();
                if let Err(fatal) = instantiator.instantiate(definition, &domain, root, &mut context)
                {
                    Self::rollback(collector, root, &deployable);
                    return Err(DeploymentError::from(fatal));
                }
                autowire.instantiate(root, &mut context);
                if context.has_errors() {
                    Self::rollback(collector, root, &deployable);
                    return Err(DeploymentError::Assembly {
                        deployable: deployable.clone(),
                        errors: context.into_errors(),
                    });
                }
                match generator.generate_deploy(root, &deployable) {
                    Ok(plan) => Ok(plan),
                    Err(failure) => {
                        Self::rollback(collector, root, &deployable);
                        Err(DeploymentError::from(failure))
                    }
                }
            })?
        };

        if let Err(source) = self.executor.execute(plan).await {
            warn!(deployable = %deployable, error = %source, "deployment failed");
            self.assembly
                .mutate(|root| Self::rollback(&self.collector, root, &deployable));
            self.events
                .publish(MonitorEvent::deployment_failed(deployable.clone(), &source));
            return Err(DeploymentError::Execution { deployable, source });
        }

        self.assembly
            .mutate(|root| self.collector.mark_as_provisioned(root));
        self.events.publish(MonitorEvent::deployed(deployable));
        Ok(())
    }

    /// Undeploys one deployable unit: marks its nodes, generates and executes
    /// the reverse plan against the still-navigable marked graph, then sweeps
    /// the marked nodes out of the tree.
    pub async fn undeploy(&self, deployable: &QName) -> Result<(), DeploymentError> {
        debug!(deployable = %deployable, "undeploying");

        let plan = self.assembly.mutate(|root| {
            self.collector.mark_for_collection(deployable, root);
            self.generator.generate_undeploy(root, deployable)
        })?;

        if let Err(source) = self.executor.execute(plan).await {
            warn!(deployable = %deployable, error = %source, "undeploy execution failed");
            self.events
                .publish(MonitorEvent::deployment_failed(deployable.clone(), &source));
            return Err(DeploymentError::Execution {
                deployable: deployable.clone(),
                source,
            });
        }

        self.assembly.mutate(|root| self.collector.collect(root));
        self.events
            .publish(MonitorEvent::undeployed(deployable.clone()));
        Ok(())
    }

    /// Removes a failed deployment's logical nodes. Nodes created by this
    /// attempt are still `New`, so mark-and-sweep deletes them without
    /// touching provisioned state.
    fn rollback(collector: &Collector, root: &mut crate::domain::logical::LogicalComposite, deployable: &QName) {
        collector.mark_for_collection(deployable, root);
        collector.collect(root);
    }
}
