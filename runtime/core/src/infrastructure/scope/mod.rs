// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Scope containers
//!
//! Instance lifecycle management for built components. A scope container
//! owns the instances of every component registered with it and starts and
//! stops them per deployable-unit context:
//!
//! - [`SingletonScopeContainer`] — one eagerly-created instance per
//!   component, started in registration order and stopped in reverse.
//! - [`DomainScopeContainer`] — domain-scoped components that must be active
//!   on exactly one runtime per zone; context starts are deferred until this
//!   runtime is the zone leader.
//!
//! [`SingletonScopeContainer`]: singleton::SingletonScopeContainer
//! [`DomainScopeContainer`]: domain::DomainScopeContainer

pub mod domain;
pub mod singleton;

use crate::domain::uri::{QName, Uri};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Instance scope of a component implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// One instance per deployable context on every runtime.
    Composite,
    /// One instance per domain; active only on the zone leader.
    Domain,
}

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("context for {0} is not active on this runtime")]
    NotActive(Uri),
    #[error("component {0} is not registered with this scope container")]
    NotRegistered(Uri),
    #[error("instance creation for {uri} failed")]
    Creation {
        uri: Uri,
        #[source]
        source: anyhow::Error,
    },
    #[error("context start for {deployable} failed for {} component(s)", failures.len())]
    GroupInitialization {
        deployable: QName,
        /// Component URI and rendered error, in failure order.
        failures: Vec<(Uri, String)>,
    },
}

/// A built component whose instances are managed by a scope container.
pub trait ScopedComponent: Send + Sync {
    fn uri(&self) -> &Uri;

    fn deployable(&self) -> &QName;

    /// Creates the backing instance. Called once per context start for
    /// singleton scopes.
    fn create_instance(&self) -> anyhow::Result<Arc<dyn Any + Send + Sync>>;
}

/// Manages component instances for one [`Scope`].
pub trait ScopeContainer: Send + Sync {
    fn scope(&self) -> Scope;

    fn register(&self, component: Arc<dyn ScopedComponent>);

    fn unregister(&self, uri: &Uri);

    /// Starts the context for a deployable unit, eagerly creating instances.
    fn start_context(&self, deployable: &QName) -> Result<(), ScopeError>;

    /// Stops the context, releasing instances in reverse creation order.
    fn stop_context(&self, deployable: &QName) -> Result<(), ScopeError>;

    fn get_instance(&self, uri: &Uri) -> Result<Arc<dyn Any + Send + Sync>, ScopeError>;
}
