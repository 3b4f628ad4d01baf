// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Component builders
//!
//! Runtime-side realization of physical component definitions. A builder is
//! registered per implementation kind and turns a [`PhysicalComponent`] into
//! a [`ScopedComponent`] that a scope container manages. Dispatch failures
//! are typed errors so a runtime missing an extension reports exactly which
//! kind it cannot build.

use crate::domain::physical::{CommandKind, PhysicalComponent};
use crate::domain::uri::Uri;
use crate::infrastructure::channel_manager::ChannelError;
use crate::infrastructure::scope::{ScopeError, ScopedComponent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("no executor registered for command kind {0:?}")]
    NoExecutor(CommandKind),
    #[error("no builder registered for implementation kind '{0}'")]
    NoBuilder(String),
    #[error("no attacher registered for kind '{0}'")]
    NoAttacher(String),
    #[error("component {0} is not built on this runtime")]
    ComponentNotFound(Uri),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error("attach for {uri} failed")]
    Attach {
        uri: Uri,
        #[source]
        source: anyhow::Error,
    },
    #[error("detach for {uri} failed")]
    Detach {
        uri: Uri,
        #[source]
        source: anyhow::Error,
    },
    #[error("build for {uri} failed")]
    Build {
        uri: Uri,
        #[source]
        source: anyhow::Error,
    },
}

/// Builds runtime components for one implementation kind.
#[async_trait]
pub trait ComponentBuilder: Send + Sync {
    async fn build(
        &self,
        definition: &PhysicalComponent,
    ) -> Result<Arc<dyn ScopedComponent>, BuilderError>;

    /// Releases resources for a disposed component. Default: nothing to do.
    async fn dispose(&self, _definition: &PhysicalComponent) -> Result<(), BuilderError> {
        Ok(())
    }
}

/// Builders keyed by implementation kind tag.
#[derive(Default)]
pub struct ComponentBuilderRegistry {
    builders: HashMap<String, Arc<dyn ComponentBuilder>>,
}

impl ComponentBuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<String>, builder: Arc<dyn ComponentBuilder>) {
        self.builders.insert(kind.into(), builder);
    }

    pub fn get(&self, kind: &str) -> Result<&Arc<dyn ComponentBuilder>, BuilderError> {
        self.builders
            .get(kind)
            .ok_or_else(|| BuilderError::NoBuilder(kind.to_string()))
    }
}
