// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! Domain-scoped container. Domain-scope components must be active on exactly
//! one runtime per zone: on a clustered node the context start is deferred
//! until this runtime wins zone leadership, then deferred contexts are
//! drained in arrival order. Losing leadership stops the active contexts and
//! re-defers them for the next leadership term.

use super::{Scope, ScopeContainer, ScopeError, ScopedComponent};
use crate::domain::events::MonitorEvent;
use crate::domain::host::{HostInfo, LeaderElection, RuntimeMode};
use crate::domain::uri::{QName, Uri};
use crate::infrastructure::event_bus::EventBus;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct DomainScopeContainer {
    inner: Arc<dyn ScopeContainer>,
    host: HostInfo,
    election: Option<Arc<dyn LeaderElection>>,
    /// Contexts waiting for leadership, in arrival order.
    deferred: Mutex<Vec<QName>>,
    /// Contexts started on this runtime, in start order.
    active: Mutex<Vec<QName>>,
    events: Arc<EventBus>,
}

impl DomainScopeContainer {
    pub fn new(
        inner: Arc<dyn ScopeContainer>,
        host: HostInfo,
        election: Option<Arc<dyn LeaderElection>>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            inner,
            host,
            election,
            deferred: Mutex::new(Vec::new()),
            active: Mutex::new(Vec::new()),
            events,
        }
    }

    fn is_leader(&self) -> bool {
        self.election.as_ref().is_some_and(|e| e.is_leader())
    }

    fn activate(&self, deployable: &QName) -> Result<(), ScopeError> {
        self.inner.start_context(deployable)?;
        self.active.lock().push(deployable.clone());
        Ok(())
    }

    /// Applies a leadership change. Gaining leadership drains the deferred
    /// contexts in arrival order; a failing context is reported and skipped,
    /// never aborting the drain. Losing leadership stops active contexts and
    /// re-defers them.
    pub fn leadership_changed(&self, leader: bool) {
        self.events.publish(MonitorEvent::leadership_changed(leader));
        if leader {
            let drained: Vec<QName> = std::mem::take(&mut *self.deferred.lock());
            for deployable in drained {
                debug!(deployable = %deployable, "starting deferred domain context");
                if let Err(error) = self.activate(&deployable) {
                    warn!(deployable = %deployable, error = %error, "deferred context start failed");
                    self.events
                        .publish(MonitorEvent::context_start_failed(deployable, error));
                }
            }
        } else {
            let stopped: Vec<QName> = std::mem::take(&mut *self.active.lock());
            let mut deferred = self.deferred.lock();
            for deployable in stopped {
                debug!(deployable = %deployable, "deactivating domain context");
                if let Err(error) = self.inner.stop_context(&deployable) {
                    warn!(deployable = %deployable, error = %error, "context stop failed");
                }
                deferred.push(deployable);
            }
        }
    }

    /// Spawns a task that applies leadership changes from the election agent.
    /// Returns `None` when no agent is configured.
    pub fn spawn_leadership_listener(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let election = self.election.as_ref()?;
        let mut receiver = election.subscribe();
        let container = Arc::clone(self);
        Some(tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let leader = *receiver.borrow_and_update();
                container.leadership_changed(leader);
            }
        }))
    }
}

impl ScopeContainer for DomainScopeContainer {
    fn scope(&self) -> Scope {
        Scope::Domain
    }

    fn register(&self, component: Arc<dyn ScopedComponent>) {
        self.inner.register(component);
    }

    fn unregister(&self, uri: &Uri) {
        self.inner.unregister(uri);
    }

    fn start_context(&self, deployable: &QName) -> Result<(), ScopeError> {
        match self.host.mode {
            RuntimeMode::Vm => self.activate(deployable),
            RuntimeMode::Node => {
                if self.election.is_none() {
                    // no election agent: this node never hosts domain scope
                    debug!(deployable = %deployable, "no election agent, skipping domain context");
                    Ok(())
                } else if self.is_leader() {
                    self.activate(deployable)
                } else {
                    debug!(deployable = %deployable, "deferring domain context until leadership");
                    self.deferred.lock().push(deployable.clone());
                    Ok(())
                }
            }
        }
    }

    fn stop_context(&self, deployable: &QName) -> Result<(), ScopeError> {
        let mut deferred = self.deferred.lock();
        if let Some(index) = deferred.iter().position(|d| d == deployable) {
            deferred.remove(index);
            return Ok(());
        }
        drop(deferred);
        self.active.lock().retain(|d| d != deployable);
        self.inner.stop_context(deployable)
    }

    fn get_instance(&self, uri: &Uri) -> Result<Arc<dyn Any + Send + Sync>, ScopeError> {
        // deferred contexts have no instances; the inner container reports
        // registered-but-unstarted components as not active
        self.inner.get_instance(uri)
    }
}
