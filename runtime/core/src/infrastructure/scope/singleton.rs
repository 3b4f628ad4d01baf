// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! Composite-scoped container: one eagerly-initialized instance per
//! component. Instances start in registration order so dependencies built
//! earlier in the deployment plan exist before their dependents, and stop in
//! reverse.

use super::{Scope, ScopeContainer, ScopeError, ScopedComponent};
use crate::domain::uri::{QName, Uri};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub struct SingletonScopeContainer {
    /// Registration order is start order.
    components: Mutex<Vec<Arc<dyn ScopedComponent>>>,
    instances: DashMap<Uri, Arc<dyn Any + Send + Sync>>,
    /// Creation order per context, for reverse-order stop.
    started: Mutex<BTreeMap<QName, Vec<Uri>>>,
}

impl SingletonScopeContainer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScopeContainer for SingletonScopeContainer {
    fn scope(&self) -> Scope {
        Scope::Composite
    }

    fn register(&self, component: Arc<dyn ScopedComponent>) {
        self.components.lock().push(component);
    }

    fn unregister(&self, uri: &Uri) {
        self.components.lock().retain(|c| c.uri() != uri);
        self.instances.remove(uri);
        for order in self.started.lock().values_mut() {
            order.retain(|u| u != uri);
        }
    }

    /// Eagerly creates every instance of the context. A failing component
    /// does not stop the pass; all failures are reported together and the
    /// successfully created instances stay live.
    fn start_context(&self, deployable: &QName) -> Result<(), ScopeError> {
        let components: Vec<Arc<dyn ScopedComponent>> = self
            .components
            .lock()
            .iter()
            .filter(|c| c.deployable() == deployable)
            .cloned()
            .collect();

        let mut failures = Vec::new();
        let mut order = Vec::new();
        for component in components {
            if self.instances.contains_key(component.uri()) {
                continue;
            }
            match component.create_instance() {
                Ok(instance) => {
                    debug!(component = %component.uri(), "created instance");
                    self.instances.insert(component.uri().clone(), instance);
                    order.push(component.uri().clone());
                }
                Err(error) => failures.push((component.uri().clone(), error.to_string())),
            }
        }
        self.started
            .lock()
            .entry(deployable.clone())
            .or_default()
            .extend(order);

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScopeError::GroupInitialization {
                deployable: deployable.clone(),
                failures,
            })
        }
    }

    fn stop_context(&self, deployable: &QName) -> Result<(), ScopeError> {
        let order = self.started.lock().remove(deployable).unwrap_or_default();
        for uri in order.iter().rev() {
            debug!(component = %uri, "releasing instance");
            self.instances.remove(uri);
        }
        Ok(())
    }

    fn get_instance(&self, uri: &Uri) -> Result<Arc<dyn Any + Send + Sync>, ScopeError> {
        if let Some(instance) = self.instances.get(uri) {
            return Ok(Arc::clone(&instance));
        }
        let registered = self.components.lock().iter().any(|c| c.uri() == uri);
        if registered {
            Err(ScopeError::NotActive(uri.clone()))
        } else {
            Err(ScopeError::NotRegistered(uri.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestComponent {
        uri: Uri,
        deployable: QName,
        fail: bool,
        created: Arc<AtomicUsize>,
    }

    impl ScopedComponent for TestComponent {
        fn uri(&self) -> &Uri {
            &self.uri
        }

        fn deployable(&self) -> &QName {
            &self.deployable
        }

        fn create_instance(&self) -> anyhow::Result<Arc<dyn Any + Send + Sync>> {
            if self.fail {
                anyhow::bail!("boom");
            }
            let index = self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(index))
        }
    }

    fn component(name: &str, deployable: &QName, fail: bool, counter: &Arc<AtomicUsize>) -> Arc<TestComponent> {
        Arc::new(TestComponent {
            uri: Uri::new(format!("domain/{name}")),
            deployable: deployable.clone(),
            fail,
            created: Arc::clone(counter),
        })
    }

    #[test]
    fn starts_in_registration_order() {
        let container = SingletonScopeContainer::new();
        let deployable = QName::new("urn:test", "app");
        let counter = Arc::new(AtomicUsize::new(0));

        container.register(component("first", &deployable, false, &counter));
        container.register(component("second", &deployable, false, &counter));
        container.start_context(&deployable).unwrap();

        let first = container.get_instance(&Uri::new("domain/first")).unwrap();
        let second = container.get_instance(&Uri::new("domain/second")).unwrap();
        assert_eq!(*first.downcast_ref::<usize>().unwrap(), 0);
        assert_eq!(*second.downcast_ref::<usize>().unwrap(), 1);
    }

    #[test]
    fn collects_all_failures_and_keeps_successes() {
        let container = SingletonScopeContainer::new();
        let deployable = QName::new("urn:test", "app");
        let counter = Arc::new(AtomicUsize::new(0));

        container.register(component("ok", &deployable, false, &counter));
        container.register(component("bad", &deployable, true, &counter));
        container.register(component("worse", &deployable, true, &counter));

        let error = container.start_context(&deployable).unwrap_err();
        match error {
            ScopeError::GroupInitialization { failures, .. } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(container.get_instance(&Uri::new("domain/ok")).is_ok());
    }

    #[test]
    fn stop_releases_instances() {
        let container = SingletonScopeContainer::new();
        let deployable = QName::new("urn:test", "app");
        let counter = Arc::new(AtomicUsize::new(0));

        container.register(component("only", &deployable, false, &counter));
        container.start_context(&deployable).unwrap();
        container.stop_context(&deployable).unwrap();

        assert!(matches!(
            container.get_instance(&Uri::new("domain/only")),
            Err(ScopeError::NotActive(_))
        ));
    }

    #[test]
    fn unknown_component_is_not_registered() {
        let container = SingletonScopeContainer::new();
        assert!(matches!(
            container.get_instance(&Uri::new("domain/ghost")),
            Err(ScopeError::NotRegistered(_))
        ));
    }
}
