// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! Domain scope deferral and leadership drain.

use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use weft_core::domain::events::MonitorEvent;
use weft_core::domain::host::{HostInfo, LeaderElection, StaticLeaderElection};
use weft_core::domain::uri::{QName, Uri};
use weft_core::infrastructure::event_bus::EventBus;
use weft_core::infrastructure::scope::domain::DomainScopeContainer;
use weft_core::infrastructure::scope::singleton::SingletonScopeContainer;
use weft_core::infrastructure::scope::{ScopeContainer, ScopeError, ScopedComponent};

struct OrderedComponent {
    uri: Uri,
    deployable: QName,
    fail: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl ScopedComponent for OrderedComponent {
    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn deployable(&self) -> &QName {
        &self.deployable
    }

    fn create_instance(&self) -> anyhow::Result<Arc<dyn Any + Send + Sync>> {
        if self.fail {
            anyhow::bail!("refused");
        }
        self.log.lock().push(self.uri.as_str().to_string());
        Ok(Arc::new(()))
    }
}

fn component(name: &str, unit: &str, fail: bool, log: &Arc<Mutex<Vec<String>>>) -> Arc<OrderedComponent> {
    Arc::new(OrderedComponent {
        uri: Uri::new(format!("domain/{name}")),
        deployable: QName::new("urn:test", unit),
        fail,
        log: Arc::clone(log),
    })
}

fn node_container(
    election: Option<Arc<dyn LeaderElection>>,
    events: Arc<EventBus>,
) -> DomainScopeContainer {
    DomainScopeContainer::new(
        Arc::new(SingletonScopeContainer::new()),
        HostInfo::node(Uri::new("domain"), "zone1"),
        election,
        events,
    )
}

#[test]
fn vm_mode_activates_immediately() {
    let container = DomainScopeContainer::new(
        Arc::new(SingletonScopeContainer::new()),
        HostInfo::vm(Uri::new("domain")),
        None,
        Arc::new(EventBus::new(16)),
    );
    let log = Arc::new(Mutex::new(Vec::new()));
    container.register(component("a", "u1", false, &log));

    container.start_context(&QName::new("urn:test", "u1")).unwrap();
    assert!(container.get_instance(&Uri::new("domain/a")).is_ok());
}

#[test]
fn non_leader_node_defers_until_leadership() {
    let election = Arc::new(StaticLeaderElection::new(false));
    let container = node_container(Some(election.clone()), Arc::new(EventBus::new(16)));
    let log = Arc::new(Mutex::new(Vec::new()));
    container.register(component("a", "u1", false, &log));
    container.register(component("b", "u2", false, &log));

    container.start_context(&QName::new("urn:test", "u1")).unwrap();
    container.start_context(&QName::new("urn:test", "u2")).unwrap();
    assert!(matches!(
        container.get_instance(&Uri::new("domain/a")),
        Err(ScopeError::NotActive(_))
    ));

    container.leadership_changed(true);

    // deferred contexts drain in arrival order
    assert_eq!(*log.lock(), vec!["domain/a", "domain/b"]);
    assert!(container.get_instance(&Uri::new("domain/a")).is_ok());
    assert!(container.get_instance(&Uri::new("domain/b")).is_ok());
}

#[tokio::test]
async fn failed_drain_reports_and_continues() {
    let election = Arc::new(StaticLeaderElection::new(false));
    let events = Arc::new(EventBus::new(16));
    let container = node_container(Some(election.clone()), Arc::clone(&events));
    let log = Arc::new(Mutex::new(Vec::new()));
    container.register(component("bad", "u1", true, &log));
    container.register(component("good", "u2", false, &log));

    container.start_context(&QName::new("urn:test", "u1")).unwrap();
    container.start_context(&QName::new("urn:test", "u2")).unwrap();

    let mut receiver = events.subscribe();
    container.leadership_changed(true);

    // the failing context does not stop the drain
    assert!(container.get_instance(&Uri::new("domain/good")).is_ok());

    assert!(matches!(
        receiver.recv().await.unwrap(),
        MonitorEvent::LeadershipChanged { leader: true, .. }
    ));
    match receiver.recv().await.unwrap() {
        MonitorEvent::ContextStartFailed { deployable, .. } => {
            assert_eq!(deployable, QName::new("urn:test", "u1"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn losing_leadership_redefers_active_contexts() {
    let election = Arc::new(StaticLeaderElection::new(true));
    let container = node_container(Some(election.clone()), Arc::new(EventBus::new(16)));
    let log = Arc::new(Mutex::new(Vec::new()));
    container.register(component("a", "u1", false, &log));

    container.start_context(&QName::new("urn:test", "u1")).unwrap();
    assert!(container.get_instance(&Uri::new("domain/a")).is_ok());

    container.leadership_changed(false);
    assert!(matches!(
        container.get_instance(&Uri::new("domain/a")),
        Err(ScopeError::NotActive(_))
    ));

    container.leadership_changed(true);
    assert!(container.get_instance(&Uri::new("domain/a")).is_ok());
}

#[test]
fn node_without_election_agent_skips_domain_contexts() {
    let container = node_container(None, Arc::new(EventBus::new(16)));
    let log = Arc::new(Mutex::new(Vec::new()));
    container.register(component("a", "u1", false, &log));

    container.start_context(&QName::new("urn:test", "u1")).unwrap();
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn listener_applies_watch_changes() {
    let election = Arc::new(StaticLeaderElection::new(false));
    let container = Arc::new(node_container(
        Some(election.clone() as Arc<dyn LeaderElection>),
        Arc::new(EventBus::new(16)),
    ));
    let log = Arc::new(Mutex::new(Vec::new()));
    container.register(component("a", "u1", false, &log));
    container.start_context(&QName::new("urn:test", "u1")).unwrap();

    let listener = container.spawn_leadership_listener().expect("listener");
    election.set_leader(true);

    // wait for the listener task to observe the change
    for _ in 0..100 {
        if container.get_instance(&Uri::new("domain/a")).is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(container.get_instance(&Uri::new("domain/a")).is_ok());
    listener.abort();
}
