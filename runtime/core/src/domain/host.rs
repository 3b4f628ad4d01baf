// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Host runtime information
//!
//! Configuration describing the hosting process ("zone") this core runs in,
//! and the seam to the cluster/discovery subsystem. Leader election itself is
//! out of scope; the domain scope container only consumes an `is_leader` poll
//! and a leadership-change event stream.

use crate::domain::uri::Uri;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Runtime topology mode for the hosting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    /// Single-VM runtime; domain scope activates immediately.
    Vm,
    /// Clustered node participating in zone leader election.
    Node,
}

/// Static information about the hosting runtime, supplied by the host
/// bootstrap. No configuration file format is prescribed; hosts deserialize
/// this from whatever source they use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    pub domain: Uri,
    pub zone: String,
    pub mode: RuntimeMode,
}

impl HostInfo {
    pub fn vm(domain: Uri) -> Self {
        Self {
            domain,
            zone: "default.zone".to_string(),
            mode: RuntimeMode::Vm,
        }
    }

    pub fn node(domain: Uri, zone: impl Into<String>) -> Self {
        Self {
            domain,
            zone: zone.into(),
            mode: RuntimeMode::Node,
        }
    }
}

/// Seam to the cluster membership subsystem. Implementations push leadership
/// changes through a `watch` channel; consumers may also poll.
pub trait LeaderElection: Send + Sync {
    /// Current leadership status of this runtime within its zone.
    fn is_leader(&self) -> bool;

    /// Subscribes to leadership changes. The receiver yields the current
    /// value immediately and every change thereafter.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// In-process leader election handle, used by single-zone deployments and
/// tests. Real cluster agents implement [`LeaderElection`] over their
/// membership protocol.
pub struct StaticLeaderElection {
    sender: watch::Sender<bool>,
}

impl StaticLeaderElection {
    pub fn new(leader: bool) -> Self {
        let (sender, _) = watch::channel(leader);
        Self { sender }
    }

    /// Pushes a leadership change to all subscribers.
    pub fn set_leader(&self, leader: bool) {
        // send_replace never fails; watch keeps the last value even with no
        // active receivers.
        self.sender.send_replace(leader);
    }
}

impl LeaderElection for StaticLeaderElection {
    fn is_leader(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
