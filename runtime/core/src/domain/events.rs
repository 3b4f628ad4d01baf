// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Monitor events
//!
//! Structured events emitted by the deployment pipeline and runtime
//! containers. The core never writes to a console or log sink itself; host
//! monitor layers subscribe to the event bus and render these.

use crate::domain::uri::{QName, Uri};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unified monitor event published on the runtime event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A deployable unit was fully provisioned.
    Deployed { deployable: QName, at: DateTime<Utc> },
    /// A deployable unit was removed from the domain.
    Undeployed { deployable: QName, at: DateTime<Utc> },
    /// A deployable failed mid-operation; prior attaches may need rollback by
    /// the caller.
    DeploymentFailed {
        deployable: QName,
        error: String,
        at: DateTime<Utc>,
    },
    /// Zone leadership changed for this runtime.
    LeadershipChanged { leader: bool, at: DateTime<Utc> },
    /// A deferred domain-scope context failed to start during a leadership
    /// drain. The drain continues with the remaining contexts.
    ContextStartFailed {
        deployable: QName,
        error: String,
        at: DateTime<Utc>,
    },
    /// A physical channel was registered on this runtime.
    ChannelRegistered { uri: Uri, at: DateTime<Utc> },
    /// A physical channel was torn down on this runtime.
    ChannelUnregistered { uri: Uri, at: DateTime<Utc> },
}

impl MonitorEvent {
    pub fn deployed(deployable: QName) -> Self {
        MonitorEvent::Deployed {
            deployable,
            at: Utc::now(),
        }
    }

    pub fn undeployed(deployable: QName) -> Self {
        MonitorEvent::Undeployed {
            deployable,
            at: Utc::now(),
        }
    }

    pub fn deployment_failed(deployable: QName, error: impl ToString) -> Self {
        MonitorEvent::DeploymentFailed {
            deployable,
            error: error.to_string(),
            at: Utc::now(),
        }
    }

    pub fn leadership_changed(leader: bool) -> Self {
        MonitorEvent::LeadershipChanged {
            leader,
            at: Utc::now(),
        }
    }

    pub fn context_start_failed(deployable: QName, error: impl ToString) -> Self {
        MonitorEvent::ContextStartFailed {
            deployable,
            error: error.to_string(),
            at: Utc::now(),
        }
    }

    pub fn channel_registered(uri: Uri) -> Self {
        MonitorEvent::ChannelRegistered {
            uri,
            at: Utc::now(),
        }
    }

    pub fn channel_unregistered(uri: Uri) -> Self {
        MonitorEvent::ChannelUnregistered {
            uri,
            at: Utc::now(),
        }
    }
}
