// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Domain assembly
//!
//! Single owner of the logical tree. All structural mutation happens inside
//! explicit locked sections driven by the deployment coordinator; concurrent
//! deployment operations against disjoint deployable units serialize on the
//! tree lock for their mutation phase only, never across command execution.

use crate::domain::logical::LogicalComposite;
use crate::domain::uri::Uri;
use parking_lot::RwLock;

/// Owns the root composite of the domain.
pub struct DomainAssembly {
    domain: Uri,
    root: RwLock<LogicalComposite>,
}

impl DomainAssembly {
    pub fn new(domain: Uri) -> Self {
        Self {
            domain,
            root: RwLock::new(LogicalComposite::new()),
        }
    }

    pub fn domain_uri(&self) -> &Uri {
        &self.domain
    }

    /// Runs a read-only closure against the logical tree.
    pub fn read<R>(&self, f: impl FnOnce(&LogicalComposite) -> R) -> R {
        f(&self.root.read())
    }

    /// Runs a structural mutation against the logical tree. The guard is
    /// released before any command execution so builds never hold the lock.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut LogicalComposite) -> R) -> R {
        f(&mut self.root.write())
    }
}
