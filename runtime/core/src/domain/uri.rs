// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Addressing primitives
//!
//! - [`Uri`] — hierarchical identity of a node in the domain tree. Child
//!   components are addressed by appending path segments; services,
//!   references, producers and consumers hang off a component URI as a
//!   `#fragment`.
//! - [`QName`] — qualified name of a deployable unit (the granularity at
//!   which logical nodes are deployed and undeployed together).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hierarchical identity of a logical or physical node, unique within a domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(pub String);

impl Uri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the URI of a child node, e.g. `domain` -> `domain/billing`.
    pub fn child(&self, segment: &str) -> Uri {
        Uri(format!("{}/{}", self.0, segment))
    }

    /// Returns the URI of an endpoint on this node, e.g. `domain/billing#invoice`.
    pub fn fragment(&self, name: &str) -> Uri {
        Uri(format!("{}#{}", self.0, name))
    }

    /// The fragment portion of the URI, if any.
    pub fn fragment_name(&self) -> Option<&str> {
        self.0.split_once('#').map(|(_, f)| f)
    }

    /// The URI with any fragment stripped, i.e. the owning node.
    pub fn defragmented(&self) -> Uri {
        match self.0.split_once('#') {
            Some((base, _)) => Uri(base.to_string()),
            None => self.clone(),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(value: &str) -> Self {
        Uri(value.to_string())
    }
}

/// Qualified name identifying a deployable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub namespace: String,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_and_fragment_addressing() {
        let domain = Uri::new("domain");
        let component = domain.child("billing");
        assert_eq!(component.as_str(), "domain/billing");

        let service = component.fragment("invoice");
        assert_eq!(service.as_str(), "domain/billing#invoice");
        assert_eq!(service.fragment_name(), Some("invoice"));
        assert_eq!(service.defragmented(), component);
    }

    #[test]
    fn qname_display() {
        let deployable = QName::new("urn:test", "app");
        assert_eq!(deployable.to_string(), "{urn:test}app");
    }
}
