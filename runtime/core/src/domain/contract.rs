// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Service contracts
//!
//! Structural typing for autowire resolution: a reference is compatible with
//! a candidate service when every operation the reference requires is
//! satisfied by an operation on the service with the same name and signature.
//! Contract names are informational; matching never keys on them.

use serde::{Deserialize, Serialize};

/// Opaque data type tag used in operation signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataType(pub String);

impl DataType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl From<&str> for DataType {
    fn from(value: &str) -> Self {
        DataType(value.to_string())
    }
}

/// A single operation on a service contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub inputs: Vec<DataType>,
    pub output: Option<DataType>,
}

impl Operation {
    pub fn new(name: impl Into<String>, inputs: Vec<DataType>, output: Option<DataType>) -> Self {
        Self {
            name: name.into(),
            inputs,
            output,
        }
    }

    fn satisfies(&self, required: &Operation) -> bool {
        self.name == required.name && self.inputs == required.inputs && self.output == required.output
    }
}

/// The contract exposed by a service or required by a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContract {
    /// Informational name, typically the interface the contract was
    /// introspected from. Not used for matching.
    pub name: String,
    pub operations: Vec<Operation>,
}

impl ServiceContract {
    pub fn new(name: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            name: name.into(),
            operations,
        }
    }

    /// Structural compatibility check: can a reference requiring `required`
    /// be wired to a service exposing this contract?
    pub fn is_assignable_from(&self, required: &ServiceContract) -> bool {
        required
            .operations
            .iter()
            .all(|req| self.operations.iter().any(|op| op.satisfies(req)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(name: &str, inputs: &[&str], output: Option<&str>) -> Operation {
        Operation::new(
            name,
            inputs.iter().map(|i| DataType::from(*i)).collect(),
            output.map(DataType::from),
        )
    }

    #[test]
    fn superset_contract_is_assignable() {
        let required = ServiceContract::new("Billing", vec![op("charge", &["Order"], Some("Receipt"))]);
        let offered = ServiceContract::new(
            "BillingImpl",
            vec![
                op("charge", &["Order"], Some("Receipt")),
                op("refund", &["Receipt"], None),
            ],
        );
        assert!(offered.is_assignable_from(&required));
        assert!(!required.is_assignable_from(&offered));
    }

    #[test]
    fn signature_mismatch_is_rejected() {
        let required = ServiceContract::new("Billing", vec![op("charge", &["Order"], Some("Receipt"))]);
        let offered = ServiceContract::new("Billing", vec![op("charge", &["Invoice"], Some("Receipt"))]);
        assert!(!offered.is_assignable_from(&required));
    }

    #[test]
    fn name_is_ignored_for_matching() {
        let required = ServiceContract::new("a.b.Billing", vec![op("charge", &[], None)]);
        let offered = ServiceContract::new("x.y.Payments", vec![op("charge", &[], None)]);
        assert!(offered.is_assignable_from(&required));
    }
}
