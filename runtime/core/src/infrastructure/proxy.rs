// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Dispatch proxies
//!
//! Typed call surface over a wire or channel dispatcher. A proxy is built
//! from an interface description: each method gets a stable positional index
//! (declaration order) that the dispatcher keys on, so two proxies built from
//! the same interface always agree on indices.
//!
//! Proxy plans are immutable and cached per `(loader, interface, dispatcher
//! kind)`; repeated proxy creation for the same key reuses the plan. Plans
//! are evicted when their owning contribution loader is removed.
//!
//! # Invariants
//!
//! - Unwrapped argument style carries at most one argument; an interface
//!   declaring an unwrapped method with two or more parameters is rejected at
//!   plan-build time.
//! - A fault raised by the dispatcher passes through as declared only if its
//!   code appears in the method's fault list; anything else surfaces as an
//!   unexpected fault.

use crate::domain::uri::Uri;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Expected shape of a method's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    /// Raw value, passed through without coercion.
    Value,
}

/// How arguments are packed for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgStyle {
    /// All arguments packed into a single array.
    Wrapped,
    /// The single argument passed as-is; at most one is allowed.
    Unwrapped,
}

/// One method of a proxied interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    pub arity: usize,
    pub returns: ReturnKind,
    /// Fault codes the caller declares it handles.
    #[serde(default)]
    pub faults: Vec<String>,
}

/// A proxied interface: methods in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    pub name: String,
    pub methods: Vec<MethodSpec>,
}

/// Fault returned by a dispatcher.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("dispatch fault {code}: {detail}")]
pub struct DispatchFault {
    pub code: String,
    pub detail: String,
}

impl DispatchFault {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }
}

/// Receiving end of a proxy: dispatches an invocation by method index.
pub trait ProxyDispatcher: Send + Sync {
    /// Stable tag distinguishing dispatcher implementations in the plan
    /// cache key.
    fn kind(&self) -> &str;

    fn dispatch(&self, index: usize, args: Value) -> Result<Value, DispatchFault>;
}

/// Plan-construction failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProxyError {
    #[error("method '{method}' on {interface} has arity {arity}; unwrapped style allows at most one argument")]
    UnsupportedArity {
        interface: String,
        method: String,
        arity: usize,
    },
    #[error("interface {interface} declares method '{method}' more than once")]
    DuplicateMethod { interface: String, method: String },
}

/// Invocation-time failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("no method at index {0}")]
    UnknownMethod(usize),
    #[error("no method named '{0}'")]
    UnknownMethodName(String),
    #[error("method '{method}' expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("method '{method}' returned a value not coercible to {expected:?}")]
    ReturnCoercion { method: String, expected: ReturnKind },
    /// Fault declared in the method's fault list, passed through.
    #[error("declared fault {code}: {detail}")]
    Declared { code: String, detail: String },
    /// Fault outside the declared list.
    #[error("unexpected fault {code}: {detail}")]
    Unexpected { code: String, detail: String },
}

#[derive(Debug, Clone, PartialEq)]
struct MethodPlan {
    name: String,
    arity: usize,
    returns: ReturnKind,
    faults: Vec<String>,
}

/// Immutable, shareable dispatch plan for one interface.
#[derive(Debug, PartialEq)]
pub struct ProxyPlan {
    interface: String,
    style: ArgStyle,
    methods: Vec<MethodPlan>,
}

impl ProxyPlan {
    fn build(interface: &InterfaceSpec, style: ArgStyle) -> Result<Self, ProxyError> {
        let mut methods = Vec::with_capacity(interface.methods.len());
        for method in &interface.methods {
            if methods.iter().any(|m: &MethodPlan| m.name == method.name) {
                return Err(ProxyError::DuplicateMethod {
                    interface: interface.name.clone(),
                    method: method.name.clone(),
                });
            }
            if style == ArgStyle::Unwrapped && method.arity > 1 {
                return Err(ProxyError::UnsupportedArity {
                    interface: interface.name.clone(),
                    method: method.name.clone(),
                    arity: method.arity,
                });
            }
            methods.push(MethodPlan {
                name: method.name.clone(),
                arity: method.arity,
                returns: method.returns,
                faults: method.faults.clone(),
            });
        }
        Ok(Self {
            interface: interface.name.clone(),
            style,
            methods,
        })
    }

    /// The positional index of a method, by declaration order.
    pub fn method_index(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|m| m.name == name)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

/// A live proxy bound to a dispatcher.
pub struct DispatchProxy {
    plan: Arc<ProxyPlan>,
    dispatcher: Arc<dyn ProxyDispatcher>,
}

impl std::fmt::Debug for DispatchProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchProxy")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl DispatchProxy {
    pub fn plan(&self) -> &Arc<ProxyPlan> {
        &self.plan
    }

    /// Invokes a method by positional index, packing arguments per the plan's
    /// style and coercing the return value to the declared kind.
    pub fn invoke(&self, index: usize, args: &[Value]) -> Result<Value, InvokeError> {
        let method = self
            .plan
            .methods
            .get(index)
            .ok_or(InvokeError::UnknownMethod(index))?;
        if args.len() != method.arity {
            return Err(InvokeError::ArityMismatch {
                method: method.name.clone(),
                expected: method.arity,
                actual: args.len(),
            });
        }

        let packed = match self.plan.style {
            ArgStyle::Wrapped => Value::Array(args.to_vec()),
            // arity validated at plan-build time
            ArgStyle::Unwrapped => args.first().cloned().unwrap_or(Value::Null),
        };

        let result = self.dispatcher.dispatch(index, packed).map_err(|fault| {
            if method.faults.contains(&fault.code) {
                InvokeError::Declared {
                    code: fault.code,
                    detail: fault.detail,
                }
            } else {
                InvokeError::Unexpected {
                    code: fault.code,
                    detail: fault.detail,
                }
            }
        })?;

        Self::coerce(&method.name, method.returns, result)
    }

    /// Invokes by method name, resolving the positional index first.
    pub fn invoke_by_name(&self, name: &str, args: &[Value]) -> Result<Value, InvokeError> {
        let index = self
            .plan
            .method_index(name)
            .ok_or_else(|| InvokeError::UnknownMethodName(name.to_string()))?;
        self.invoke(index, args)
    }

    fn coerce(method: &str, returns: ReturnKind, value: Value) -> Result<Value, InvokeError> {
        let coercion = InvokeError::ReturnCoercion {
            method: method.to_string(),
            expected: returns,
        };
        match returns {
            ReturnKind::Unit => Ok(Value::Null),
            ReturnKind::Value => Ok(value),
            ReturnKind::Bool => value.as_bool().map(Value::from).ok_or(coercion),
            ReturnKind::Int => value.as_i64().map(Value::from).ok_or(coercion),
            ReturnKind::Float => value.as_f64().map(Value::from).ok_or(coercion),
            ReturnKind::Str => match value {
                Value::String(s) => Ok(Value::String(s)),
                _ => Err(coercion),
            },
        }
    }
}

type PlanKey = (Uri, String, String, ArgStyle);

/// Builds proxies, caching plans per loader, interface and dispatcher kind.
#[derive(Default)]
pub struct ProxyFactory {
    plans: DashMap<PlanKey, Arc<ProxyPlan>>,
}

impl ProxyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a proxy for `interface` dispatching through `dispatcher`. The
    /// plan is reused across calls with the same loader, interface name,
    /// dispatcher kind and style.
    pub fn create(
        &self,
        loader: &Uri,
        interface: &InterfaceSpec,
        style: ArgStyle,
        dispatcher: Arc<dyn ProxyDispatcher>,
    ) -> Result<DispatchProxy, ProxyError> {
        let key = (
            loader.clone(),
            interface.name.clone(),
            dispatcher.kind().to_string(),
            style,
        );
        // entry API keeps concurrent creators from racing plan construction
        let plan = match self.plans.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let plan = Arc::new(ProxyPlan::build(interface, style)?);
                vacant.insert(Arc::clone(&plan));
                plan
            }
        };
        Ok(DispatchProxy { plan, dispatcher })
    }

    /// Evicts every cached plan owned by a removed contribution loader.
    pub fn on_contribution_removed(&self, loader: &Uri) {
        self.plans.retain(|(key_loader, _, _, _), _| key_loader != loader);
    }

    pub fn cached_plans(&self) -> usize {
        self.plans.len()
    }
}
