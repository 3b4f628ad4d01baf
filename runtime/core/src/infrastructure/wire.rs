// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Runtime wires
//!
//! The invocation path realized from a [`PhysicalWire`]: one interceptor
//! chain per operation, terminated by the target-side invoker installed by
//! the target attacher. Interceptors are synchronous and composable; source
//! attachers prepend transport interceptors in front of the chain the target
//! attacher created.
//!
//! [`PhysicalWire`]: crate::domain::physical::PhysicalWire

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A single invocation travelling down a wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub body: Value,
}

impl Message {
    pub fn new(body: Value) -> Self {
        Self { body }
    }
}

/// Fault raised by an interceptor or the terminal invoker.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invocation fault in '{operation}': {detail}")]
pub struct InvocationError {
    pub operation: String,
    pub detail: String,
}

impl InvocationError {
    pub fn new(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: detail.into(),
        }
    }
}

/// One link in an operation's invocation chain.
pub trait Interceptor: Send + Sync {
    fn invoke(&self, message: Message, next: &dyn Invoker) -> Result<Message, InvocationError>;
}

/// Terminal invocation target of a chain.
pub trait Invoker: Send + Sync {
    fn invoke(&self, message: Message) -> Result<Message, InvocationError>;
}

/// Ordered interceptors in front of a terminal invoker.
pub struct InterceptorChain {
    operation: String,
    interceptors: Vec<Arc<dyn Interceptor>>,
    invoker: Arc<dyn Invoker>,
}

impl InterceptorChain {
    pub fn new(operation: impl Into<String>, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            operation: operation.into(),
            interceptors: Vec::new(),
            invoker,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Prepends an interceptor; the most recently added runs first.
    pub fn add_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.insert(0, interceptor);
    }

    pub fn invoke(&self, message: Message) -> Result<Message, InvocationError> {
        Self::invoke_from(&self.interceptors, &*self.invoker, message)
    }

    fn invoke_from(
        interceptors: &[Arc<dyn Interceptor>],
        invoker: &dyn Invoker,
        message: Message,
    ) -> Result<Message, InvocationError> {
        match interceptors.split_first() {
            Some((head, tail)) => {
                let next = ChainTail { interceptors: tail, invoker };
                head.invoke(message, &next)
            }
            None => invoker.invoke(message),
        }
    }
}

struct ChainTail<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    invoker: &'a dyn Invoker,
}

impl Invoker for ChainTail<'_> {
    fn invoke(&self, message: Message) -> Result<Message, InvocationError> {
        InterceptorChain::invoke_from(self.interceptors, self.invoker, message)
    }
}

/// A fully attached wire: one chain per operation name.
#[derive(Default)]
pub struct RuntimeWire {
    chains: HashMap<String, InterceptorChain>,
}

impl RuntimeWire {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chain(&mut self, chain: InterceptorChain) {
        self.chains.insert(chain.operation().to_string(), chain);
    }

    pub fn chain(&self, operation: &str) -> Option<&InterceptorChain> {
        self.chains.get(operation)
    }

    pub fn chain_mut(&mut self, operation: &str) -> Option<&mut InterceptorChain> {
        self.chains.get_mut(operation)
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    /// Invokes one operation through its chain.
    pub fn invoke(&self, operation: &str, message: Message) -> Result<Message, InvocationError> {
        let chain = self
            .chains
            .get(operation)
            .ok_or_else(|| InvocationError::new(operation, "no such operation on wire"))?;
        chain.invoke(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoInvoker;

    impl Invoker for EchoInvoker {
        fn invoke(&self, message: Message) -> Result<Message, InvocationError> {
            Ok(message)
        }
    }

    struct TagInterceptor(&'static str);

    impl Interceptor for TagInterceptor {
        fn invoke(&self, message: Message, next: &dyn Invoker) -> Result<Message, InvocationError> {
            let mut tags = message.body["tags"].as_array().cloned().unwrap_or_default();
            tags.push(json!(self.0));
            next.invoke(Message::new(json!({ "tags": tags })))
        }
    }

    #[test]
    fn chain_runs_interceptors_in_prepend_order() {
        let mut chain = InterceptorChain::new("op", Arc::new(EchoInvoker));
        chain.add_interceptor(Arc::new(TagInterceptor("target")));
        chain.add_interceptor(Arc::new(TagInterceptor("source")));

        let result = chain.invoke(Message::new(json!({}))).unwrap();
        assert_eq!(result.body["tags"], json!(["source", "target"]));
    }

    #[test]
    fn wire_rejects_unknown_operation() {
        let wire = RuntimeWire::new();
        let error = wire.invoke("missing", Message::default()).unwrap_err();
        assert_eq!(error.operation, "missing");
    }
}
