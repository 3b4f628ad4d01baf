// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! Weft runtime core
//!
//! Component-assembly runtime: a logical domain model, a deployment pipeline
//! that transforms it into physical commands, and the runtime-side containers
//! that execute them.
//!
//! # Architecture
//!
//! - **domain** — the logical and physical models plus addressing and host
//!   primitives.
//! - **application** — the deployment pipeline: instantiation, autowire,
//!   generation, collection and the deployer coordinating them.
//! - **infrastructure** — runtime services: command executors, builders, the
//!   connector, channel manager, scope containers and dispatch proxies.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::deployer::{Deployer, DeploymentError};
pub use domain::definition::{ComponentBuilder, Composite, CompositeBuilder};
pub use domain::host::{HostInfo, RuntimeMode};
pub use domain::uri::{QName, Uri};
pub use infrastructure::runtime::WeftRuntime;
