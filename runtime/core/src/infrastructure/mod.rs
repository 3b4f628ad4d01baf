// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! Infrastructure layer: runtime-side realization of deployment plans.

pub mod builder;
pub mod channel_manager;
pub mod connector;
pub mod event_bus;
pub mod executor;
pub mod proxy;
pub mod runtime;
pub mod scope;
pub mod wire;
