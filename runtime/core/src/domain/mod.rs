// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! # Domain model
//!
//! Data types and trait seams for the assembly runtime:
//!
//! - [`uri`] — hierarchical identities and deployable-unit names.
//! - [`contract`] — structural service contracts.
//! - [`definition`] — declarative composites consumed from introspection
//!   front-ends, plus the programmatic builder API.
//! - [`logical`] — the mutable logical graph with lifecycle state.
//! - [`physical`] — serializable generated definitions and deployment plans.
//! - [`events`] — structured monitor events.
//! - [`host`] — host runtime info and the leader-election seam.

pub mod contract;
pub mod definition;
pub mod events;
pub mod host;
pub mod logical;
pub mod physical;
pub mod uri;
