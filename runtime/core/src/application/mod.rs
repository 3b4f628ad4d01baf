// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! Application layer: the deployment pipeline over the logical model.

pub mod assembly;
pub mod autowire;
pub mod collector;
pub mod deployer;
pub mod generator;
pub mod instantiator;
