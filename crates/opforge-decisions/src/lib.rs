// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # opforge-decisions
//!
//! Optimization decision files for generated interpreters.
//!
//! A decision file is a JSON array. String entries are comments; object
//! entries carry a `type` of `SuperInstruction`, `CommonInstruction` or
//! `Quicken`. A run reads one main file and any number of override files and
//! concatenates their decisions in that order.
//!
//! ```rust,ignore
//! use std::path::Path;
//! use opforge_decisions::load_decisions;
//!
//! let outcome = load_decisions(Some(Path::new("decisions.json")), &[]);
//! for err in &outcome.errors {
//!     eprintln!("{err}");
//! }
//! println!("{} decisions", outcome.decisions.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "async")]
mod async_loader;
pub mod config;
pub mod decision;
pub mod error;
mod loader;

#[cfg(feature = "async")]
pub use async_loader::load_decisions_async;
pub use config::{
    BoxableType, ExecutionMode, GenerationConfig, GenerationPlan, TRACING_ENV_VAR,
    tracing_requested_from_env,
};
pub use decision::{
    Decision, DecisionEntry, DecisionKind, DecisionSet, DedupDecision, FusionDecision, Origin,
    Provenance, SpecializeDecision,
};
pub use error::{ConfigError, DecisionError, Result};
pub use loader::{LoadOutcome, load_decisions, parse_decisions};
