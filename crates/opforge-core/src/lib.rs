// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # opforge-core
//!
//! Builds structured operation trees for bytecode-style interpreters.
//!
//! ## Overview
//!
//! A language front end lowers its parse tree by driving a [`Builder`]
//! through nested `begin*`/`end*` pairs and leaf `emit*` calls. The builder
//! tracks local slots across nested blocks, allocates and resolves branch
//! labels, and checks every call against the open-operation stack. A
//! successful [`Builder::publish`] yields an immutable [`Program`].
//!
//! On top of the builder this crate provides:
//! - Lowering of a small reference language ([`ast`], [`lowering`]),
//!   including N-ary short-circuit chains and member-expression writes
//! - A tree-walking evaluator for published programs ([`vm`])
//! - Parallel lowering of independent functions (feature `parallel`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opforge_core::{Builder, Constant, OperationSet};
//!
//! let mut builder = Builder::new(Arc::new(OperationSet::new()));
//! builder.begin_block()?;
//! let x = builder.create_local()?;
//! builder.begin_store_local(x)?;
//! builder.emit_constant(Constant::Long(1))?;
//! builder.end_store_local()?;
//! builder.emit_load_local(x)?;
//! builder.end_block()?;
//! let program = builder.publish()?;
//! println!("{program}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builder;
pub mod error;
pub mod lowering;
pub mod operation;
pub mod program;
pub mod vm;

pub use builder::{Builder, Label, LocalSlot};
pub use error::{BuildError, LoweringError, RuntimeError, SemanticError, SemanticErrorKind};
pub use lowering::{Intrinsic, LanguageOps, Lowerer, lower_function, lower_module};
pub use operation::{Arity, Constant, CustomOpId, Operation, OperationKind, OperationSet, Span, Tag};
pub use program::Program;
pub use vm::{Interpreter, Value};

#[cfg(feature = "parallel")]
pub use lowering::ParallelLowerer;
