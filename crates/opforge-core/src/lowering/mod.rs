//! Lowering of the reference language onto the operation builder.
//!
//! The [`Lowerer`] walks an [`ast::Function`](crate::ast::Function) and issues
//! the matching builder calls. Language-specific behavior (arithmetic,
//! truthiness, property access, calls) is expressed through the custom
//! operations declared by [`LanguageOps`].
//!
//! ## Function layout
//!
//! ```text
//! Tag root
//!   Block
//!     StoreLocal local#0            (one per parameter)
//!       LoadArgument 0
//!     Tag root-body
//!       ...body statements...
//!     Return
//!       Constant null
//! ```
//!
//! ## Loops
//!
//! ```text
//! Tag statement
//!   Label continue
//!   While
//!     ToBoolean
//!       condition
//!     body              break/continue branch to the labels around the loop
//!   Label break
//! ```

mod logical;
mod member;
mod scope;

#[cfg(feature = "parallel")]
mod parallel;


pub use scope::{Binding, NameScope};

#[cfg(feature = "parallel")]
pub use parallel::ParallelLowerer;

use std::sync::Arc;

use num_bigint::BigInt;
use tracing::{debug, instrument};

use crate::ast::{Accessor, ArithmeticOp, Block, CompareOp, Expr, Function, Stmt};
use crate::builder::{Builder, Label, LocalSlot};
use crate::error::{BuildError, LoweringError, SemanticError, SemanticErrorKind};
use crate::operation::{Arity, Constant, CustomOpId, OperationSet, Span, Tag};
use crate::program::Program;

/// The custom operations of the reference language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// Truthiness coercion
    ToBoolean,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `<`
    LessThan,
    /// `<=`
    LessOrEqual,
    /// `==`
    Equal,
    /// Boolean negation
    LogicalNot,
    /// Call: target, then arguments
    Invoke,
    /// Property read: receiver, key
    ReadProperty,
    /// Property write: receiver, key, value
    WriteProperty,
    /// Global function reference by name
    FunctionLiteral,
}

impl Intrinsic {
    /// Every intrinsic, in declaration order.
    pub const ALL: [Intrinsic; 13] = [
        Intrinsic::ToBoolean,
        Intrinsic::Add,
        Intrinsic::Sub,
        Intrinsic::Mul,
        Intrinsic::Div,
        Intrinsic::LessThan,
        Intrinsic::LessOrEqual,
        Intrinsic::Equal,
        Intrinsic::LogicalNot,
        Intrinsic::Invoke,
        Intrinsic::ReadProperty,
        Intrinsic::WriteProperty,
        Intrinsic::FunctionLiteral,
    ];

    /// Operation name.
    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::ToBoolean => "ToBoolean",
            Intrinsic::Add => "Add",
            Intrinsic::Sub => "Sub",
            Intrinsic::Mul => "Mul",
            Intrinsic::Div => "Div",
            Intrinsic::LessThan => "LessThan",
            Intrinsic::LessOrEqual => "LessOrEqual",
            Intrinsic::Equal => "Equal",
            Intrinsic::LogicalNot => "LogicalNot",
            Intrinsic::Invoke => "Invoke",
            Intrinsic::ReadProperty => "ReadProperty",
            Intrinsic::WriteProperty => "WriteProperty",
            Intrinsic::FunctionLiteral => "FunctionLiteral",
        }
    }

    /// Accepted operand count.
    pub fn arity(self) -> Arity {
        match self {
            Intrinsic::ToBoolean | Intrinsic::LogicalNot | Intrinsic::FunctionLiteral => {
                Arity::Fixed(1)
            }
            Intrinsic::Invoke => Arity::AtLeast(1),
            Intrinsic::WriteProperty => Arity::Fixed(3),
            _ => Arity::Fixed(2),
        }
    }
}

/// The operation set of the reference language with typed access to its ids.
#[derive(Debug, Clone)]
pub struct LanguageOps {
    set: Arc<OperationSet>,
    ids: Vec<CustomOpId>,
}

impl LanguageOps {
    /// Declares every [`Intrinsic`] in a fresh operation set.
    pub fn new() -> Result<Self, BuildError> {
        let mut set = OperationSet::new();
        let ids = Intrinsic::ALL
            .iter()
            .map(|intrinsic| set.define(intrinsic.name(), intrinsic.arity()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            set: Arc::new(set),
            ids,
        })
    }

    /// The shared operation set.
    pub fn operations(&self) -> &Arc<OperationSet> {
        &self.set
    }

    /// The id of `intrinsic`.
    pub fn id(&self, intrinsic: Intrinsic) -> CustomOpId {
        self.ids[intrinsic as usize]
    }

    /// The intrinsic an id stands for.
    pub fn intrinsic(&self, id: CustomOpId) -> Option<Intrinsic> {
        self.ids
            .iter()
            .position(|candidate| *candidate == id)
            .map(|i| Intrinsic::ALL[i])
    }
}

/// Break and continue targets of one loop.
#[derive(Debug, Clone, Copy)]
struct LoopLabels {
    break_label: Label,
    continue_label: Label,
}

/// Lowers one function through a fresh [`Builder`].
pub struct Lowerer<'a> {
    ops: &'a LanguageOps,
    builder: Builder,
    names: NameScope,
    /// Enclosing loops, innermost last
    loops: Vec<LoopLabels>,
    /// Slots of the local assignments whose value is being lowered
    write_targets: Vec<LocalSlot>,
    diagnostics: Vec<SemanticError>,
}

impl<'a> Lowerer<'a> {
    /// Creates a lowerer for the given language.
    pub fn new(ops: &'a LanguageOps) -> Self {
        Self {
            ops,
            builder: Builder::new(Arc::clone(ops.operations())),
            names: NameScope::new(),
            loops: Vec::new(),
            write_targets: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Semantic errors reported so far.
    pub fn diagnostics(&self) -> &[SemanticError] {
        &self.diagnostics
    }

    /// Lowers `function` and publishes the resulting program.
    #[instrument(level = "debug", skip_all, fields(function = %function.name.name))]
    pub fn lower(mut self, function: &Function) -> Result<Program, LoweringError> {
        self.function(function)?;
        if !self.diagnostics.is_empty() {
            debug!(errors = self.diagnostics.len(), "lowering reported semantic errors");
            return Err(LoweringError::Semantic(self.diagnostics));
        }
        Ok(self.builder.publish()?)
    }

    fn function(&mut self, function: &Function) -> Result<(), BuildError> {
        self.builder.set_name(function.name.name.clone())?;
        self.builder.begin_source_section(function.span.start)?;
        self.builder.begin_tag(Tag::Root)?;
        self.builder.begin_block()?;
        self.names.begin_scope();

        for (index, param) in function.params.iter().enumerate() {
            let slot = self.builder.create_local()?;
            self.names.declare(param.name.clone(), slot);
            self.builder.begin_store_local(slot)?;
            self.builder.emit_load_argument(index)?;
            self.builder.end_store_local()?;
        }

        self.builder.begin_tag(Tag::RootBody)?;
        self.statements(&function.body.statements)?;
        self.builder.end_tag()?;

        self.builder.begin_return()?;
        self.builder.emit_constant(Constant::Null)?;
        self.builder.end_return()?;

        self.names.end_scope();
        self.builder.end_block()?;
        self.builder.end_tag()?;
        self.builder.end_source_section(function.span.length)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self, block: &Block) -> Result<(), BuildError> {
        self.builder.begin_block()?;
        self.names.begin_scope();
        self.statements(&block.statements)?;
        self.names.end_scope();
        self.builder.end_block()
    }

    /// Declares the names assigned by `statements` that are not visible yet,
    /// then lowers each statement.
    fn statements(&mut self, statements: &[Stmt]) -> Result<(), BuildError> {
        for stmt in statements {
            if let Some(name) = assigned_name(stmt) {
                if !self.names.is_local(name) {
                    let slot = self.builder.create_local()?;
                    self.names.declare(name, slot);
                }
            }
        }
        for stmt in statements {
            self.statement(stmt)?;
        }
        Ok(())
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<(), BuildError> {
        let span = stmt.span();
        self.builder.begin_source_section(span.start)?;
        match stmt {
            Stmt::Block(block) => self.block(block)?,
            Stmt::Expr(expr) => {
                self.builder.begin_tag(Tag::Statement)?;
                self.expression(expr)?;
                self.builder.end_tag()?;
            }
            Stmt::While {
                condition, body, ..
            } => self.while_loop(condition, body)?,
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.builder.begin_tag(Tag::Statement)?;
                match else_branch {
                    Some(else_branch) => {
                        self.builder.begin_if_then_else()?;
                        self.condition(condition)?;
                        self.block(then_branch)?;
                        self.block(else_branch)?;
                        self.builder.end_if_then_else()?;
                    }
                    None => {
                        self.builder.begin_if_then()?;
                        self.condition(condition)?;
                        self.block(then_branch)?;
                        self.builder.end_if_then()?;
                    }
                }
                self.builder.end_tag()?;
            }
            Stmt::Break(span) => match self.loops.last().copied() {
                Some(labels) => self.jump(labels.break_label)?,
                None => self.report(SemanticErrorKind::BreakOutsideLoop, *span),
            },
            Stmt::Continue(span) => match self.loops.last().copied() {
                Some(labels) => self.jump(labels.continue_label)?,
                None => self.report(SemanticErrorKind::ContinueOutsideLoop, *span),
            },
            Stmt::Return { value, .. } => {
                self.builder.begin_tag(Tag::Statement)?;
                self.builder.begin_return()?;
                match value {
                    Some(value) => self.expression(value)?,
                    None => self.builder.emit_constant(Constant::Null)?,
                }
                self.builder.end_return()?;
                self.builder.end_tag()?;
            }
            Stmt::Debugger(_) => {
                self.builder.begin_tag(Tag::AlwaysHalt)?;
                self.builder.end_tag()?;
            }
        }
        self.builder.end_source_section(span.length)
    }

    fn while_loop(&mut self, condition: &Expr, body: &Block) -> Result<(), BuildError> {
        let labels = LoopLabels {
            break_label: self.builder.create_label()?,
            continue_label: self.builder.create_label()?,
        };

        self.builder.begin_tag(Tag::Statement)?;
        self.builder.emit_label(labels.continue_label)?;
        self.builder.begin_while()?;
        self.condition(condition)?;

        self.loops.push(labels);
        let lowered = self.block(body);
        self.loops.pop();
        lowered?;

        self.builder.end_while()?;
        self.builder.emit_label(labels.break_label)?;
        self.builder.end_tag()
    }

    /// A `break` or `continue`, tagged like any other statement.
    fn jump(&mut self, target: Label) -> Result<(), BuildError> {
        self.builder.begin_tag(Tag::Statement)?;
        self.builder.emit_branch(target)?;
        self.builder.end_tag()
    }

    /// Branch and loop conditions are coerced to booleans explicitly.
    fn condition(&mut self, condition: &Expr) -> Result<(), BuildError> {
        self.custom(Intrinsic::ToBoolean, |l| l.expression(condition))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self, expr: &Expr) -> Result<(), BuildError> {
        match expr {
            Expr::Number { literal, span } => self.number(literal, *span),
            Expr::String { value, .. } => {
                self.builder.emit_constant(Constant::String(value.clone()))
            }
            Expr::Logical { op, terms, .. } => self.logical(*op, terms),
            Expr::Arithmetic { op, lhs, rhs, .. } => {
                let intrinsic = match op {
                    ArithmeticOp::Add => Intrinsic::Add,
                    ArithmeticOp::Sub => Intrinsic::Sub,
                    ArithmeticOp::Mul => Intrinsic::Mul,
                    ArithmeticOp::Div => Intrinsic::Div,
                };
                self.binary(intrinsic, lhs, rhs)
            }
            Expr::Compare { op, lhs, rhs, .. } => match op {
                CompareOp::Less => self.binary(Intrinsic::LessThan, lhs, rhs),
                CompareOp::LessEqual => self.binary(Intrinsic::LessOrEqual, lhs, rhs),
                CompareOp::Equal => self.binary(Intrinsic::Equal, lhs, rhs),
                CompareOp::Greater => self.negated(Intrinsic::LessOrEqual, lhs, rhs),
                CompareOp::GreaterEqual => self.negated(Intrinsic::LessThan, lhs, rhs),
                CompareOp::NotEqual => self.negated(Intrinsic::Equal, lhs, rhs),
            },
            Expr::Member { base, chain, .. } => self.member_read(base, chain),
        }
    }

    fn number(&mut self, literal: &str, span: Span) -> Result<(), BuildError> {
        let value = if let Ok(n) = literal.parse::<i64>() {
            Constant::Long(n)
        } else if let Ok(n) = literal.parse::<BigInt>() {
            Constant::BigNumber(n)
        } else {
            self.report(SemanticErrorKind::InvalidNumber(literal.to_string()), span);
            Constant::Null
        };
        self.builder.emit_constant(value)
    }

    fn binary(&mut self, intrinsic: Intrinsic, lhs: &Expr, rhs: &Expr) -> Result<(), BuildError> {
        self.custom(intrinsic, |l| {
            l.expression(lhs)?;
            l.expression(rhs)
        })
    }

    fn negated(&mut self, intrinsic: Intrinsic, lhs: &Expr, rhs: &Expr) -> Result<(), BuildError> {
        self.custom(Intrinsic::LogicalNot, |l| l.binary(intrinsic, lhs, rhs))
    }

    /// Wraps whatever `operands` emits in the custom operation `intrinsic`.
    fn custom(
        &mut self,
        intrinsic: Intrinsic,
        operands: impl FnOnce(&mut Self) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        let id = self.ops.id(intrinsic);
        self.builder.begin_custom(id)?;
        operands(self)?;
        self.builder.end_custom(id)
    }

    fn report(&mut self, kind: SemanticErrorKind, span: Span) {
        debug!(%kind, %span, "semantic error");
        self.diagnostics.push(SemanticError { kind, span });
    }
}

/// The local a statement of the form `name = value` assigns, if any.
fn assigned_name(stmt: &Stmt) -> Option<&str> {
    match stmt {
        Stmt::Expr(Expr::Member { base, chain, .. }) => match chain.as_slice() {
            [Accessor::Assign { .. }] => Some(base.name.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// Lowers a single function.
pub fn lower_function(ops: &LanguageOps, function: &Function) -> Result<Program, LoweringError> {
    Lowerer::new(ops).lower(function)
}

/// Lowers every function with its own builder.
///
/// A structural error stops immediately. Semantic errors of all functions are
/// collected and reported together.
pub fn lower_module(ops: &LanguageOps, functions: &[Function]) -> Result<Vec<Program>, LoweringError> {
    collect_programs(functions.iter().map(|function| lower_function(ops, function)))
}

pub(crate) fn collect_programs(
    results: impl IntoIterator<Item = Result<Program, LoweringError>>,
) -> Result<Vec<Program>, LoweringError> {
    let mut programs = Vec::new();
    let mut diagnostics = Vec::new();
    for result in results {
        match result {
            Ok(program) => programs.push(program),
            Err(LoweringError::Semantic(errors)) => diagnostics.extend(errors),
            Err(err @ LoweringError::Build(_)) => return Err(err),
        }
    }
    if diagnostics.is_empty() {
        Ok(programs)
    } else {
        Err(LoweringError::Semantic(diagnostics))
    }
}
