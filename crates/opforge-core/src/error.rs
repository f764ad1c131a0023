//! Error types for building and lowering operation trees.

use std::fmt;

use thiserror::Error;

use crate::builder::{Label, LocalSlot};
use crate::operation::{Arity, CustomOpId, OperationKind, Span};

/// Violations of the builder protocol.
///
/// These are programmer errors in the front end. The builder refuses all
/// further work once one has been returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// `end*` called for a different kind than the innermost open operation
    #[error("cannot end {closing}: the innermost open operation is {open}")]
    Mismatch {
        /// The innermost open operation
        open: OperationKind,
        /// The operation the caller tried to end
        closing: OperationKind,
    },

    /// `end*` called with nothing open
    #[error("cannot end {closing}: no operation is open")]
    UnexpectedEnd {
        /// The operation the caller tried to end
        closing: OperationKind,
    },

    /// Wrong number of children at `end*`
    #[error("{kind} expects {expected} children, found {found}")]
    ChildCount {
        /// The operation being closed
        kind: OperationKind,
        /// What the operation accepts
        expected: Arity,
        /// What was emitted
        found: usize,
    },

    /// `publish` with open operations
    #[error("cannot publish with open operations: {}", join_kinds(.open))]
    UnclosedFrames {
        /// Open operations, outermost first
        open: Vec<OperationKind>,
    },

    /// A label emitted twice
    #[error("{label} is already emitted")]
    LabelAlreadyBound {
        /// The label
        label: Label,
    },

    /// A label never emitted before `publish`
    #[error("{label}{} was never emitted", describe_origin(.origin))]
    UnboundLabel {
        /// The label
        label: Label,
        /// Source offset of the region the label was created in
        origin: Option<usize>,
    },

    /// A label created by another builder
    #[error("{label} was not created by this builder")]
    UnknownLabel {
        /// The label
        label: Label,
    },

    /// A label emitted as the child of a non-sequence operation
    #[error("{label} must be emitted inside a sequence, not inside {container}")]
    LabelOutsideSequence {
        /// The label
        label: Label,
        /// The operation the label would have become a child of
        container: OperationKind,
    },

    /// A branch whose label is not bound in an enclosing sequence
    #[error("branch to {label} is not enclosed by the sequence that binds it")]
    BranchOutOfScope {
        /// The label
        label: Label,
    },

    /// A local used after its block closed
    #[error("{slot} is not in scope")]
    LocalOutOfScope {
        /// The slot
        slot: LocalSlot,
    },

    /// More blocks exited than entered
    #[error("exited more blocks than were entered")]
    ScopeUnderflow,

    /// Local scope depth not back to zero at `publish`
    #[error("local scope depth is {depth} at publish, expected 0")]
    ScopeImbalance {
        /// The remaining depth
        depth: usize,
    },

    /// A custom operation id not in the builder's set
    #[error("operation {id} is not defined in this operation set")]
    UnknownOperation {
        /// The id
        id: CustomOpId,
    },

    /// Two custom operations with the same name
    #[error("operation '{name}' is already defined")]
    DuplicateOperation {
        /// The name
        name: String,
    },

    /// More custom operations than a [`CustomOpId`] can address
    #[error("an operation set holds at most {max} operations")]
    TooManyOperations {
        /// The limit
        max: usize,
    },

    /// More labels than a [`Label`] can address
    #[error("a program holds at most {max} labels")]
    TooManyLabels {
        /// The limit
        max: u64,
    },

    /// More locals than a [`LocalSlot`] can address
    #[error("a program holds at most {max} locals")]
    TooManyLocals {
        /// The limit
        max: u64,
    },

    /// `publish` without any top-level operation
    #[error("cannot publish an empty program")]
    EmptyProgram,

    /// A mutating call after `publish`
    #[error("the builder has already published its program")]
    Published,

    /// A mutating call after an earlier structural error
    #[error("the builder was aborted by an earlier error")]
    Aborted,
}

fn join_kinds(kinds: &[OperationKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" > ")
}

fn describe_origin(origin: &Option<usize>) -> String {
    match origin {
        Some(offset) => format!(" (created at offset {})", offset),
        None => String::new(),
    }
}

/// Semantic problems found while lowering, reported against a source range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at {span}")]
pub struct SemanticError {
    /// What went wrong
    pub kind: SemanticErrorKind,
    /// Where
    pub span: Span,
}

/// Kinds of [`SemanticError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// `break` with no enclosing loop
    #[error("break used outside of loop")]
    BreakOutsideLoop,
    /// `continue` with no enclosing loop
    #[error("continue used outside of loop")]
    ContinueOutsideLoop,
    /// Assignment to a call result or to another assignment
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    /// Assignment to a name that has no local slot
    #[error("assignment to undeclared name '{0}'")]
    UndeclaredAssignmentTarget(String),
    /// A numeric literal that is not a number
    #[error("invalid numeric literal '{0}'")]
    InvalidNumber(String),
}

/// Result of lowering one function.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoweringError {
    /// The builder protocol was violated; lowering stopped
    #[error("operation builder failed: {0}")]
    Build(#[from] BuildError),

    /// Lowering finished but reported semantic errors
    #[error("{}", Diagnostics(.0))]
    Semantic(Vec<SemanticError>),
}

struct Diagnostics<'a>(&'a [SemanticError]);

impl fmt::Display for Diagnostics<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} semantic error(s)", self.0.len())?;
        for error in self.0 {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

/// Errors of the reference evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Operand of the wrong type
    #[error("type error: {0}")]
    TypeError(String),

    /// Integer division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Call to a name with no program or builtin
    #[error("undefined function '{0}'")]
    UndefinedFunction(String),

    /// Call of a non-function value
    #[error("cannot call a value of type {0}")]
    NotCallable(&'static str),

    /// Custom operation the evaluator does not implement
    #[error("operation {0} is not supported by the evaluator")]
    UnsupportedOperation(CustomOpId),

    /// A branch that left the program without reaching its label
    #[error("branch to {0} escaped the program")]
    UnresolvedBranch(Label),

    /// Read of a slot outside the program's slot table
    #[error("{0} does not exist in this program")]
    MissingLocal(LocalSlot),

    /// Too many nested calls
    #[error("maximum call depth of {0} exceeded")]
    StackOverflow(usize),

    /// A program registered without a name
    #[error("cannot register an unnamed program")]
    UnnamedProgram,

    /// A program built over a different operation set than the evaluator's
    #[error("program '{0}' was built over a different operation set")]
    ForeignOperations(String),

    /// Failure reported by a host builtin
    #[error("{0}")]
    Host(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_label_message_includes_origin() {
        let err = BuildError::UnboundLabel {
            label: Label(3),
            origin: Some(12),
        };
        assert_eq!(err.to_string(), "label#3 (created at offset 12) was never emitted");
    }

    #[test]
    fn test_semantic_batch_message() {
        let err = LoweringError::Semantic(vec![
            SemanticError {
                kind: SemanticErrorKind::BreakOutsideLoop,
                span: Span::new(4, 6),
            },
            SemanticError {
                kind: SemanticErrorKind::InvalidAssignmentTarget,
                span: Span::new(20, 1),
            },
        ]);
        let text = err.to_string();
        assert!(text.starts_with("2 semantic error(s)"));
        assert!(text.contains("break used outside of loop at 4..10"));
    }
}
