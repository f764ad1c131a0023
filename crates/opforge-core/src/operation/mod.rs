//! Operation definitions.
//!
//! An [`Operation`] is one node of the tree a front end assembles through the
//! [`Builder`](crate::builder::Builder). Built-in operations cover structured
//! control flow and local variables; everything language specific is a
//! [`CustomOperation`] declared up front in an [`OperationSet`].

use std::fmt;

use num_bigint::BigInt;
use rustc_hash::FxHashMap;

use crate::builder::{Label, LocalSlot};
use crate::error::BuildError;

/// A node in the operation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// A sequence of operations; evaluates to the value of the last child.
    Block(Vec<Operation>),
    /// Value-producing `condition ? then_value : else_value`.
    Conditional {
        /// The boolean condition
        condition: Box<Operation>,
        /// Evaluated when the condition holds
        then_value: Box<Operation>,
        /// Evaluated otherwise
        else_value: Box<Operation>,
    },
    /// Statement-form `if` without an else branch.
    IfThen {
        /// The boolean condition
        condition: Box<Operation>,
        /// Executed when the condition holds
        then_branch: Box<Operation>,
    },
    /// Statement-form `if` with an else branch.
    IfThenElse {
        /// The boolean condition
        condition: Box<Operation>,
        /// Executed when the condition holds
        then_branch: Box<Operation>,
        /// Executed otherwise
        else_branch: Box<Operation>,
    },
    /// Repeats `body` while `condition` holds.
    While {
        /// The boolean condition
        condition: Box<Operation>,
        /// The loop body
        body: Box<Operation>,
    },
    /// Binds a label at this position of the enclosing sequence.
    Label(Label),
    /// Transfers control to a label.
    Branch(Label),
    /// Reads a local slot.
    LoadLocal(LocalSlot),
    /// Writes a local slot; evaluates to the stored value.
    StoreLocal {
        /// The target slot
        slot: LocalSlot,
        /// The stored value
        value: Box<Operation>,
    },
    /// Reads an argument of the running program.
    LoadArgument(usize),
    /// A constant value.
    Constant(Constant),
    /// Returns from the running program.
    Return(Box<Operation>),
    /// Instrumentation region. Semantically a sequence.
    Tag {
        /// The classification of the wrapped subtree
        tag: Tag,
        /// The wrapped operations
        body: Vec<Operation>,
    },
    /// Source attribution region. Semantically a sequence.
    SourceSection {
        /// The attributed source range
        span: Span,
        /// The wrapped operations
        body: Vec<Operation>,
    },
    /// A language-specific operation.
    Custom {
        /// Which operation of the set
        op: CustomOpId,
        /// Operand subtrees, in evaluation order
        children: Vec<Operation>,
    },
}

impl Operation {
    /// Returns the children of a sequence-like operation, if this is one.
    pub fn sequence(&self) -> Option<&[Operation]> {
        match self {
            Operation::Block(body)
            | Operation::Tag { body, .. }
            | Operation::SourceSection { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Constant values that can be embedded in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// The null value
    Null,
    /// A boolean
    Bool(bool),
    /// A 64-bit integer
    Long(i64),
    /// An integer that does not fit into 64 bits
    BigNumber(BigInt),
    /// A string
    String(String),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => write!(f, "null"),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Long(n) => write!(f, "{}", n),
            Constant::BigNumber(n) => write!(f, "{}", n),
            Constant::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Instrumentation classifications for tag regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// The whole program
    Root,
    /// The body of the program, excluding argument setup
    RootBody,
    /// A statement
    Statement,
    /// An expression
    Expression,
    /// A call site
    Call,
    /// A debugger halt point
    AlwaysHalt,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::Root => "root",
            Tag::RootBody => "root-body",
            Tag::Statement => "statement",
            Tag::Expression => "expression",
            Tag::Call => "call",
            Tag::AlwaysHalt => "always-halt",
        };
        f.write_str(name)
    }
}

/// A textual range in the source, as character offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Offset of the first character
    pub start: usize,
    /// Number of characters
    pub length: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Offset one past the last character.
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

/// Identifies a custom operation within its [`OperationSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomOpId(pub(crate) u16);

impl CustomOpId {
    /// Position of the operation in its set.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CustomOpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How many children an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many
    Fixed(usize),
    /// This many or more
    AtLeast(usize),
}

impl Arity {
    /// Whether `count` children satisfy this arity.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// A language-specific operation declared by a front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomOperation {
    /// Unique name, used in diagnostics and tree dumps
    pub name: String,
    /// Accepted child count
    pub arity: Arity,
}

/// The declarative description of a language's custom operations.
#[derive(Debug, Clone, Default)]
pub struct OperationSet {
    operations: Vec<CustomOperation>,
    by_name: FxHashMap<String, CustomOpId>,
}

impl OperationSet {
    /// Creates an empty operation set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new operation and returns its id.
    pub fn define(&mut self, name: &str, arity: Arity) -> Result<CustomOpId, BuildError> {
        if self.by_name.contains_key(name) {
            return Err(BuildError::DuplicateOperation {
                name: name.to_string(),
            });
        }
        let id = u16::try_from(self.operations.len())
            .map(CustomOpId)
            .map_err(|_| BuildError::TooManyOperations {
                max: usize::from(u16::MAX) + 1,
            })?;
        self.operations.push(CustomOperation {
            name: name.to_string(),
            arity,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up an operation by id.
    pub fn get(&self, id: CustomOpId) -> Option<&CustomOperation> {
        self.operations.get(id.index())
    }

    /// Looks up an operation id by name.
    pub fn lookup(&self, name: &str) -> Option<CustomOpId> {
        self.by_name.get(name).copied()
    }

    /// Name of an operation, or a placeholder for foreign ids.
    pub fn name_of(&self, id: CustomOpId) -> &str {
        self.get(id).map_or("<unknown>", |op| op.name.as_str())
    }

    /// Number of declared operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operation is declared.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates over all operations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (CustomOpId, &CustomOperation)> {
        (0..=u16::MAX)
            .zip(&self.operations)
            .map(|(i, op)| (CustomOpId(i), op))
    }
}

/// Kinds of operations that are opened with `begin*` and closed with `end*`.
///
/// Used to report protocol violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// `begin_block` / `end_block`
    Block,
    /// `begin_conditional` / `end_conditional`
    Conditional,
    /// `begin_if_then` / `end_if_then`
    IfThen,
    /// `begin_if_then_else` / `end_if_then_else`
    IfThenElse,
    /// `begin_while` / `end_while`
    While,
    /// `begin_store_local` / `end_store_local`
    StoreLocal,
    /// `begin_return` / `end_return`
    Return,
    /// `begin_tag` / `end_tag`
    Tag,
    /// `begin_source_section` / `end_source_section`
    SourceSection,
    /// `begin_custom` / `end_custom`, with the operation name
    Custom(String),
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Block => f.write_str("Block"),
            OperationKind::Conditional => f.write_str("Conditional"),
            OperationKind::IfThen => f.write_str("IfThen"),
            OperationKind::IfThenElse => f.write_str("IfThenElse"),
            OperationKind::While => f.write_str("While"),
            OperationKind::StoreLocal => f.write_str("StoreLocal"),
            OperationKind::Return => f.write_str("Return"),
            OperationKind::Tag => f.write_str("Tag"),
            OperationKind::SourceSection => f.write_str("SourceSection"),
            OperationKind::Custom(name) => f.write_str(name),
        }
    }
}
