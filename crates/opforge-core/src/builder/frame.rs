//! Open-operation frames of the builder stack.

use std::fmt;

use crate::builder::LocalSlot;
use crate::error::BuildError;
use crate::operation::{Arity, CustomOpId, Operation, OperationKind, OperationSet, Span, Tag};

/// Identifies a sequence container for label scoping.
///
/// `FrameId::ROOT` is the program's top level, which is never on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub(crate) u32);

impl FrameId {
    /// The program's top level.
    pub const ROOT: FrameId = FrameId(0);
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == FrameId::ROOT {
            f.write_str("root")
        } else {
            write!(f, "frame#{}", self.0)
        }
    }
}

/// What an open frame will become once closed.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    /// A block; also a local scope level
    Block,
    /// Value conditional
    Conditional,
    /// If without else
    IfThen,
    /// If with else
    IfThenElse,
    /// While loop
    While,
    /// Store into a slot
    StoreLocal(LocalSlot),
    /// Return
    Return,
    /// Instrumentation region
    Tag(Tag),
    /// Source attribution; `length` is filled in when the region ends
    SourceSection(Span),
    /// Language-specific operation
    Custom(CustomOpId),
}

impl FrameKind {
    /// Whether labels may be emitted directly inside this frame.
    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            FrameKind::Block | FrameKind::Tag(_) | FrameKind::SourceSection(_)
        )
    }

    /// The child count this frame accepts, or `None` for sequences.
    pub fn arity(&self, operations: &OperationSet) -> Option<Arity> {
        match self {
            FrameKind::Block | FrameKind::Tag(_) | FrameKind::SourceSection(_) => None,
            FrameKind::Conditional | FrameKind::IfThenElse => Some(Arity::Fixed(3)),
            FrameKind::IfThen | FrameKind::While => Some(Arity::Fixed(2)),
            FrameKind::StoreLocal(_) | FrameKind::Return => Some(Arity::Fixed(1)),
            FrameKind::Custom(id) => operations.get(*id).map(|op| op.arity),
        }
    }

    /// The kind reported in protocol errors.
    pub fn operation_kind(&self, operations: &OperationSet) -> OperationKind {
        match self {
            FrameKind::Block => OperationKind::Block,
            FrameKind::Conditional => OperationKind::Conditional,
            FrameKind::IfThen => OperationKind::IfThen,
            FrameKind::IfThenElse => OperationKind::IfThenElse,
            FrameKind::While => OperationKind::While,
            FrameKind::StoreLocal(_) => OperationKind::StoreLocal,
            FrameKind::Return => OperationKind::Return,
            FrameKind::Tag(_) => OperationKind::Tag,
            FrameKind::SourceSection(_) => OperationKind::SourceSection,
            FrameKind::Custom(id) => OperationKind::Custom(operations.name_of(*id).to_string()),
        }
    }
}

/// An in-progress `begin*` awaiting its `end*`.
#[derive(Debug, Clone)]
pub struct BuilderFrame {
    pub(crate) id: FrameId,
    pub(crate) kind: FrameKind,
    pub(crate) children: Vec<Operation>,
}

impl BuilderFrame {
    pub(crate) fn new(id: FrameId, kind: FrameKind) -> Self {
        Self {
            id,
            kind,
            children: Vec::new(),
        }
    }

    /// The frame's container id.
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// The frame's kind.
    pub fn kind(&self) -> &FrameKind {
        &self.kind
    }

    /// Children emitted so far.
    pub fn children(&self) -> &[Operation] {
        &self.children
    }

    /// Validates the child count and produces the finished operation.
    pub(crate) fn finish(self, operations: &OperationSet) -> Result<Operation, BuildError> {
        if let Some(expected) = self.kind.arity(operations) {
            if !expected.accepts(self.children.len()) {
                return Err(BuildError::ChildCount {
                    kind: self.kind.operation_kind(operations),
                    expected,
                    found: self.children.len(),
                });
            }
        }

        let kind = self.kind;
        let children = self.children;
        let op = match kind {
            FrameKind::Block => Operation::Block(children),
            FrameKind::Tag(tag) => Operation::Tag {
                tag,
                body: children,
            },
            FrameKind::SourceSection(span) => Operation::SourceSection {
                span,
                body: children,
            },
            FrameKind::Custom(op) => Operation::Custom { op, children },
            FrameKind::Conditional => {
                let [condition, then_value, else_value] =
                    exactly(OperationKind::Conditional, children)?;
                Operation::Conditional {
                    condition: Box::new(condition),
                    then_value: Box::new(then_value),
                    else_value: Box::new(else_value),
                }
            }
            FrameKind::IfThen => {
                let [condition, then_branch] = exactly(OperationKind::IfThen, children)?;
                Operation::IfThen {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                }
            }
            FrameKind::IfThenElse => {
                let [condition, then_branch, else_branch] =
                    exactly(OperationKind::IfThenElse, children)?;
                Operation::IfThenElse {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                }
            }
            FrameKind::While => {
                let [condition, body] = exactly(OperationKind::While, children)?;
                Operation::While {
                    condition: Box::new(condition),
                    body: Box::new(body),
                }
            }
            FrameKind::StoreLocal(slot) => {
                let [value] = exactly(OperationKind::StoreLocal, children)?;
                Operation::StoreLocal {
                    slot,
                    value: Box::new(value),
                }
            }
            FrameKind::Return => {
                let [value] = exactly(OperationKind::Return, children)?;
                Operation::Return(Box::new(value))
            }
        };
        Ok(op)
    }
}

fn exactly<const N: usize>(
    kind: OperationKind,
    children: Vec<Operation>,
) -> Result<[Operation; N], BuildError> {
    let found = children.len();
    children.try_into().map_err(|_| BuildError::ChildCount {
        kind,
        expected: Arity::Fixed(N),
        found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Constant;

    fn constant(n: i64) -> Operation {
        Operation::Constant(Constant::Long(n))
    }

    #[test]
    fn test_finish_conditional() {
        let mut frame = BuilderFrame::new(FrameId(1), FrameKind::Conditional);
        frame.children = vec![Operation::Constant(Constant::Bool(true)), constant(1), constant(2)];
        let op = frame.finish(&OperationSet::new()).unwrap();
        assert!(matches!(op, Operation::Conditional { .. }));
    }

    #[test]
    fn test_finish_rejects_wrong_count() {
        let mut frame = BuilderFrame::new(FrameId(1), FrameKind::While);
        frame.children = vec![constant(1)];
        let err = frame.finish(&OperationSet::new()).unwrap_err();
        assert_eq!(
            err,
            BuildError::ChildCount {
                kind: OperationKind::While,
                expected: Arity::Fixed(2),
                found: 1,
            }
        );
    }

    #[test]
    fn test_exactly_reports_the_closing_kind() {
        let err = exactly::<3>(OperationKind::IfThenElse, vec![constant(1)]).unwrap_err();
        assert_eq!(
            err,
            BuildError::ChildCount {
                kind: OperationKind::IfThenElse,
                expected: Arity::Fixed(3),
                found: 1,
            }
        );
    }

    #[test]
    fn test_sequences_accept_any_count() {
        let frame = BuilderFrame::new(FrameId(1), FrameKind::Tag(Tag::Statement));
        assert!(frame.kind().is_sequence());
        let op = frame.finish(&OperationSet::new()).unwrap();
        assert_eq!(
            op,
            Operation::Tag {
                tag: Tag::Statement,
                body: vec![]
            }
        );
    }
}
