//! The finished result of a builder session.

use std::fmt;
use std::sync::Arc;

use crate::builder::{LabelTable, SlotInfo};
use crate::operation::{Operation, OperationSet, Span};

/// An immutable, fully resolved operation tree with its metadata.
///
/// Produced by [`Builder::publish`](crate::builder::Builder::publish). There
/// are no open frames and no unbound labels in a `Program`.
#[derive(Debug, Clone)]
pub struct Program {
    name: Option<String>,
    argument_count: usize,
    operations: Arc<OperationSet>,
    body: Vec<Operation>,
    slots: Vec<SlotInfo>,
    labels: LabelTable,
    spans: Vec<Span>,
}

impl Program {
    pub(crate) fn new(
        name: Option<String>,
        argument_count: usize,
        operations: Arc<OperationSet>,
        body: Vec<Operation>,
        slots: Vec<SlotInfo>,
        labels: LabelTable,
        spans: Vec<Span>,
    ) -> Self {
        Self {
            name,
            argument_count,
            operations,
            body,
            slots,
            labels,
            spans,
        }
    }

    /// The program (method) name, if one was set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of arguments the program reads.
    pub fn argument_count(&self) -> usize {
        self.argument_count
    }

    /// The operation set custom operations refer to.
    pub fn operations(&self) -> &Arc<OperationSet> {
        &self.operations
    }

    /// Top-level operations.
    pub fn body(&self) -> &[Operation] {
        &self.body
    }

    /// Every local slot, indexed by [`LocalSlot::index`](crate::builder::LocalSlot::index).
    pub fn slots(&self) -> &[SlotInfo] {
        &self.slots
    }

    /// Number of local slots the program needs.
    pub fn local_count(&self) -> usize {
        self.slots.len()
    }

    /// Resolved label positions.
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Source attribution spans, in the order their regions closed.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    fn write_operation(&self, f: &mut fmt::Formatter<'_>, op: &Operation, indent: usize) -> fmt::Result {
        write!(f, "{:width$}", "", width = indent * 2)?;
        match op {
            Operation::Block(body) => {
                writeln!(f, "Block")?;
                self.write_all(f, body, indent + 1)
            }
            Operation::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                writeln!(f, "Conditional")?;
                self.write_all(f, [&**condition, &**then_value, &**else_value], indent + 1)
            }
            Operation::IfThen {
                condition,
                then_branch,
            } => {
                writeln!(f, "IfThen")?;
                self.write_all(f, [&**condition, &**then_branch], indent + 1)
            }
            Operation::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                writeln!(f, "IfThenElse")?;
                self.write_all(f, [&**condition, &**then_branch, &**else_branch], indent + 1)
            }
            Operation::While { condition, body } => {
                writeln!(f, "While")?;
                self.write_all(f, [&**condition, &**body], indent + 1)
            }
            Operation::Label(label) => writeln!(f, "Label {}", label),
            Operation::Branch(label) => writeln!(f, "Branch {}", label),
            Operation::LoadLocal(slot) => writeln!(f, "LoadLocal {}", slot),
            Operation::StoreLocal { slot, value } => {
                writeln!(f, "StoreLocal {}", slot)?;
                self.write_operation(f, value, indent + 1)
            }
            Operation::LoadArgument(index) => writeln!(f, "LoadArgument {}", index),
            Operation::Constant(value) => writeln!(f, "Constant {}", value),
            Operation::Return(value) => {
                writeln!(f, "Return")?;
                self.write_operation(f, value, indent + 1)
            }
            Operation::Tag { tag, body } => {
                writeln!(f, "Tag {}", tag)?;
                self.write_all(f, body, indent + 1)
            }
            Operation::SourceSection { span, body } => {
                writeln!(f, "SourceSection {}", span)?;
                self.write_all(f, body, indent + 1)
            }
            Operation::Custom { op, children } => {
                writeln!(f, "{}", self.operations.name_of(*op))?;
                self.write_all(f, children, indent + 1)
            }
        }
    }

    fn write_all<'a>(
        &self,
        f: &mut fmt::Formatter<'_>,
        ops: impl IntoIterator<Item = &'a Operation>,
        indent: usize,
    ) -> fmt::Result {
        for op in ops {
            self.write_operation(f, op, indent)?;
        }
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "program {} (arguments: {}, locals: {}, labels: {})",
            self.name().unwrap_or("<anonymous>"),
            self.argument_count,
            self.local_count(),
            self.labels.len()
        )?;
        self.write_all(f, &self.body, 1)
    }
}
