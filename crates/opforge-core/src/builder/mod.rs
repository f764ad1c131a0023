//! The operation builder.
//!
//! A front end lowers its parse tree by calling `begin*`/`end*` pairs and
//! `emit*` leaves in tree order. The builder keeps an explicit stack of open
//! [`BuilderFrame`]s, so nesting is checked on every call instead of relying on
//! the caller's recursion.
//!
//! ```text
//! begin_block()
//!   begin_store_local(x)
//!     emit_constant(1)
//!   end_store_local()
//!   emit_load_local(x)
//! end_block()
//! publish()          => Block[StoreLocal(x, 1), LoadLocal(x)]
//! ```
//!
//! # Module Structure
//!
//! - `frame`: open-operation frames and their child-count rules
//! - `locals`: slot tracking across nested blocks
//! - `labels`: label allocation and resolution

mod frame;
mod labels;
mod locals;

#[cfg(test)]
mod tests;

pub use frame::{BuilderFrame, FrameId, FrameKind};
pub use labels::{Label, LabelPosition, LabelRegistry, LabelTable};
pub use locals::{LocalScope, LocalSlot, SlotInfo};

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::BuildError;
use crate::operation::{Constant, CustomOpId, Operation, OperationKind, OperationSet, Span, Tag};
use crate::program::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderState {
    Building,
    Published,
    Aborted,
}

/// Assembles one program through the begin/end protocol.
#[derive(Debug)]
pub struct Builder {
    operations: Arc<OperationSet>,
    name: Option<String>,
    argument_count: usize,
    frames: Vec<BuilderFrame>,
    roots: Vec<Operation>,
    locals: LocalScope,
    labels: LabelRegistry,
    spans: Vec<Span>,
    next_frame: u32,
    state: BuilderState,
}

impl Builder {
    /// Creates a builder for programs over the given operation set.
    pub fn new(operations: Arc<OperationSet>) -> Self {
        Self {
            operations,
            name: None,
            argument_count: 0,
            frames: Vec::new(),
            roots: Vec::new(),
            locals: LocalScope::new(),
            labels: LabelRegistry::new(),
            spans: Vec::new(),
            next_frame: 0,
            state: BuilderState::Building,
        }
    }

    /// The operation set this builder validates against.
    pub fn operations(&self) -> &Arc<OperationSet> {
        &self.operations
    }

    /// Kinds of the currently open operations, outermost first.
    pub fn open_frames(&self) -> Vec<OperationKind> {
        self.frames
            .iter()
            .map(|frame| frame.kind.operation_kind(&self.operations))
            .collect()
    }

    /// The innermost open frame, if any.
    pub fn current_frame(&self) -> Option<&BuilderFrame> {
        self.frames.last()
    }

    /// Current local scope depth.
    pub fn scope_depth(&self) -> usize {
        self.locals.depth()
    }

    /// Whether `publish` has succeeded.
    pub fn is_published(&self) -> bool {
        self.state == BuilderState::Published
    }

    /// Whether a structural error stopped this builder.
    pub fn is_aborted(&self) -> bool {
        self.state == BuilderState::Aborted
    }

    /// Sets the program name recorded in the published program.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), BuildError> {
        let name = name.into();
        self.guarded(|b| {
            b.name = Some(name);
            Ok(())
        })
    }

    // ========================================================================
    // Locals and Labels
    // ========================================================================

    /// Declares a local slot in the innermost open block.
    pub fn create_local(&mut self) -> Result<LocalSlot, BuildError> {
        self.guarded(|b| b.locals.declare())
    }

    /// Creates an unbound label.
    pub fn create_label(&mut self) -> Result<Label, BuildError> {
        self.guarded(|b| {
            let origin = b.frames.iter().rev().find_map(|frame| match frame.kind {
                FrameKind::SourceSection(span) => Some(span.start),
                _ => None,
            });
            b.labels.create(origin)
        })
    }

    /// Binds `label` at the current position.
    pub fn emit_label(&mut self, label: Label) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.labels.check(label)?;
            let (container, index) = match b.frames.last() {
                Some(frame) if frame.kind.is_sequence() => (frame.id, frame.children.len()),
                Some(frame) => {
                    return Err(BuildError::LabelOutsideSequence {
                        label,
                        container: frame.kind.operation_kind(&b.operations),
                    });
                }
                None => (FrameId::ROOT, b.roots.len()),
            };
            b.labels.bind(label, LabelPosition { container, index })?;
            b.append(Operation::Label(label));
            Ok(())
        })
    }

    /// Emits a branch to `label`, which may still be unbound.
    pub fn emit_branch(&mut self, label: Label) -> Result<(), BuildError> {
        self.guarded(|b| {
            let enclosing = std::iter::once(FrameId::ROOT)
                .chain(b.frames.iter().map(|frame| frame.id))
                .collect();
            b.labels.record_use(label, enclosing)?;
            b.append(Operation::Branch(label));
            Ok(())
        })
    }

    // ========================================================================
    // Leaves
    // ========================================================================

    /// Emits a read of `slot`.
    pub fn emit_load_local(&mut self, slot: LocalSlot) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.locals.check_live(slot)?;
            b.append(Operation::LoadLocal(slot));
            Ok(())
        })
    }

    /// Emits a read of argument `index`.
    pub fn emit_load_argument(&mut self, index: usize) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.argument_count = b.argument_count.max(index + 1);
            b.append(Operation::LoadArgument(index));
            Ok(())
        })
    }

    /// Emits a constant.
    pub fn emit_constant(&mut self, value: Constant) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.append(Operation::Constant(value));
            Ok(())
        })
    }

    // ========================================================================
    // Begin/End Pairs
    // ========================================================================

    /// Opens a block, which is also a local scope level.
    pub fn begin_block(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.locals.enter_block(0);
            b.open(FrameKind::Block);
            Ok(())
        })
    }

    /// Closes the innermost block and kills its locals.
    pub fn end_block(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| b.close(OperationKind::Block))
    }

    /// Opens a value conditional: condition, then-value, else-value.
    pub fn begin_conditional(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.open(FrameKind::Conditional);
            Ok(())
        })
    }

    /// Closes the innermost conditional.
    pub fn end_conditional(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| b.close(OperationKind::Conditional))
    }

    /// Opens an if statement: condition, then-branch.
    pub fn begin_if_then(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.open(FrameKind::IfThen);
            Ok(())
        })
    }

    /// Closes the innermost if statement.
    pub fn end_if_then(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| b.close(OperationKind::IfThen))
    }

    /// Opens an if/else statement: condition, then-branch, else-branch.
    pub fn begin_if_then_else(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.open(FrameKind::IfThenElse);
            Ok(())
        })
    }

    /// Closes the innermost if/else statement.
    pub fn end_if_then_else(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| b.close(OperationKind::IfThenElse))
    }

    /// Opens a loop: condition, body.
    pub fn begin_while(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.open(FrameKind::While);
            Ok(())
        })
    }

    /// Closes the innermost loop.
    pub fn end_while(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| b.close(OperationKind::While))
    }

    /// Opens a store into `slot`; the single child is the stored value.
    pub fn begin_store_local(&mut self, slot: LocalSlot) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.locals.check_live(slot)?;
            b.open(FrameKind::StoreLocal(slot));
            Ok(())
        })
    }

    /// Closes the innermost store.
    pub fn end_store_local(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| b.close(OperationKind::StoreLocal))
    }

    /// Opens a return; the single child is the returned value.
    pub fn begin_return(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.open(FrameKind::Return);
            Ok(())
        })
    }

    /// Closes the innermost return.
    pub fn end_return(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| b.close(OperationKind::Return))
    }

    /// Opens an instrumentation region.
    pub fn begin_tag(&mut self, tag: Tag) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.open(FrameKind::Tag(tag));
            Ok(())
        })
    }

    /// Closes the innermost instrumentation region.
    pub fn end_tag(&mut self) -> Result<(), BuildError> {
        self.guarded(|b| b.close(OperationKind::Tag))
    }

    /// Opens a source attribution region starting at `start`.
    pub fn begin_source_section(&mut self, start: usize) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.open(FrameKind::SourceSection(Span::new(start, 0)));
            Ok(())
        })
    }

    /// Closes the innermost source region, `length` characters long.
    pub fn end_source_section(&mut self, length: usize) -> Result<(), BuildError> {
        self.guarded(|b| {
            if let Some(frame) = b.frames.last_mut() {
                if let FrameKind::SourceSection(span) = &mut frame.kind {
                    span.length = length;
                }
            }
            b.close(OperationKind::SourceSection)
        })
    }

    /// Opens a language-specific operation.
    pub fn begin_custom(&mut self, op: CustomOpId) -> Result<(), BuildError> {
        self.guarded(|b| {
            b.custom_kind(op)?;
            b.open(FrameKind::Custom(op));
            Ok(())
        })
    }

    /// Closes the innermost language-specific operation, which must be `op`.
    pub fn end_custom(&mut self, op: CustomOpId) -> Result<(), BuildError> {
        self.guarded(|b| {
            let kind = b.custom_kind(op)?;
            b.close(kind)
        })
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    /// Validates the finished tree and hands it out as a [`Program`].
    pub fn publish(&mut self) -> Result<Program, BuildError> {
        self.guarded(|b| {
            if !b.frames.is_empty() {
                return Err(BuildError::UnclosedFrames {
                    open: b.open_frames(),
                });
            }
            if b.locals.depth() != 0 {
                return Err(BuildError::ScopeImbalance {
                    depth: b.locals.depth(),
                });
            }
            if b.roots.is_empty() {
                return Err(BuildError::EmptyProgram);
            }

            let labels = std::mem::take(&mut b.labels).resolve()?;
            let slots = std::mem::take(&mut b.locals).into_table();
            let program = Program::new(
                b.name.take(),
                b.argument_count,
                Arc::clone(&b.operations),
                std::mem::take(&mut b.roots),
                slots,
                labels,
                std::mem::take(&mut b.spans),
            );
            b.state = BuilderState::Published;

            debug!(
                name = program.name().unwrap_or("<anonymous>"),
                locals = program.local_count(),
                labels = program.labels().len(),
                "published program"
            );
            Ok(program)
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn guarded<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, BuildError>,
    ) -> Result<T, BuildError> {
        match self.state {
            BuilderState::Building => {}
            BuilderState::Published => return Err(BuildError::Published),
            BuilderState::Aborted => return Err(BuildError::Aborted),
        }
        let result = f(self);
        if let Err(err) = &result {
            debug!(error = %err, open = self.frames.len(), "builder aborted");
            self.state = BuilderState::Aborted;
        }
        result
    }

    fn open(&mut self, kind: FrameKind) {
        self.next_frame += 1;
        trace!(depth = self.frames.len(), ?kind, "begin");
        self.frames
            .push(BuilderFrame::new(FrameId(self.next_frame), kind));
    }

    fn close(&mut self, closing: OperationKind) -> Result<(), BuildError> {
        let frame = self.frames.pop().ok_or_else(|| BuildError::UnexpectedEnd {
            closing: closing.clone(),
        })?;
        let open = frame.kind.operation_kind(&self.operations);
        if open != closing {
            return Err(BuildError::Mismatch { open, closing });
        }
        trace!(depth = self.frames.len(), kind = %closing, "end");

        match frame.kind {
            FrameKind::Block => {
                self.locals.exit_block()?;
            }
            FrameKind::SourceSection(span) => self.spans.push(span),
            _ => {}
        }
        let op = frame.finish(&self.operations)?;
        self.append(op);
        Ok(())
    }

    fn append(&mut self, op: Operation) {
        match self.frames.last_mut() {
            Some(frame) => frame.children.push(op),
            None => self.roots.push(op),
        }
    }

    fn custom_kind(&self, op: CustomOpId) -> Result<OperationKind, BuildError> {
        self.operations
            .get(op)
            .map(|def| OperationKind::Custom(def.name.clone()))
            .ok_or(BuildError::UnknownOperation { id: op })
    }
}
