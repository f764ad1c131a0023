//! Member-expression chains: `base(args).field[index] = value`.
//!
//! Reads recurse from the last accessor back to the base identifier, each
//! accessor wrapping the lowering of its prefix.
//!
//! Writes are split around the assigned value. The "before" half opens the
//! frames of the target and leaves the value slot open, the value is lowered
//! into it, and the "after" half closes what "before" opened:
//!
//! ```text
//! x = v        Block[StoreLocal(x, v), LoadLocal(x)]
//! a.b = v      Tag expression[WriteProperty(a, "b", v)]
//! a[i] = v     Tag expression[WriteProperty(a, i, v)]
//! ```

use super::{Intrinsic, Lowerer};
use crate::ast::{Accessor, Expr, Ident};
use crate::error::{BuildError, SemanticErrorKind};
use crate::operation::{Constant, OperationKind, Span, Tag};

/// What the "before" half of a write opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteTarget {
    /// A block and a store; the slot is on the write-target stack
    Local,
    /// An expression tag and a property write
    Property,
    /// Nothing; the value is lowered bare
    Invalid,
}

impl Lowerer<'_> {
    pub(super) fn member_read(&mut self, base: &Ident, chain: &[Accessor]) -> Result<(), BuildError> {
        let Some((last, prefix)) = chain.split_last() else {
            return self.name_read(base);
        };
        match last {
            Accessor::Call { args, .. } => {
                self.builder.begin_tag(Tag::Call)?;
                self.custom(Intrinsic::Invoke, |l| {
                    l.member_read(base, prefix)?;
                    args.iter().try_for_each(|arg| l.expression(arg))
                })?;
                self.builder.end_tag()
            }
            Accessor::Field(name) => self.custom(Intrinsic::ReadProperty, |l| {
                l.member_read(base, prefix)?;
                l.builder.emit_constant(Constant::String(name.name.clone()))
            }),
            Accessor::Index(index) => self.custom(Intrinsic::ReadProperty, |l| {
                l.member_read(base, prefix)?;
                l.expression(index)
            }),
            Accessor::Assign { value, span } => self.member_write(base, prefix, value, *span),
        }
    }

    fn name_read(&mut self, name: &Ident) -> Result<(), BuildError> {
        match self.names.resolve(&name.name) {
            Some(slot) => self.builder.emit_load_local(slot),
            None => self.custom(Intrinsic::FunctionLiteral, |l| {
                l.builder.emit_constant(Constant::String(name.name.clone()))
            }),
        }
    }

    fn member_write(
        &mut self,
        base: &Ident,
        target: &[Accessor],
        value: &Expr,
        span: Span,
    ) -> Result<(), BuildError> {
        let opened = self.write_before(base, target, span)?;
        self.expression(value)?;
        self.write_after(opened)
    }

    fn write_before(
        &mut self,
        base: &Ident,
        target: &[Accessor],
        span: Span,
    ) -> Result<WriteTarget, BuildError> {
        match target.split_last() {
            None => match self.names.resolve(&base.name) {
                Some(slot) => {
                    self.write_targets.push(slot);
                    self.builder.begin_block()?;
                    self.builder.begin_store_local(slot)?;
                    Ok(WriteTarget::Local)
                }
                None => {
                    self.report(
                        SemanticErrorKind::UndeclaredAssignmentTarget(base.name.clone()),
                        base.span,
                    );
                    Ok(WriteTarget::Invalid)
                }
            },
            Some((Accessor::Field(name), prefix)) => {
                self.begin_property_write(base, prefix)?;
                self.builder
                    .emit_constant(Constant::String(name.name.clone()))?;
                Ok(WriteTarget::Property)
            }
            Some((Accessor::Index(index), prefix)) => {
                self.begin_property_write(base, prefix)?;
                self.expression(index)?;
                Ok(WriteTarget::Property)
            }
            Some((Accessor::Call { .. } | Accessor::Assign { .. }, _)) => {
                self.report(SemanticErrorKind::InvalidAssignmentTarget, span);
                Ok(WriteTarget::Invalid)
            }
        }
    }

    fn begin_property_write(&mut self, base: &Ident, receiver: &[Accessor]) -> Result<(), BuildError> {
        self.builder.begin_tag(Tag::Expression)?;
        self.builder
            .begin_custom(self.ops.id(Intrinsic::WriteProperty))?;
        self.member_read(base, receiver)
    }

    fn write_after(&mut self, opened: WriteTarget) -> Result<(), BuildError> {
        match opened {
            WriteTarget::Local => {
                let Some(slot) = self.write_targets.pop() else {
                    return Err(BuildError::UnexpectedEnd {
                        closing: OperationKind::StoreLocal,
                    });
                };
                self.builder.end_store_local()?;
                self.builder.emit_load_local(slot)?;
                self.builder.end_block()
            }
            WriteTarget::Property => {
                self.builder
                    .end_custom(self.ops.id(Intrinsic::WriteProperty))?;
                self.builder.end_tag()
            }
            WriteTarget::Invalid => Ok(()),
        }
    }
}
