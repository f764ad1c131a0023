//! N-ary short-circuit chains.
//!
//! `t0 || t1 || t2` lowers right-associated, with one temporary per term but
//! the last:
//!
//! ```text
//! Block
//!   StoreLocal l0 <- t0
//!   Conditional
//!     ToBoolean(l0)
//!     l0                          (OR: first truthy value wins)
//!     Block
//!       StoreLocal l1 <- t1
//!       Conditional
//!         ToBoolean(l1)
//!         l1
//!         t2
//! ```
//!
//! For `&&` the then/else roles swap: the continuation runs when the
//! temporary is truthy and the temporary itself is the else value.

use super::{Intrinsic, Lowerer};
use crate::ast::{Expr, LogicalOp};
use crate::error::BuildError;
use crate::operation::{Constant, Tag};

impl Lowerer<'_> {
    pub(super) fn logical(&mut self, op: LogicalOp, terms: &[Expr]) -> Result<(), BuildError> {
        let Some((last, leading)) = terms.split_last() else {
            // identity of the operator
            return self
                .builder
                .emit_constant(Constant::Bool(op == LogicalOp::And));
        };
        if leading.is_empty() {
            return self.expression(last);
        }

        self.builder.begin_tag(Tag::Expression)?;

        // Frames stay open across terms; the continuation is built inside
        // the innermost conditional and closed from the inside out.
        let mut temporaries = Vec::with_capacity(leading.len());
        for term in leading {
            self.builder.begin_block()?;
            let slot = self.builder.create_local()?;
            self.builder.begin_store_local(slot)?;
            self.expression(term)?;
            self.builder.end_store_local()?;

            self.builder.begin_conditional()?;
            self.custom(Intrinsic::ToBoolean, |l| l.builder.emit_load_local(slot))?;
            if op == LogicalOp::Or {
                self.builder.emit_load_local(slot)?;
            }
            temporaries.push(slot);
        }

        self.expression(last)?;

        for slot in temporaries.into_iter().rev() {
            if op == LogicalOp::And {
                self.builder.emit_load_local(slot)?;
            }
            self.builder.end_conditional()?;
            self.builder.end_block()?;
        }

        self.builder.end_tag()
    }
}
