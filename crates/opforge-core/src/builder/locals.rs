//! Local slot tracking across nested blocks.

use std::fmt;

use crate::error::BuildError;

/// A local variable slot.
///
/// Slot indices are assigned in declaration order and never reused within a
/// program, so a slot from a closed block can never alias a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalSlot(pub(crate) u32);

impl LocalSlot {
    /// The slot index within its program.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LocalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local#{}", self.0)
    }
}

/// Per-slot record kept in the program's slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    /// The slot
    pub slot: LocalSlot,
    /// Block depth the slot was declared at (0 = program level)
    pub depth: usize,
}

/// The ambient sequence of live slots.
#[derive(Debug, Default)]
pub struct LocalScope {
    /// Slots visible right now, in declaration order
    live: Vec<LocalSlot>,
    /// Length of `live` at each open block
    marks: Vec<usize>,
    /// Every slot ever declared
    table: Vec<SlotInfo>,
    /// Whether each slot in `table` is still live
    alive: Vec<bool>,
}

impl LocalScope {
    /// Creates an empty scope at depth 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a nesting level, reserving room for `expected` declarations.
    pub fn enter_block(&mut self, expected: usize) {
        self.marks.push(self.live.len());
        self.live.reserve(expected);
    }

    /// Closes the innermost nesting level and returns how many slots died.
    pub fn exit_block(&mut self) -> Result<usize, BuildError> {
        let mark = self.marks.pop().ok_or(BuildError::ScopeUnderflow)?;
        let dead = self.live.len() - mark;
        for slot in self.live.drain(mark..) {
            self.alive[slot.index()] = false;
        }
        Ok(dead)
    }

    /// Declares a fresh slot in the innermost level.
    pub fn declare(&mut self) -> Result<LocalSlot, BuildError> {
        let slot = slot_at(self.table.len())?;
        self.table.push(SlotInfo {
            slot,
            depth: self.depth(),
        });
        self.alive.push(true);
        self.live.push(slot);
        Ok(slot)
    }

    /// Fails unless `slot` belongs to an open level.
    pub fn check_live(&self, slot: LocalSlot) -> Result<(), BuildError> {
        match self.alive.get(slot.index()) {
            Some(true) => Ok(()),
            _ => Err(BuildError::LocalOutOfScope { slot }),
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Number of live slots.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Consumes the tracker, yielding the slot table.
    pub fn into_table(self) -> Vec<SlotInfo> {
        self.table
    }
}

fn slot_at(index: usize) -> Result<LocalSlot, BuildError> {
    u32::try_from(index).map(LocalSlot).map_err(|_| BuildError::TooManyLocals {
        max: u64::from(u32::MAX) + 1,
    })
}
