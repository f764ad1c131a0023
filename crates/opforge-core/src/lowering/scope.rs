//! Name resolution for lowering.

use crate::builder::LocalSlot;

/// A named local visible to the lowerer.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The source name
    pub name: String,
    /// The builder slot holding it
    pub slot: LocalSlot,
    /// The scope depth where this was declared
    pub depth: usize,
}

/// Maps source names to local slots across nested blocks.
#[derive(Debug, Default)]
pub struct NameScope {
    bindings: Vec<Binding>,
    depth: usize,
}

impl NameScope {
    /// Creates an empty scope at depth 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new scope.
    pub fn begin_scope(&mut self) {
        self.depth += 1;
    }

    /// End the current scope and return the number of names dropped.
    pub fn end_scope(&mut self) -> usize {
        let keep = self
            .bindings
            .iter()
            .rposition(|binding| binding.depth < self.depth)
            .map_or(0, |i| i + 1);
        let dropped = self.bindings.len() - keep;
        self.bindings.truncate(keep);
        self.depth = self.depth.saturating_sub(1);
        dropped
    }

    /// Binds `name` to `slot` in the current scope.
    pub fn declare(&mut self, name: impl Into<String>, slot: LocalSlot) {
        self.bindings.push(Binding {
            name: name.into(),
            slot,
            depth: self.depth,
        });
    }

    /// Resolves `name` to the innermost visible slot.
    pub fn resolve(&self, name: &str) -> Option<LocalSlot> {
        self.bindings
            .iter()
            .rev()
            .find(|binding| binding.name == name)
            .map(|binding| binding.slot)
    }

    /// Check if a name is bound to a local.
    pub fn is_local(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Current depth.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
