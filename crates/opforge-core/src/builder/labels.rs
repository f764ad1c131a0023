//! Label allocation and resolution.
//!
//! A label is created first, may be branched to any number of times (before
//! or after it is bound), and must be emitted exactly once. Resolution at
//! publish time checks the binding and that every branch site is nested inside
//! the sequence that binds the label.

use std::fmt;

use crate::builder::FrameId;
use crate::error::BuildError;

/// A branch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub(crate) u32);

impl Label {
    /// Position of the label in creation order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label#{}", self.0)
    }
}

/// Where a label is bound: a sequence container and the child index of the
/// `Label` operation within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPosition {
    /// The enclosing sequence
    pub container: FrameId,
    /// Index of the label among the container's children
    pub index: usize,
}

#[derive(Debug, Default)]
struct LabelState {
    origin: Option<usize>,
    position: Option<LabelPosition>,
    /// Containers open at each branch site
    uses: Vec<Vec<FrameId>>,
}

/// Allocates labels and records their bindings and uses.
#[derive(Debug, Default)]
pub struct LabelRegistry {
    labels: Vec<LabelState>,
}

impl LabelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a new unbound label. `origin` is reported if it stays unbound.
    pub fn create(&mut self, origin: Option<usize>) -> Result<Label, BuildError> {
        let label = label_at(self.labels.len())?;
        self.labels.push(LabelState {
            origin,
            ..LabelState::default()
        });
        Ok(label)
    }

    /// Binds `label` at `position`.
    pub fn bind(&mut self, label: Label, position: LabelPosition) -> Result<(), BuildError> {
        let state = self.state_mut(label)?;
        if state.position.is_some() {
            return Err(BuildError::LabelAlreadyBound { label });
        }
        state.position = Some(position);
        Ok(())
    }

    /// Records a branch to `label` from inside the given open containers.
    pub fn record_use(&mut self, label: Label, enclosing: Vec<FrameId>) -> Result<(), BuildError> {
        self.state_mut(label)?.uses.push(enclosing);
        Ok(())
    }

    /// Fails if `label` was not minted here.
    pub fn check(&self, label: Label) -> Result<(), BuildError> {
        if label.index() < self.labels.len() {
            Ok(())
        } else {
            Err(BuildError::UnknownLabel { label })
        }
    }

    /// Whether `label` has been emitted.
    pub fn is_bound(&self, label: Label) -> bool {
        self.labels
            .get(label.index())
            .is_some_and(|state| state.position.is_some())
    }

    /// Number of branches recorded for `label`.
    pub fn use_count(&self, label: Label) -> usize {
        self.labels.get(label.index()).map_or(0, |state| state.uses.len())
    }

    /// Number of labels created.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no label was created.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Checks every label and produces the resolution table.
    pub fn resolve(self) -> Result<LabelTable, BuildError> {
        let mut positions = Vec::with_capacity(self.labels.len());
        for (index, state) in (0..=u32::MAX).zip(self.labels) {
            let label = Label(index);
            let Some(position) = state.position else {
                return Err(BuildError::UnboundLabel {
                    label,
                    origin: state.origin,
                });
            };
            if state
                .uses
                .iter()
                .any(|enclosing| !enclosing.contains(&position.container))
            {
                return Err(BuildError::BranchOutOfScope { label });
            }
            positions.push(position);
        }
        Ok(LabelTable { positions })
    }

    fn state_mut(&mut self, label: Label) -> Result<&mut LabelState, BuildError> {
        self.labels
            .get_mut(label.index())
            .ok_or(BuildError::UnknownLabel { label })
    }
}

fn label_at(index: usize) -> Result<Label, BuildError> {
    u32::try_from(index).map(Label).map_err(|_| BuildError::TooManyLabels {
        max: u64::from(u32::MAX) + 1,
    })
}

/// Resolved label positions of a published program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    positions: Vec<LabelPosition>,
}

impl LabelTable {
    /// Where `label` is bound.
    pub fn position(&self, label: Label) -> Option<LabelPosition> {
        self.positions.get(label.index()).copied()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the program has no labels.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(container: u32, index: usize) -> LabelPosition {
        LabelPosition {
            container: FrameId(container),
            index,
        }
    }

    #[test]
    fn test_forward_reference_resolves() {
        let mut labels = LabelRegistry::new();
        let l = labels.create(None).unwrap();
        labels.record_use(l, vec![FrameId::ROOT, FrameId(1)]).unwrap();
        assert!(!labels.is_bound(l));
        labels.bind(l, at(0, 3)).unwrap();

        let table = labels.resolve().unwrap();
        assert_eq!(table.position(l), Some(at(0, 3)));
    }

    #[test]
    fn test_double_bind_fails() {
        let mut labels = LabelRegistry::new();
        let l = labels.create(None).unwrap();
        labels.bind(l, at(0, 0)).unwrap();
        assert_eq!(
            labels.bind(l, at(0, 1)),
            Err(BuildError::LabelAlreadyBound { label: l })
        );
    }

    #[test]
    fn test_unbound_label_reports_origin() {
        let mut labels = LabelRegistry::new();
        let l = labels.create(Some(42)).unwrap();
        assert_eq!(
            labels.resolve(),
            Err(BuildError::UnboundLabel {
                label: l,
                origin: Some(42)
            })
        );
    }

    #[test]
    fn test_branch_outside_binding_sequence() {
        let mut labels = LabelRegistry::new();
        let l = labels.create(None).unwrap();
        labels.bind(l, at(5, 0)).unwrap();
        labels.record_use(l, vec![FrameId::ROOT, FrameId(2)]).unwrap();
        assert_eq!(
            labels.resolve(),
            Err(BuildError::BranchOutOfScope { label: l })
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_label_index_limit() {
        assert_eq!(label_at(7), Ok(Label(7)));
        assert_eq!(label_at(u32::MAX as usize), Ok(Label(u32::MAX)));
        assert_eq!(
            label_at(u32::MAX as usize + 1),
            Err(BuildError::TooManyLabels {
                max: u64::from(u32::MAX) + 1
            })
        );
    }

    #[test]
    fn test_unknown_label() {
        let mut labels = LabelRegistry::new();
        let foreign = Label(9);
        assert_eq!(
            labels.record_use(foreign, vec![]),
            Err(BuildError::UnknownLabel { label: foreign })
        );
        assert_eq!(labels.use_count(foreign), 0);
    }
}
