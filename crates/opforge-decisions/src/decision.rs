//! Decision records and the merged decision set.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Merge an ordered run of instructions into one super-instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionDecision {
    /// Decision id
    pub id: String,
    /// Instructions to fuse, in execution order
    pub instructions: Vec<String>,
}

/// Share one implementation between equivalent instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupDecision {
    /// Decision id
    pub id: String,
}

/// Quicken an instruction into specialized variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecializeDecision {
    /// Decision id
    pub id: String,
    /// The instruction being specialized
    pub instruction: String,
    /// Specialization names, in order
    pub specializations: Vec<String>,
}

/// One optimization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Decision {
    /// `SuperInstruction`
    #[serde(rename = "SuperInstruction")]
    Fusion(FusionDecision),
    /// `CommonInstruction`
    #[serde(rename = "CommonInstruction")]
    Dedup(DedupDecision),
    /// `Quicken`
    #[serde(rename = "Quicken")]
    Specialize(SpecializeDecision),
}

impl Decision {
    /// The decision id.
    pub fn id(&self) -> &str {
        match self {
            Decision::Fusion(d) => &d.id,
            Decision::Dedup(d) => &d.id,
            Decision::Specialize(d) => &d.id,
        }
    }

    /// The decision kind.
    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Fusion(_) => DecisionKind::Fusion,
            Decision::Dedup(_) => DecisionKind::Dedup,
            Decision::Specialize(_) => DecisionKind::Specialize,
        }
    }
}

/// Decision kinds, ordered as they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DecisionKind {
    /// `SuperInstruction`
    Fusion,
    /// `CommonInstruction`
    Dedup,
    /// `Quicken`
    Specialize,
}

impl DecisionKind {
    /// Every kind.
    pub const ALL: [DecisionKind; 3] = [
        DecisionKind::Fusion,
        DecisionKind::Dedup,
        DecisionKind::Specialize,
    ];

    /// The `type` discriminator used in decision files.
    pub fn type_name(self) -> &'static str {
        match self {
            DecisionKind::Fusion => "SuperInstruction",
            DecisionKind::Dedup => "CommonInstruction",
            DecisionKind::Specialize => "Quicken",
        }
    }

    /// Look up a kind by its `type` discriminator.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Which file of a run an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    /// The main decisions file
    Main,
    /// The override file at this position in the override list
    Override(usize),
}

/// Where a decision came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Resolved path of the file
    pub path: PathBuf,
    /// Role of the file in the run
    pub origin: Origin,
}

impl Provenance {
    /// Provenance for the main decisions file.
    pub fn main(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            origin: Origin::Main,
        }
    }

    /// Provenance for the override file at `index`.
    pub fn overriding(index: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            origin: Origin::Override(index),
        }
    }

    /// Resolved path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Origin::Main => write!(f, "{} (main)", self.path.display()),
            Origin::Override(i) => write!(f, "{} (override #{})", self.path.display(), i + 1),
        }
    }
}

/// A decision together with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEntry {
    /// The decision
    pub decision: Decision,
    /// Its source file
    pub provenance: Provenance,
}

/// The merged decisions of one run: main file entries, then each override
/// file's entries in list order.
///
/// Entries are never dropped or reordered. Colliding ids are kept and can be
/// listed with [`DecisionSet::duplicate_ids`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionSet {
    entries: Vec<DecisionEntry>,
}

impl DecisionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one decision.
    pub fn push(&mut self, decision: Decision, provenance: Provenance) {
        self.entries.push(DecisionEntry {
            decision,
            provenance,
        });
    }

    /// Append every entry of `other`, keeping its order.
    pub fn extend(&mut self, other: DecisionSet) {
        self.entries.extend(other.entries);
    }

    /// Number of decisions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no decisions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in merge order.
    pub fn iter(&self) -> impl Iterator<Item = &DecisionEntry> {
        self.entries.iter()
    }

    /// All decisions in merge order.
    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.entries.iter().map(|e| &e.decision)
    }

    /// Super-instruction decisions.
    pub fn fusions(&self) -> impl Iterator<Item = &FusionDecision> {
        self.decisions().filter_map(|d| match d {
            Decision::Fusion(f) => Some(f),
            _ => None,
        })
    }

    /// Common-instruction decisions.
    pub fn dedups(&self) -> impl Iterator<Item = &DedupDecision> {
        self.decisions().filter_map(|d| match d {
            Decision::Dedup(c) => Some(c),
            _ => None,
        })
    }

    /// Quickening decisions.
    pub fn specializations(&self) -> impl Iterator<Item = &SpecializeDecision> {
        self.decisions().filter_map(|d| match d {
            Decision::Specialize(q) => Some(q),
            _ => None,
        })
    }

    /// Number of decisions of each kind.
    pub fn counts(&self) -> BTreeMap<DecisionKind, usize> {
        let mut counts = BTreeMap::new();
        for decision in self.decisions() {
            *counts.entry(decision.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Ids declared more than once within a kind, with every place they
    /// were declared.
    pub fn duplicate_ids(&self) -> BTreeMap<(DecisionKind, String), Vec<&Provenance>> {
        let mut seen: BTreeMap<(DecisionKind, String), Vec<&Provenance>> = BTreeMap::new();
        for entry in &self.entries {
            seen.entry((entry.decision.kind(), entry.decision.id().to_string()))
                .or_default()
                .push(&entry.provenance);
        }
        seen.retain(|_, sources| sources.len() > 1);
        seen
    }

    /// Serialize to the decision file format.
    pub fn to_json_string_pretty(&self) -> serde_json::Result<String> {
        let decisions: Vec<&Decision> = self.decisions().collect();
        serde_json::to_string_pretty(&decisions)
    }
}

impl<'a> IntoIterator for &'a DecisionSet {
    type Item = &'a DecisionEntry;
    type IntoIter = std::slice::Iter<'a, DecisionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
