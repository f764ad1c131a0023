//! Reading and merging decision files.

use std::io;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::decision::{Decision, DecisionKind, DecisionSet, Origin, Provenance};
use crate::error::DecisionError;

/// Decisions parsed so far plus every error met on the way.
///
/// A failing file or entry never discards decisions parsed from the others.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Decisions in merge order
    pub decisions: DecisionSet,
    /// Errors in the order they were found
    pub errors: Vec<DecisionError>,
}

impl LoadOutcome {
    /// Append another outcome after this one.
    pub fn merge(&mut self, other: LoadOutcome) {
        self.decisions.extend(other.decisions);
        self.errors.extend(other.errors);
    }

    /// Whether no errors were recorded.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The decisions, or every error if there was any.
    pub fn into_result(self) -> Result<DecisionSet, Vec<DecisionError>> {
        if self.errors.is_empty() {
            Ok(self.decisions)
        } else {
            Err(self.errors)
        }
    }

    fn failed(error: DecisionError) -> Self {
        Self {
            decisions: DecisionSet::new(),
            errors: vec![error],
        }
    }
}

/// The files of one run in merge order.
pub(crate) fn sources(main: Option<&Path>, overrides: &[PathBuf]) -> Vec<Provenance> {
    main.map(Provenance::main)
        .into_iter()
        .chain(
            overrides
                .iter()
                .enumerate()
                .map(|(i, path)| Provenance::overriding(i, path.as_path())),
        )
        .collect()
}

/// Load the main decisions file followed by each override file.
#[instrument(skip(overrides), fields(overrides = overrides.len()))]
pub fn load_decisions(main: Option<&Path>, overrides: &[PathBuf]) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();
    for source in sources(main, overrides) {
        let file = match std::fs::read_to_string(&source.path) {
            Ok(text) => parse_decisions(&text, source),
            Err(err) => LoadOutcome::failed(read_error(&source, err)),
        };
        outcome.merge(file);
    }
    debug!(
        decisions = outcome.decisions.len(),
        errors = outcome.errors.len(),
        "Loaded decisions"
    );
    outcome
}

/// Parse the text of one decision file.
///
/// String entries are comments. Entries that fail are reported and the rest
/// of the file is still parsed.
pub fn parse_decisions(text: &str, provenance: Provenance) -> LoadOutcome {
    let path = provenance.path.clone();
    let root: Value = match serde_json::from_str(text) {
        Ok(root) => root,
        Err(source) => return LoadOutcome::failed(DecisionError::Malformed { path, source }),
    };
    let Value::Array(entries) = root else {
        return LoadOutcome::failed(DecisionError::InvalidShape {
            path,
            reason: "top level must be an array".into(),
        });
    };

    let mut outcome = LoadOutcome::default();
    for (index, entry) in entries.into_iter().enumerate() {
        match entry {
            Value::String(comment) => trace!(%comment, "Skipping comment"),
            Value::Object(_) => match parse_entry(entry, &path, index) {
                Ok(decision) => outcome.decisions.push(decision, provenance.clone()),
                Err(err) => outcome.errors.push(err),
            },
            other => outcome.errors.push(DecisionError::InvalidShape {
                path: path.clone(),
                reason: format!("entry {index} must be a string or an object, found {other}"),
            }),
        }
    }
    outcome
}

fn parse_entry(entry: Value, path: &Path, index: usize) -> Result<Decision, DecisionError> {
    let invalid = |source| DecisionError::InvalidEntry {
        path: path.to_path_buf(),
        index,
        source,
    };

    let kind = match entry.get("type") {
        None => return Err(invalid(serde_json::Error::missing_field("type"))),
        Some(Value::String(ty)) => match DecisionKind::from_type_name(ty) {
            Some(kind) => kind,
            None => {
                return Err(DecisionError::UnknownType {
                    path: path.to_path_buf(),
                    index,
                    ty: ty.clone(),
                });
            }
        },
        Some(_) => return Err(invalid(serde_json::Error::custom("`type` must be a string"))),
    };

    let decision = match kind {
        DecisionKind::Fusion => serde_json::from_value(entry).map(Decision::Fusion),
        DecisionKind::Dedup => serde_json::from_value(entry).map(Decision::Dedup),
        DecisionKind::Specialize => serde_json::from_value(entry).map(Decision::Specialize),
    };
    decision.map_err(invalid)
}

pub(crate) fn read_error(source: &Provenance, err: io::Error) -> DecisionError {
    let path = source.path.clone();
    if err.kind() != io::ErrorKind::NotFound {
        return DecisionError::Io { path, source: err };
    }
    match source.origin {
        Origin::Main => DecisionError::MainFileMissing { path },
        Origin::Override(_) => {
            warn!(path = %path.display(), "Override decisions file is missing");
            DecisionError::OverrideFileMissing { path }
        }
    }
}
