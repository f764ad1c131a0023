//! Concurrent decision loading.
//!
//! Every file is read at once; parsing and merging then happen in list order
//! so the result matches [`load_decisions`](crate::load_decisions).

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{debug, instrument};

use crate::loader::{LoadOutcome, parse_decisions, read_error, sources};

/// Load the main decisions file followed by each override file, reading
/// all of them concurrently.
#[instrument(skip(overrides), fields(overrides = overrides.len()))]
pub async fn load_decisions_async(main: Option<&Path>, overrides: &[PathBuf]) -> LoadOutcome {
    let sources = sources(main, overrides);
    let reads = join_all(
        sources
            .iter()
            .map(|source| tokio::fs::read_to_string(&source.path)),
    )
    .await;

    let mut outcome = LoadOutcome::default();
    for (source, read) in sources.into_iter().zip(reads) {
        let file = match read {
            Ok(text) => parse_decisions(&text, source),
            Err(err) => LoadOutcome {
                decisions: Default::default(),
                errors: vec![read_error(&source, err)],
            },
        };
        outcome.merge(file);
    }
    debug!(
        decisions = outcome.decisions.len(),
        errors = outcome.errors.len(),
        "Loaded decisions concurrently"
    );
    outcome
}
