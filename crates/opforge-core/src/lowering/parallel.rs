//! Lowering independent functions on a thread pool.

use rayon::prelude::*;
use tracing::debug;

use super::{LanguageOps, collect_programs, lower_function};
use crate::ast::Function;
use crate::error::LoweringError;
use crate::program::Program;

/// Lowers many functions in parallel, one builder per function.
pub struct ParallelLowerer {
    /// Thread pool for CPU-bound work
    pool: rayon::ThreadPool,
}

impl ParallelLowerer {
    /// Creates a lowerer with the default number of threads.
    pub fn new() -> Result<Self, rayon::ThreadPoolBuildError> {
        Ok(Self {
            pool: rayon::ThreadPoolBuilder::new().build()?,
        })
    }

    /// Creates a lowerer with a specific number of threads.
    pub fn with_threads(num_threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        Ok(Self {
            pool: rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()?,
        })
    }

    /// Lowers every function; results keep the input order.
    ///
    /// Errors are combined as in [`lower_module`](super::lower_module).
    pub fn lower_all(
        &self,
        ops: &LanguageOps,
        functions: &[Function],
    ) -> Result<Vec<Program>, LoweringError> {
        debug!(
            functions = functions.len(),
            threads = self.pool.current_num_threads(),
            "lowering in parallel"
        );
        let results: Vec<_> = self.pool.install(|| {
            functions
                .par_iter()
                .map(|function| lower_function(ops, function))
                .collect()
        });
        collect_programs(results)
    }
}
