//! Chunked execution of id-list mutations.
//!
//! Large `IN (...)` mutations are split into fixed-size chunks, one
//! statement per chunk, and are normally run inside a single
//! [`TransactionScope`](crate::TransactionScope) by the caller.

use localcollection_core::DEFAULT_CHUNK_SIZE;

use crate::error::StoreError;

/// A side-effecting operation applied to one chunk of ids.
///
/// Any `FnMut(&[i64]) -> Result<(), StoreError>` closure qualifies.
pub trait ChunkOperation {
    fn apply(&mut self, chunk: &[i64]) -> Result<(), StoreError>;
}

impl<F> ChunkOperation for F
where
    F: FnMut(&[i64]) -> Result<(), StoreError>,
{
    fn apply(&mut self, chunk: &[i64]) -> Result<(), StoreError> {
        self(chunk)
    }
}

/// Splits id lists into chunks of at most `chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchExecutor {
    chunk_size: usize,
}

impl BatchExecutor {
    /// A zero chunk size is treated as 1.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Apply `op` to every chunk of `ids`, in order.
    ///
    /// The final partial chunk is always flushed. Stops at the first failing
    /// chunk. Returns the number of chunks applied.
    pub fn run<O: ChunkOperation>(&self, ids: &[i64], mut op: O) -> Result<usize, StoreError> {
        let mut applied = 0;
        for chunk in ids.chunks(self.chunk_size) {
            log::trace!("Applying batch chunk {} ({} ids)", applied + 1, chunk.len());
            op.apply(chunk)?;
            applied += 1;
        }
        if applied > 0 {
            log::debug!("Applied {} ids in {applied} chunks", ids.len());
        }
        Ok(applied)
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

/// `?, ?, ?` with `n` anonymous parameters, for an `IN (...)` clause.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
