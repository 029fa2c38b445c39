use std::path::{Path, PathBuf};

use serde::Serialize;

use super::progress::FetchState;

/// Outcome of a successful fetch.
///
/// Only built after the body was fully consumed, flushed and synced, so
/// `bytes_written` always matches the file on disk. Path and byte count are
/// the whole handoff contract to downstream steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    destination:   PathBuf,
    bytes_written: u64,
    status:        FetchState,
}

impl FetchResult {
    pub(crate) fn complete(destination: impl Into<PathBuf>, bytes_written: u64) -> Self {
        Self {
            destination: destination.into(),
            bytes_written,
            status: FetchState::Complete,
        }
    }

    pub fn destination(&self) -> &Path { &self.destination }

    pub fn bytes_written(&self) -> u64 { self.bytes_written }

    pub fn status(&self) -> FetchState { self.status }
}
