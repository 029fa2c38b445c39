//! Fetching several sibling resources at once.
//!
//! Shapefiles arrive as a handful of files (`.shp`, `.shx`, `.dbf`, `.prj`)
//! that are fetched together and consumed together.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use ferry_profile::ProfileStore;
use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::data::{FetchRequest, FetchResult};
use crate::effects::fetcher::Fetcher;
use crate::effects::transport::Transport;
use crate::error::{FetchError, Result, TransferCause};

/// Configuration for [`Fetcher::fetch_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum number of fetches in flight. Zero is treated as one.
    pub max_concurrent: usize,
    /// Cancel the remaining fetches after the first failure.
    pub fail_fast:      bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            fail_fast:      false,
        }
    }
}

impl<S: ProfileStore, T: Transport> Fetcher<S, T> {
    /// Fetch every request through `profile`, at most
    /// `options.max_concurrent` at a time.
    ///
    /// Returns one result per request, in input order. The outer error is
    /// reserved for batches that are rejected before anything starts: two
    /// requests writing the same destination.
    pub async fn fetch_all(
        &self,
        requests: &[FetchRequest],
        profile: &str,
        options: BatchOptions,
    ) -> Result<Vec<Result<FetchResult>>> {
        self.fetch_all_with_cancel(requests, profile, options, &CancellationToken::new())
            .await
    }

    pub async fn fetch_all_with_cancel(
        &self,
        requests: &[FetchRequest],
        profile: &str,
        options: BatchOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<Result<FetchResult>>> {
        check_unique(requests.iter().map(FetchRequest::destination))?;

        let batch = cancel.child_token();
        let batch = &batch;
        tracing::debug!(requests = requests.len(), max_concurrent = options.max_concurrent, "fetching batch");

        let results = stream::iter(requests)
            .map(|request| async move {
                if batch.is_cancelled() {
                    return Err(FetchError::transfer(TransferCause::Cancelled, 0));
                }
                let result = self.fetch_with_cancel(request, profile, batch).await;
                if options.fail_fast && result.is_err() {
                    batch.cancel();
                }
                result
            })
            .buffered(options.max_concurrent.max(1))
            .collect()
            .await;

        Ok(results)
    }
}

fn check_unique<'a>(destinations: impl Iterator<Item = &'a Path>) -> Result<()> {
    let mut seen = HashSet::new();
    for destination in destinations {
        if !seen.insert(normalize(destination)) {
            return Err(FetchError::DuplicateDestination(destination.to_path_buf()));
        }
    }
    Ok(())
}

/// Absolute form of `path` with `.` components removed, so `out/a.shp`,
/// `./out/a.shp` and `$PWD/out/a.shp` compare equal. `..` and symlinks are
/// left alone.
fn normalize(path: &Path) -> PathBuf {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
