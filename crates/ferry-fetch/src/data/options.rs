use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::progress::{Progress, ProgressCallback};

/// When the destination file is created relative to connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileCreation {
    /// Create (and truncate) the file only once the server answered with a
    /// success status. A failed connection leaves an existing destination
    /// untouched and never creates an empty one.
    #[default]
    Deferred,
    /// Create (and truncate) the file before connecting. A failed connection
    /// leaves a zero-length file behind. Matches pipelines that expect the
    /// file to exist as soon as the step started.
    Eager,
}

/// Per-fetcher configuration.
///
/// # Examples
///
/// ```
/// use ferry_fetch::{FetchOptions, FileCreation};
/// use std::time::Duration;
///
/// let options = FetchOptions::default()
///     .chunk_size(16 * 1024)
///     .timeout(Duration::from_secs(600))
///     .file_creation(FileCreation::Eager);
/// assert_eq!(options.chunk_size, 16 * 1024);
/// ```
#[derive(Clone)]
pub struct FetchOptions {
    /// Upper bound on bytes written per write call, and the granularity at which
    /// cancellation and the deadline are observed. Zero is treated as one.
    ///
    /// Default: 64 KiB
    pub chunk_size: usize,

    /// Default: [`FileCreation::Deferred`]
    pub file_creation: FileCreation,

    /// Overall deadline for one fetch, connecting included. Expiry fails the
    /// fetch as a timeout and keeps what was written.
    ///
    /// Default: None
    pub timeout: Option<Duration>,

    /// Invoked on every state transition and after each chunk write.
    ///
    /// Default: None
    pub on_progress: Option<ProgressCallback>,
}

impl FetchOptions {
    pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn file_creation(mut self, file_creation: FileCreation) -> Self {
        self.file_creation = file_creation;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: Arc<dyn Fn(&Progress) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            chunk_size:    Self::DEFAULT_CHUNK_SIZE,
            file_creation: FileCreation::default(),
            timeout:       None,
            on_progress:   None,
        }
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("chunk_size", &self.chunk_size)
            .field("file_creation", &self.file_creation)
            .field("timeout", &self.timeout)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = FetchOptions::default();
        assert_eq!(options.chunk_size, 64 * 1024);
        assert_eq!(options.file_creation, FileCreation::Deferred);
        assert!(options.timeout.is_none());
        assert!(options.on_progress.is_none());
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        assert_eq!(FetchOptions::default().chunk_size(0).chunk_size, 1);
    }
}
