use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;

/// The destination file, opened lazily so the fetcher controls when it is
/// created and truncated.
pub(crate) struct Sink {
    path: PathBuf,
    file: Option<File>,
}

impl Sink {
    pub(crate) fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
        }
    }

    /// Create or truncate the destination. Idempotent.
    pub(crate) async fn open(&mut self) -> Result<(), FetchError> {
        if self.file.is_none() {
            let file = File::create(&self.path)
                .await
                .map_err(|source| FetchError::DestinationUnwritable {
                    path: self.path.clone(),
                    source,
                })?;
            self.file = Some(file);
        }
        Ok(())
    }

    pub(crate) async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(bytes).await,
            None => Err(io::Error::other("destination written before it was opened")),
        }
    }

    /// Flush, sync to stable storage and close.
    pub(crate) async fn finish(mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }

    /// Push buffered bytes to the OS and close, keeping whatever was written.
    /// Errors are ignored: the transfer already failed for another reason.
    pub(crate) async fn abandon(mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush().await;
        }
    }
}
