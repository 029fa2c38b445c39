use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("destination is an existing directory: {0}")]
    IsDirectory(PathBuf),

    #[error("destination has no file name: {0}")]
    NoFileName(PathBuf),

    #[error("parent path exists but is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
}

impl Error {
    /// Whether the error rejects the path itself rather than a failed filesystem
    /// operation on it.
    pub fn is_invalid_destination(&self) -> bool {
        matches!(self, Self::IsDirectory(_) | Self::NoFileName(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
