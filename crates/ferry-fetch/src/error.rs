//! Error types for ferry-fetch.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`crate::Transport`] while opening or reading a body.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("server answered {code} for {url}")]
    Status { code: u16, url: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response body failed: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Other(String),
}

/// Why a started transfer did not complete.
#[derive(Debug, Error)]
pub enum TransferCause {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("fetch deadline elapsed")]
    Timeout,

    #[error("fetch cancelled")]
    Cancelled,

    #[error("body ended after {received} of {expected} announced bytes")]
    Truncated { expected: u64, received: u64 },

    #[error("writing destination failed: {0}")]
    Write(#[source] io::Error),
}

impl TransferCause {
    /// True for both the caller deadline and a transport-level timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(TransportError::Timeout))
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unknown connection profile: {0}")]
    UnknownProfile(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(PathBuf),

    #[error("destination not writable: {path}: {source}")]
    DestinationUnwritable {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transfer failed after {bytes_written} bytes: {cause}")]
    TransferFailed {
        #[source]
        cause:         TransferCause,
        bytes_written: u64,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("destination appears more than once in batch: {0}")]
    DuplicateDestination(PathBuf),
}

impl FetchError {
    pub(crate) fn transfer(cause: impl Into<TransferCause>, bytes_written: u64) -> Self {
        Self::TransferFailed {
            cause: cause.into(),
            bytes_written,
        }
    }

    /// Whether re-running the same request could succeed. Only transfer
    /// failures qualify; everything else fails the same way again.
    pub fn is_retryable(&self) -> bool { matches!(self, Self::TransferFailed { .. }) }

    /// Bytes left on disk by a failed transfer.
    pub fn bytes_written(&self) -> Option<u64> {
        match self {
            Self::TransferFailed { bytes_written, .. } => Some(*bytes_written),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<&TransferCause> {
        match self {
            Self::TransferFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<ferry_fs::Error> for FetchError {
    fn from(e: ferry_fs::Error) -> Self {
        match e {
            ferry_fs::Error::IsDirectory(path) | ferry_fs::Error::NoFileName(path) => {
                Self::InvalidDestination(path)
            }
            ferry_fs::Error::NotADirectory(path) => Self::DestinationUnwritable {
                source: io::Error::new(io::ErrorKind::NotADirectory, "parent is not a directory"),
                path,
            },
            ferry_fs::Error::CreateDir { path, source } => {
                Self::DestinationUnwritable { path, source }
            }
        }
    }
}

impl From<tera::Error> for FetchError {
    fn from(e: tera::Error) -> Self {
        use std::error::Error as _;

        let mut reason = e.to_string();
        let mut source = e.source();
        while let Some(inner) = source {
            reason.push_str(": ");
            reason.push_str(&inner.to_string());
            source = inner.source();
        }
        Self::InvalidRequest(format!("template: {reason}"))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
