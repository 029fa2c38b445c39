use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Lifecycle of one fetch.
///
/// Transitions are linear:
/// `NotStarted → Connecting → Streaming → {Complete | Failed}`.
/// There is no pause or resume; a retry is a new fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    #[default]
    NotStarted,
    /// Waiting for the server to answer with a success status.
    Connecting,
    /// Copying body chunks to the destination file.
    Streaming,
    /// Body consumed, file flushed and synced.
    Complete,
    Failed,
}

impl FetchState {
    pub fn is_terminal(self) -> bool { matches!(self, Self::Complete | Self::Failed) }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchState::NotStarted => "not started",
            FetchState::Connecting => "connecting",
            FetchState::Streaming => "streaming",
            FetchState::Complete => "complete",
            FetchState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Snapshot passed to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub state:         FetchState,
    /// Bytes written to the destination so far.
    pub bytes_written: u64,
    /// Announced body length, if the server sent one.
    pub total_bytes:   Option<u64>,
}

impl Progress {
    pub fn percentage(&self) -> Option<f32> {
        self.total_bytes.map(|total| {
            if total == 0 {
                0.0
            } else {
                (self.bytes_written as f32 / total as f32) * 100.0
            }
        })
    }
}

pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Tracks one fetch and forwards every change to the callback, if any.
pub(crate) struct ProgressTracker {
    callback: Option<ProgressCallback>,
    current:  Progress,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            current: Progress {
                state:         FetchState::NotStarted,
                bytes_written: 0,
                total_bytes:   None,
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> FetchState { self.current.state }

    pub(crate) fn connecting(&mut self) { self.transition(FetchState::Connecting); }

    pub(crate) fn streaming(&mut self, total_bytes: Option<u64>) {
        self.current.total_bytes = total_bytes;
        self.transition(FetchState::Streaming);
    }

    pub(crate) fn add_bytes(&mut self, bytes: u64) {
        self.current.bytes_written += bytes;
        self.emit();
    }

    pub(crate) fn complete(&mut self) { self.transition(FetchState::Complete); }

    pub(crate) fn failed(&mut self) { self.transition(FetchState::Failed); }

    fn transition(&mut self, state: FetchState) {
        debug_assert!(!self.current.state.is_terminal(), "transition out of {}", self.current.state);
        self.current.state = state;
        self.emit();
    }

    fn emit(&self) {
        if let Some(callback) = &self.callback {
            callback(&self.current);
        }
    }
}
