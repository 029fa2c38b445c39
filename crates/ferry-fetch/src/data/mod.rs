//! Immutable data types for fetch operations.
//!
//! Requests, options, progress reports and results. Nothing in here performs
//! I/O; values are built once and passed by reference.

pub mod options;
pub mod progress;
pub mod request;
pub mod result;

pub use options::{FetchOptions, FileCreation};
pub use progress::{FetchState, Progress};
pub use request::{FetchRequest, Source};
pub use result::FetchResult;
