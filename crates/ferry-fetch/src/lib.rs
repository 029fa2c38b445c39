//! Streaming fetch of remote resources into local files.
//!
//! A request names where a resource lives (an HTTP endpoint or an object-store
//! container and key) relative to a named connection profile, and where it
//! should land on disk. The fetcher resolves the profile, creates the
//! destination's parent directories, and streams the body to the file without
//! holding it in memory.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable requests, options and results
//! - `core` - Pure planning, templating and retry arithmetic
//! - `effects` - I/O behind the [`Transport`] trait
//!
//! # Example
//!
//! ```no_run
//! use ferry_fetch::{FetchRequest, Fetcher, ReqwestTransport};
//! use ferry_profile::{ConnectionProfile, StaticProfileStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StaticProfileStore::new()
//!     .with_profile(ConnectionProfile::new("pdok", "https://service.pdok.nl"));
//! let fetcher = Fetcher::new(store, ReqwestTransport::new()?);
//!
//! let request = FetchRequest::http("/cbs/wijkenbuurten/2022/wfs/v1_0", "/data/raw/wijken.json")
//!     .param("request", "GetFeature")
//!     .param("outputFormat", "json");
//! let result = fetcher.fetch(&request, "pdok").await?;
//! println!("{} bytes", result.bytes_written());
//! # Ok(())
//! # }
//! ```
//!
//! Failed transfers are not retried and partial files are not removed;
//! [`FetchError::bytes_written`] reports what was left behind and
//! [`retry_delay`] gives a backoff for callers that retry.

mod core;
pub mod data;
mod effects;
mod error;

pub use core::{Auth, OBJECT_TOKEN_HEADER, Target, plan, render, retry_delay};
pub use data::progress::ProgressCallback;
pub use data::{FetchOptions, FetchRequest, FetchResult, FetchState, FileCreation, Progress, Source};
pub use effects::{BatchOptions, BoxStream, Fetcher, Response, Transport};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;

pub use error::{FetchError, Result, TransferCause, TransportError};
