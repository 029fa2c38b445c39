use std::future::Future;
use std::io;
use std::path::Path;

use bytes::Bytes;
use ferry_profile::ProfileStore;
use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::plan;
use crate::data::progress::ProgressTracker;
use crate::data::{FetchOptions, FetchRequest, FetchResult, FileCreation};
use crate::effects::sink::Sink;
use crate::effects::transport::{BoxStream, Transport};
use crate::error::{FetchError, Result, TransferCause, TransportError};

/// Streams remote resources to local files.
///
/// Each call to [`Fetcher::fetch`] is independent: it resolves the named
/// profile, materializes the destination's parent directories, opens one
/// streaming response and copies it chunk by chunk into the destination.
/// Nothing is retried and nothing is cleaned up on failure; the error says how
/// many bytes were left on disk and the caller decides what happens next.
pub struct Fetcher<S, T> {
    store:     S,
    transport: T,
    options:   FetchOptions,
}

impl<S: ProfileStore, T: Transport> Fetcher<S, T> {
    pub fn new(store: S, transport: T) -> Self {
        Self {
            store,
            transport,
            options: FetchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FetchOptions { &self.options }

    /// Fetch `request` through the profile called `profile`.
    ///
    /// Fails, in this order and before any network activity, with
    /// [`FetchError::UnknownProfile`], [`FetchError::InvalidDestination`],
    /// [`FetchError::InvalidRequest`] or [`FetchError::DestinationUnwritable`].
    /// Once connecting has started, every failure is
    /// [`FetchError::TransferFailed`].
    pub async fn fetch(&self, request: &FetchRequest, profile: &str) -> Result<FetchResult> {
        self.fetch_with_cancel(request, profile, &CancellationToken::new())
            .await
    }

    /// Like [`Fetcher::fetch`], aborting within one chunk once `cancel` fires.
    #[tracing::instrument(
        name = "fetch",
        skip_all,
        fields(profile = %profile, destination = %request.destination().display())
    )]
    pub async fn fetch_with_cancel(
        &self,
        request: &FetchRequest,
        profile: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchResult> {
        let deadline = self.options.timeout.map(|timeout| Instant::now() + timeout);

        let profile = self
            .store
            .resolve(profile)
            .ok_or_else(|| FetchError::UnknownProfile(profile.to_string()))?;
        let destination = request.destination();
        blocking(destination, ferry_fs::check_destination).await?;
        let target = plan(request, &profile)?;
        blocking(destination, ferry_fs::ensure_parent).await?;

        let mut tracker = ProgressTracker::new(self.options.on_progress.clone());
        let mut sink = Sink::new(destination);
        if self.options.file_creation == FileCreation::Eager {
            sink.open().await?;
        }

        tracker.connecting();
        tracing::debug!(url = %target.url, "connecting");

        let opened = match guarded(self.transport.open(&target), deadline, cancel).await {
            Ok(opened) => opened.map_err(TransferCause::from),
            Err(cause) => Err(cause),
        };
        let response = match opened {
            Ok(response) => response,
            Err(cause) => {
                tracker.failed();
                sink.abandon().await;
                return Err(failed(cause, 0));
            }
        };

        if let Err(e) = sink.open().await {
            tracker.failed();
            return Err(e);
        }
        tracker.streaming(response.content_length);

        let mut body = response.body;
        let mut written = 0u64;
        let outcome = self
            .copy_body(&mut body, &mut sink, &mut tracker, &mut written, deadline, cancel)
            .await
            .and_then(|()| match response.content_length {
                Some(expected) if expected != written => Err(TransferCause::Truncated {
                    expected,
                    received: written,
                }),
                _ => Ok(()),
            });

        if let Err(cause) = outcome {
            drop(body);
            tracker.failed();
            sink.abandon().await;
            return Err(failed(cause, written));
        }

        if let Err(e) = sink.finish().await {
            tracker.failed();
            return Err(failed(TransferCause::Write(e), written));
        }

        tracker.complete();
        tracing::info!(bytes = written, "fetch complete");
        Ok(FetchResult::complete(destination, written))
    }

    async fn copy_body(
        &self,
        body: &mut BoxStream<'static, std::result::Result<Bytes, TransportError>>,
        sink: &mut Sink,
        tracker: &mut ProgressTracker,
        written: &mut u64,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), TransferCause> {
        while let Some(chunk) = guarded(body.next(), deadline, cancel).await? {
            let chunk = chunk?;
            for piece in chunk.chunks(self.options.chunk_size.max(1)) {
                if cancel.is_cancelled() {
                    return Err(TransferCause::Cancelled);
                }
                sink.write(piece).await.map_err(TransferCause::Write)?;
                *written += piece.len() as u64;
                tracker.add_bytes(piece.len() as u64);
            }
        }
        Ok(())
    }
}

/// Run a `ferry_fs` check on tokio's blocking pool.
async fn blocking<T, F>(path: &Path, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> ferry_fs::Result<T> + Send + 'static,
{
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || op(&owned)).await {
        Ok(result) => Ok(result?),
        Err(e) => Err(FetchError::DestinationUnwritable {
            path:   path.to_path_buf(),
            source: io::Error::other(e),
        }),
    }
}

fn failed(cause: TransferCause, bytes_written: u64) -> FetchError {
    tracing::warn!(bytes_written, error = %cause, "fetch failed");
    FetchError::transfer(cause, bytes_written)
}

/// Run `future` unless `cancel` fires or `deadline` passes first.
async fn guarded<F: Future>(
    future: F,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> std::result::Result<F::Output, TransferCause> {
    let expiry = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransferCause::Cancelled),
        _ = expiry => Err(TransferCause::Timeout),
        output = future => Ok(output),
    }
}
