use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::ArgGroup;
use ferry_fetch::{
    FetchError, FetchOptions, FetchRequest, FetchResult, Fetcher, FileCreation, ReqwestTransport,
    Source, Transport, retry_delay,
};
use ferry_profile::{ProfileStore, StaticProfileStore};
use tokio_util::sync::CancellationToken;

use super::parse::key_value;

#[derive(Debug, clap::Args)]
#[command(group(ArgGroup::new("source").required(true).args(["endpoint", "container"])))]
pub struct Fetch {
    /// Connection profile to resolve the request against
    #[arg(long)]
    pub profile: String,

    /// HTTP endpoint relative to the profile host
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Object-store container
    #[arg(long, requires = "object")]
    pub container: Option<String>,

    /// Object key inside the container
    #[arg(long, requires = "container")]
    pub object: Option<String>,

    /// Destination file
    #[arg(long, short)]
    pub output: PathBuf,

    /// Query parameter, repeatable
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = key_value)]
    pub params: Vec<(String, String)>,

    /// Request header, repeatable
    #[arg(long = "header", value_name = "KEY=VALUE", value_parser = key_value)]
    pub headers: Vec<(String, String)>,

    /// Template variable for the endpoint, object, params and headers
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = key_value)]
    pub vars: Vec<(String, String)>,

    /// Overall deadline for one attempt
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "BYTES", default_value_t = FetchOptions::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Create the destination before connecting
    #[arg(long)]
    pub eager_create: bool,

    /// Extra attempts after a failed transfer
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub retry_backoff_ms: u64,
}

impl Fetch {
    pub async fn run(self, profiles: &Path) -> anyhow::Result<()> {
        let store = StaticProfileStore::load(profiles)
            .with_context(|| format!("loading profiles from {}", profiles.display()))?;
        let request = self.request()?;
        let fetcher = Fetcher::new(store, ReqwestTransport::new()?).with_options(self.options());

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling fetch");
                interrupt.cancel();
            }
        });

        let policy = RetryPolicy {
            retries: self.retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        };
        let result = fetch_with_retries(&fetcher, &request, &self.profile, policy, &cancel).await?;

        println!("{}", serde_json::to_string(&result)?);
        Ok(())
    }

    fn request(&self) -> anyhow::Result<FetchRequest> {
        let source = match (&self.endpoint, &self.container, &self.object) {
            (Some(endpoint), None, None) => Source::Http {
                endpoint: endpoint.clone(),
            },
            (None, Some(container), Some(key)) => Source::Object {
                container: container.clone(),
                key:       key.clone(),
            },
            _ => anyhow::bail!("pass either --endpoint or --container with --object"),
        };

        let mut context = tera::Context::new();
        for (key, value) in &self.vars {
            context.insert(key, value);
        }

        let request = FetchRequest::new(source, &self.output)
            .extend_params(self.params.iter().cloned())
            .extend_headers(self.headers.iter().cloned())
            .render(&context)?;
        Ok(request)
    }

    fn options(&self) -> FetchOptions {
        let mut options = FetchOptions::default().chunk_size(self.chunk_size);
        if let Some(secs) = self.timeout {
            options = options.timeout(Duration::from_secs(secs));
        }
        if self.eager_create {
            options = options.file_creation(FileCreation::Eager);
        }
        options
    }
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    retries: u32,
    backoff: Duration,
}

/// Re-run the whole fetch after retryable failures, waiting `backoff * 2^n`
/// between attempts. Cancellation ends the loop with the last error.
async fn fetch_with_retries<S: ProfileStore, T: Transport>(
    fetcher: &Fetcher<S, T>,
    request: &FetchRequest,
    profile: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<FetchResult, FetchError> {
    let mut attempt = 0;
    loop {
        let err = match fetcher.fetch_with_cancel(request, profile, cancel).await {
            Ok(result) => return Ok(result),
            Err(err) => err,
        };
        if !err.is_retryable() || attempt >= policy.retries || cancel.is_cancelled() {
            return Err(err);
        }

        let delay = retry_delay(attempt, policy.backoff);
        attempt += 1;
        tracing::warn!(
            attempt,
            retries = policy.retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "fetch failed, retrying"
        );
        tokio::select! {
            _ = cancel.cancelled() => return Err(err),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
