use std::time::Duration;

use futures_util::TryStreamExt;

use crate::core::{Auth, Target};
use crate::effects::transport::{Response, Transport};
use crate::error::TransportError;

/// Production transport backed by `reqwest`.
///
/// One client (and its connection pool) is shared by every fetch; per-profile
/// settings travel with each [`Target`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Self::DEFAULT_CONNECT_TIMEOUT)
            .user_agent(concat!("ferry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TransportError::from)?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (proxies, TLS roots, ...).
    pub fn with_client(client: reqwest::Client) -> Self { Self { client } }
}

impl Transport for ReqwestTransport {
    async fn open(&self, target: &Target) -> Result<Response, TransportError> {
        let mut request = self.client.get(target.url.clone());

        if !target.query.is_empty() {
            request = request.query(&target.query);
        }
        for (key, value) in &target.headers {
            request = request.header(key, value);
        }
        match &target.auth {
            Some(Auth::Basic { login, password }) => {
                request = request.basic_auth(login, password.as_ref().map(|p| p.expose()));
            }
            Some(Auth::Header { name, value }) => {
                request = request.header(name, value.expose());
            }
            None => {}
        }
        if let Some(timeout) = target.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                url:  target.url.to_string(),
            });
        }

        let content_length = response.content_length();
        let body = response.bytes_stream().map_err(TransportError::from);
        Ok(Response::new(content_length, body))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Status {
                code: status.as_u16(),
                url:  e.url().map(ToString::to_string).unwrap_or_default(),
            }
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}
