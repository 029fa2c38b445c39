use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::core::Target;
use crate::error::TransportError;

/// A boxed stream of response body chunks.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// An open response whose status was already checked.
pub struct Response {
    /// `Content-Length` announced by the server, if any.
    pub content_length: Option<u64>,
    pub body:           BoxStream<'static, Result<Bytes, TransportError>>,
}

impl Response {
    pub fn new(
        content_length: Option<u64>,
        body: impl Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    ) -> Self {
        Self {
            content_length,
            body: Box::pin(body),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Opens streaming responses for planned targets.
///
/// Implementations must not buffer the body: the returned stream yields chunks
/// as they arrive. A non-success status is an error from `open`, never a
/// `Response`.
///
/// # Implementations
///
/// - [`crate::ReqwestTransport`]: HTTP(S) endpoints and HTTP-fronted object stores
/// - Fakes in tests
pub trait Transport: Send + Sync {
    fn open(&self, target: &Target) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

impl<T: Transport> Transport for &T {
    fn open(&self, target: &Target) -> impl Future<Output = Result<Response, TransportError>> + Send {
        (**self).open(target)
    }
}
