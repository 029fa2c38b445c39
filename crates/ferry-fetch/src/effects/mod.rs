//! I/O: transports, the destination file, and the fetch loop itself.

mod batch;
mod fetcher;
#[cfg(feature = "reqwest")]
mod http;
mod sink;
mod transport;

pub use batch::BatchOptions;
pub use fetcher::Fetcher;
#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
pub use transport::{BoxStream, Response, Transport};
