//! Fetcher behaviour against scripted transports.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use ferry_fetch::{
    BatchOptions, BoxStream, FetchError, FetchOptions, FetchRequest, FetchState, Fetcher,
    FileCreation, OBJECT_TOKEN_HEADER, Progress, Response, Target, TransferCause, Transport,
    TransportError,
};
use ferry_profile::{ConnectionProfile, Credentials, Secret, StaticProfileStore};
use futures_util::{StreamExt, future, stream};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy)]
enum Tail {
    End,
    Reset,
    Hang,
}

/// Serves the same body for every target and records what it was asked for.
#[derive(Clone)]
struct Scripted {
    chunks:         Vec<Bytes>,
    content_length: Option<u64>,
    tail:           Tail,
    status:         Option<u16>,
    hang_on_open:   bool,
    opened:         Arc<Mutex<Vec<Target>>>,
}

impl Scripted {
    fn body(chunks: &[&'static [u8]]) -> Self {
        let chunks: Vec<Bytes> = chunks.iter().map(|c| Bytes::from_static(c)).collect();
        let len = chunks.iter().map(|c| c.len() as u64).sum();
        Self {
            chunks,
            content_length: Some(len),
            tail: Tail::End,
            status: None,
            hang_on_open: false,
            opened: Arc::default(),
        }
    }

    fn status(code: u16) -> Self {
        Self {
            status: Some(code),
            ..Self::body(&[])
        }
    }

    fn content_length(mut self, len: Option<u64>) -> Self {
        self.content_length = len;
        self
    }

    fn tail(mut self, tail: Tail) -> Self {
        self.tail = tail;
        self
    }

    fn hang_on_open(mut self) -> Self {
        self.hang_on_open = true;
        self
    }

    fn opened(&self) -> Vec<Target> { self.opened.lock().unwrap().clone() }
}

impl Transport for Scripted {
    fn open(&self, target: &Target) -> impl Future<Output = Result<Response, TransportError>> + Send {
        self.opened.lock().unwrap().push(target.clone());
        let this = self.clone();
        let url = target.url.to_string();

        async move {
            if this.hang_on_open {
                future::pending::<()>().await;
            }
            if let Some(code) = this.status {
                return Err(TransportError::Status { code, url });
            }

            let head = stream::iter(this.chunks.into_iter().map(Ok));
            let body: BoxStream<'static, Result<Bytes, TransportError>> = match this.tail {
                Tail::End => Box::pin(head),
                Tail::Reset => Box::pin(head.chain(stream::once(async {
                    Err(TransportError::Body("connection reset by peer".into()))
                }))),
                Tail::Hang => Box::pin(head.chain(stream::pending())),
            };
            Ok(Response::new(this.content_length, body))
        }
    }
}

/// Counts attempts to reach the network and refuses every one.
struct Unreachable {
    calls: AtomicUsize,
}

impl Unreachable {
    fn new() -> Self { Self { calls: AtomicUsize::new(0) } }
}

impl Transport for Unreachable {
    fn open(&self, target: &Target) -> impl Future<Output = Result<Response, TransportError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = target.url.to_string();
        async move { Err(TransportError::Connect(format!("unexpected request to {url}"))) }
    }
}

/// Answers every target with its own path repeated, so concurrent fetches can
/// be told apart on disk.
struct Echo;

impl Echo {
    fn expected(path: &str) -> Vec<u8> { path.repeat(500).into_bytes() }
}

impl Transport for Echo {
    fn open(&self, target: &Target) -> impl Future<Output = Result<Response, TransportError>> + Send {
        let data = Self::expected(target.url.path());
        async move {
            let len = data.len() as u64;
            let chunks: Vec<Result<Bytes, TransportError>> = data
                .chunks(7)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            let body = stream::iter(chunks).then(|chunk| async move {
                tokio::task::yield_now().await;
                chunk
            });
            Ok(Response::new(Some(len), body))
        }
    }
}

fn store() -> StaticProfileStore {
    StaticProfileStore::new()
        .with_profile(ConnectionProfile::new("http_default", "https://api.example.org"))
        .with_profile(
            ConnectionProfile::new("objectstore", "https://objectstore.example.org/v1/AUTH_data")
                .credentials(Credentials::Token {
                    token:  Secret::new("swift-token"),
                    header: None,
                }),
        )
}

fn read(path: &Path) -> Vec<u8> { std::fs::read(path).unwrap() }

#[tokio::test]
async fn test_fetch_streams_body_into_new_directories() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("raw/2020/export.csv");
    let transport = Scripted::body(&[b"id,name\n", b"1,Dam\n", b"2,Zuid\n"]);
    let fetcher = Fetcher::new(store(), &transport);

    let result = fetcher
        .fetch(&FetchRequest::http("/v1/export", &destination), "http_default")
        .await
        .unwrap();

    assert_eq!(result.destination(), destination);
    assert_eq!(result.bytes_written(), 21);
    assert_eq!(result.status(), FetchState::Complete);
    assert_eq!(read(&destination), b"id,name\n1,Dam\n2,Zuid\n");
    assert_eq!(transport.opened()[0].url.as_str(), "https://api.example.org/v1/export");
}

#[tokio::test]
async fn test_refetch_replaces_destination() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("out.txt");
    std::fs::write(&destination, b"a much longer stale file from yesterday").unwrap();

    let transport = Scripted::body(&[b"fresh"]);
    let fetcher = Fetcher::new(store(), &transport);
    let request = FetchRequest::http("today", &destination);

    let first = fetcher.fetch(&request, "http_default").await.unwrap();
    let second = fetcher.fetch(&request, "http_default").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(read(&destination), b"fresh");
}

#[tokio::test]
async fn test_empty_body_creates_empty_file() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("empty.json");
    let transport = Scripted::body(&[]);
    let fetcher = Fetcher::new(store(), &transport);

    let result = fetcher
        .fetch(&FetchRequest::http("empty", &destination), "http_default")
        .await
        .unwrap();

    assert_eq!(result.bytes_written(), 0);
    assert!(destination.is_file());
    assert!(read(&destination).is_empty());
}

#[tokio::test]
async fn test_unknown_profile_touches_nothing() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("never/created/file.csv");
    let transport = Unreachable::new();
    let fetcher = Fetcher::new(store(), &transport);

    let err = fetcher
        .fetch(&FetchRequest::http("x", &destination), "no_such_profile")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::UnknownProfile(ref name) if name == "no_such_profile"));
    assert!(!dir.path().join("never").exists());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_directory_destination_is_invalid() {
    let dir = tempdir().unwrap();
    let transport = Unreachable::new();
    let fetcher = Fetcher::new(store(), &transport);

    let err = fetcher
        .fetch(&FetchRequest::http("x", dir.path()), "http_default")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::InvalidDestination(_)));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_parent_blocked_by_file_is_unwritable() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("blocker"), b"").unwrap();
    let transport = Unreachable::new();
    let fetcher = Fetcher::new(store(), &transport);

    let err = fetcher
        .fetch(&FetchRequest::http("x", dir.path().join("blocker/out.csv")), "http_default")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::DestinationUnwritable { .. }));
    assert!(!err.is_retryable());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_deferred_creation_keeps_existing_file_on_refused_connection() {
    let dir = tempdir().unwrap();
    let existing = dir.path().join("existing.csv");
    let missing = dir.path().join("missing.csv");
    std::fs::write(&existing, b"previous run").unwrap();

    let transport = Scripted::status(503);
    let fetcher = Fetcher::new(store(), &transport);

    for destination in [&existing, &missing] {
        let err = fetcher
            .fetch(&FetchRequest::http("x", destination), "http_default")
            .await
            .unwrap_err();
        assert_eq!(err.bytes_written(), Some(0));
        assert!(matches!(
            err.cause(),
            Some(TransferCause::Transport(TransportError::Status { code: 503, .. }))
        ));
    }

    assert_eq!(read(&existing), b"previous run");
    assert!(!missing.exists());
}

#[tokio::test]
async fn test_eager_creation_truncates_before_connecting() {
    let dir = tempdir().unwrap();
    let existing = dir.path().join("existing.csv");
    let missing = dir.path().join("missing.csv");
    std::fs::write(&existing, b"previous run").unwrap();

    let transport = Scripted::status(404);
    let fetcher = Fetcher::new(store(), &transport)
        .with_options(FetchOptions::default().file_creation(FileCreation::Eager));

    for destination in [&existing, &missing] {
        let err = fetcher
            .fetch(&FetchRequest::http("x", destination), "http_default")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(read(destination).is_empty());
    }
}

#[tokio::test]
async fn test_dropped_connection_reports_partial_bytes() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("partial.bin");
    let transport = Scripted::body(&[b"abcd", b"ef"])
        .content_length(None)
        .tail(Tail::Reset);
    let fetcher = Fetcher::new(store(), &transport);

    let err = fetcher
        .fetch(&FetchRequest::http("x", &destination), "http_default")
        .await
        .unwrap_err();

    assert_eq!(err.bytes_written(), Some(6));
    assert!(matches!(err.cause(), Some(TransferCause::Transport(TransportError::Body(_)))));
    assert_eq!(read(&destination), b"abcdef");

    let healthy = Scripted::body(&[b"xyz"]);
    let retry = Fetcher::new(store(), &healthy)
        .fetch(&FetchRequest::http("x", &destination), "http_default")
        .await
        .unwrap();
    assert_eq!(retry.bytes_written(), 3);
    assert_eq!(read(&destination), b"xyz");
}

#[tokio::test]
async fn test_short_body_is_truncation() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("short.bin");
    let transport = Scripted::body(&[b"abc"]).content_length(Some(10));
    let fetcher = Fetcher::new(store(), &transport);

    let err = fetcher
        .fetch(&FetchRequest::http("x", &destination), "http_default")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetchError::TransferFailed {
            cause: TransferCause::Truncated {
                expected: 10,
                received: 3
            },
            bytes_written: 3,
        }
    ));
    assert_eq!(read(&destination), b"abc");
}

#[tokio::test]
async fn test_deadline_fails_stalled_transfer_as_timeout() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("stalled.bin");
    let transport = Scripted::body(&[b"abc"]).content_length(None).tail(Tail::Hang);
    let fetcher = Fetcher::new(store(), &transport)
        .with_options(FetchOptions::default().timeout(Duration::from_millis(100)));

    let err = fetcher
        .fetch(&FetchRequest::http("x", &destination), "http_default")
        .await
        .unwrap_err();

    assert!(err.cause().unwrap().is_timeout());
    assert_eq!(err.bytes_written(), Some(3));
    assert_eq!(read(&destination), b"abc");
}

#[tokio::test]
async fn test_cancel_stops_streaming() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("cancelled.bin");
    let transport = Scripted::body(&[b"abc", b"def"]).content_length(None).tail(Tail::Hang);
    let fetcher = Fetcher::new(store(), &transport);
    let cancel = CancellationToken::new();
    let request = FetchRequest::http("x", &destination);

    let (result, ()) = tokio::join!(fetcher.fetch_with_cancel(&request, "http_default", &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let err = result.unwrap_err();
    assert!(matches!(err.cause(), Some(TransferCause::Cancelled)));
    assert_eq!(err.bytes_written(), Some(6));
    assert_eq!(read(&destination), b"abcdef");
}

#[tokio::test]
async fn test_cancel_while_connecting_writes_nothing() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("never.bin");
    let transport = Scripted::body(&[b"abc"]).hang_on_open();
    let fetcher = Fetcher::new(store(), &transport);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fetcher
        .fetch_with_cancel(&FetchRequest::http("x", &destination), "http_default", &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err.cause(), Some(TransferCause::Cancelled)));
    assert_eq!(err.bytes_written(), Some(0));
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_zero_chunk_size_in_struct_literal_still_streams() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("tiny.bin");
    let transport = Scripted::body(&[b"abc"]);
    let options = FetchOptions {
        chunk_size: 0,
        ..FetchOptions::default()
    };
    let fetcher = Fetcher::new(store(), &transport).with_options(options);

    let result = fetcher
        .fetch(&FetchRequest::http("x", &destination), "http_default")
        .await
        .unwrap();

    assert_eq!(result.bytes_written(), 3);
    assert_eq!(read(&destination), b"abc");
}

#[tokio::test]
async fn test_progress_follows_lifecycle_in_chunk_steps() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("progress.bin");
    let seen: Arc<Mutex<Vec<Progress>>> = Arc::default();
    let record = seen.clone();

    let transport = Scripted::body(&[b"hello ", b"world"]);
    let fetcher = Fetcher::new(store(), &transport).with_options(
        FetchOptions::default()
            .chunk_size(4)
            .on_progress(Arc::new(move |p: &Progress| record.lock().unwrap().push(*p))),
    );

    fetcher
        .fetch(&FetchRequest::http("x", &destination), "http_default")
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first().map(|p| p.state), Some(FetchState::Connecting));
    assert_eq!(seen.last().map(|p| (p.state, p.bytes_written)), Some((FetchState::Complete, 11)));
    assert!(seen.iter().all(|p| p.state != FetchState::Failed));
    for pair in seen.windows(2) {
        let step = pair[1].bytes_written - pair[0].bytes_written;
        assert!(step <= 4, "wrote {step} bytes in one step");
    }
    let streaming = seen.iter().find(|p| p.state == FetchState::Streaming).unwrap();
    assert_eq!(streaming.total_bytes, Some(11));
}

#[tokio::test]
async fn test_failed_fetch_reports_failed_state() {
    let dir = tempdir().unwrap();
    let states: Arc<Mutex<Vec<FetchState>>> = Arc::default();
    let record = states.clone();

    let transport = Scripted::status(500);
    let fetcher = Fetcher::new(store(), &transport).with_options(
        FetchOptions::default().on_progress(Arc::new(move |p: &Progress| record.lock().unwrap().push(p.state))),
    );

    fetcher
        .fetch(&FetchRequest::http("x", dir.path().join("f")), "http_default")
        .await
        .unwrap_err();

    assert_eq!(*states.lock().unwrap(), vec![FetchState::Connecting, FetchState::Failed]);
}

#[tokio::test]
async fn test_object_source_uses_container_key_and_token_header() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("oov/OOV_gebieden_totaal.shp");
    let transport = Scripted::body(&[b"shape"]);
    let fetcher = Fetcher::new(store(), &transport);

    fetcher
        .fetch(
            &FetchRequest::object("overlastgebieden", "OOV_gebieden_totaal.shp", &destination),
            "objectstore",
        )
        .await
        .unwrap();

    let target = &transport.opened()[0];
    assert_eq!(
        target.url.as_str(),
        "https://objectstore.example.org/v1/AUTH_data/overlastgebieden/OOV_gebieden_totaal.shp"
    );
    assert_eq!(target.auth, Some(ferry_fetch::Auth::Header {
        name:  OBJECT_TOKEN_HEADER.to_string(),
        value: Secret::new("swift-token"),
    }));
    assert_eq!(read(&destination), b"shape");
}

#[tokio::test]
async fn test_rendered_request_reaches_transport() {
    let dir = tempdir().unwrap();
    let transport = Scripted::body(&[b"{}"]);
    let fetcher = Fetcher::new(store(), &transport);

    let mut context = tera::Context::new();
    context.insert("ds", "2020-05-01");
    let request = FetchRequest::http("/export/{{ ds }}", dir.path().join("{{ ds }}.json"))
        .param("since", "{{ ds }}")
        .render(&context)
        .unwrap();

    let result = fetcher.fetch(&request, "http_default").await.unwrap();

    let target = &transport.opened()[0];
    assert_eq!(target.url.path(), "/export/2020-05-01");
    assert_eq!(target.query, vec![("since".to_string(), "2020-05-01".to_string())]);
    assert_eq!(result.destination(), dir.path().join("{{ ds }}.json"));
}

#[tokio::test]
async fn test_concurrent_fetches_do_not_interfere() {
    let dir = tempdir().unwrap();
    let fetcher = Fetcher::new(store(), Echo);
    let requests: Vec<FetchRequest> = (0..8)
        .map(|i| FetchRequest::http(format!("/part/{i}"), dir.path().join(format!("parts/{i}.bin"))))
        .collect();

    let results = future::join_all(requests.iter().map(|r| fetcher.fetch(r, "http_default"))).await;

    for (i, result) in results.into_iter().enumerate() {
        let result = result.unwrap();
        let expected = Echo::expected(&format!("/part/{i}"));
        assert_eq!(result.bytes_written(), expected.len() as u64);
        assert_eq!(read(result.destination()), expected);
    }
}

#[tokio::test]
async fn test_fetch_all_preserves_order() {
    let dir = tempdir().unwrap();
    let fetcher = Fetcher::new(store(), Echo);
    let requests: Vec<FetchRequest> = ["shp", "shx", "dbf", "prj"]
        .iter()
        .map(|ext| FetchRequest::http(format!("/oov.{ext}"), dir.path().join(format!("oov.{ext}"))))
        .collect();

    let results = fetcher
        .fetch_all(&requests, "http_default", BatchOptions {
            max_concurrent: 2,
            fail_fast:      false,
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    for (request, result) in requests.iter().zip(results) {
        assert_eq!(result.unwrap().destination(), request.destination());
    }
}

#[tokio::test]
async fn test_fetch_all_rejects_duplicate_destinations() {
    let dir = tempdir().unwrap();
    let transport = Unreachable::new();
    let fetcher = Fetcher::new(store(), &transport);
    let destination = dir.path().join("same.csv");
    let requests = [
        FetchRequest::http("a", &destination),
        FetchRequest::http("b", &destination),
    ];

    let err = fetcher
        .fetch_all(&requests, "http_default", BatchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::DuplicateDestination(ref p) if *p == destination));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fetch_all_rejects_same_file_spelled_twice() {
    let transport = Unreachable::new();
    let fetcher = Fetcher::new(store(), &transport);
    let requests = [
        FetchRequest::http("a", "ferry-batch/oov.shp"),
        FetchRequest::http("b", "./ferry-batch/oov.shp"),
    ];

    let err = fetcher
        .fetch_all(&requests, "http_default", BatchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::DuplicateDestination(_)));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    assert!(!Path::new("ferry-batch").exists());
}

#[tokio::test]
async fn test_fetch_all_fail_fast_cancels_the_rest() {
    let dir = tempdir().unwrap();
    let transport = Scripted::status(500);
    let fetcher = Fetcher::new(store(), &transport);
    let requests: Vec<FetchRequest> =
        (0..3).map(|i| FetchRequest::http("x", dir.path().join(format!("{i}")))).collect();

    let results = fetcher
        .fetch_all(&requests, "http_default", BatchOptions {
            max_concurrent: 1,
            fail_fast:      true,
        })
        .await
        .unwrap();

    assert!(matches!(results[0].as_ref().unwrap_err().cause(), Some(TransferCause::Transport(_))));
    for result in &results[1..] {
        assert!(matches!(result.as_ref().unwrap_err().cause(), Some(TransferCause::Cancelled)));
    }
    assert_eq!(transport.opened().len(), 1);
}
