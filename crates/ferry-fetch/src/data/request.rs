use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where the bytes come from. Exactly one addressing mode per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Endpoint relative to the profile's host (or an absolute path on it).
    Http { endpoint: String },
    /// Object `key` inside `container` of a key-addressed object store.
    Object { container: String, key: String },
}

impl Source {
    pub fn is_object(&self) -> bool { matches!(self, Self::Object { .. }) }
}

/// A single resource to materialize at `destination`.
///
/// Built with the consuming builder methods and read through accessors; once
/// handed to the fetcher it is never modified.
///
/// # Examples
///
/// ```
/// use ferry_fetch::FetchRequest;
///
/// let request = FetchRequest::object("overlastgebieden", "OOV_gebieden_totaal.shp", "/tmp/oov/OOV.shp");
/// assert!(request.source().is_object());
///
/// let request = FetchRequest::http("/v1/export", "/tmp/export.csv")
///     .param("format", "csv")
///     .header("Accept", "text/csv");
/// assert_eq!(request.params().get("format").map(String::as_str), Some("csv"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    source:      Source,
    params:      BTreeMap<String, String>,
    headers:     BTreeMap<String, String>,
    destination: PathBuf,
}

impl FetchRequest {
    pub fn new(source: Source, destination: impl Into<PathBuf>) -> Self {
        Self {
            source,
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            destination: destination.into(),
        }
    }

    pub fn http(endpoint: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self::new(
            Source::Http {
                endpoint: endpoint.into(),
            },
            destination,
        )
    }

    pub fn object(
        container: impl Into<String>,
        key: impl Into<String>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            Source::Object {
                container: container.into(),
                key:       key.into(),
            },
            destination,
        )
    }

    /// Add a query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn extend_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a request header. Overrides a profile default header of the same name.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn extend_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn source(&self) -> &Source { &self.source }

    pub fn params(&self) -> &BTreeMap<String, String> { &self.params }

    pub fn headers(&self) -> &BTreeMap<String, String> { &self.headers }

    pub fn destination(&self) -> &Path { &self.destination }

    /// Render templated fields against `context`. See [`crate::render`].
    pub fn render(&self, context: &tera::Context) -> crate::Result<Self> {
        crate::core::render(self, context)
    }
}
