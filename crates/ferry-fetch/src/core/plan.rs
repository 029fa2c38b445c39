use std::time::Duration;

use ferry_profile::{ConnectionProfile, Credentials, Secret};
use url::Url;

use crate::data::{FetchRequest, Source};
use crate::error::{FetchError, Result};

/// Header carrying object-store tokens when the profile names none.
pub const OBJECT_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    Basic {
        login:    String,
        password: Option<Secret>,
    },
    Header {
        name:  String,
        value: Secret,
    },
}

/// A request resolved against its profile, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url:     Url,
    pub query:   Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub auth:    Option<Auth>,
    pub timeout: Option<Duration>,
}

/// Resolve `request` against `profile`.
///
/// HTTP endpoints are appended to the profile host with exactly one `/`
/// between them. Object keys are appended as `<host>/<container>/<key>` with
/// every path segment percent-encoded. Request headers replace profile headers
/// of the same name (case-insensitive), and an explicit `Authorization` or
/// token header on the request suppresses the profile credentials.
pub fn plan(request: &FetchRequest, profile: &ConnectionProfile) -> Result<Target> {
    let base = base_url(&profile.host)?;
    let url = match request.source() {
        Source::Http { endpoint } => endpoint_url(&base, endpoint)?,
        Source::Object { container, key } => object_url(&base, container, key)?,
    };

    let overrides = |name: &str| request.headers().keys().any(|k| k.eq_ignore_ascii_case(name));

    let mut headers: Vec<(String, String)> = profile
        .headers
        .iter()
        .filter(|(k, _)| !overrides(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    headers.extend(request.headers().iter().map(|(k, v)| (k.clone(), v.clone())));

    let auth = auth(&profile.credentials, request.source().is_object()).filter(|auth| match auth {
        Auth::Basic { .. } => !overrides("Authorization"),
        Auth::Header { name, .. } => !overrides(name),
    });

    Ok(Target {
        url,
        query: request
            .params()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        headers,
        auth,
        timeout: profile.timeout,
    })
}

fn base_url(host: &str) -> Result<Url> {
    let host = host.trim();
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };

    let url = Url::parse(&raw)
        .map_err(|e| FetchError::InvalidRequest(format!("profile host '{host}': {e}")))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(FetchError::InvalidRequest(format!(
            "profile host '{host}' is not a base URL"
        )));
    }
    Ok(url)
}

fn endpoint_url(base: &Url, endpoint: &str) -> Result<Url> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Ok(base.clone());
    }

    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| FetchError::InvalidRequest(format!("endpoint '{endpoint}': {e}")))
}

fn object_url(base: &Url, container: &str, key: &str) -> Result<Url> {
    let container = container.trim_matches('/');
    let key = key.trim_start_matches('/');
    if container.is_empty() || key.is_empty() {
        return Err(FetchError::InvalidRequest(
            "object source needs a container and a key".to_string(),
        ));
    }
    if container.contains('/') {
        return Err(FetchError::InvalidRequest(format!(
            "container '{container}' contains '/'"
        )));
    }
    if key.split('/').any(|s| s == "." || s == "..") {
        return Err(FetchError::InvalidRequest(format!(
            "object key '{key}' contains a relative segment"
        )));
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidRequest("profile host is not a base URL".to_string()))?
        .pop_if_empty()
        .push(container)
        .extend(key.split('/'));
    Ok(url)
}

fn auth(credentials: &Credentials, object: bool) -> Option<Auth> {
    match credentials {
        Credentials::None => None,
        Credentials::Basic { login, password } => Some(Auth::Basic {
            login:    login.clone(),
            password: password.clone(),
        }),
        Credentials::Token {
            token,
            header: Some(header),
        } => Some(Auth::Header {
            name:  header.clone(),
            value: token.clone(),
        }),
        Credentials::Token { token, header: None } if object => Some(Auth::Header {
            name:  OBJECT_TOKEN_HEADER.to_string(),
            value: token.clone(),
        }),
        Credentials::Token { token, header: None } => Some(Auth::Header {
            name:  "Authorization".to_string(),
            value: Secret::new(format!("Bearer {}", token.expose())),
        }),
    }
}
