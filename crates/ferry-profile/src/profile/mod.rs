use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result, Secret, lenient};

/// How a profile authenticates its requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    None,
    /// HTTP basic authentication.
    Basic {
        login:    String,
        password: Option<Secret>,
    },
    /// Pre-issued token. With no `header`, the transport picks the header that
    /// fits the addressing mode (`Authorization: Bearer` for HTTP endpoints,
    /// `X-Auth-Token` for object stores).
    Token {
        token:  Secret,
        header: Option<String>,
    },
}

/// A named bundle of transport settings.
///
/// Profiles are owned by the configuration store; fetches receive a copy and
/// never write back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub name:        String,
    /// Base endpoint. A value without a scheme is treated as `http://`.
    pub host:        String,
    pub credentials: Credentials,
    /// Headers sent with every request made through this profile.
    pub headers:     BTreeMap<String, String>,
    /// Per-request timeout enforced by the transport.
    pub timeout:     Option<Duration>,
    /// Protocol-specific options, passed through untouched.
    pub options:     BTreeMap<String, String>,
}

impl ConnectionProfile {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name:        name.into(),
            host:        host.into(),
            credentials: Credentials::None,
            headers:     BTreeMap::new(),
            timeout:     None,
            options:     BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// On-disk shape of one `[profiles.<name>]` table.
///
/// Text fields also accept numbers and booleans, which is what the `Env`
/// provider produces for values like `8080` or `true`.
#[derive(Debug, Deserialize)]
pub struct ProfileConfig {
    #[serde(deserialize_with = "lenient::string")]
    pub host:         String,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub login:        Option<String>,
    #[serde(default)]
    pub password:     Option<Secret>,
    #[serde(default)]
    pub token:        Option<Secret>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub token_header: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub headers:      BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub options:      BTreeMap<String, String>,
}

impl ProfileConfig {
    /// Validate the raw table and turn it into a profile called `name`.
    pub fn into_profile(self, name: &str) -> Result<ConnectionProfile> {
        let invalid = |reason: &str| Error::InvalidProfile {
            name:   name.to_string(),
            reason: reason.to_string(),
        };

        if self.host.trim().is_empty() {
            return Err(invalid("host is empty"));
        }

        let credentials = match (self.login, self.password, self.token) {
            (None, None, None) => Credentials::None,
            (Some(login), password, None) => Credentials::Basic { login, password },
            (None, None, Some(token)) => Credentials::Token {
                token,
                header: self.token_header,
            },
            (None, Some(_), _) => return Err(invalid("password given without login")),
            (Some(_), _, Some(_)) => return Err(invalid("login and token are mutually exclusive")),
        };

        let timeout = match self.timeout_secs {
            Some(0) => return Err(invalid("timeout_secs must be positive")),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(ConnectionProfile {
            name: name.to_string(),
            host: self.host.trim().to_string(),
            credentials,
            headers: self.headers,
            timeout,
            options: self.options,
        })
    }
}
