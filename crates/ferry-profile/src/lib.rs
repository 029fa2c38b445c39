//! Named connection profiles.
//!
//! A fetch names a profile instead of carrying hosts and credentials around.
//! Profiles live in a TOML file:
//!
//! ```toml
//! [profiles.http_default]
//! host = "https://api.data.example.org"
//! timeout_secs = 60
//! headers = { Accept = "application/json" }
//!
//! [profiles.objectstore]
//! host = "https://objectstore.example.org/v1/AUTH_datasets"
//! token = "..."
//! ```
//!
//! and any field can be overridden from the environment with
//! `FERRY_PROFILES__<NAME>__<FIELD>` (names and fields are lowercased).
//! Override values are parsed, so numbers lose leading zeros; wrap a value in
//! double quotes (`FERRY_PROFILES__OS__TOKEN='"0042"'`) to keep it verbatim.

mod error;
mod lenient;
pub mod profile;
mod secret;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;

pub use error::{Error, Result};
pub use profile::{ConnectionProfile, Credentials, ProfileConfig};
pub use secret::Secret;

/// Read-only lookup of connection profiles by name.
pub trait ProfileStore: Send + Sync {
    /// Return a copy of the profile called `name`, if any.
    fn resolve(&self, name: &str) -> Option<ConnectionProfile>;
}

impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    fn resolve(&self, name: &str) -> Option<ConnectionProfile> { (**self).resolve(name) }
}

impl<T: ProfileStore + ?Sized> ProfileStore for &T {
    fn resolve(&self, name: &str) -> Option<ConnectionProfile> { (**self).resolve(name) }
}

#[derive(Debug, Default, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: BTreeMap<String, ProfileConfig>,
}

/// Profiles loaded once from static configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticProfileStore {
    profiles: BTreeMap<String, ConnectionProfile>,
}

impl StaticProfileStore {
    /// Prefix of environment overrides.
    pub const ENV_PREFIX: &'static str = "FERRY_";

    pub fn new() -> Self { Self::default() }

    /// Load `path` (which may be absent) merged with environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new().merge(Toml::file(path.as_ref())).merge(
            Env::prefixed(Self::ENV_PREFIX)
                .filter(|key| key.as_str().to_ascii_lowercase().starts_with("profiles__"))
                .split("__"),
        );
        Self::from_figment(&figment)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let file: ProfileFile = figment.extract()?;

        let mut profiles = BTreeMap::new();
        for (name, config) in file.profiles {
            let profile = config.into_profile(&name)?;
            profiles.insert(name, profile);
        }

        tracing::debug!(count = profiles.len(), "loaded connection profiles");
        Ok(Self { profiles })
    }

    pub fn insert(&mut self, profile: ConnectionProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    #[must_use]
    pub fn with_profile(mut self, profile: ConnectionProfile) -> Self {
        self.insert(profile);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.profiles.keys().map(String::as_str) }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionProfile> { self.profiles.values() }

    pub fn len(&self) -> usize { self.profiles.len() }

    pub fn is_empty(&self) -> bool { self.profiles.is_empty() }
}

impl ProfileStore for StaticProfileStore {
    fn resolve(&self, name: &str) -> Option<ConnectionProfile> { self.profiles.get(name).cloned() }
}
