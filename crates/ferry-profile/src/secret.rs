use std::fmt;

use serde::{Deserialize, Deserializer};

/// Credential material that never shows up in logs.
///
/// `Debug` and `Display` print a fixed placeholder; use [`Secret::expose`] at
/// the single point where the value goes on the wire.
///
/// Deserializes from a string, or from a number or boolean taken verbatim, so
/// an all-digit token set through the environment still loads.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

    pub fn expose(&self) -> &str { &self.0 }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for Secret {
    fn from(value: String) -> Self { Self(value) }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::lenient::string(deserializer).map(Self)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("Secret(***)") }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("***") }
}
