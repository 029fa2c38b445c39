//! Deserializers for text fields that may arrive as scalars.
//!
//! Figment's `Env` provider parses `FERRY_PROFILES__X__TOKEN=123456` into an
//! integer and `...=true` into a bool. Text fields take them back as strings.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// A string that also accepts integers, floats and booleans.
pub(crate) struct Text(pub(crate) String);

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TextVisitor).map(Text)
    }
}

struct TextVisitor;

impl Visitor<'_> for TextVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> { Ok(v.to_string()) }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> { Ok(v) }

    fn visit_char<E: de::Error>(self, v: char) -> Result<String, E> { Ok(v.to_string()) }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> { Ok(v.to_string()) }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> { Ok(v.to_string()) }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<String, E> { Ok(v.to_string()) }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> { Ok(v.to_string()) }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<String, E> { Ok(v.to_string()) }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> { Ok(v.to_string()) }
}

pub(crate) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Text::deserialize(deserializer).map(|t| t.0)
}

pub(crate) fn option_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<Text>::deserialize(deserializer).map(|t| t.map(|t| t.0))
}

pub(crate) fn string_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let map = BTreeMap::<String, Text>::deserialize(deserializer)?;
    Ok(map.into_iter().map(|(k, v)| (k, v.0)).collect())
}
