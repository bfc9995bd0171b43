//! Free-form provider and tool settings with secret-aware storage.
//!
//! String values under credential-looking keys (`api_key`, `client-secret`,
//! `Authorization`, ...) are held as [`Secret`] and print as `[REDACTED]` in
//! both `Debug` output and serialized output. Read them with
//! [`Settings::secret`] or [`Settings::expose_str`].

use std::fmt;

use {
    indexmap::IndexMap,
    secrecy::{ExposeSecret, Secret},
    serde::{Serialize, Serializer},
};

use crate::document::{Document, Mapping};

pub const REDACTED: &str = "[REDACTED]";

/// Key segments (split on `_` and `-`, case-insensitive) that mark a value as
/// a credential.
const SECRET_SEGMENTS: &[&str] = &[
    "apikey",
    "authorization",
    "credential",
    "credentials",
    "key",
    "password",
    "secret",
    "token",
];

/// Whether a string stored under `key` is kept as a secret.
#[must_use]
pub fn is_secret_key(key: &str) -> bool {
    key.to_ascii_lowercase()
        .split(['_', '-'])
        .any(|segment| SECRET_SEGMENTS.contains(&segment))
}

/// One settings value.
#[derive(Clone)]
pub enum Setting {
    Plain(Document),
    Secret(Secret<String>),
}

impl Setting {
    #[must_use]
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }
}

impl fmt::Debug for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => fmt::Debug::fmt(value, f),
            Self::Secret(_) => f.write_str(REDACTED),
        }
    }
}

impl PartialEq for Setting {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => a == b,
            (Self::Secret(a), Self::Secret(b)) => a.expose_secret() == b.expose_secret(),
            _ => false,
        }
    }
}

impl Serialize for Setting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Plain(value) => value.serialize(serializer),
            Self::Secret(_) => serializer.serialize_str(REDACTED),
        }
    }
}

/// Settings mapping, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Settings(IndexMap<String, Setting>);

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Document) {
        let key = key.into();
        let setting = match value {
            Document::String(s) if is_secret_key(&key) => Setting::Secret(Secret::new(s)),
            other => Setting::Plain(other),
        };
        self.0.insert(key, setting);
    }

    /// A non-secret value. Secrets are only reachable through
    /// [`Self::secret`] and [`Self::expose_str`].
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self.0.get(key)? {
            Setting::Plain(value) => Some(value),
            Setting::Secret(_) => None,
        }
    }

    /// A non-secret string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Document::as_str)
    }

    #[must_use]
    pub fn secret(&self, key: &str) -> Option<&Secret<String>> {
        match self.0.get(key)? {
            Setting::Secret(secret) => Some(secret),
            Setting::Plain(_) => None,
        }
    }

    /// A string value, exposing it if it is a secret.
    #[must_use]
    pub fn expose_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            Setting::Plain(value) => value.as_str(),
            Setting::Secret(secret) => Some(secret.expose_secret()),
        }
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Setting> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&Mapping> for Settings {
    fn from(map: &Mapping) -> Self {
        let mut settings = Self::new();
        for (key, value) in map {
            settings.insert(key.clone(), value.clone());
        }
        settings
    }
}

impl<K: Into<String>> FromIterator<(K, Document)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, Document)>>(iter: I) -> Self {
        let mut settings = Self::new();
        for (key, value) in iter {
            settings.insert(key, value);
        }
        settings
    }
}

impl<'a> IntoIterator for &'a Settings {
    type IntoIter = indexmap::map::Iter<'a, String, Setting>;
    type Item = (&'a String, &'a Setting);

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    fn sample() -> Settings {
        Settings::from(
            json!({
                "endpoint": "https://example.com",
                "api_key": "sk-live-123",
                "Authorization": "Bearer t",
                "key_count": 2,
            })
            .as_object()
            .unwrap(),
        )
    }

    #[rstest]
    #[case("api_key", true)]
    #[case("apiKey", true)]
    #[case("client-secret", true)]
    #[case("Authorization", true)]
    #[case("access_token", true)]
    #[case("password", true)]
    #[case("endpoint", false)]
    #[case("deployment_name", false)]
    #[case("keyword", false)]
    #[case("monkey", false)]
    fn secret_key_detection(#[case] key: &str, #[case] expected: bool) {
        assert_eq!(is_secret_key(key), expected, "{key}");
    }

    #[test]
    fn secrets_are_redacted_in_debug_and_serialized_output() {
        let settings = sample();
        let debug = format!("{settings:?}");
        assert!(debug.contains(REDACTED));
        assert!(!debug.contains("sk-live-123"));

        let out = serde_json::to_value(&settings).unwrap();
        assert_eq!(out["api_key"], REDACTED);
        assert_eq!(out["Authorization"], REDACTED);
        assert_eq!(out["endpoint"], "https://example.com");
        assert_eq!(out["key_count"], 2);
    }

    #[test]
    fn secrets_need_explicit_access() {
        let settings = sample();
        assert!(settings.get("api_key").is_none());
        assert_eq!(settings.secret("api_key").unwrap().expose_secret(), "sk-live-123");
        assert_eq!(settings.expose_str("api_key"), Some("sk-live-123"));
        assert_eq!(settings.get_str("endpoint"), Some("https://example.com"));
        assert_eq!(settings.expose_str("endpoint"), Some("https://example.com"));
        assert!(settings.secret("endpoint").is_none());
        // Only string values become secrets.
        assert_eq!(settings.get("key_count"), Some(&json!(2)));
    }

    #[test]
    fn keeps_document_order() {
        let settings = sample();
        assert_eq!(
            settings.keys().collect::<Vec<_>>(),
            vec!["endpoint", "api_key", "Authorization", "key_count"]
        );
    }

    #[test]
    fn equality_compares_secret_values() {
        assert_eq!(sample(), sample());
        let mut other = sample();
        other.insert("api_key", json!("sk-live-456"));
        assert_ne!(sample(), other);
    }
}
