//! Safe vs problematic classification against the configured allow-list.

use crate::settings::Settings;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

pub const DEFAULT_SAFE_ENCODINGS: &[&str] = &["ascii", "utf-8"];

/// Ordered, de-duplicated set of lowercased encoding names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SafeEncodingSet {
    names: Vec<String>,
}

impl SafeEncodingSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let normalized = normalize(name.as_ref());
            if normalized.is_empty() || out.contains(&normalized) {
                continue;
            }
            out.push(normalized);
        }
        Self { names: out }
    }

    /// Parse a comma-separated list such as `"ascii, UTF-8"`.
    pub fn parse_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        let label = normalize(label);
        self.names.iter().any(|name| *name == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for SafeEncodingSet {
    fn default() -> Self {
        Self::new(DEFAULT_SAFE_ENCODINGS)
    }
}

impl From<Vec<String>> for SafeEncodingSet {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<SafeEncodingSet> for Vec<String> {
    fn from(set: SafeEncodingSet) -> Self {
        set.names
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Safe,
    Problematic,
}

pub fn classify(label: &str, safe: &SafeEncodingSet) -> Verdict {
    if safe.contains(label) {
        Verdict::Safe
    } else {
        Verdict::Problematic
    }
}

/// Supplies the allow-list. Read on every classification, never cached.
pub trait SafeEncodingSource: Send + Sync {
    fn safe_encodings(&self) -> SafeEncodingSet;
}

impl SafeEncodingSource for SafeEncodingSet {
    fn safe_encodings(&self) -> SafeEncodingSet {
        self.clone()
    }
}

/// Allow-list the host can swap at runtime.
#[derive(Debug, Clone, Default)]
pub struct SharedSafeEncodings {
    inner: Arc<RwLock<SafeEncodingSet>>,
}

impl SharedSafeEncodings {
    pub fn new(set: SafeEncodingSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(set)),
        }
    }

    pub fn replace(&self, set: SafeEncodingSet) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = set;
    }
}

impl SafeEncodingSource for SharedSafeEncodings {
    fn safe_encodings(&self) -> SafeEncodingSet {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Re-reads `safe_encodings` from a settings file on every query.
#[derive(Debug, Clone)]
pub struct SettingsFileSafeEncodings {
    path: PathBuf,
    fallback: SafeEncodingSet,
}

impl SettingsFileSafeEncodings {
    pub fn new(path: impl Into<PathBuf>, fallback: SafeEncodingSet) -> Self {
        Self {
            path: path.into(),
            fallback,
        }
    }
}

impl SafeEncodingSource for SettingsFileSafeEncodings {
    fn safe_encodings(&self) -> SafeEncodingSet {
        match Settings::from_file(&self.path) {
            Ok(settings) => settings.safe_encodings,
            Err(err) => {
                warn!(
                    "Falling back to default safe encodings ({}): {err}",
                    self.path.display()
                );
                self.fallback.clone()
            }
        }
    }
}
