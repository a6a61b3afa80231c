// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locale-keyed text used by labels, descriptions, and help links.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Locale used when the requested one is missing.
pub const DEFAULT_LOCALE: &str = "en_US";

/// A map of locale to text, e.g. `{en_US: "Acme", zh_Hans: "..."}`.
///
/// A bare string in a descriptor is accepted and stored under
/// [`DEFAULT_LOCALE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocalizedRepr")]
pub struct LocalizedText(BTreeMap<String, String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum LocalizedRepr {
    Plain(String),
    Map(BTreeMap<String, String>),
}

impl From<LocalizedRepr> for LocalizedText {
    fn from(repr: LocalizedRepr) -> Self {
        match repr {
            LocalizedRepr::Plain(text) => LocalizedText::single(DEFAULT_LOCALE, text),
            LocalizedRepr::Map(map) => LocalizedText(map),
        }
    }
}

impl LocalizedText {
    pub fn single(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self(BTreeMap::from([(locale.into(), text.into())]))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| v.trim().is_empty())
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0
            .get(locale)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Text for `locale`, falling back to [`DEFAULT_LOCALE`], then to any
    /// non-empty entry.
    pub fn resolve(&self, locale: &str) -> Option<&str> {
        self.get(locale)
            .or_else(|| self.get(DEFAULT_LOCALE))
            .or_else(|| self.0.values().map(String::as_str).find(|v| !v.trim().is_empty()))
    }

    /// Like [`resolve`](Self::resolve), with `fallback` (normally the plain
    /// name) when no locale has text.
    pub fn resolve_or(&self, locale: &str, fallback: &str) -> String {
        self.resolve(locale).unwrap_or(fallback).to_string()
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
