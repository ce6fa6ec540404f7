//! Credential shapes and per-source rotation state.
//!
//! A credential is either a single API key or an ID/secret pair (Censys
//! style). Both shapes are immutable once loaded; rotation advances a cursor
//! over an ordered list and never wraps, so a run walks each configured
//! credential at most once until an explicit reset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque per-source secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    /// Single API key.
    Key(String),
    /// Paired credential for providers that authenticate with two values.
    Pair { id: String, secret: String },
}

impl Credential {
    pub fn key(value: impl Into<String>) -> Self {
        Self::Key(value.into())
    }

    pub fn pair(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Pair {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// True when every part of the credential is blank.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Key(k) => k.trim().is_empty(),
            Self::Pair { id, secret } => id.trim().is_empty() || secret.trim().is_empty(),
        }
    }

    /// Detects unfilled template values copied from sample configs.
    pub fn is_placeholder(&self) -> bool {
        match self {
            Self::Key(k) => k.contains("YOUR_"),
            Self::Pair { id, secret } => id.contains("YOUR_") || secret.contains("YOUR_"),
        }
    }
}

/// Show a short non-reversible prefix so credentials can appear in log
/// events without leaking secret material.
fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(2).collect();
    format!("{prefix}\u{2026}")
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => write!(f, "key({})", redact(k)),
            Self::Pair { id, .. } => write!(f, "pair(id={})", redact(id)),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Ordered credential list plus rotation cursor for one source.
///
/// The cursor is monotonic within a run: `rotate` only ever advances, and a
/// failed rotation leaves it at the last valid index.
#[derive(Debug, Default)]
pub(crate) struct CredentialRotation {
    credentials: Vec<Credential>,
    cursor: usize,
}

impl CredentialRotation {
    pub(crate) fn new(credentials: Vec<Credential>) -> Self {
        Self {
            credentials,
            cursor: 0,
        }
    }

    pub(crate) fn current(&self) -> Option<&Credential> {
        self.credentials.get(self.cursor)
    }

    /// Advance to the next credential. Returns `false` (cursor unchanged)
    /// when the list is exhausted or empty.
    pub(crate) fn rotate(&mut self) -> bool {
        if self.cursor + 1 < self.credentials.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn reset(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.credentials.len()
    }
}
