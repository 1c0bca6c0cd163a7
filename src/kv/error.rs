// ABOUTME: Error types for key-value store access
// ABOUTME: Distinguishes missing keys from transport failures and client setup problems

use std::fmt;
use thiserror::Error;

/// What kind of lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Key,
    Prefix,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::Key => write!(f, "Key"),
            LookupKind::Prefix => write!(f, "Prefix"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KvError {
    #[error("{kind} {key} not found in Consul")]
    NotFound { kind: LookupKind, key: String },

    #[error("Consul unavailable while reading {key}: {reason}")]
    Unavailable { key: String, reason: String },

    #[error("Constructing Consul client: {0}")]
    ClientInit(String),

    #[error("Malformed Consul response for {key}: {reason}")]
    Decode { key: String, reason: String },
}

impl KvError {
    pub fn key_not_found(key: impl Into<String>) -> Self {
        KvError::NotFound {
            kind: LookupKind::Key,
            key: key.into(),
        }
    }

    pub fn prefix_not_found(prefix: impl Into<String>) -> Self {
        KvError::NotFound {
            kind: LookupKind::Prefix,
            key: prefix.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, KvError>;
