// ABOUTME: Storage backend trait shared by the Consul client and the in-memory store
// ABOUTME: Defines the key/value pair type returned by point and prefix reads

use super::error::Result;

/// A single entry read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Value decoded as UTF-8, with invalid sequences replaced.
    pub fn value_string(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

/// Read-only access to a key-value store.
///
/// Implementations perform exactly one read per call and never retry. A
/// missing key is `Ok(None)` and an empty prefix is `Ok(vec![])`; only
/// transport or decoding problems are errors.
pub trait KvStore: Send + Sync {
    /// Fetch the entry stored at exactly `key`.
    fn get(&self, key: &str) -> Result<Option<KvPair>>;

    /// Fetch every entry whose key starts with `prefix`, in key order.
    fn list(&self, prefix: &str) -> Result<Vec<KvPair>>;
}
