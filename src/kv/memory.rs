// ABOUTME: In-process key-value store backed by an ordered map
// ABOUTME: Mirrors Consul listing order so templates render identically without a server

use std::collections::BTreeMap;

use super::error::Result;
use super::store::{KvPair, KvStore};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryStore
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = MemoryStore::new();
        for (key, value) in iter {
            store.insert(key, value);
        }
        store
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<KvPair>> {
        Ok(self
            .entries
            .get(key)
            .map(|value| KvPair::new(key, value.clone())))
    }

    fn list(&self, prefix: &str) -> Result<Vec<KvPair>> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| KvPair::new(key.clone(), value.clone()))
            .collect())
    }
}
