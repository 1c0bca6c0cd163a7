// ABOUTME: Prefix-scoped value lookups used by the template helpers
// ABOUTME: Turns empty store reads into NotFound errors and decodes values as text

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::error::{KvError, Result};
use super::store::KvStore;

/// A store handle bound to a key prefix.
///
/// Cloning is cheap; every clone shares the same underlying store.
#[derive(Clone)]
pub struct KvResolver {
    store: Arc<dyn KvStore>,
    prefix: String,
}

impl KvResolver {
    pub fn new(store: Arc<dyn KvStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Value stored at `prefix + key`.
    pub fn get_value(&self, key: &str) -> Result<String> {
        let full_key = self.full_key(key);
        match self.store.get(&full_key)? {
            Some(pair) => {
                debug!("Read {}", full_key);
                Ok(pair.value_string())
            }
            None => {
                debug!("Missing {}", full_key);
                Err(KvError::key_not_found(full_key))
            }
        }
    }

    /// Values of every entry under `prefix + key`, in store order.
    pub fn list_values(&self, key: &str) -> Result<Vec<String>> {
        let full_prefix = self.full_key(key);
        let pairs = self.store.list(&full_prefix)?;
        debug!("Listed {} entries under {}", pairs.len(), full_prefix);

        if pairs.is_empty() {
            return Err(KvError::prefix_not_found(full_prefix));
        }

        Ok(pairs.iter().map(|pair| pair.value_string()).collect())
    }
}

impl fmt::Debug for KvResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvResolver")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryStore;
    use crate::kv::LookupKind;

    fn resolver(prefix: &str) -> KvResolver {
        let store = MemoryStore::new()
            .with("svc/a", "1")
            .with("svc/list/y", "2")
            .with("svc/list/x", "1")
            .with("a", "root");
        KvResolver::new(Arc::new(store), prefix)
    }

    #[test]
    fn test_get_value_applies_prefix() {
        assert_eq!(resolver("svc/").get_value("a").unwrap(), "1");
        assert_eq!(resolver("").get_value("a").unwrap(), "root");
    }

    #[test]
    fn test_get_value_missing_reports_full_key() {
        let err = resolver("svc/").get_value("missing").unwrap_err();
        assert_eq!(
            err,
            KvError::NotFound {
                kind: LookupKind::Key,
                key: "svc/missing".to_string()
            }
        );
    }

    #[test]
    fn test_list_values_in_key_order() {
        assert_eq!(
            resolver("svc/").list_values("list/").unwrap(),
            vec!["1".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn test_list_values_empty_is_not_found() {
        let err = resolver("svc/").list_values("nothing/").unwrap_err();
        assert_eq!(err, KvError::prefix_not_found("svc/nothing/"));
    }
}
