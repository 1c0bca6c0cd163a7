// ABOUTME: Key-value store access for template rendering
// ABOUTME: Provides the store trait, Consul and in-memory backends, and the prefix resolver

pub mod config;
pub mod consul;
pub mod error;
pub mod memory;
pub mod resolver;
pub mod store;

pub use config::ConsulConfig;
pub use consul::ConsulClient;
pub use error::{KvError, LookupKind, Result};
pub use memory::MemoryStore;
pub use resolver::KvResolver;
pub use store::{KvPair, KvStore};
