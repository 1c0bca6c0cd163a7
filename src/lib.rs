// ABOUTME: Main library module for ctmpl, the Consul-backed template renderer
// ABOUTME: Exports the CLI, key-value and template modules and the public API

pub mod cli;
pub mod kv;
pub mod template;

// Re-export commonly used types
pub use cli::{App, Args, CliError, Config};
pub use kv::{ConsulClient, ConsulConfig, KvError, KvResolver, KvStore, MemoryStore};
pub use template::{CompiledTemplate, HelperError, TemplateEngine, TemplateError};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
