// ABOUTME: CLI module for ctmpl
// ABOUTME: Exports command line interface components and main application logic

pub mod app;
pub mod args;
pub mod commands;
pub mod config;
pub mod error;

pub use app::App;
pub use args::Args;
pub use config::Config;
pub use error::CliError;
