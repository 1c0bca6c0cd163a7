// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Accepts the single-dash -prefix spelling alongside the usual --prefix

use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "ctmpl")]
#[command(about = "Render a template with values from Consul KV and environment variables")]
#[command(version)]
pub struct Args {
    #[arg(value_name = "TEMPLATE", help = "Path to the template file")]
    pub templates: Vec<PathBuf>,

    #[arg(long, default_value = "", help = "Prefix for Consul keys")]
    pub prefix: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long, help = "Write output only after the whole template rendered")]
    pub buffered: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_flags(std::env::args_os()))
    }

    /// The one template path, or a usage error for any other count
    pub fn template_path(&self) -> Result<&Path, CliError> {
        match self.templates.as_slice() {
            [path] => Ok(path.as_path()),
            other => Err(CliError::Usage { got: other.len() }),
        }
    }
}

/// Rewrite `-prefix` / `-prefix=x` to their double-dash forms.
pub fn normalize_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut normalized = Vec::new();
    let mut passthrough = false;

    for arg in args {
        let rewritten = match arg.to_str() {
            _ if passthrough => None,
            Some("--") => {
                passthrough = true;
                None
            }
            Some(s) if s == "-prefix" || s.starts_with("-prefix=") => {
                Some(OsString::from(format!("-{}", s)))
            }
            _ => None,
        };
        normalized.push(rewritten.unwrap_or(arg));
    }

    normalized
}
