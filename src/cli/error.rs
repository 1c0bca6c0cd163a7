// ABOUTME: Error types for the command line front end
// ABOUTME: Covers argument count problems and template file access failures

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Got {got} arguments, expected 1")]
    Usage { got: usize },

    #[error("Read {}: {source}", path.display())]
    ReadTemplate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CliError>;
