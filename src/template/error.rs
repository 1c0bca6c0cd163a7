// ABOUTME: Error types for template compilation, execution, and helper failures
// ABOUTME: Maps handlebars render errors back onto the renderer's own error taxonomy

use handlebars::RenderError;
use std::error::Error as StdError;
use thiserror::Error;

use crate::kv::KvError;

/// Failure raised from inside a helper while the template executes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HelperError {
    #[error("Environment variable {name} not set")]
    EnvVarUnset { name: String },

    #[error("Environment variable {name} is not valid unicode")]
    EnvVarNotUnicode { name: String },

    #[error("{helper} helper requires {expected}")]
    InvalidArgument { helper: String, expected: String },

    #[error(transparent)]
    Store(#[from] KvError),
}

impl HelperError {
    pub fn invalid_argument(helper: &str, expected: &str) -> Self {
        HelperError::InvalidArgument {
            helper: helper.to_string(),
            expected: expected.to_string(),
        }
    }
}

impl From<HelperError> for RenderError {
    fn from(err: HelperError) -> Self {
        RenderError::from_error(&err.to_string(), err)
    }
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template syntax error: {0}")]
    Syntax(String),

    #[error("Undefined template function {name:?} (line {line})")]
    UndefinedHelper { name: String, line: usize },

    #[error("Missing template variable: {0}")]
    MissingDataKey(String),

    #[error(transparent)]
    Helper(#[from] HelperError),

    #[error("Unsupported template construct: {construct} (line {line})")]
    Unsupported { construct: String, line: usize },

    #[error("Template render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RenderError> for TemplateError {
    fn from(err: RenderError) -> Self {
        let mut source = StdError::source(&err);
        while let Some(cause) = source {
            if let Some(helper_err) = cause.downcast_ref::<HelperError>() {
                return TemplateError::Helper(helper_err.clone());
            }
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                return TemplateError::Io(std::io::Error::new(
                    io_err.kind(),
                    io_err.to_string(),
                ));
            }
            source = cause.source();
        }

        let desc = err.desc.clone();
        if desc.contains("strict mode") {
            TemplateError::MissingDataKey(desc)
        } else if desc.starts_with("Helper not defined") {
            TemplateError::UndefinedHelper {
                name: quoted_name(&desc).unwrap_or(desc.as_str()).to_string(),
                line: err.line_no.unwrap_or(0),
            }
        } else {
            TemplateError::Render(err.to_string())
        }
    }
}

/// The first double-quoted word in a handlebars error message
fn quoted_name(desc: &str) -> Option<&str> {
    let start = desc.find('"')? + 1;
    let len = desc[start..].find('"')?;
    Some(&desc[start..start + len])
}

pub type Result<T> = std::result::Result<T, TemplateError>;
