// ABOUTME: Template engine module for ctmpl
// ABOUTME: Provides strict-mode compilation, helper registration and streamed rendering

mod check;
pub mod engine;
pub mod error;
pub mod helpers;

pub use engine::{CompiledTemplate, TemplateEngine};
pub use error::{HelperError, Result, TemplateError};
