use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, compiling or evaluating a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Grammar error at line {line}: {reason}: `{content}`")]
    Grammar {
        line: usize,
        content: String,
        reason: String,
    },
    #[error("Filter {0} not found")]
    FilterNotFound(String),
    #[error("Evaluation error: {0}")]
    Evaluation(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Include error in '{name}': {reason}")]
    Include { name: String, reason: String },
    #[error("Value error: {0}")]
    Value(String),
    #[error("Format error: {0}")]
    Format(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TemplateError>;

impl TemplateError {
    pub(crate) fn grammar(line: usize, content: &str, reason: impl Into<String>) -> Self {
        TemplateError::Grammar {
            line,
            content: content.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplateError::Io {
            path: path.into(),
            source,
        }
    }
}

impl serde::ser::Error for TemplateError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        TemplateError::Value(msg.to_string())
    }
}
