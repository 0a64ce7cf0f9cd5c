use std::fmt;

use concord_core::{InvalidLanguagePattern, TermError};

#[derive(Debug)]
pub enum CompareError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty aspect, unknown reference, etc.).
    ConfigValidation(String),
    /// A step references an aspect that is not configured.
    UnknownAspect(String),
    /// A step references a variable no dataset of the aspect provides.
    UnknownVariable { aspect: String, variable: String },
    /// A dataset is requested that the aspect does not cover.
    UnknownDataset { aspect: String, dataset: String },
    /// Unparseable language filter pattern.
    InvalidLanguagePattern(String),
    /// Missing required column in input data.
    MissingColumn { file: String, column: String },
    /// A cell that is not a valid value term.
    InvalidTerm { file: String, line: u64, message: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownAspect(aspect) => write!(f, "unknown aspect: {aspect}"),
            Self::UnknownVariable { aspect, variable } => {
                write!(f, "aspect '{aspect}': unknown variable '{variable}'")
            }
            Self::UnknownDataset { aspect, dataset } => {
                write!(f, "aspect '{aspect}': dataset '{dataset}' not covered")
            }
            Self::InvalidLanguagePattern(pattern) => {
                write!(f, "invalid language filter pattern: '{pattern}'")
            }
            Self::MissingColumn { file, column } => {
                write!(f, "file '{file}': missing column '{column}'")
            }
            Self::InvalidTerm { file, line, message } => {
                write!(f, "file '{file}', line {line}: {message}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for CompareError {}

impl From<InvalidLanguagePattern> for CompareError {
    fn from(e: InvalidLanguagePattern) -> Self {
        Self::InvalidLanguagePattern(e.0)
    }
}

impl CompareError {
    pub(crate) fn invalid_term(file: &str, line: u64, e: TermError) -> Self {
        Self::InvalidTerm {
            file: file.into(),
            line,
            message: e.to_string(),
        }
    }
}
