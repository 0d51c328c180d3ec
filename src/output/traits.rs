//! Output handler traits and types
//!
//! This module defines the converter port used when scraping pages and the
//! error type shared by every writer in this module.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to format output: {0}")]
    Format(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Formats a scraped page can be rendered to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Json,
    Csv,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Html => "html",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "html" => Ok(Self::Html),
            other => Err(OutputError::Format(format!("unknown output format: {}", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Html => "html",
        };
        write!(f, "{}", name)
    }
}

/// Renders a fetched HTML document into an output format
///
/// Implementations are pure: the crawler only forwards the body and writes
/// whatever string comes back. Callers check [`Converter::supports`] before
/// rendering, so `render` is only asked for formats it declared.
pub trait Converter {
    /// Whether `render` produces valid output for `format`
    fn supports(&self, format: OutputFormat) -> bool;

    fn render(&self, html: &[u8], source: &Url, format: OutputFormat) -> String;
}

/// Fails with `OutputError::Format` unless `converter` handles `format`
pub fn ensure_supported(converter: &dyn Converter, format: OutputFormat) -> OutputResult<()> {
    if converter.supports(format) {
        Ok(())
    } else {
        Err(OutputError::Format(format!(
            "{} output is not available with this converter",
            format
        )))
    }
}
