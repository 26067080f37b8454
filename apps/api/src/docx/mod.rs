//! DOCX placeholder engine.
//!
//! Scans Word documents for `«Name»` placeholders and fills them with values,
//! regardless of how Word split the visible text into formatting runs.
//! All functions are synchronous and CPU-bound; async callers wrap them in
//! `tokio::task::spawn_blocking`.

pub mod fill;
pub mod package;
pub mod paragraph;
pub mod scanner;
pub mod xml;

#[cfg(test)]
pub mod testing;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use fill::fill_docx;
pub use scanner::extract_placeholders;

/// Captures the key inside `«...»`.
pub static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"«([^»]+)»").expect("placeholder regex"));

/// A paragraph made only of placeholder tokens and whitespace.
pub static WHOLE_PLACEHOLDER_PARA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:«[^»]+»\s*)+$").expect("placeholder paragraph regex"));

/// A lone bullet glyph: • - – —
pub static BULLET_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[•\-\u{2013}\u{2014}]\s*$").expect("bullet regex"));

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("file is not a DOCX package: {0}")]
    NotADocument(String),

    #[error("DOCX package has no main document part")]
    MissingMainPart,

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wraps a placeholder key in its delimiters.
pub fn token_for(key: &str) -> String {
    format!("«{key}»")
}
