//! Error types for CAP parsing.

use thiserror::Error;

/// Errors raised while turning XML text into a tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapError {
    #[error("Malformed XML at byte {position}: {message}")]
    Malformed { position: usize, message: String },

    #[error("Unclosed element <{0}> at end of document")]
    UnclosedElement(String),

    #[error("Document contains no root element")]
    NoRootElement,
}

/// Result type for CAP parsing operations.
pub type Result<T> = std::result::Result<T, CapError>;
