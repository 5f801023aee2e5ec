//! Error types for the ingestion crate.

use cap_parser::CapError;
use thiserror::Error;

/// Errors that can occur during an ingestion cycle.
///
/// `Discovery*`, `Fetch` and `ArchiveDecode` abort the whole cycle.
/// `MarkupParse` and `Normalization` only cost the affected file.
#[derive(Error, Debug, Clone)]
pub enum IngestionError {
    #[error("Discovery request failed: {0}")]
    DiscoveryRequest(String),

    #[error("Discovery rejected (estado {estado}): {descripcion}")]
    DiscoveryRejected { estado: i64, descripcion: String },

    #[error("Failed to fetch archive from {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to decode archive: {0}")]
    ArchiveDecode(String),

    #[error("Failed to parse {file}: {source}")]
    MarkupParse {
        file: String,
        #[source]
        source: CapError,
    },

    #[error("Failed to normalize {file}: {message}")]
    Normalization { file: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IngestionError {
    /// Whether this error voids the whole cycle rather than a single file.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            IngestionError::MarkupParse { .. } | IngestionError::Normalization { .. }
        )
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
