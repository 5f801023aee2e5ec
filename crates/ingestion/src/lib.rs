//! Weather alert ingestion library.
//!
//! Fetches the upstream CAP archive, extracts it, parses each bulletin and
//! normalizes every info block into a [`NormalizedAlert`].
//!
//! # Architecture
//!
//! - [`source`]: discovery call and archive download ([`AlertSource`])
//! - [`archive`]: tar extraction into in-memory entries
//! - [`normalize`]: CAP bulletin to normalized alert records
//! - [`pipeline`]: the per-cycle orchestrator tying it all together
//! - [`filter`] and [`layers`]: read-side helpers for list and map consumers

pub mod archive;
pub mod error;
pub mod filter;
pub mod layers;
pub mod mock;
pub mod normalize;
pub mod pipeline;
pub mod source;

// Re-exports
pub use archive::{extract_archive, ArchiveEntry};
pub use error::{IngestionError, Result};
pub use filter::{event_catalog, AlertFilter, EventCount};
pub use layers::{map_layers, MapLayer};
pub use mock::MockAlertSource;
pub use normalize::{normalize_bulletin, NormalizedAlert};
pub use pipeline::{CycleOutcome, CycleReport, CycleState, FileFailure, IngestionPipeline};
pub use source::{AlertSource, DiscoveryEnvelope, HttpAlertSource, SourceConfig};
