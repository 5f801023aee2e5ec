//! Common types shared across the weather alert services.

pub mod polygon;
pub mod severity;

pub use polygon::{parse_polygon, LatLon, MIN_POLYGON_VERTICES};
pub use severity::{CapSeverity, SeverityTier, UnknownTier};
