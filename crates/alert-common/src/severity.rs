//! Severity classification for CAP alerts.
//!
//! CAP bulletins carry a textual severity (`Extreme`, `Severe`, ...). The
//! dashboard works with a color-coded tier derived from it through a fixed
//! table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity values defined by the CAP 1.2 standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapSeverity {
    Extreme,
    Severe,
    Moderate,
    Minor,
    Unknown,
}

impl CapSeverity {
    /// Parse a CAP severity value. Matching is exact; anything outside the
    /// enumeration is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "Extreme" => CapSeverity::Extreme,
            "Severe" => CapSeverity::Severe,
            "Moderate" => CapSeverity::Moderate,
            "Minor" => CapSeverity::Minor,
            _ => CapSeverity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapSeverity::Extreme => "Extreme",
            CapSeverity::Severe => "Severe",
            CapSeverity::Moderate => "Moderate",
            CapSeverity::Minor => "Minor",
            CapSeverity::Unknown => "Unknown",
        }
    }
}

/// Color-coded severity tier shown on the map and list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Red,
    Orange,
    Yellow,
    Green,
    Unknown,
}

impl SeverityTier {
    /// Tiers shown when a user has not stored any severity preference.
    pub const DEFAULT_VISIBLE: [SeverityTier; 3] =
        [SeverityTier::Yellow, SeverityTier::Orange, SeverityTier::Red];

    /// Map a raw CAP severity string to its tier.
    pub fn from_cap(value: &str) -> Self {
        CapSeverity::parse(value).into()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Red => "red",
            SeverityTier::Orange => "orange",
            SeverityTier::Yellow => "yellow",
            SeverityTier::Green => "green",
            SeverityTier::Unknown => "unknown",
        }
    }

    /// Drawing priority on the map. Higher ranks are drawn on top.
    pub fn rank(&self) -> u8 {
        match self {
            SeverityTier::Unknown => 0,
            SeverityTier::Green => 1,
            SeverityTier::Yellow => 2,
            SeverityTier::Orange => 3,
            SeverityTier::Red => 4,
        }
    }

    /// Fill/stroke color used by the map renderer.
    pub fn color_hex(&self) -> &'static str {
        match self {
            SeverityTier::Red => "#ef4444",
            SeverityTier::Orange => "#f97316",
            SeverityTier::Yellow => "#eab308",
            SeverityTier::Green => "#22c55e",
            SeverityTier::Unknown => "#9ca3af",
        }
    }
}

impl From<CapSeverity> for SeverityTier {
    fn from(severity: CapSeverity) -> Self {
        match severity {
            CapSeverity::Extreme => SeverityTier::Red,
            CapSeverity::Severe => SeverityTier::Orange,
            CapSeverity::Moderate => SeverityTier::Yellow,
            CapSeverity::Minor => SeverityTier::Green,
            CapSeverity::Unknown => SeverityTier::Unknown,
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tier name (e.g. from a query string) is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown severity tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for SeverityTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(SeverityTier::Red),
            "orange" => Ok(SeverityTier::Orange),
            "yellow" => Ok(SeverityTier::Yellow),
            "green" => Ok(SeverityTier::Green),
            "unknown" => Ok(SeverityTier::Unknown),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}
