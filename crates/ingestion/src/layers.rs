//! Map layering of alerts.
//!
//! Layers are ordered by ascending severity rank so that the most severe
//! alerts are drawn last, on top.

use alert_common::{LatLon, SeverityTier};
use cap_parser::AreaBlock;
use serde::Serialize;

use crate::normalize::NormalizedAlert;

/// One drawable alert: its renderable polygons plus display attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub id: String,
    pub language: String,
    pub event: String,
    pub headline: String,
    pub severity: SeverityTier,
    /// Fill color for the tier, as `#rrggbb`.
    pub color: &'static str,
    pub polygons: Vec<Vec<LatLon>>,
}

impl MapLayer {
    /// Build a layer, or `None` when the alert has no renderable polygon.
    pub fn from_alert(alert: &NormalizedAlert) -> Option<Self> {
        let polygons: Vec<Vec<LatLon>> = alert
            .areas()
            .iter()
            .flat_map(AreaBlock::rings)
            .collect();

        if polygons.is_empty() {
            return None;
        }

        Some(Self {
            id: alert.id.clone(),
            language: alert.language.clone(),
            event: alert.event.clone(),
            headline: alert.headline.clone(),
            severity: alert.severity,
            color: alert.severity.color_hex(),
            polygons,
        })
    }
}

/// Layers for every alert with a renderable polygon, least severe first.
pub fn map_layers<'a, I>(alerts: I) -> Vec<MapLayer>
where
    I: IntoIterator<Item = &'a NormalizedAlert>,
{
    let mut layers: Vec<MapLayer> = alerts.into_iter().filter_map(MapLayer::from_alert).collect();
    // stable: equal ranks keep input order
    layers.sort_by_key(|layer| layer.severity.rank());
    layers
}
