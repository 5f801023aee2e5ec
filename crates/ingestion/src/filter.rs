//! Read-side selection over the current alert set.

use std::collections::BTreeMap;

use alert_common::SeverityTier;
use serde::{Deserialize, Serialize};

use crate::normalize::{NormalizedAlert, DEFAULT_LANGUAGE};

/// Criteria a consumer applies to the current alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertFilter {
    /// UI language; alert languages must start with it ("es" matches "es-ES").
    pub language: String,
    /// Tiers to show.
    pub severities: Vec<SeverityTier>,
    /// Preferred event types. Empty means all.
    pub event_types: Vec<String>,
    /// Exact event name to narrow down to.
    pub selected_event: Option<String>,
}

impl Default for AlertFilter {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            severities: SeverityTier::DEFAULT_VISIBLE.to_vec(),
            event_types: Vec::new(),
            selected_event: None,
        }
    }
}

impl AlertFilter {
    pub fn matches(&self, alert: &NormalizedAlert) -> bool {
        self.matches_language(alert)
            && self.severities.contains(&alert.severity)
            && self.matches_event_types(alert)
            && self
                .selected_event
                .as_deref()
                .map_or(true, |event| alert.event == event)
    }

    fn matches_language(&self, alert: &NormalizedAlert) -> bool {
        let wanted = self.language.to_lowercase();
        alert.language.to_lowercase().starts_with(&wanted)
    }

    fn matches_event_types(&self, alert: &NormalizedAlert) -> bool {
        if self.event_types.is_empty() {
            return true;
        }
        let event = alert.event.to_lowercase();
        self.event_types.iter().any(|preferred| {
            let preferred = preferred.to_lowercase();
            event.contains(&preferred) || preferred.contains(&event)
        })
    }

    /// Alerts that pass the filter, in input order.
    pub fn apply<'a>(&self, alerts: &'a [NormalizedAlert]) -> Vec<&'a NormalizedAlert> {
        alerts.iter().filter(|a| self.matches(a)).collect()
    }
}

/// One entry of the event catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventCount {
    pub event: String,
    pub count: usize,
}

/// Distinct event names with their alert counts, sorted by name.
pub fn event_catalog(alerts: &[NormalizedAlert]) -> Vec<EventCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for alert in alerts {
        *counts.entry(alert.event.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(event, count)| EventCount {
            event: event.to_string(),
            count,
        })
        .collect()
}
