//! CAP bulletin normalization.
//!
//! Every info block of a bulletin becomes one [`NormalizedAlert`]. The
//! conversion is total: missing fields resolve to fixed defaults through the
//! small `resolve_*` functions below.

use alert_common::SeverityTier;
use cap_parser::{AreaBlock, InfoBlock, Node, RawBulletin};
use serde::Serialize;

/// Event name used when an info block has none.
pub const DEFAULT_EVENT: &str = "Unknown";

/// Language assumed when an info block has none.
pub const DEFAULT_LANGUAGE: &str = "es";

/// Separator between area descriptions.
pub const AREA_SEPARATOR: &str = ", ";

/// One user-visible alert: a single info block of a bulletin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedAlert {
    /// Identifier of the parent bulletin.
    pub id: String,
    pub sent: String,
    pub event: String,
    pub severity: SeverityTier,
    pub headline: String,
    pub description: String,
    pub instruction: String,
    /// All area descriptions, joined.
    pub area: String,
    pub expires: String,
    pub language: String,
    /// The `<info>` subtree as parsed, for geographic rendering.
    pub raw: Node,
}

impl NormalizedAlert {
    /// Area blocks of the retained info subtree.
    pub fn areas(&self) -> Vec<AreaBlock> {
        AreaBlock::all_from_info(&self.raw)
    }

    /// Whether any area carries a polygon string.
    pub fn has_polygon(&self) -> bool {
        self.areas().iter().any(AreaBlock::has_polygon)
    }
}

/// Normalize a bulletin into one alert per info block.
pub fn normalize_bulletin(bulletin: &RawBulletin) -> Vec<NormalizedAlert> {
    bulletin
        .infos
        .iter()
        .map(|info| normalize_info(bulletin, info))
        .collect()
}

/// Normalize a single info block in the context of its bulletin.
pub fn normalize_info(bulletin: &RawBulletin, info: &InfoBlock) -> NormalizedAlert {
    NormalizedAlert {
        id: bulletin.identifier.clone().unwrap_or_default(),
        sent: bulletin.sent.clone().unwrap_or_default(),
        event: resolve_event(info.event.as_deref()),
        severity: resolve_severity(info.severity.as_deref()),
        headline: info.headline.clone().unwrap_or_default(),
        description: info.description.clone().unwrap_or_default(),
        instruction: resolve_optional(info.instruction.as_deref()),
        area: join_area_descriptions(&info.areas),
        expires: resolve_optional(info.expires.as_deref()),
        language: resolve_language(info.language.as_deref()),
        raw: info.raw.clone(),
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn resolve_event(event: Option<&str>) -> String {
    present(event).unwrap_or(DEFAULT_EVENT).to_string()
}

pub fn resolve_language(language: Option<&str>) -> String {
    present(language).unwrap_or(DEFAULT_LANGUAGE).to_string()
}

/// Optional text fields (`instruction`, `expires`) default to empty.
pub fn resolve_optional(value: Option<&str>) -> String {
    present(value).unwrap_or_default().to_string()
}

pub fn resolve_severity(severity: Option<&str>) -> SeverityTier {
    severity
        .map(SeverityTier::from_cap)
        .unwrap_or(SeverityTier::Unknown)
}

/// Join the descriptions of all areas. Areas without a description are
/// skipped.
pub fn join_area_descriptions(areas: &[AreaBlock]) -> String {
    areas
        .iter()
        .filter_map(|area| present(area.area_desc.as_deref()))
        .collect::<Vec<_>>()
        .join(AREA_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cap_parser::parse_document;
    use test_utils::{cap_alert_xml, polygons, InfoFixture};

    fn bulletin(xml: &str) -> RawBulletin {
        RawBulletin::from_document(&parse_document(xml).unwrap()).unwrap()
    }

    fn area(desc: &str) -> AreaBlock {
        AreaBlock {
            area_desc: Some(desc.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_alert_per_info_block() {
        let xml = cap_alert_xml(
            "bulletin-1",
            &[
                InfoFixture::new("Viento", "Severe").area("Galicia"),
                InfoFixture::new("Wind", "Severe").language("en-GB").area("Galicia"),
                InfoFixture::new("Vent", "Severe").language("fr-FR").area("Galice"),
            ],
        );
        let alerts = normalize_bulletin(&bulletin(&xml));

        assert_eq!(alerts.len(), 3);
        assert!(alerts.iter().all(|a| a.id == "bulletin-1"));
        let languages: Vec<_> = alerts.iter().map(|a| a.language.as_str()).collect();
        assert_eq!(languages, vec!["es-ES", "en-GB", "fr-FR"]);
    }

    #[test]
    fn test_no_info_yields_nothing() {
        let b = bulletin("<alert><identifier>empty</identifier></alert>");
        assert!(normalize_bulletin(&b).is_empty());
    }

    #[test]
    fn test_fields_copied() {
        let xml = cap_alert_xml(
            "b",
            &[InfoFixture::new("Viento", "Severe")
                .instruction("Evite desplazamientos")
                .area("Galicia")],
        );
        let alert = &normalize_bulletin(&bulletin(&xml))[0];

        assert_eq!(alert.sent, test_utils::time::SENT);
        assert_eq!(alert.event, "Viento");
        assert_eq!(alert.severity, SeverityTier::Orange);
        assert_eq!(alert.headline, "Aviso: Viento");
        assert_eq!(alert.instruction, "Evite desplazamientos");
        assert_eq!(alert.expires, test_utils::time::EXPIRES);
        assert_eq!(alert.area, "Galicia");
    }

    #[test]
    fn test_fallbacks_applied() {
        let xml = cap_alert_xml(
            "b",
            &[InfoFixture::new("ignored", "Catastrophic")
                .without_event()
                .without_language()
                .without_expires()],
        );
        let alert = &normalize_bulletin(&bulletin(&xml))[0];

        assert_eq!(alert.event, DEFAULT_EVENT);
        assert_eq!(alert.language, DEFAULT_LANGUAGE);
        assert_eq!(alert.instruction, "");
        assert_eq!(alert.expires, "");
        assert_eq!(alert.area, "");
        assert_eq!(alert.severity, SeverityTier::Unknown);
    }

    #[test]
    fn test_bare_info_is_total() {
        let b = bulletin("<alert><info/></alert>");
        let alerts = normalize_bulletin(&b);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "");
        assert_eq!(alerts[0].event, DEFAULT_EVENT);
        assert_eq!(alerts[0].headline, "");
    }

    #[test]
    fn test_default_resolvers() {
        assert_eq!(resolve_event(None), "Unknown");
        assert_eq!(resolve_event(Some("  ")), "Unknown");
        assert_eq!(resolve_event(Some("Nevadas")), "Nevadas");
        assert_eq!(resolve_language(None), "es");
        assert_eq!(resolve_language(Some("en-GB")), "en-GB");
        assert_eq!(resolve_optional(None), "");
        assert_eq!(resolve_severity(None), SeverityTier::Unknown);
        assert_eq!(resolve_severity(Some("Minor")), SeverityTier::Green);
    }

    #[test]
    fn test_area_join() {
        assert_eq!(join_area_descriptions(&[area("Madrid")]), "Madrid");
        assert_eq!(
            join_area_descriptions(&[area("Madrid"), area("Toledo")]),
            "Madrid, Toledo"
        );
        assert_eq!(join_area_descriptions(&[]), "");
        assert_eq!(
            join_area_descriptions(&[area("Madrid"), AreaBlock::default(), area("Toledo")]),
            "Madrid, Toledo"
        );
    }

    #[test]
    fn test_raw_info_retained_for_rendering() {
        let xml = cap_alert_xml(
            "b",
            &[InfoFixture::new("Lluvias", "Severe")
                .area_with_polygon("Sierra de Madrid", polygons::MADRID)
                .area("Area Metropolitana")],
        );
        let alert = &normalize_bulletin(&bulletin(&xml))[0];

        assert!(alert.has_polygon());
        let areas = alert.areas();
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0].polygons, vec![polygons::MADRID.to_string()]);
        assert_eq!(alert.area, "Sierra de Madrid, Area Metropolitana");
    }
}
