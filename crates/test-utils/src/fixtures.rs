//! Common test fixtures for alert ingestion tests.
//!
//! This module provides CAP bulletin builders and pre-defined polygons that
//! represent common scenarios in the upstream alert feed.

/// Polygon strings in CAP `lat,lon lat,lon ...` form.
pub mod polygons {
    /// Sierra de Madrid (closed ring, 5 vertices)
    pub const MADRID: &str = "40.8,-4.1 41.0,-3.8 40.9,-3.5 40.7,-3.8 40.8,-4.1";

    /// Galician coast (closed ring, 5 vertices)
    pub const GALICIA: &str = "43.5,-8.5 43.8,-8.0 43.6,-7.5 43.2,-8.0 43.5,-8.5";

    /// Huesca Pyrenees (closed ring, 5 vertices)
    pub const PYRENEES: &str = "42.6,-0.5 42.8,0.2 42.6,0.8 42.4,0.1 42.6,-0.5";

    /// Only two vertices: not renderable
    pub const DEGENERATE: &str = "40.0,-3.0 41.0,-3.5";
}

/// Fixed timestamps used across tests.
pub mod time {
    /// Sent time of fixture bulletins
    pub const SENT: &str = "2024-01-15T12:00:00+01:00";

    /// Expiry of fixture info blocks
    pub const EXPIRES: &str = "2024-01-16T00:00:00+01:00";
}

/// A malformed bulletin (mismatched end tag).
pub const MALFORMED_XML: &str = "<alert><identifier>broken</identifier><info></alert>";

/// An `<area>` inside an info block fixture.
#[derive(Debug, Clone)]
pub struct AreaFixture {
    pub desc: String,
    pub polygons: Vec<String>,
}

/// Builder for one `<info>` block.
#[derive(Debug, Clone)]
pub struct InfoFixture {
    pub language: Option<String>,
    pub event: Option<String>,
    pub severity: String,
    pub headline: String,
    pub description: String,
    pub instruction: Option<String>,
    pub expires: Option<String>,
    pub areas: Vec<AreaFixture>,
}

impl InfoFixture {
    /// A Spanish info block with the given event and CAP severity.
    pub fn new(event: &str, severity: &str) -> Self {
        Self {
            language: Some("es-ES".to_string()),
            event: Some(event.to_string()),
            severity: severity.to_string(),
            headline: format!("Aviso: {}", event),
            description: format!("Descripción del aviso de {}", event),
            instruction: None,
            expires: Some(time::EXPIRES.to_string()),
            areas: Vec::new(),
        }
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn without_language(mut self) -> Self {
        self.language = None;
        self
    }

    pub fn without_event(mut self) -> Self {
        self.event = None;
        self
    }

    pub fn without_expires(mut self) -> Self {
        self.expires = None;
        self
    }

    pub fn instruction(mut self, instruction: &str) -> Self {
        self.instruction = Some(instruction.to_string());
        self
    }

    pub fn area(mut self, desc: &str) -> Self {
        self.areas.push(AreaFixture {
            desc: desc.to_string(),
            polygons: Vec::new(),
        });
        self
    }

    pub fn area_with_polygon(self, desc: &str, polygon: &str) -> Self {
        self.area_with_polygons(desc, &[polygon])
    }

    /// An area carrying several `<polygon>` elements.
    pub fn area_with_polygons(mut self, desc: &str, polygons: &[&str]) -> Self {
        self.areas.push(AreaFixture {
            desc: desc.to_string(),
            polygons: polygons.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    /// Render as an `<info>` element.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("  <info>\n");
        if let Some(language) = &self.language {
            xml.push_str(&element("language", language));
        }
        xml.push_str(&element("category", "Met"));
        if let Some(event) = &self.event {
            xml.push_str(&element("event", event));
        }
        xml.push_str(&element("urgency", "Future"));
        xml.push_str(&element("severity", &self.severity));
        xml.push_str(&element("certainty", "Likely"));
        if let Some(expires) = &self.expires {
            xml.push_str(&element("expires", expires));
        }
        xml.push_str(&element("senderName", "Agencia Estatal de Meteorología"));
        xml.push_str(&element("headline", &self.headline));
        xml.push_str(&element("description", &self.description));
        if let Some(instruction) = &self.instruction {
            xml.push_str(&element("instruction", instruction));
        }
        for area in &self.areas {
            xml.push_str("    <area>\n");
            xml.push_str(&element("areaDesc", &area.desc));
            for polygon in &area.polygons {
                xml.push_str(&element("polygon", polygon));
            }
            xml.push_str("    </area>\n");
        }
        xml.push_str("  </info>\n");
        xml
    }
}

fn element(name: &str, text: &str) -> String {
    format!("    <{name}>{}</{name}>\n", escape(text))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render a complete CAP `<alert>` document.
pub fn cap_alert_xml(identifier: &str, infos: &[InfoFixture]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<alert xmlns=\"urn:oasis:names:tc:emergency:cap:1.2\">\n");
    xml.push_str(&element("identifier", identifier));
    xml.push_str(&element("sender", "http://www.aemet.es"));
    xml.push_str(&element("sent", time::SENT));
    xml.push_str(&element("status", "Actual"));
    xml.push_str(&element("msgType", "Alert"));
    xml.push_str(&element("scope", "Public"));
    for info in infos {
        xml.push_str(&info.to_xml());
    }
    xml.push_str("</alert>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_alert_xml_contains_infos() {
        let xml = cap_alert_xml(
            "id-1",
            &[
                InfoFixture::new("Viento", "Severe").area("Galicia"),
                InfoFixture::new("Wind", "Severe").language("en-GB"),
            ],
        );
        assert_eq!(xml.matches("<info>").count(), 2);
        assert!(xml.contains("<areaDesc>Galicia</areaDesc>"));
        assert!(xml.contains("<identifier>id-1</identifier>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = InfoFixture::new("Lluvia & tormenta", "Minor").to_xml();
        assert!(xml.contains("Lluvia &amp; tormenta"));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let xml = InfoFixture::new("Nieve", "Extreme")
            .without_language()
            .without_expires()
            .to_xml();
        assert!(!xml.contains("<language>"));
        assert!(!xml.contains("<expires>"));
        assert!(!xml.contains("<instruction>"));
    }
}
