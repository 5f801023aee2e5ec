//! Built-in sample source for running without an API key.
//!
//! Serves a small archive of hand-written CAP bulletins through the same
//! [`AlertSource`] interface, so the full pipeline still runs.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, SecondsFormat, Utc};

use crate::error::{IngestionError, Result};
use crate::source::{AlertSource, DiscoveryEnvelope, ESTADO_OK};

const MOCK_ARCHIVE_URL: &str = "mock://avisos/latest.tar";

struct SampleInfo {
    language: &'static str,
    event: &'static str,
    severity: &'static str,
    headline: &'static str,
    description: &'static str,
    instruction: &'static str,
    area_desc: &'static str,
    polygon: &'static str,
    area_extra: Option<&'static str>,
    expires_in_hours: i64,
}

struct SampleBulletin {
    identifier: &'static str,
    infos: &'static [SampleInfo],
}

const SAMPLES: &[SampleBulletin] = &[
    SampleBulletin {
        identifier: "mock-1",
        infos: &[
            SampleInfo {
                language: "es-ES",
                event: "Lluvias y Tormentas",
                severity: "Severe",
                headline: "Aviso naranja por lluvias intensas",
                description: "Se esperan precipitaciones acumuladas de 40mm en 1 hora.",
                instruction: "Evite desplazamientos innecesarios.",
                area_desc: "Sierra de Madrid",
                polygon: "40.8,-4.1 41.0,-3.8 40.9,-3.5 40.7,-3.8 40.8,-4.1",
                area_extra: Some("Area Metropolitana"),
                expires_in_hours: 4,
            },
            SampleInfo {
                language: "en-GB",
                event: "Rain and Storms",
                severity: "Severe",
                headline: "Orange warning for heavy rain",
                description: "Accumulated precipitation of 40mm in 1 hour expected.",
                instruction: "Avoid unnecessary travel.",
                area_desc: "Sierra de Madrid",
                polygon: "40.8,-4.1 41.0,-3.8 40.9,-3.5 40.7,-3.8 40.8,-4.1",
                area_extra: Some("Metropolitan Area"),
                expires_in_hours: 4,
            },
        ],
    },
    SampleBulletin {
        identifier: "mock-2",
        infos: &[SampleInfo {
            language: "es-ES",
            event: "Viento",
            severity: "Moderate",
            headline: "Rachas de viento fuerte",
            description: "Rachas máximas de 80 km/h.",
            instruction: "Precaución con objetos que puedan desprenderse.",
            area_desc: "Costa de Galicia",
            polygon: "43.5,-8.5 43.8,-8.0 43.6,-7.5 43.2,-8.0 43.5,-8.5",
            area_extra: None,
            expires_in_hours: 8,
        }],
    },
    SampleBulletin {
        identifier: "mock-3",
        infos: &[SampleInfo {
            language: "es-ES",
            event: "Nevadas",
            severity: "Extreme",
            headline: "Aviso rojo por nevadas copiosas",
            description: "Espesores de más de 50cm en cotas altas",
            instruction: "Cadenas obligatorias. Carreteras cortadas.",
            area_desc: "Pirineo Oscense",
            polygon: "42.6,-0.5 42.8,0.2 42.6,0.8 42.4,0.1 42.6,-0.5",
            area_extra: None,
            expires_in_hours: 12,
        }],
    },
];

/// Sample alert source used when no API key is configured.
#[derive(Debug, Default, Clone)]
pub struct MockAlertSource;

impl MockAlertSource {
    pub fn new() -> Self {
        Self
    }

    fn render_bulletin(sample: &SampleBulletin) -> String {
        let now = Utc::now();
        let sent = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<alert xmlns=\"urn:oasis:names:tc:emergency:cap:1.2\">\n");
        xml.push_str(&format!("  <identifier>{}</identifier>\n", sample.identifier));
        xml.push_str("  <sender>mock</sender>\n");
        xml.push_str(&format!("  <sent>{}</sent>\n", sent));
        xml.push_str("  <status>Actual</status>\n  <msgType>Alert</msgType>\n  <scope>Public</scope>\n");

        for info in sample.infos {
            let expires = (now + Duration::hours(info.expires_in_hours))
                .to_rfc3339_opts(SecondsFormat::Secs, true);
            xml.push_str("  <info>\n");
            xml.push_str(&format!("    <language>{}</language>\n", info.language));
            xml.push_str("    <category>Met</category>\n");
            xml.push_str(&format!("    <event>{}</event>\n", info.event));
            xml.push_str("    <urgency>Immediate</urgency>\n");
            xml.push_str(&format!("    <severity>{}</severity>\n", info.severity));
            xml.push_str("    <certainty>Likely</certainty>\n");
            xml.push_str(&format!("    <expires>{}</expires>\n", expires));
            xml.push_str("    <senderName>mock</senderName>\n");
            xml.push_str(&format!("    <headline>{}</headline>\n", info.headline));
            xml.push_str(&format!("    <description>{}</description>\n", info.description));
            xml.push_str(&format!("    <instruction>{}</instruction>\n", info.instruction));
            xml.push_str(&format!(
                "    <area>\n      <areaDesc>{}</areaDesc>\n      <polygon>{}</polygon>\n    </area>\n",
                info.area_desc, info.polygon
            ));
            if let Some(extra) = info.area_extra {
                xml.push_str(&format!(
                    "    <area>\n      <areaDesc>{}</areaDesc>\n    </area>\n",
                    extra
                ));
            }
            xml.push_str("  </info>\n");
        }

        xml.push_str("</alert>\n");
        xml
    }

    fn build_archive() -> std::io::Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());
        for sample in SAMPLES {
            let xml = Self::render_bulletin(sample);
            let mut header = tar::Header::new_gnu();
            header.set_size(xml.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            builder.append_data(
                &mut header,
                format!("{}.xml", sample.identifier),
                xml.as_bytes(),
            )?;
        }
        builder.into_inner()
    }
}

#[async_trait]
impl AlertSource for MockAlertSource {
    async fn discover(&self) -> Result<DiscoveryEnvelope> {
        Ok(DiscoveryEnvelope {
            estado: ESTADO_OK,
            descripcion: "mock".to_string(),
            datos: Some(MOCK_ARCHIVE_URL.to_string()),
            metadatos: None,
        })
    }

    async fn fetch_archive(&self, url: &str) -> Result<Bytes> {
        Self::build_archive()
            .map(Bytes::from)
            .map_err(|e| IngestionError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
