//! Typed view over a parsed CAP `<alert>` tree.
//!
//! Reading is total: a missing or oddly shaped field yields `None` or an
//! empty list, never an error. Every single-or-many field (`info`, `area`,
//! `geocode`, `parameter`, `code`) is coerced to a `Vec` here.

use alert_common::{parse_polygon, CapSeverity, LatLon};
use serde::Serialize;

use crate::markup::Node;

/// Root element name of a CAP document.
pub const ALERT_ROOT: &str = "alert";

/// One CAP bulletin as published by the issuing authority.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RawBulletin {
    pub identifier: Option<String>,
    pub sender: Option<String>,
    pub sent: Option<String>,
    pub status: Option<String>,
    pub msg_type: Option<String>,
    pub scope: Option<String>,
    pub codes: Vec<String>,
    pub infos: Vec<InfoBlock>,
}

/// One language/severity variant within a bulletin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoBlock {
    pub language: Option<String>,
    pub category: Option<String>,
    pub event: Option<String>,
    pub urgency: Option<String>,
    pub severity: Option<String>,
    pub certainty: Option<String>,
    pub effective: Option<String>,
    pub onset: Option<String>,
    pub expires: Option<String>,
    pub sender_name: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub parameters: Vec<NamedValue>,
    pub areas: Vec<AreaBlock>,
    /// The `<info>` subtree exactly as parsed.
    #[serde(skip)]
    pub raw: Node,
}

/// A geographic area affected by an info block.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AreaBlock {
    pub area_desc: Option<String>,
    /// Every `<polygon>` of the area, in document order.
    pub polygons: Vec<String>,
    pub geocodes: Vec<NamedValue>,
}

/// `valueName`/`value` pair, used by both `<geocode>` and `<parameter>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    pub value_name: String,
    pub value: String,
}

fn owned_text(node: &Node, key: &str) -> Option<String> {
    node.child_text(key).map(str::to_string)
}

impl RawBulletin {
    /// Read a bulletin from a whole parsed document. Returns `None` when the
    /// document has no `<alert>` root.
    pub fn from_document(document: &Node) -> Option<Self> {
        document.get(ALERT_ROOT).map(Self::from_alert)
    }

    /// Read a bulletin from an `<alert>` node.
    pub fn from_alert(alert: &Node) -> Self {
        Self {
            identifier: owned_text(alert, "identifier"),
            sender: owned_text(alert, "sender"),
            sent: owned_text(alert, "sent"),
            status: owned_text(alert, "status"),
            msg_type: owned_text(alert, "msgType"),
            scope: owned_text(alert, "scope"),
            codes: alert
                .children("code")
                .into_iter()
                .filter_map(Node::text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            infos: alert
                .children("info")
                .into_iter()
                .map(InfoBlock::from_node)
                .collect(),
        }
    }
}

impl InfoBlock {
    pub fn from_node(info: &Node) -> Self {
        Self {
            language: owned_text(info, "language"),
            category: owned_text(info, "category"),
            event: owned_text(info, "event"),
            urgency: owned_text(info, "urgency"),
            severity: owned_text(info, "severity"),
            certainty: owned_text(info, "certainty"),
            effective: owned_text(info, "effective"),
            onset: owned_text(info, "onset"),
            expires: owned_text(info, "expires"),
            sender_name: owned_text(info, "senderName"),
            headline: owned_text(info, "headline"),
            description: owned_text(info, "description"),
            instruction: owned_text(info, "instruction"),
            parameters: info
                .children("parameter")
                .into_iter()
                .filter_map(NamedValue::from_node)
                .collect(),
            areas: AreaBlock::all_from_info(info),
            raw: info.clone(),
        }
    }

    pub fn cap_severity(&self) -> CapSeverity {
        self.severity
            .as_deref()
            .map(CapSeverity::parse)
            .unwrap_or(CapSeverity::Unknown)
    }

    /// Value of the `<parameter>` whose `valueName` matches.
    pub fn parameter(&self, value_name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.value_name == value_name)
            .map(|p| p.value.as_str())
    }
}

impl AreaBlock {
    pub fn from_node(area: &Node) -> Self {
        Self {
            area_desc: owned_text(area, "areaDesc"),
            polygons: area
                .children("polygon")
                .into_iter()
                .filter_map(Node::text)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .collect(),
            geocodes: area
                .children("geocode")
                .into_iter()
                .filter_map(NamedValue::from_node)
                .collect(),
        }
    }

    /// All `<area>` blocks of an `<info>` node.
    pub fn all_from_info(info: &Node) -> Vec<Self> {
        info.children("area")
            .into_iter()
            .map(Self::from_node)
            .collect()
    }

    /// Renderable rings, one per polygon. Degenerate polygons are dropped.
    pub fn rings(&self) -> Vec<Vec<LatLon>> {
        self.polygons
            .iter()
            .map(|polygon| parse_polygon(polygon))
            .filter(|ring| !ring.is_empty())
            .collect()
    }

    pub fn has_polygon(&self) -> bool {
        !self.polygons.is_empty()
    }
}

impl NamedValue {
    fn from_node(node: &Node) -> Option<Self> {
        Some(Self {
            value_name: node.child_text("valueName")?.to_string(),
            value: node.child_text("value").unwrap_or_default().to_string(),
        })
    }
}
