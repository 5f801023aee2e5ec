//! Generic XML to tree conversion.
//!
//! The tree mirrors the shape the alert feed has always been consumed in:
//!
//! - element names become keys of their parent [`Element`]
//! - an element repeated under the same parent becomes a [`Node::List`];
//!   a single occurrence is never wrapped in a one-item list
//! - attributes are stored as `@_<name>` so they cannot collide with a
//!   child element of the same name
//! - a leaf element becomes [`Node::Text`]; an element with attributes or
//!   children keeps its own text under `#text`
//!
//! Text is kept as strings. Typed interpretation belongs to the caller.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{CapError, Result};
use crate::one_or_many::OneOrMany;

/// Key prefix under which attributes are stored.
pub const ATTRIBUTE_PREFIX: &str = "@_";

/// Key holding the text of an element that also has attributes or children.
pub const TEXT_KEY: &str = "#text";

/// A value in the parsed document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Element(Element),
    /// Same-named siblings, in document order.
    List(Vec<Node>),
}

/// Ordered key/value entries of one XML element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    entries: Vec<(String, Node)>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
    }

    /// Attribute value by its unprefixed name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| {
                k.strip_prefix(ATTRIBUTE_PREFIX)
                    .is_some_and(|local| local == name)
            })
            .and_then(|(_, node)| node.text())
    }

    /// Insert a child. A second child under the same key turns the entry
    /// into a [`Node::List`].
    pub fn insert(&mut self, key: impl Into<String>, node: Node) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, Node::List(items))) => items.push(node),
            Some((_, existing)) => {
                let first = std::mem::replace(existing, Node::List(Vec::with_capacity(2)));
                if let Node::List(items) = existing {
                    items.push(first);
                    items.push(node);
                }
            }
            None => self.entries.push((key, node)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn entries(&self) -> &[(String, Node)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Node {
    /// Child lookup. Only elements have children.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_element().and_then(|e| e.get(key))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Scalar text of this node. For a list, the first item's text.
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(element) => element.get(TEXT_KEY).and_then(Node::text),
            Node::List(items) => items.first().and_then(Node::text),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.as_element().and_then(|e| e.attribute(name))
    }

    /// View this node as one or many items.
    pub fn one_or_many(&self) -> OneOrMany<&Node> {
        match self {
            Node::List(items) => OneOrMany::Many(items.iter().collect()),
            node => OneOrMany::One(node),
        }
    }

    /// All children under `key` as a sequence; empty when the key is absent.
    pub fn children(&self, key: &str) -> Vec<&Node> {
        self.get(key)
            .map(|node| node.one_or_many().into_vec())
            .unwrap_or_default()
    }

    /// Trimmed text of the child under `key`, if present and non-empty.
    pub fn child_text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Node::text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Text(text) => serializer.serialize_str(text),
            Node::Element(element) => element.serialize(serializer),
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, node) in &self.entries {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}

/// An element whose end tag has not been seen yet.
struct OpenElement {
    name: String,
    element: Element,
    text: String,
}

impl OpenElement {
    fn start(start: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut element = Element::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = format!(
                "{}{}",
                ATTRIBUTE_PREFIX,
                String::from_utf8_lossy(attr.key.as_ref())
            );
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            element.insert(key, Node::Text(value.into_owned()));
        }

        Ok(Self {
            name,
            element,
            text: String::new(),
        })
    }

    fn finish(self) -> (String, Node) {
        let OpenElement {
            name,
            mut element,
            text,
        } = self;

        if element.is_empty() {
            return (name, Node::Text(text));
        }
        if !text.is_empty() {
            element.insert(TEXT_KEY, Node::Text(text));
        }
        (name, Node::Element(element))
    }
}

/// Attach a closed element to its parent, or to the document if it is a root.
fn attach(stack: &mut [OpenElement], document: &mut Element, closed: OpenElement) {
    let (name, node) = closed.finish();
    match stack.last_mut() {
        Some(parent) => parent.element.insert(name, node),
        None => document.insert(name, node),
    }
}

fn malformed(position: usize, message: impl Into<String>) -> CapError {
    CapError::Malformed {
        position,
        message: message.into(),
    }
}

/// Parse an XML document into a tree rooted at an element whose keys are the
/// document's root element names.
pub fn parse_document(xml: &str) -> Result<Node> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut document = Element::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let open = OpenElement::start(&start).map_err(|m| malformed(position, m))?;
                stack.push(open);
            }
            Ok(Event::Empty(start)) => {
                let open = OpenElement::start(&start).map_err(|m| malformed(position, m))?;
                attach(&mut stack, &mut document, open);
            }
            Ok(Event::End(_)) => {
                let closed = stack
                    .pop()
                    .ok_or_else(|| malformed(position, "end tag without matching start tag"))?;
                attach(&mut stack, &mut document, closed);
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|e| malformed(position, e.to_string()))?;
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, doctype.
            Ok(_) => {}
            Err(e) => return Err(malformed(reader.buffer_position(), e.to_string())),
        }
    }

    if let Some(open) = stack.pop() {
        return Err(CapError::UnclosedElement(open.name));
    }
    if document.is_empty() {
        return Err(CapError::NoRootElement);
    }

    Ok(Node::Element(document))
}
