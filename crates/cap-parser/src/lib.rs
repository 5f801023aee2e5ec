//! CAP (Common Alerting Protocol) parsing.
//!
//! Parsing happens in two layers:
//!
//! - [`markup`] turns an XML document into a generic [`Node`] tree. Repeated
//!   sibling elements collapse into a list, single elements stay scalar, and
//!   attributes live under `@_`-prefixed keys.
//! - [`bulletin`] reads a typed [`RawBulletin`] out of that tree, coercing
//!   every single-or-many field into a `Vec` so callers never see the
//!   ambiguity.

pub mod bulletin;
pub mod error;
pub mod markup;
pub mod one_or_many;

pub use bulletin::{AreaBlock, InfoBlock, NamedValue, RawBulletin, ALERT_ROOT};
pub use error::{CapError, Result};
pub use markup::{parse_document, Element, Node, ATTRIBUTE_PREFIX, TEXT_KEY};
pub use one_or_many::OneOrMany;
