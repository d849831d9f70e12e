//! Metadata format registry and readers.
//!
//! Records carry their payload in a format chosen by the metadata prefix
//! of the request. A [`MetadataRegistry`] maps each prefix to a
//! [`MetadataReader`]; supporting a new format is a matter of registering
//! a reader, nothing in the response parser changes.

mod oai_dc;
mod reader;
mod registry;

pub use oai_dc::{create_default_registry, oai_dc_reader, DC_ELEMENTS, OAI_DC_PREFIX};
pub use reader::{payload_root, FieldKind, MetadataReader, SchemaReader};
pub use registry::MetadataRegistry;
