//! Metadata format registry mapping prefixes to readers.

use std::collections::HashMap;
use std::fmt;

use roxmltree::Node;

use super::reader::MetadataReader;
use crate::error::{OaiError, Result};
use crate::types::Metadata;

/// Registry mapping metadata prefixes to readers.
///
/// A registry starts empty. Registering a reader under a prefix that
/// already has one replaces it, which is how built-in formats are
/// overridden.
pub struct MetadataRegistry {
    readers: HashMap<String, Box<dyn MetadataReader>>,
}

impl MetadataRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            readers: HashMap::new(),
        }
    }

    /// Register a reader for a metadata prefix, replacing any previous one.
    pub fn register_reader(
        &mut self,
        prefix: impl Into<String>,
        reader: impl MetadataReader + 'static,
    ) {
        let prefix = prefix.into();
        if self.readers.insert(prefix.clone(), Box::new(reader)).is_some() {
            tracing::debug!(prefix = %prefix, "Replaced metadata reader");
        }
    }

    /// Get the reader for a prefix.
    ///
    /// # Errors
    /// `OaiError::UnknownMetadataFormat` when nothing is registered.
    pub fn reader_for(&self, prefix: &str) -> Result<&dyn MetadataReader> {
        self.readers
            .get(prefix)
            .map(|r| r.as_ref())
            .ok_or_else(|| OaiError::UnknownMetadataFormat(prefix.to_string()))
    }

    /// Check if a reader is registered for a prefix.
    #[must_use]
    pub fn has_reader(&self, prefix: &str) -> bool {
        self.readers.contains_key(prefix)
    }

    /// Registered prefixes, sorted.
    #[must_use]
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.readers.keys().map(String::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }

    /// Decode a `<metadata>` element with the reader for `prefix`.
    pub fn read_metadata(&self, prefix: &str, metadata: Node<'_, '_>) -> Result<Metadata> {
        self.reader_for(prefix)?.read(metadata)
    }
}

impl Default for MetadataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetadataRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataRegistry")
            .field("prefixes", &self.prefixes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn first_reader(_metadata: Node<'_, '_>) -> Result<Metadata> {
        Ok(Metadata::new("first"))
    }

    fn second_reader(_metadata: Node<'_, '_>) -> Result<Metadata> {
        Ok(Metadata::new("second"))
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = MetadataRegistry::new();
        assert!(registry.prefixes().is_empty());
        assert!(!registry.has_reader("oai_dc"));
    }

    #[test]
    fn test_registry_unknown_prefix() {
        let registry = MetadataRegistry::new();
        let err = registry.reader_for("marc21").err().unwrap();
        assert!(matches!(err, OaiError::UnknownMetadataFormat(p) if p == "marc21"));
    }

    #[test]
    fn test_registry_last_registration_wins() {
        let mut registry = MetadataRegistry::new();
        registry.register_reader("oai_dc", first_reader);
        registry.register_reader("oai_dc", second_reader);

        let doc = Document::parse("<metadata><dc/></metadata>").unwrap();
        let metadata = registry.read_metadata("oai_dc", doc.root_element()).unwrap();
        assert_eq!(metadata.tag, "second");
        assert_eq!(registry.prefixes(), vec!["oai_dc"]);
    }

    #[test]
    fn test_registry_debug_lists_prefixes() {
        let mut registry = MetadataRegistry::new();
        registry.register_reader("b", first_reader);
        registry.register_reader("a", first_reader);
        assert_eq!(
            format!("{registry:?}"),
            r#"MetadataRegistry { prefixes: ["a", "b"] }"#
        );
    }
}
