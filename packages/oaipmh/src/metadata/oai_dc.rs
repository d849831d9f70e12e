//! The built-in Dublin Core (`oai_dc`) reader.

use super::reader::{FieldKind, SchemaReader};
use super::registry::MetadataRegistry;
use crate::config::{DC_NAMESPACE, OAI_DC_NAMESPACE};

/// Metadata prefix of simple Dublin Core.
pub const OAI_DC_PREFIX: &str = "oai_dc";

/// The fifteen Dublin Core elements, each read as a repeatable field.
pub const DC_ELEMENTS: [&str; 15] = [
    "title",
    "creator",
    "subject",
    "description",
    "publisher",
    "contributor",
    "date",
    "type",
    "format",
    "identifier",
    "source",
    "language",
    "relation",
    "coverage",
    "rights",
];

/// Create the reader for `oai_dc` payloads.
#[must_use]
pub fn oai_dc_reader() -> SchemaReader {
    DC_ELEMENTS.iter().fold(
        SchemaReader::new("oai_dc:dc")
            .namespace("oai_dc", OAI_DC_NAMESPACE)
            .namespace("dc", DC_NAMESPACE),
        |reader, element| reader.field(*element, FieldKind::TextList, format!("dc:{element}")),
    )
}

/// Create a registry with the built-in readers registered.
///
/// Currently that is `oai_dc` only.
#[must_use]
pub fn create_default_registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    registry.register_reader(OAI_DC_PREFIX, oai_dc_reader());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataReader;
    use roxmltree::Document;

    const DC: &str = r#"<metadata xmlns="http://www.openarchives.org/OAI/2.0/">
      <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"
                 xmlns:dc="http://purl.org/dc/elements/1.1/">
        <dc:title>Kijken in het brein: Over de mogelijkheden van neuromarketing</dc:title>
        <dc:creator>Smidts, A.</dc:creator>
        <dc:subject>neuromarketing</dc:subject>
        <dc:subject>marketing</dc:subject>
        <dc:date>2002-10-25</dc:date>
        <dc:identifier>http://hdl.handle.net/1765/308</dc:identifier>
        <dc:language>nl</dc:language>
      </oai_dc:dc>
    </metadata>"#;

    #[test]
    fn test_oai_dc_reader() {
        let doc = Document::parse(DC).unwrap();
        let metadata = oai_dc_reader().read(doc.root_element()).unwrap();

        assert_eq!(metadata.tag, "{http://www.openarchives.org/OAI/2.0/oai_dc/}dc");
        assert_eq!(
            metadata.get_field("title"),
            ["Kijken in het brein: Over de mogelijkheden van neuromarketing"]
        );
        assert_eq!(metadata.get_field("subject"), ["neuromarketing", "marketing"]);
        assert_eq!(metadata.first("language"), Some("nl"));
        assert!(metadata.get_field("rights").is_empty());
        assert_eq!(metadata.fields.len(), DC_ELEMENTS.len());
    }

    #[test]
    fn test_oai_dc_reader_rejects_other_payload() {
        let xml = r#"<metadata><mods xmlns="http://www.loc.gov/mods/v3"/></metadata>"#;
        let doc = Document::parse(xml).unwrap();
        assert!(oai_dc_reader().read(doc.root_element()).is_err());
    }

    #[test]
    fn test_create_default_registry() {
        let registry = create_default_registry();
        assert!(registry.has_reader(OAI_DC_PREFIX));
        assert_eq!(registry.prefixes(), vec![OAI_DC_PREFIX]);
    }
}
