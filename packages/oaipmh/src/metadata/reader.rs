//! Metadata reader trait and the declarative schema reader.

use std::collections::HashMap;

use roxmltree::Node;

use crate::error::{OaiError, Result};
use crate::types::Metadata;
use crate::xml::{clark_name, element_children, fragment, get_text};

/// Turns the `<metadata>` element of a record into a `Metadata` value.
///
/// Plain functions and closures with the signature
/// `Fn(Node<'_, '_>) -> Result<Metadata>` are readers too.
pub trait MetadataReader: Send + Sync {
    /// Decode the payload inside `metadata` (the `<metadata>` element).
    fn read(&self, metadata: Node<'_, '_>) -> Result<Metadata>;
}

impl<F> MetadataReader for F
where
    F: Fn(Node<'_, '_>) -> Result<Metadata> + Send + Sync,
{
    fn read(&self, metadata: Node<'_, '_>) -> Result<Metadata> {
        self(metadata)
    }
}

/// The single element child of `<metadata>`.
pub fn payload_root<'a, 'input>(metadata: Node<'a, 'input>) -> Result<Node<'a, 'input>> {
    element_children(metadata)
        .next()
        .ok_or_else(|| OaiError::MetadataParse("empty <metadata> element".to_string()))
}

/// How many values a field keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The first value only.
    Text,
    /// Every value in document order.
    TextList,
}

#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    kind: FieldKind,
    path: String,
}

/// A reader driven by field declarations instead of code.
///
/// Paths are `/`-separated prefixed element names evaluated from the
/// payload root; a final `@name` step selects an attribute.
///
/// # Examples
/// ```
/// use oaipmh_harvester::metadata::{FieldKind, MetadataReader, SchemaReader};
/// use roxmltree::Document;
///
/// let reader = SchemaReader::new("ex:item")
///     .namespace("ex", "urn:example")
///     .field("title", FieldKind::Text, "ex:title");
///
/// let xml = r#"<metadata><item xmlns="urn:example"><title>Hi</title></item></metadata>"#;
/// let doc = Document::parse(xml).unwrap();
/// let metadata = reader.read(doc.root_element()).unwrap();
/// assert_eq!(metadata.get_field("title"), ["Hi"]);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaReader {
    root: String,
    namespaces: HashMap<String, String>,
    fields: Vec<FieldSpec>,
}

impl SchemaReader {
    /// Create a reader whose payload root is the prefixed name `root`.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            namespaces: HashMap::new(),
            fields: Vec::new(),
        }
    }

    /// Declare a namespace prefix used in the root and field paths.
    #[must_use]
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Declare a field.
    #[must_use]
    pub fn field(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        path: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            path: path.into(),
        });
        self
    }

    /// Names of the declared fields, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    fn resolve<'s>(&'s self, qname: &'s str) -> Result<(Option<&'s str>, &'s str)> {
        match qname.split_once(':') {
            Some((prefix, local)) => self
                .namespaces
                .get(prefix)
                .map(|uri| (Some(uri.as_str()), local))
                .ok_or_else(|| OaiError::UnknownNamespacePrefix(prefix.to_string())),
            None => Ok((None, qname)),
        }
    }

    fn matches(&self, node: Node<'_, '_>, qname: &str) -> Result<bool> {
        let (namespace, local) = self.resolve(qname)?;
        Ok(node.is_element()
            && node.tag_name().name() == local
            && node.tag_name().namespace() == namespace)
    }

    fn values(&self, root: Node<'_, '_>, path: &str) -> Result<Vec<String>> {
        let mut current = vec![root];
        let mut values = Vec::new();

        let steps: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        for (i, step) in steps.iter().enumerate() {
            if let Some(attr) = step.strip_prefix('@') {
                if i + 1 != steps.len() {
                    return Err(OaiError::MetadataParse(format!(
                        "attribute step '{step}' must end the path '{path}'"
                    )));
                }
                values.extend(
                    current
                        .iter()
                        .filter_map(|n| n.attribute(attr))
                        .map(str::to_string),
                );
                return Ok(values);
            }

            let mut next = Vec::new();
            for node in &current {
                for child in element_children(*node) {
                    if self.matches(child, step)? {
                        next.push(child);
                    }
                }
            }
            current = next;
        }

        values.extend(
            current
                .into_iter()
                .map(get_text)
                .filter(|text| !text.is_empty()),
        );
        Ok(values)
    }
}

impl MetadataReader for SchemaReader {
    fn read(&self, metadata: Node<'_, '_>) -> Result<Metadata> {
        let root = payload_root(metadata)?;
        if !self.matches(root, &self.root)? {
            return Err(OaiError::MetadataParse(format!(
                "expected <{}>, found <{}>",
                self.root,
                clark_name(root)
            )));
        }

        let mut result = Metadata::new(clark_name(root));
        result.xml = fragment(root);

        for field in &self.fields {
            let mut values = self.values(root, &field.path)?;
            if field.kind == FieldKind::Text {
                values.truncate(1);
            }
            result.fields.insert(field.name.clone(), values);
        }

        Ok(result)
    }
}
