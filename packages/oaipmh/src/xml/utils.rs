//! XML utility functions for navigating and extracting data from DOM trees.
//!
//! All lookups are namespace aware: an element matches only when both its
//! namespace URI and its local name match.

use roxmltree::Node;

use crate::config::OAI_NAMESPACE;

/// Get the element name in Clark notation (`{namespace}local`).
///
/// Elements without a namespace yield the bare local name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use oaipmh_harvester::xml::clark_name;
///
/// let xml = r#"<dc xmlns="http://www.openarchives.org/OAI/2.0/oai_dc/"/>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(
///     clark_name(doc.root_element()),
///     "{http://www.openarchives.org/OAI/2.0/oai_dc/}dc"
/// );
/// ```
pub fn clark_name(node: Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace() {
        Some(ns) => format!("{{{ns}}}{}", tag.name()),
        None => tag.name().to_string(),
    }
}

/// Check if a node is an element with the given namespace and local name.
pub fn is_element(node: Node<'_, '_>, namespace: &str, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(namespace)
}

/// Find the first child element with the given namespace and local name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use oaipmh_harvester::xml::find_child;
///
/// let xml = r#"<root xmlns="urn:a"><child1/><child2/></root>"#;
/// let doc = Document::parse(xml).unwrap();
/// let root = doc.root_element();
///
/// assert!(find_child(root, "urn:a", "child1").is_some());
/// assert!(find_child(root, "urn:b", "child1").is_none());
/// ```
pub fn find_child<'a, 'input>(
    node: Node<'a, 'input>,
    namespace: &str,
    local: &str,
) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| is_element(*child, namespace, local))
}

/// Find all child elements with the given namespace and local name.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    namespace: &'a str,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| is_element(*child, namespace, local))
}

/// Find the first OAI-PMH namespaced child element.
pub fn oai_child<'a, 'input>(node: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    find_child(node, OAI_NAMESPACE, local)
}

/// Find all OAI-PMH namespaced child elements.
pub fn oai_children<'a, 'input>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    find_children(node, OAI_NAMESPACE, local)
}

/// Get the text content of a node, trimmed.
///
/// Concatenates all descendant text so that character data split by
/// comments or CDATA sections is kept whole.
pub fn get_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Trimmed text of the first OAI-PMH child, or `None` if absent or blank.
pub fn oai_child_text(node: Node<'_, '_>, local: &str) -> Option<String> {
    oai_child(node, local)
        .map(get_text)
        .filter(|text| !text.is_empty())
}

/// Trimmed, non-blank texts of all OAI-PMH children with the name, in order.
pub fn oai_children_text(node: Node<'_, '_>, local: &str) -> Vec<String> {
    node.children()
        .filter(|child| is_element(*child, OAI_NAMESPACE, local))
        .map(get_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Get all element children of a node.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// The source text of an element, markup included.
///
/// Used for the opaque fragments (`<about>`, `<description>`) that are
/// passed through without interpretation.
pub fn fragment(node: Node<'_, '_>) -> String {
    let input = node.document().input_text();
    input
        .get(node.range())
        .map(str::to_string)
        .unwrap_or_default()
}
