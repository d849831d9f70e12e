//! Parsing of OAI-PMH response envelopes into typed values.
//!
//! Every response is an `<OAI-PMH>` document holding either one or more
//! `<error>` elements or a single element named after the verb. The
//! parsers here check the envelope, surface embedded errors as
//! [`ProtocolError`]s and decode the verb payload.

use roxmltree::{Document, Node, ParsingOptions};

use crate::config::OAI_NAMESPACE;
use crate::datestamp::{decode, granularity_of, Granularity};
use crate::error::{ErrorCode, OaiError, ProtocolError, Result};
use crate::metadata::MetadataRegistry;
use crate::types::{
    DeletedRecord, Header, Identify, MetadataFormat, Page, Record, ResumptionToken, SetInfo,
};
use crate::validation::Verb;
use crate::xml::{
    fragment, get_text, is_element, oai_child, oai_child_text, oai_children, oai_children_text,
};

/// Parse response text into a document.
pub fn parse_document(xml: &str) -> Result<Document<'_>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Ok(Document::parse_with_options(xml, options)?)
}

/// Check the envelope and return the element named after `verb`.
///
/// # Errors
/// * `OaiError::Protocol` for the first `<error>` element of the response
/// * `OaiError::MalformedResponse` when the root or verb element is missing
pub fn parse_envelope<'a, 'input>(
    doc: &'a Document<'input>,
    verb: Verb,
) -> Result<Node<'a, 'input>> {
    let root = doc.root_element();
    if !is_element(root, OAI_NAMESPACE, "OAI-PMH") {
        return Err(malformed(
            verb,
            format!("root element is <{}>, not <OAI-PMH>", root.tag_name().name()),
        ));
    }

    let errors: Vec<ProtocolError> = oai_children(root, "error")
        .map(|node| ProtocolError {
            code: ErrorCode::from_code(node.attribute("code").unwrap_or_default()),
            message: get_text(node),
        })
        .collect();

    if let Some(first) = errors.first() {
        for err in &errors {
            tracing::warn!(verb = %verb, code = %err.code, message = %err.message, "Repository reported an error");
        }
        return Err(first.clone().into());
    }

    oai_child(root, verb.as_str())
        .ok_or_else(|| malformed(verb, format!("missing <{verb}> element")))
}

/// Parse an Identify response.
pub fn parse_identify(xml: &str) -> Result<Identify> {
    let verb = Verb::Identify;
    let doc = parse_document(xml)?;
    let node = parse_envelope(&doc, verb)?;

    let earliest = required_text(node, verb, "earliestDatestamp")?;
    let earliest_datestamp = decode(&earliest).map_err(|_| {
        malformed(verb, format!("earliestDatestamp '{earliest}' is not a datestamp"))
    })?;

    let deleted = required_text(node, verb, "deletedRecord")?;
    let deleted_record = DeletedRecord::from_declared(&deleted)
        .ok_or_else(|| malformed(verb, format!("unknown deletedRecord policy '{deleted}'")))?;

    let granularity = Granularity::from_declared(&required_text(node, verb, "granularity")?)?;
    if granularity_of(&earliest)? != granularity {
        tracing::warn!(
            earliest_datestamp = %earliest,
            granularity = granularity.as_str(),
            "earliestDatestamp does not match the declared granularity"
        );
    }

    Ok(Identify {
        repository_name: required_text(node, verb, "repositoryName")?,
        base_url: required_text(node, verb, "baseURL")?,
        protocol_version: required_text(node, verb, "protocolVersion")?,
        admin_emails: oai_children_text(node, "adminEmail"),
        earliest_datestamp,
        deleted_record,
        granularity,
        compression: oai_children_text(node, "compression"),
        descriptions: oai_children(node, "description").map(fragment).collect(),
    })
}

/// Parse a ListMetadataFormats response.
pub fn parse_metadata_formats(xml: &str) -> Result<Vec<MetadataFormat>> {
    let verb = Verb::ListMetadataFormats;
    let doc = parse_document(xml)?;
    let node = parse_envelope(&doc, verb)?;

    oai_children(node, "metadataFormat")
        .map(|format| {
            Ok(MetadataFormat {
                prefix: required_text(format, verb, "metadataPrefix")?,
                schema: required_text(format, verb, "schema")?,
                namespace: required_text(format, verb, "metadataNamespace")?,
            })
        })
        .collect()
}

/// Parse one page of a ListSets response.
pub fn parse_sets(xml: &str) -> Result<Page<SetInfo>> {
    let verb = Verb::ListSets;
    let doc = parse_document(xml)?;
    let node = parse_envelope(&doc, verb)?;

    let items = oai_children(node, "set")
        .map(|set| {
            Ok(SetInfo {
                spec: required_text(set, verb, "setSpec")?,
                name: required_text(set, verb, "setName")?,
                descriptions: oai_children(set, "setDescription").map(fragment).collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(page(verb, node, items))
}

/// Parse one page of a ListIdentifiers response.
pub fn parse_headers(xml: &str) -> Result<Page<Header>> {
    let verb = Verb::ListIdentifiers;
    let doc = parse_document(xml)?;
    let node = parse_envelope(&doc, verb)?;

    let items = oai_children(node, "header")
        .map(|header| parse_header(header, verb))
        .collect::<Result<Vec<_>>>()?;

    Ok(page(verb, node, items))
}

/// Parse one page of a ListRecords response.
///
/// Payloads are decoded by the reader registered for `metadata_prefix`.
pub fn parse_records(
    xml: &str,
    registry: &MetadataRegistry,
    metadata_prefix: &str,
) -> Result<Page<Record>> {
    let verb = Verb::ListRecords;
    let doc = parse_document(xml)?;
    let node = parse_envelope(&doc, verb)?;

    let items = oai_children(node, "record")
        .map(|record| parse_record_node(record, verb, registry, metadata_prefix))
        .collect::<Result<Vec<_>>>()?;

    Ok(page(verb, node, items))
}

/// Parse a GetRecord response.
pub fn parse_record(
    xml: &str,
    registry: &MetadataRegistry,
    metadata_prefix: &str,
) -> Result<Record> {
    let verb = Verb::GetRecord;
    let doc = parse_document(xml)?;
    let node = parse_envelope(&doc, verb)?;

    let record = oai_child(node, "record")
        .ok_or_else(|| malformed(verb, "missing <record> element".to_string()))?;
    parse_record_node(record, verb, registry, metadata_prefix)
}

fn parse_record_node(
    node: Node<'_, '_>,
    verb: Verb,
    registry: &MetadataRegistry,
    metadata_prefix: &str,
) -> Result<Record> {
    let header_node = oai_child(node, "header")
        .ok_or_else(|| malformed(verb, "record without <header>".to_string()))?;
    let header = parse_header(header_node, verb)?;

    let metadata = if header.is_deleted() {
        None
    } else {
        oai_child(node, "metadata")
            .map(|m| registry.read_metadata(metadata_prefix, m))
            .transpose()?
    };

    let about = oai_children(node, "about").map(fragment).collect();

    Ok(Record::new(header, metadata, about))
}

fn parse_header(node: Node<'_, '_>, verb: Verb) -> Result<Header> {
    let identifier = required_text(node, verb, "identifier")?;
    let raw_datestamp = required_text(node, verb, "datestamp")?;
    let datestamp = decode(&raw_datestamp).map_err(|_| {
        malformed(
            verb,
            format!("header {identifier} has invalid datestamp '{raw_datestamp}'"),
        )
    })?;
    let deleted = node.attribute("status") == Some("deleted");

    Ok(Header::new(
        identifier,
        datestamp,
        oai_children_text(node, "setSpec"),
        deleted,
    ))
}

/// Extract the resumption token of a list element.
///
/// An absent element and an element with empty text both end the list.
pub fn parse_resumption_token(list: Node<'_, '_>) -> Option<ResumptionToken> {
    let node = oai_child(list, "resumptionToken")?;
    // Sent back verbatim, surrounding whitespace included
    let token: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    if token.trim().is_empty() {
        return None;
    }

    Some(ResumptionToken {
        token,
        complete_list_size: node
            .attribute("completeListSize")
            .and_then(|v| v.trim().parse().ok()),
        cursor: node.attribute("cursor").and_then(|v| v.trim().parse().ok()),
        expiration_date: node.attribute("expirationDate").map(str::to_string),
    })
}

fn page<T>(verb: Verb, list: Node<'_, '_>, items: Vec<T>) -> Page<T> {
    let resumption = parse_resumption_token(list);
    tracing::debug!(
        verb = %verb,
        items = items.len(),
        has_more = resumption.is_some(),
        cursor = ?resumption.as_ref().and_then(|r| r.cursor),
        complete_list_size = ?resumption.as_ref().and_then(|r| r.complete_list_size),
        "Parsed page"
    );
    Page { items, resumption }
}

fn required_text(node: Node<'_, '_>, verb: Verb, local: &str) -> Result<String> {
    oai_child_text(node, local).ok_or_else(|| {
        malformed(
            verb,
            format!("missing <{local}> in <{}>", node.tag_name().name()),
        )
    })
}

fn malformed(verb: Verb, detail: String) -> OaiError {
    OaiError::MalformedResponse { verb, detail }
}
