//! Core data types for the client.
//!
//! These types represent what an OAI-PMH repository returns: record
//! headers, metadata payloads, records, repository identity, sets and
//! metadata formats.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::datestamp::Granularity;

/// Identifier, datestamp, set membership and deletion status of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    identifier: String,
    datestamp: NaiveDateTime,
    set_spec: Vec<String>,
    deleted: bool,
}

impl Header {
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        datestamp: NaiveDateTime,
        set_spec: Vec<String>,
        deleted: bool,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            datestamp,
            set_spec,
            deleted,
        }
    }

    /// Unique identifier of the item.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Date of creation, modification or deletion, in UTC.
    #[must_use]
    pub fn datestamp(&self) -> NaiveDateTime {
        self.datestamp
    }

    /// Set membership in server order.
    #[must_use]
    pub fn set_spec(&self) -> &[String] {
        &self.set_spec
    }

    /// Whether the repository reports the item as deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// A metadata payload decoded into named, repeatable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Payload root element in Clark notation (`{namespace}local`).
    pub tag: String,

    /// Field values in document order per field.
    pub fields: BTreeMap<String, Vec<String>>,

    /// Source XML of the payload root element.
    #[serde(skip)]
    pub xml: String,
}

impl Metadata {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: BTreeMap::new(),
            xml: String::new(),
        }
    }

    /// Values of a field; empty when the field is absent.
    #[must_use]
    pub fn get_field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of a field.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get_field(name).first().map(String::as_str)
    }

    /// Append a value to a field.
    pub fn push_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }
}

/// Header, optional metadata and `<about>` fragments of one item.
///
/// Metadata is always `None` for deleted items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub header: Header,
    pub metadata: Option<Metadata>,
    pub about: Vec<String>,
}

impl Record {
    /// Build a record, dropping metadata when the header is deleted.
    #[must_use]
    pub fn new(header: Header, metadata: Option<Metadata>, about: Vec<String>) -> Self {
        let metadata = if header.is_deleted() { None } else { metadata };
        Self {
            header,
            metadata,
            about,
        }
    }
}

/// How a repository keeps track of deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletedRecord {
    No,
    Transient,
    Persistent,
}

impl DeletedRecord {
    /// Parse the `<deletedRecord>` value.
    #[must_use]
    pub fn from_declared(value: &str) -> Option<Self> {
        match value.trim() {
            "no" => Some(Self::No),
            "transient" => Some(Self::Transient),
            "persistent" => Some(Self::Persistent),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Transient => "transient",
            Self::Persistent => "persistent",
        }
    }
}

/// Repository information from an Identify response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identify {
    pub repository_name: String,
    pub base_url: String,
    pub protocol_version: String,
    pub admin_emails: Vec<String>,
    pub earliest_datestamp: NaiveDateTime,
    pub deleted_record: DeletedRecord,
    pub granularity: Granularity,
    pub compression: Vec<String>,

    /// `<description>` containers as source XML.
    pub descriptions: Vec<String>,
}

/// A metadata format a repository can disseminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataFormat {
    pub prefix: String,
    pub schema: String,
    pub namespace: String,
}

/// A set in the repository's set hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetInfo {
    pub spec: String,
    pub name: String,

    /// `<setDescription>` containers as source XML; empty when none.
    pub descriptions: Vec<String>,
}

/// Flow-control state returned with a partial list.
///
/// The token is opaque: it is only ever sent back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumptionToken {
    pub token: String,
    pub complete_list_size: Option<u64>,
    pub cursor: Option<u64>,
    pub expiration_date: Option<String>,
}

/// Items of one list response plus the token for the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub resumption: Option<ResumptionToken>,
}

impl<T> Page<T> {
    /// A page that ends the list.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            resumption: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn header(deleted: bool) -> Header {
        let ts = NaiveDate::from_ymd_opt(2003, 4, 15)
            .unwrap()
            .and_hms_opt(10, 18, 51)
            .unwrap();
        Header::new("hdl:1765/308", ts, vec!["1:2".to_string()], deleted)
    }

    #[test]
    fn test_header_accessors() {
        let h = header(false);
        assert_eq!(h.identifier(), "hdl:1765/308");
        assert_eq!(h.set_spec(), ["1:2"]);
        assert!(!h.is_deleted());
    }

    #[test]
    fn test_deleted_record_drops_metadata() {
        let record = Record::new(header(true), Some(Metadata::new("dc")), Vec::new());
        assert!(record.metadata.is_none());

        let record = Record::new(header(false), Some(Metadata::new("dc")), Vec::new());
        assert!(record.metadata.is_some());
    }

    #[test]
    fn test_metadata_fields() {
        let mut metadata = Metadata::new("dc");
        metadata.push_value("creator", "Smidts, A.");
        metadata.push_value("creator", "Hoefnagels, M.");

        assert_eq!(metadata.get_field("creator").len(), 2);
        assert_eq!(metadata.first("creator"), Some("Smidts, A."));
        assert!(metadata.get_field("title").is_empty());
    }

    #[test]
    fn test_deleted_record_policy() {
        assert_eq!(DeletedRecord::from_declared("no"), Some(DeletedRecord::No));
        assert_eq!(
            DeletedRecord::from_declared(" persistent "),
            Some(DeletedRecord::Persistent)
        );
        assert_eq!(DeletedRecord::from_declared("sometimes"), None);
        assert_eq!(DeletedRecord::Transient.as_str(), "transient");
    }
}
