//! OAI-PMH Harvester - a client for the Open Archives Initiative Protocol
//! for Metadata Harvesting, version 2.0.
//!
//! The crate speaks the six protocol verbs against a repository base URL,
//! validates arguments before anything is sent, encodes dates at the
//! repository's declared granularity and follows resumption tokens lazily.
//! Metadata payloads are decoded by readers registered per metadata prefix.
//!
//! # Example
//!
//! ```no_run
//! use oaipmh_harvester::{create_default_registry, Arguments, Client};
//!
//! let client = Client::new("http://dspace.ubib.eur.nl/oai/")?
//!     .with_registry(create_default_registry());
//!
//! let args = Arguments::new().metadata_prefix("oai_dc").set(Some("1:2"));
//! for record in client.list_records(&args)? {
//!     let record = record?;
//!     println!("{}", record.header.identifier());
//! }
//! # Ok::<(), oaipmh_harvester::OaiError>(())
//! ```
//!
//! # Architecture
//!
//! - [`datestamp`]: Datestamp granularity and codec
//! - [`validation`]: Verbs, arguments and per-verb argument rules
//! - [`metadata`]: Metadata readers and the per-session registry
//! - [`response`]: Response envelope and verb parsers
//! - [`paginator`]: Lazy resumption-token iteration
//! - [`client`]: The verb-level client
//! - [`http`]: HTTP transport with retries
//! - [`xml`]: Namespace-aware XML helpers
//! - [`types`]: Protocol data types
//! - [`config`]: Constants and client configuration
//! - [`error`]: Error types and Result alias
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod client;
pub mod config;
pub mod datestamp;
pub mod error;
pub mod http;
pub mod metadata;
pub mod paginator;
pub mod response;
pub mod types;
pub mod validation;
pub mod xml;

// Re-export commonly used items
pub use client::Client;
pub use config::ClientConfig;
pub use datestamp::Granularity;
pub use error::{ErrorCode, OaiError, ProtocolError, Result};
pub use http::{HttpTransport, Transport};
pub use metadata::{create_default_registry, MetadataReader, MetadataRegistry};
pub use types::{Header, Identify, Metadata, MetadataFormat, Record, SetInfo};
pub use validation::{Arguments, Verb};
