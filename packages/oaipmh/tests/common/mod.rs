//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use oaipmh_harvester::{ClientConfig, OaiError, Result, Transport};
use url::{form_urlencoded, Url};

/// Directory of a fixture repository under `tests/fixtures`.
pub fn fixture_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Serves responses from files named after the sorted, url-encoded query.
///
/// `verb=GetRecord&identifier=hdl:1765/315&metadataPrefix=oai_dc` is read
/// from `identifier=hdl%3A1765%2F315&metadataPrefix=oai_dc&verb=GetRecord.xml`.
pub struct FixtureTransport {
    dir: PathBuf,
    requests: RefCell<Vec<Vec<(String, String)>>>,
}

impl FixtureTransport {
    pub fn new(name: &str) -> Self {
        Self {
            dir: fixture_dir(name),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// File name a request is served from.
    pub fn file_name(params: &[(String, String)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(sorted)
            .finish();
        format!("{query}.xml")
    }

    /// Number of requests served so far.
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Verbs of the requests served so far, in order.
    pub fn verbs(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|params| params.iter().find(|(k, _)| k == "verb"))
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl Transport for FixtureTransport {
    fn send(&self, _base_url: &Url, params: &[(String, String)]) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(params.to_vec());
        let path = self.dir.join(Self::file_name(params));
        fs::read(&path).map_err(|e| {
            OaiError::Io(io::Error::new(
                e.kind(),
                format!("no fixture {}: {e}", path.display()),
            ))
        })
    }
}

/// Configuration for the fake1 repository.
pub fn fake1_config() -> ClientConfig {
    ClientConfig::new("http://dspace.ubib.eur.nl/oai/").unwrap()
}
