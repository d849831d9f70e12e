//! Error types for the OAI-PMH client.
//!
//! Uses the dual-error pattern: `OaiError` for library consumers with
//! detailed error context, and `ProtocolError` for the `<error>` elements
//! a repository embeds in an otherwise successful response.

use std::fmt;

use thiserror::Error;

use crate::validation::Verb;

/// Error codes defined by OAI-PMH 2.0, section 3.6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// Illegal or missing arguments, or repeated arguments.
    BadArgument,
    /// The resumption token is invalid or expired.
    BadResumptionToken,
    /// The verb is illegal or missing.
    BadVerb,
    /// The metadata format is not supported for the item or repository.
    CannotDisseminateFormat,
    /// The identifier is unknown or illegal in this repository.
    IdDoesNotExist,
    /// The combination of arguments results in an empty list.
    NoRecordsMatch,
    /// No metadata formats are available for the item.
    NoMetadataFormats,
    /// The repository does not support sets.
    NoSetHierarchy,
    /// Any code the protocol does not define, kept verbatim.
    Unknown(String),
}

impl ErrorCode {
    /// Parse the value of an `<error code="...">` attribute.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "badArgument" => Self::BadArgument,
            "badResumptionToken" => Self::BadResumptionToken,
            "badVerb" => Self::BadVerb,
            "cannotDisseminateFormat" => Self::CannotDisseminateFormat,
            "idDoesNotExist" => Self::IdDoesNotExist,
            "noRecordsMatch" => Self::NoRecordsMatch,
            "noMetadataFormats" => Self::NoMetadataFormats,
            "noSetHierarchy" => Self::NoSetHierarchy,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The code as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::BadArgument => "badArgument",
            Self::BadResumptionToken => "badResumptionToken",
            Self::BadVerb => "badVerb",
            Self::CannotDisseminateFormat => "cannotDisseminateFormat",
            Self::IdDoesNotExist => "idDoesNotExist",
            Self::NoRecordsMatch => "noRecordsMatch",
            Self::NoMetadataFormats => "noMetadataFormats",
            Self::NoSetHierarchy => "noSetHierarchy",
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol-level error reported by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ProtocolError {
    /// The error code selected by the `code` attribute.
    pub code: ErrorCode,
    /// Text content of the `<error>` element.
    pub message: String,
}

/// Main error type for the client library.
#[derive(Debug, Error)]
pub enum OaiError {
    /// Request arguments rejected locally, before any network call.
    #[error("Bad argument for {verb} ({}): {reason}", .arguments.join(", "))]
    BadArgument {
        verb: Verb,
        arguments: Vec<String>,
        reason: String,
    },

    /// A verb name outside the protocol.
    #[error("Unknown verb: '{0}'")]
    UnknownVerb(String),

    /// The repository answered with an `<error>` element.
    #[error("OAI-PMH error {0}")]
    Protocol(#[from] ProtocolError),

    /// The response does not have the structure the verb requires.
    #[error("Malformed {verb} response: {detail}")]
    MalformedResponse { verb: Verb, detail: String },

    /// No metadata reader is registered for the prefix.
    #[error("No metadata reader registered for prefix '{0}'")]
    UnknownMetadataFormat(String),

    /// A metadata payload does not match what its reader expects.
    #[error("Metadata parsing failed: {0}")]
    MetadataParse(String),

    /// A schema reader path uses a prefix it never declared.
    #[error("Undeclared namespace prefix '{0}' in metadata field path")]
    UnknownNamespacePrefix(String),

    /// A granularity declaration other than the two defined forms.
    #[error("Invalid granularity: '{0}'. Expected YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ")]
    InvalidGranularity(String),

    /// A datestamp in neither protocol form.
    #[error("Invalid datestamp: '{0}'. Expected YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ")]
    InvalidDatestamp(String),

    /// Repository base URL is unusable.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The repository answered with an HTTP error status.
    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Transient failures persisted through every retry.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Response body exceeded the configured limit.
    #[error("Response too large: {size} bytes exceeds limit of {limit} bytes")]
    ResponseTooLarge { size: u64, limit: u64 },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    YamlSerialization(#[from] serde_yaml_ng::Error),
}

impl OaiError {
    /// The protocol error code, if this is a repository-reported error.
    #[must_use]
    pub fn protocol_code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Protocol(err) => Some(&err.code),
            _ => None,
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, OaiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_round_trip_known() {
        let code = ErrorCode::from_code("idDoesNotExist");
        assert_eq!(code, ErrorCode::IdDoesNotExist);
        assert_eq!(code.as_str(), "idDoesNotExist");
    }

    #[test]
    fn test_error_code_unknown_kept_verbatim() {
        let code = ErrorCode::from_code("somethingElse");
        assert_eq!(code, ErrorCode::Unknown("somethingElse".to_string()));
        assert_eq!(code.to_string(), "somethingElse");
    }

    #[test]
    fn test_protocol_error_display() {
        let err = OaiError::from(ProtocolError {
            code: ErrorCode::NoRecordsMatch,
            message: "nothing here".to_string(),
        });
        assert_eq!(err.to_string(), "OAI-PMH error noRecordsMatch: nothing here");
        assert_eq!(err.protocol_code(), Some(&ErrorCode::NoRecordsMatch));
    }

    #[test]
    fn test_bad_argument_display() {
        let err = OaiError::BadArgument {
            verb: Verb::ListIdentifiers,
            arguments: vec!["foo".to_string()],
            reason: "unknown argument".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Bad argument for ListIdentifiers (foo): unknown argument"
        );
        assert!(err.protocol_code().is_none());
    }
}
