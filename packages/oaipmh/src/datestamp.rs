//! Datestamp encoding at the granularity a repository declares.
//!
//! OAI-PMH knows two granularities: day (`YYYY-MM-DD`) and seconds
//! (`YYYY-MM-DDThh:mm:ssZ`, always UTC). Every date argument in a session is
//! sent at the repository's granularity.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};

use crate::error::{OaiError, Result};

const DAY_FORMAT: &str = "%Y-%m-%d";
const SECOND_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Datestamp precision supported by a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// `YYYY-MM-DD`
    Day,
    /// `YYYY-MM-DDThh:mm:ssZ`
    Second,
}

impl Granularity {
    /// Parse the `<granularity>` value from an Identify response.
    ///
    /// # Examples
    /// ```
    /// use oaipmh_harvester::datestamp::Granularity;
    ///
    /// assert_eq!(Granularity::from_declared("YYYY-MM-DD").unwrap(), Granularity::Day);
    /// assert!(Granularity::from_declared("YYYY").is_err());
    /// ```
    pub fn from_declared(declared: &str) -> Result<Self> {
        match declared.trim() {
            "YYYY-MM-DD" => Ok(Self::Day),
            "YYYY-MM-DDThh:mm:ssZ" => Ok(Self::Second),
            other => Err(OaiError::InvalidGranularity(other.to_string())),
        }
    }

    /// The declaration as written in an Identify response.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "YYYY-MM-DD",
            Self::Second => "YYYY-MM-DDThh:mm:ssZ",
        }
    }
}

impl Serialize for Granularity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Encode a timestamp at the given granularity.
///
/// Under `Day` the time of day is dropped; this is what the protocol
/// requires, not a loss to report.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use oaipmh_harvester::datestamp::{encode, Granularity};
///
/// let ts = NaiveDate::from_ymd_opt(2003, 4, 10).unwrap().and_hms_opt(14, 0, 0).unwrap();
/// assert_eq!(encode(&ts, Granularity::Day), "2003-04-10");
/// assert_eq!(encode(&ts, Granularity::Second), "2003-04-10T14:00:00Z");
/// ```
#[must_use]
pub fn encode(timestamp: &NaiveDateTime, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => timestamp.format(DAY_FORMAT).to_string(),
        Granularity::Second => timestamp.format(SECOND_FORMAT).to_string(),
    }
}

/// The instant `timestamp` denotes once encoded at `granularity`.
#[must_use]
pub fn truncate(timestamp: &NaiveDateTime, granularity: Granularity) -> NaiveDateTime {
    match granularity {
        Granularity::Day => timestamp.date().and_hms_opt(0, 0, 0).unwrap_or(*timestamp),
        Granularity::Second => timestamp.with_nanosecond(0).unwrap_or(*timestamp),
    }
}

/// Decode a datestamp in either protocol form.
///
/// A day-only value decodes to midnight.
pub fn decode(datestamp: &str) -> Result<NaiveDateTime> {
    let value = datestamp.trim();

    if let Ok(ts) = NaiveDateTime::parse_from_str(value, SECOND_FORMAT) {
        return Ok(ts);
    }

    NaiveDate::parse_from_str(value, DAY_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| OaiError::InvalidDatestamp(datestamp.to_string()))
}

/// Granularity implied by the shape of a datestamp string.
pub fn granularity_of(datestamp: &str) -> Result<Granularity> {
    let value = datestamp.trim();
    decode(value)?;
    if value.contains('T') {
        Ok(Granularity::Second)
    } else {
        Ok(Granularity::Day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_from_declared() {
        assert_eq!(
            Granularity::from_declared("YYYY-MM-DDThh:mm:ssZ").unwrap(),
            Granularity::Second
        );
        assert_eq!(
            Granularity::from_declared(" YYYY-MM-DD\n").unwrap(),
            Granularity::Day
        );
    }

    #[test]
    fn test_from_declared_invalid() {
        let err = Granularity::from_declared("YYYY-MM-DDThh:mm:ss.sZ").unwrap_err();
        assert!(matches!(err, OaiError::InvalidGranularity(_)));
    }

    #[test]
    fn test_encode_day_truncates_time() {
        assert_eq!(encode(&ts(2003, 4, 10, 14, 0, 0), Granularity::Day), "2003-04-10");
        assert_eq!(encode(&ts(2004, 6, 17, 15, 30, 0), Granularity::Day), "2004-06-17");
    }

    #[test]
    fn test_encode_second_keeps_time() {
        assert_eq!(
            encode(&ts(2003, 4, 10, 14, 0, 0), Granularity::Second),
            "2003-04-10T14:00:00Z"
        );
    }

    #[test]
    fn test_truncate_matches_encoding() {
        let afternoon = ts(2003, 4, 10, 14, 0, 0);
        assert_eq!(truncate(&afternoon, Granularity::Day), ts(2003, 4, 10, 0, 0, 0));
        assert_eq!(truncate(&afternoon, Granularity::Second), afternoon);
        assert_eq!(
            truncate(&afternoon.with_nanosecond(500_000_000).unwrap(), Granularity::Second),
            afternoon
        );
    }

    #[test]
    fn test_decode_both_forms() {
        assert_eq!(decode("2003-04-15T10:18:51Z").unwrap(), ts(2003, 4, 15, 10, 18, 51));
        assert_eq!(decode("2003-04-15").unwrap(), ts(2003, 4, 15, 0, 0, 0));
    }

    #[test]
    fn test_decode_invalid() {
        assert!(decode("15-04-2003").is_err());
        assert!(decode("2003-04-15T10:18:51").is_err());
        assert!(decode("2003-13-01").is_err());
        assert!(decode("").is_err());
    }

    #[test]
    fn test_granularity_of() {
        assert_eq!(granularity_of("2003-04-15").unwrap(), Granularity::Day);
        assert_eq!(
            granularity_of("2003-04-15T10:18:51Z").unwrap(),
            Granularity::Second
        );
        assert!(granularity_of("yesterday").is_err());
    }
}
