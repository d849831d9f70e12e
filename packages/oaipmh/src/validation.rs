//! Verbs, request arguments and the per-verb argument rules.
//!
//! Every request is checked here before anything goes over the wire. An
//! argument explicitly set to `None` counts as absent everywhere: it is
//! neither validated nor sent.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::datestamp::{decode, encode, truncate, Granularity};
use crate::error::{OaiError, Result};

/// The six OAI-PMH request verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    GetRecord,
    Identify,
    ListIdentifiers,
    ListMetadataFormats,
    ListRecords,
    ListSets,
}

impl Verb {
    /// The verb as sent in the `verb` parameter.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetRecord => "GetRecord",
            Self::Identify => "Identify",
            Self::ListIdentifiers => "ListIdentifiers",
            Self::ListMetadataFormats => "ListMetadataFormats",
            Self::ListRecords => "ListRecords",
            Self::ListSets => "ListSets",
        }
    }

    /// Whether responses to this verb may be split over resumption tokens.
    #[must_use]
    pub fn is_paginated(&self) -> bool {
        matches!(
            self,
            Self::ListIdentifiers | Self::ListRecords | Self::ListSets
        )
    }

    /// Argument rules for this verb.
    #[must_use]
    pub fn rules(&self) -> &'static [(&'static str, ArgumentRule)] {
        use ArgumentRule::{Exclusive, Optional, Required};

        match self {
            Self::GetRecord => &[("identifier", Required), ("metadataPrefix", Required)],
            Self::Identify => &[],
            Self::ListIdentifiers | Self::ListRecords => &[
                ("from", Optional),
                ("until", Optional),
                ("set", Optional),
                ("metadataPrefix", Required),
                ("resumptionToken", Exclusive),
            ],
            Self::ListMetadataFormats => &[("identifier", Optional)],
            Self::ListSets => &[("resumptionToken", Exclusive)],
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = OaiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GetRecord" => Ok(Self::GetRecord),
            "Identify" => Ok(Self::Identify),
            "ListIdentifiers" => Ok(Self::ListIdentifiers),
            "ListMetadataFormats" => Ok(Self::ListMetadataFormats),
            "ListRecords" => Ok(Self::ListRecords),
            "ListSets" => Ok(Self::ListSets),
            other => Err(OaiError::UnknownVerb(other.to_string())),
        }
    }
}

/// How a verb treats one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentRule {
    /// Must be present unless the exclusive argument is.
    Required,
    /// May be present.
    Optional,
    /// Must be the only argument when present.
    Exclusive,
}

/// Value of a request argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    Date(NaiveDateTime),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for ArgValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value)
    }
}

/// Names of the arguments that carry datestamps.
const DATE_ARGUMENTS: [&str; 2] = ["from", "until"];

/// Request arguments, keyed by their wire name.
///
/// # Examples
/// ```
/// use oaipmh_harvester::validation::{validate, Arguments, Verb};
///
/// let args = Arguments::new().metadata_prefix("oai_dc").set(Some("2:7"));
/// assert!(validate(Verb::ListRecords, &args).is_ok());
///
/// let bad = Arguments::new().text("foo", "bar");
/// assert!(validate(Verb::ListIdentifiers, &bad).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    values: BTreeMap<String, Option<ArgValue>>,
}

impl Arguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an argument; `None` marks it as explicitly absent.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Option<ArgValue>) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, Some(ArgValue::Text(value.into())))
    }

    #[must_use]
    pub fn date(self, name: impl Into<String>, value: NaiveDateTime) -> Self {
        self.with(name, Some(ArgValue::Date(value)))
    }

    #[must_use]
    pub fn unset(self, name: impl Into<String>) -> Self {
        self.with(name, None)
    }

    #[must_use]
    pub fn identifier(self, identifier: impl Into<String>) -> Self {
        self.text("identifier", identifier)
    }

    #[must_use]
    pub fn metadata_prefix(self, prefix: impl Into<String>) -> Self {
        self.text("metadataPrefix", prefix)
    }

    #[must_use]
    pub fn from(self, from: Option<NaiveDateTime>) -> Self {
        self.with("from", from.map(ArgValue::Date))
    }

    #[must_use]
    pub fn until(self, until: Option<NaiveDateTime>) -> Self {
        self.with("until", until.map(ArgValue::Date))
    }

    #[must_use]
    pub fn set(self, set_spec: Option<&str>) -> Self {
        self.with("set", set_spec.map(ArgValue::from))
    }

    #[must_use]
    pub fn resumption_token(self, token: impl Into<String>) -> Self {
        self.text("resumptionToken", token)
    }

    /// Value of a present argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// Text value of a present argument.
    #[must_use]
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ArgValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether the argument is present with a value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Present arguments in name order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v)))
    }

    /// Whether any present argument is a datestamp.
    #[must_use]
    pub fn has_dates(&self) -> bool {
        DATE_ARGUMENTS.iter().any(|name| self.contains(name))
    }

    /// Wire parameters for `verb`, dates encoded at `granularity`.
    ///
    /// Text dates are decoded and re-encoded so every outgoing datestamp
    /// has the session granularity.
    pub fn to_params(&self, verb: Verb, granularity: Granularity) -> Result<Vec<(String, String)>> {
        let mut params = vec![("verb".to_string(), verb.as_str().to_string())];

        for (name, value) in self.present() {
            let encoded = match value {
                ArgValue::Date(ts) => encode(ts, granularity),
                ArgValue::Text(text) if DATE_ARGUMENTS.contains(&name) => {
                    encode(&decode(text)?, granularity)
                }
                ArgValue::Text(text) => text.clone(),
            };
            params.push((name.to_string(), encoded));
        }

        Ok(params)
    }
}

/// Validate `args` against the rules for `verb`.
///
/// # Errors
/// `OaiError::BadArgument` for an unknown argument, a datestamp given for a
/// text argument, an exclusive argument combined with others, a missing
/// required argument, an undecodable date or `from` later than `until` even
/// at day granularity.
pub fn validate(verb: Verb, args: &Arguments) -> Result<()> {
    let rules = verb.rules();
    let rule_for = |name: &str| {
        rules
            .iter()
            .find(|(arg, _)| *arg == name)
            .map(|(_, rule)| *rule)
    };

    let present: Vec<&str> = args.present().map(|(name, _)| name).collect();

    let unknown: Vec<String> = present
        .iter()
        .filter(|name| rule_for(name).is_none())
        .map(|name| (*name).to_string())
        .collect();
    if !unknown.is_empty() {
        return Err(bad_argument(verb, unknown, "unknown argument"));
    }

    let misplaced: Vec<String> = args
        .present()
        .filter(|(name, value)| {
            matches!(value, ArgValue::Date(_)) && !DATE_ARGUMENTS.contains(name)
        })
        .map(|(name, _)| name.to_string())
        .collect();
    if !misplaced.is_empty() {
        return Err(bad_argument(verb, misplaced, "expects text, not a datestamp"));
    }

    if let Some(exclusive) = present
        .iter()
        .find(|name| rule_for(name) == Some(ArgumentRule::Exclusive))
    {
        if present.len() > 1 {
            return Err(bad_argument(
                verb,
                present.iter().map(|n| (*n).to_string()).collect(),
                &format!("{exclusive} cannot be combined with other arguments"),
            ));
        }
        return Ok(());
    }

    let missing: Vec<String> = rules
        .iter()
        .filter(|(name, rule)| *rule == ArgumentRule::Required && !args.contains(name))
        .map(|(name, _)| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(bad_argument(verb, missing, "missing required argument"));
    }

    // The coarsest granularity; the session one is checked at send time.
    check_date_range(verb, args, Granularity::Day)
}

/// Reject `from` later than `until` once both are encoded at `granularity`.
///
/// Under `Day`, two times on the same day form a valid range.
pub fn check_date_range(verb: Verb, args: &Arguments, granularity: Granularity) -> Result<()> {
    let date_of = |name: &str| -> Result<Option<NaiveDateTime>> {
        match args.get(name) {
            None => Ok(None),
            Some(ArgValue::Date(ts)) => Ok(Some(*ts)),
            Some(ArgValue::Text(text)) => decode(text)
                .map(Some)
                .map_err(|_| bad_argument(verb, vec![name.to_string()], "not a valid datestamp")),
        }
    };

    if let (Some(from), Some(until)) = (date_of("from")?, date_of("until")?) {
        if truncate(&from, granularity) > truncate(&until, granularity) {
            return Err(bad_argument(
                verb,
                vec!["from".to_string(), "until".to_string()],
                "from is later than until",
            ));
        }
    }

    Ok(())
}

fn bad_argument(verb: Verb, arguments: Vec<String>, reason: &str) -> OaiError {
    OaiError::BadArgument {
        verb,
        arguments,
        reason: reason.to_string(),
    }
}
