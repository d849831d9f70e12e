//! The verb-level client that ties all components together.

use std::cell::Cell;

use url::Url;

use crate::config::ClientConfig;
use crate::datestamp::Granularity;
use crate::error::{OaiError, Result};
use crate::http::{bytes_to_string, HttpTransport, Transport};
use crate::metadata::{MetadataReader, MetadataRegistry};
use crate::paginator::Paginator;
use crate::response::{
    parse_headers, parse_identify, parse_metadata_formats, parse_record, parse_records, parse_sets,
};
use crate::types::{Header, Identify, Metadata, MetadataFormat, Page, Record, SetInfo};
use crate::validation::{check_date_range, validate, Arguments, Verb};

/// Page-fetch capability borrowed from a client.
pub type Fetch<'c, T> = Box<dyn FnMut(&Arguments) -> Result<Page<T>> + 'c>;

/// Lazy sequence of headers from ListIdentifiers.
pub type Headers<'c> = Paginator<Header, Fetch<'c, Header>>;

/// Lazy sequence of records from ListRecords.
pub type Records<'c> = Paginator<Record, Fetch<'c, Record>>;

/// Lazy sequence of sets from ListSets.
pub type Sets<'c> = Paginator<SetInfo, Fetch<'c, SetInfo>>;

/// An OAI-PMH client session for one repository.
///
/// Every verb validates its arguments, encodes dates at the repository's
/// granularity, sends the request through the transport and parses the
/// response. List verbs return lazy [`Paginator`]s that follow resumption
/// tokens on demand.
///
/// The granularity is learned from Identify the first time a date
/// argument is sent and cached for the session.
pub struct Client<T: Transport = HttpTransport> {
    config: ClientConfig,
    transport: T,
    registry: MetadataRegistry,
    granularity: Cell<Option<Granularity>>,
}

impl Client<HttpTransport> {
    /// Create a client for `base_url` with default settings.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(base_url)?)
    }

    /// Create an HTTP client from a configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Client<T> {
    /// Create a client that sends requests through `transport`.
    ///
    /// The metadata registry starts empty.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let granularity = Cell::new(config.granularity);
        Self {
            config,
            transport,
            registry: MetadataRegistry::new(),
            granularity,
        }
    }

    /// Replace the metadata registry.
    #[must_use]
    pub fn with_registry(mut self, registry: MetadataRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Repository base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    /// The transport requests are sent through.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Register a metadata reader, replacing any reader for the prefix.
    pub fn register_reader(
        &mut self,
        prefix: impl Into<String>,
        reader: impl MetadataReader + 'static,
    ) {
        self.registry.register_reader(prefix, reader);
    }

    /// The session's metadata registry.
    #[must_use]
    pub fn metadata_registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    /// The cached granularity, if known.
    #[must_use]
    pub fn granularity(&self) -> Option<Granularity> {
        self.granularity.get()
    }

    /// Forget the cached granularity; the next date argument re-fetches it.
    pub fn invalidate_granularity(&self) {
        self.granularity.set(None);
    }

    /// Fetch Identify and cache the granularity it declares.
    pub fn update_granularity(&self) -> Result<Granularity> {
        Ok(self.identify()?.granularity)
    }

    fn session_granularity(&self) -> Result<Granularity> {
        match self.granularity.get() {
            Some(granularity) => Ok(granularity),
            None => self.update_granularity(),
        }
    }

    /// Validate, encode and send one request; returns the response text.
    fn request(&self, verb: Verb, args: &Arguments) -> Result<String> {
        validate(verb, args)?;

        // Only date arguments depend on the granularity.
        let granularity = if args.has_dates() {
            let granularity = self.session_granularity()?;
            check_date_range(verb, args, granularity)?;
            granularity
        } else {
            Granularity::Second
        };
        let params = args.to_params(verb, granularity)?;

        let body = self.transport.send(&self.config.base_url, &params)?;
        Ok(bytes_to_string(&body, verb.as_str()))
    }

    /// Identify the repository.
    ///
    /// Always fetches, and refreshes the cached granularity.
    pub fn identify(&self) -> Result<Identify> {
        let xml = self.request(Verb::Identify, &Arguments::new())?;
        let identify = parse_identify(&xml)?;

        if self.granularity.replace(Some(identify.granularity)) != Some(identify.granularity) {
            tracing::info!(
                repository = %identify.repository_name,
                granularity = identify.granularity.as_str(),
                "Negotiated datestamp granularity"
            );
        }
        Ok(identify)
    }

    /// Metadata formats of the repository, or of one item with `identifier`.
    pub fn list_metadata_formats(&self, args: &Arguments) -> Result<Vec<MetadataFormat>> {
        let xml = self.request(Verb::ListMetadataFormats, args)?;
        parse_metadata_formats(&xml)
    }

    /// Fetch a single record (`identifier` and `metadataPrefix`).
    pub fn get_record(&self, args: &Arguments) -> Result<Record> {
        let xml = self.request(Verb::GetRecord, args)?;
        let prefix = args.get_text("metadataPrefix").unwrap_or_default();
        parse_record(&xml, &self.registry, prefix)
    }

    /// Fetch only the metadata of a single record.
    ///
    /// `None` when the record is deleted or carries no payload.
    pub fn get_metadata(&self, args: &Arguments) -> Result<Option<Metadata>> {
        Ok(self.get_record(args)?.metadata)
    }

    /// Lazily list headers.
    ///
    /// Arguments are validated now; requests are made while iterating.
    pub fn list_identifiers(&self, args: &Arguments) -> Result<Headers<'_>> {
        let verb = Verb::ListIdentifiers;
        validate(verb, args)?;

        let fetch: Fetch<'_, Header> = Box::new(move |page_args: &Arguments| {
            let xml = self.request(verb, page_args)?;
            parse_headers(&xml)
        });
        Ok(Paginator::new(verb, args.clone(), fetch))
    }

    /// Lazily list records.
    ///
    /// Needs `metadataPrefix` to pick the reader; to continue from a
    /// resumption token use [`Client::resume_records`].
    pub fn list_records(&self, args: &Arguments) -> Result<Records<'_>> {
        let verb = Verb::ListRecords;
        validate(verb, args)?;

        let prefix = args
            .get_text("metadataPrefix")
            .ok_or_else(|| OaiError::BadArgument {
                verb,
                arguments: vec!["resumptionToken".to_string()],
                reason: "metadataPrefix is unknown; use resume_records to continue from a token"
                    .to_string(),
            })?
            .to_string();

        Ok(self.records(args.clone(), prefix))
    }

    /// Continue a ListRecords harvest from a resumption token.
    ///
    /// `metadata_prefix` selects the reader; it is not sent.
    pub fn resume_records(&self, token: &str, metadata_prefix: &str) -> Result<Records<'_>> {
        let args = Arguments::new().resumption_token(token);
        validate(Verb::ListRecords, &args)?;
        Ok(self.records(args, metadata_prefix.to_string()))
    }

    fn records(&self, initial: Arguments, prefix: String) -> Records<'_> {
        let verb = Verb::ListRecords;
        let fetch: Fetch<'_, Record> = Box::new(move |page_args: &Arguments| {
            let xml = self.request(verb, page_args)?;
            parse_records(&xml, &self.registry, &prefix)
        });
        Paginator::new(verb, initial, fetch)
    }

    /// Lazily list the repository's sets.
    pub fn list_sets(&self, args: &Arguments) -> Result<Sets<'_>> {
        let verb = Verb::ListSets;
        validate(verb, args)?;

        let fetch: Fetch<'_, SetInfo> = Box::new(move |page_args: &Arguments| {
            let xml = self.request(verb, page_args)?;
            parse_sets(&xml)
        });
        Ok(Paginator::new(verb, args.clone(), fetch))
    }
}
