//! HTTP transport for OAI-PMH requests.
//!
//! The client talks to repositories through the [`Transport`] trait so the
//! protocol logic does not depend on how bytes are fetched. [`HttpTransport`]
//! is the blocking `reqwest` implementation, with retries for transient
//! failures.

use std::io::Read;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use url::Url;

use crate::config::{ClientConfig, Credentials, MAX_RETRY_AFTER_SECS, OAI_NAMESPACE, USER_AGENT};
use crate::error::{OaiError, Result};
use crate::response::parse_document;
use crate::xml::is_element;

/// Performs one OAI-PMH request and returns the raw response body.
pub trait Transport {
    /// Send `params` (including `verb`) to the repository at `base_url`.
    fn send(&self, base_url: &Url, params: &[(String, String)]) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, base_url: &Url, params: &[(String, String)]) -> Result<Vec<u8>> {
        (**self).send(base_url, params)
    }
}

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` configured with the timeout and user agent.
pub fn create_client(config: &ClientConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(config.timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Blocking HTTP transport.
///
/// Sends a POST form by default and a GET query when `force_http_get` is
/// set. Retries `503 Service Unavailable` (honouring `Retry-After`), other
/// 5xx responses and connection or timeout errors with exponential
/// backoff.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    force_http_get: bool,
    credentials: Option<Credentials>,
    max_retries: u32,
    retry_base_delay: Duration,
    max_response_size: u64,
}

impl HttpTransport {
    /// Create a transport from the client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(config)?,
            force_http_get: config.force_http_get,
            credentials: config.credentials.clone(),
            max_retries: config.max_retries.max(1),
            retry_base_delay: config.retry_base_delay,
            max_response_size: config.max_response_size,
        })
    }

    fn build_request(&self, base_url: &Url, params: &[(String, String)]) -> RequestBuilder {
        let request = if self.force_http_get {
            self.client.get(base_url.clone()).query(params)
        } else {
            self.client.post(base_url.clone()).form(params)
        };

        match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(&c.password)),
            None => request,
        }
    }

    fn read_body(&self, response: Response) -> Result<Vec<u8>> {
        if let Some(size) = response.content_length() {
            if size > self.max_response_size {
                return Err(OaiError::ResponseTooLarge {
                    size,
                    limit: self.max_response_size,
                });
            }
        }

        // Chunked bodies carry no length
        read_capped(response, self.max_response_size)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        // 500ms, 1000ms, 2000ms, ...
        self.retry_base_delay * (1 << (attempt - 1).min(16))
    }
}

/// Read at most `limit` bytes; one byte more is `ResponseTooLarge`.
fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut body)?;

    let size = body.len() as u64;
    if size > limit {
        return Err(OaiError::ResponseTooLarge { size, limit });
    }
    Ok(body)
}

impl Transport for HttpTransport {
    fn send(&self, base_url: &Url, params: &[(String, String)]) -> Result<Vec<u8>> {
        let mut last_error: Option<String> = None;
        let mut retry_after: Option<Duration> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = retry_after.take().unwrap_or_else(|| self.backoff(attempt));
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after delay");
                thread::sleep(delay);
            }

            tracing::debug!(url = %base_url, ?params, post = !self.force_http_get, "Sending request");

            match self.build_request(base_url, params).send() {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::SERVICE_UNAVAILABLE {
                        retry_after = parse_retry_after(&response);
                        tracing::warn!(
                            status = %status,
                            retry_after_secs = ?retry_after.map(|d| d.as_secs()),
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            "Repository busy, will retry"
                        );
                        last_error = Some(format!("Server error: {status}"));
                        continue;
                    }

                    if status.is_server_error() {
                        tracing::warn!(
                            status = %status,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            "Server error, will retry"
                        );
                        last_error = Some(format!("Server error: {status}"));
                        continue;
                    }

                    if !status.is_success() {
                        // Some repositories send their <error> envelope with a 4xx status.
                        let body = self.read_body(response)?;
                        if is_oai_envelope(&body) {
                            return Ok(body);
                        }
                        return Err(OaiError::HttpStatus {
                            status: status.as_u16(),
                            url: base_url.to_string(),
                        });
                    }

                    return self.read_body(response);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        tracing::warn!(
                            error = %e,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            "Connection error, will retry"
                        );
                        last_error = Some(e.to_string());
                        continue;
                    }
                    return Err(OaiError::Http(e));
                }
            }
        }

        Err(OaiError::RetriesExhausted {
            attempts: self.max_retries,
            message: last_error.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Seconds from a `Retry-After` header, capped.
///
/// The HTTP-date form is not interpreted; backoff applies instead.
fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
}

fn is_oai_envelope(body: &[u8]) -> bool {
    std::str::from_utf8(body)
        .ok()
        .and_then(|text| parse_document(text).ok())
        .is_some_and(|doc| is_element(doc.root_element(), OAI_NAMESPACE, "OAI-PMH"))
}

/// Convert a response body to text, replacing invalid UTF-8.
///
/// # Arguments
/// * `bytes` - Raw response body
/// * `context` - What the body is, for the warning
pub fn bytes_to_string(bytes: &[u8], context: &str) -> String {
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                context,
                valid_up_to = e.utf8_error().valid_up_to(),
                "Response is not valid UTF-8, replacing invalid sequences"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IDENTIFY: &str = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><Identify/></OAI-PMH>"#;

    fn params(verb: &str) -> Vec<(String, String)> {
        vec![("verb".to_string(), verb.to_string())]
    }

    fn config(server: &MockServer) -> ClientConfig {
        ClientConfig::new(&server.uri())
            .unwrap()
            .with_retry_base_delay(Duration::from_millis(1))
    }

    /// The blocking client must be built and used off the async runtime.
    async fn send(config: ClientConfig, verb: &'static str) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || {
            HttpTransport::new(&config)?.send(&config.base_url, &params(verb))
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_create_client() {
        let config = ClientConfig::new("http://example.org/oai").unwrap();
        assert!(create_client(&config).is_ok());
    }

    #[test]
    fn test_bytes_to_string() {
        assert_eq!(bytes_to_string(b"<a/>", "test"), "<a/>");
        assert_eq!(bytes_to_string(b"a\xffb", "test"), "a\u{fffd}b");
    }

    #[test]
    fn test_is_oai_envelope() {
        assert!(is_oai_envelope(IDENTIFY.as_bytes()));
        assert!(!is_oai_envelope(b"<html/>"));
        assert!(!is_oai_envelope(b"not xml"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_post_form_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("verb=Identify"))
            .respond_with(ResponseTemplate::new(200).set_body_string(IDENTIFY))
            .expect(1)
            .mount(&server)
            .await;

        let body = send(config(&server), "Identify")
            .await
            .unwrap();
        assert_eq!(body, IDENTIFY.as_bytes());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_when_forced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("verb", "ListSets"))
            .respond_with(ResponseTemplate::new(200).set_body_string(IDENTIFY))
            .expect(1)
            .mount(&server)
            .await;

        let result = send(config(&server).with_force_http_get(true), "ListSets")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retries_503_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(IDENTIFY))
            .mount(&server)
            .await;

        let body = send(config(&server).with_max_retries(3), "Identify")
            .await
            .unwrap();
        assert_eq!(body, IDENTIFY.as_bytes());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retries_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let err = send(config(&server).with_max_retries(2), "Identify")
            .await
            .unwrap_err();
        assert!(matches!(err, OaiError::RetriesExhausted { attempts: 2, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_client_error_status_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("<html>not found</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = send(config(&server), "Identify")
            .await
            .unwrap_err();
        assert!(matches!(err, OaiError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_protocol_error_body_with_4xx_status_is_returned() {
        let server = MockServer::start().await;
        let body = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><error code="badVerb">bad</error></OAI-PMH>"#;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(body))
            .mount(&server)
            .await;

        let result = send(config(&server), "Identify")
            .await
            .unwrap();
        assert_eq!(result, body.as_bytes());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_response_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(IDENTIFY))
            .mount(&server)
            .await;

        let err = send(config(&server).with_max_response_size(10), "Identify")
            .await
            .unwrap_err();
        assert!(matches!(err, OaiError::ResponseTooLarge { limit: 10, .. }));
    }

    #[test]
    fn test_read_capped_stops_at_limit() {
        let err = read_capped(std::io::repeat(b'x'), 1024).unwrap_err();
        assert!(matches!(
            err,
            OaiError::ResponseTooLarge {
                size: 1025,
                limit: 1024
            }
        ));

        let body = read_capped(&b"<OAI-PMH/>"[..], 10).unwrap();
        assert_eq!(body, b"<OAI-PMH/>");
    }
}
