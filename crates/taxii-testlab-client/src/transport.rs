use std::borrow::Cow;
use std::collections::BTreeMap;
use std::error::Error as _;
use std::io::Read;

use crate::config::ClientConfig;
use crate::request::PreparedRequest;
use crate::tls::insecure_tls_config;
use crate::TransportError;

/// A server reply. Any HTTP status, including 4xx and 5xx, is a response.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are stored lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self { status, ..Self::default() }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Sends one prepared request and waits for the complete reply.
pub trait Transport {
    /// # Errors
    /// Returns a [`TransportError`] when no HTTP response could be obtained.
    fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError>;
}

impl<T> Transport for &T
where
    T: Transport + ?Sized,
{
    fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        (**self).send(request)
    }
}

/// Blocking HTTP transport backed by a `ureq` agent.
#[derive(Debug)]
pub struct UreqTransport {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl UreqTransport {
    /// # Errors
    /// Returns [`TransportError::Config`] for an invalid proxy URL or TLS setup.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.overall_timeout)
            .tls_config(insecure_tls_config()?);
        if let Some(proxy) = &config.proxy {
            let proxy = ureq::Proxy::new(proxy)
                .map_err(|err| TransportError::Config(format!("invalid proxy `{proxy}`: {err}")))?;
            builder = builder.proxy(proxy);
        }
        Ok(Self { agent: builder.build(), max_body_bytes: config.max_body_bytes })
    }

    fn read_response(
        &self,
        url: &str,
        response: ureq::Response,
    ) -> Result<RawResponse, TransportError> {
        let mut raw = RawResponse::new(response.status());
        for name in response.headers_names() {
            if let Some(value) = response.header(&name) {
                raw.headers.insert(name.to_ascii_lowercase(), value.to_string());
            }
        }
        response
            .into_reader()
            .take(self.max_body_bytes)
            .read_to_end(&mut raw.body)
            .map_err(|err| classify_io(url, &err))?;
        Ok(raw)
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        tracing::debug!(url = %request.display_url(), auth = ?request.auth, accept = ?request.accept, "sending request");

        let mut call = self.agent.get(&request.url);
        for (key, value) in &request.query {
            call = call.query(key, value);
        }
        if let Some(accept) = &request.accept {
            call = call.set("Accept", accept);
        }
        if let Some(authorization) = &request.authorization {
            call = call.set("Authorization", authorization);
        }

        let response = match call.call() {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(classify_transport(&request.url, &transport));
            }
        };
        let raw = self.read_response(&request.url, response)?;
        tracing::trace!(status = raw.status, bytes = raw.body.len(), "response received");
        Ok(raw)
    }
}

fn classify_io(url: &str, err: &std::io::Error) -> TransportError {
    let (url, message) = (url.to_string(), err.to_string());
    match err.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            TransportError::Timeout { url, message }
        }
        _ if err.get_ref().is_some_and(|inner| inner.is::<rustls::Error>()) => {
            TransportError::Tls { url, message }
        }
        _ => TransportError::Io { url, message },
    }
}

fn classify_transport(url: &str, transport: &ureq::Transport) -> TransportError {
    let mut source = transport.source();
    while let Some(cause) = source {
        if cause.is::<rustls::Error>() {
            return TransportError::Tls { url: url.to_string(), message: transport.to_string() };
        }
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            let classified = classify_io(url, io);
            if !matches!(classified, TransportError::Io { .. }) {
                return classified;
            }
        }
        source = cause.source();
    }

    let (url, message) = (url.to_string(), transport.to_string());
    match transport.kind() {
        ureq::ErrorKind::InvalidUrl
        | ureq::ErrorKind::UnknownScheme
        | ureq::ErrorKind::InvalidProxyUrl => TransportError::Config(message),
        ureq::ErrorKind::Dns
        | ureq::ErrorKind::ConnectionFailed
        | ureq::ErrorKind::ProxyConnect
        | ureq::ErrorKind::ProxyUnauthorized => TransportError::Connect { url, message },
        _ => TransportError::Io { url, message },
    }
}
