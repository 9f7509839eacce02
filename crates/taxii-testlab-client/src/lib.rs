//! HTTP transport for probing a TAXII server under test.
//!
//! Requests are derived from an immutable [`RequestTemplate`]; every probe gets
//! its own [`PreparedRequest`] and nothing is carried between probes.

mod config;
mod request;
mod tls;
mod transport;

pub use config::{ClientConfig, Credentials, DEFAULT_CONNECT_TIMEOUT, DEFAULT_OVERALL_TIMEOUT};
pub use request::{AuthMode, PreparedRequest, ProbeRequest, RequestTemplate};
pub use tls::insecure_tls_config;
pub use transport::{RawResponse, Transport, UreqTransport};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum TransportError {
    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },
    #[error("request to {url} timed out: {message}")]
    Timeout { url: String, message: String },
    #[error("TLS failure talking to {url}: {message}")]
    Tls { url: String, message: String },
    #[error("I/O error talking to {url}: {message}")]
    Io { url: String, message: String },
    #[error("client configuration error: {0}")]
    Config(String),
}
