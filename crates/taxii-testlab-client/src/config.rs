use std::fmt::{Debug, Formatter};
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// Connection settings shared by every probe of a run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub proxy: Option<String>,
    /// Bounds both the TCP connect and the TLS handshake.
    pub connect_timeout: Duration,
    pub overall_timeout: Duration,
    pub max_body_bytes: u64,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            proxy: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|value| !value.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, overall: Duration) -> Self {
        self.connect_timeout = connect;
        self.overall_timeout = overall;
        self
    }
}

/// HTTP Basic credentials. The password never appears in `Debug` output.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: &str, password: &str) -> Self {
        Self { username: username.to_string(), password: password.to_string() }
    }

    /// Same user, password guaranteed to differ from the real one.
    #[must_use]
    pub fn with_wrong_password(&self) -> Self {
        let password = if self.password == "foo" { "foo-wrong" } else { "foo" };
        Self::new(&self.username, password)
    }

    #[must_use]
    pub fn basic_header(&self) -> String {
        let pair = format!("{}:{}", self.username, self.password);
        format!("Basic {}", general_purpose::STANDARD.encode(pair))
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
