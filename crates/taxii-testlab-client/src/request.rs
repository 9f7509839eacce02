use serde::Serialize;

use crate::config::Credentials;

/// Which credentials a probe presents.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    None,
    Wrong,
    #[default]
    Correct,
}

/// Immutable base for every request of a run: server root and credentials.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RequestTemplate {
    base_url: String,
    credentials: Credentials,
}

impl RequestTemplate {
    #[must_use]
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), credentials }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Start a fresh request for `path`, which is appended to the base URL.
    #[must_use]
    pub fn probe(&self, path: &str) -> ProbeRequest<'_> {
        ProbeRequest {
            template: self,
            path: path.to_string(),
            query: Vec::new(),
            accept: None,
            auth: AuthMode::Correct,
        }
    }
}

/// Builder for a single probe; consumed by [`ProbeRequest::build`].
#[derive(Debug, Clone)]
pub struct ProbeRequest<'a> {
    template: &'a RequestTemplate,
    path: String,
    query: Vec<(String, String)>,
    accept: Option<String>,
    auth: AuthMode,
}

impl ProbeRequest<'_> {
    #[must_use]
    pub fn accept(mut self, media_type: &str) -> Self {
        self.accept = Some(media_type.to_string());
        self
    }

    #[must_use]
    pub fn auth(mut self, mode: AuthMode) -> Self {
        self.auth = mode;
        self
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn queries<I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.query.extend(pairs);
        self
    }

    #[must_use]
    pub fn without_trailing_slash(mut self) -> Self {
        let trimmed = self.path.trim_end_matches('/').len();
        self.path.truncate(trimmed);
        self
    }

    #[must_use]
    pub fn build(self) -> PreparedRequest {
        let authorization = match self.auth {
            AuthMode::None => None,
            AuthMode::Wrong => Some(self.template.credentials.with_wrong_password().basic_header()),
            AuthMode::Correct => Some(self.template.credentials.basic_header()),
        };
        PreparedRequest {
            url: format!("{}{}", self.template.base_url, self.path),
            path: self.path,
            query: self.query,
            accept: self.accept,
            authorization,
            auth: self.auth,
        }
    }
}

/// A fully derived GET request, ready for a [`crate::Transport`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PreparedRequest {
    pub url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// `Some("")` sends an empty `Accept` header; `None` leaves it to the transport.
    pub accept: Option<String>,
    pub authorization: Option<String>,
    pub auth: AuthMode,
}

impl PreparedRequest {
    /// URL with its query string, for logs.
    #[must_use]
    pub fn display_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> RequestTemplate {
        RequestTemplate::new("https://127.0.0.1:8000/", Credentials::new("user", "pass"))
    }

    #[test]
    fn probes_start_from_a_clean_baseline() {
        let template = template();
        let first = template
            .probe("/api1/collections/c1/objects/")
            .accept("application/foo")
            .auth(AuthMode::None)
            .query("match[version]", "all")
            .build();
        let second = template.probe("/api1/collections/c1/objects/").build();

        assert_eq!(first.authorization, None);
        assert_eq!(first.display_url(), "https://127.0.0.1:8000/api1/collections/c1/objects/?match[version]=all");
        assert_eq!(second.accept, None);
        assert!(second.query.is_empty());
        assert_eq!(second.auth, AuthMode::Correct);
        assert_eq!(second.authorization.as_deref(), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn wrong_auth_sends_a_different_password() {
        let request = template().probe("/taxii2/").auth(AuthMode::Wrong).build();
        assert!(request.authorization.is_some());
        assert_ne!(request.authorization, template().probe("/taxii2/").build().authorization);
    }

    #[test]
    fn trailing_slash_can_be_removed() {
        let request = template().probe("/taxii2/").without_trailing_slash().build();
        assert_eq!(request.url, "https://127.0.0.1:8000/taxii2");
        assert_eq!(request.path, "/taxii2");
    }

    #[test]
    fn query_pairs_keep_their_order_in_the_display_url() {
        let request = template()
            .probe("/api1/")
            .queries(vec![
                ("match[id]".to_string(), "a,b".to_string()),
                ("match[version]".to_string(), "last".to_string()),
            ])
            .build();
        assert_eq!(request.display_url(), "https://127.0.0.1:8000/api1/?match[id]=a,b&match[version]=last");
    }
}
