use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taxii_testlab_client::{ClientConfig, Credentials, RequestTemplate};
use taxii_testlab_core::testlab::{
    READ_ONLY_COLLECTION_ID, READ_WRITE_COLLECTION_ID, WRITE_ONLY_COLLECTION_ID,
};
use taxii_testlab_core::{CompareDepth, MatchStrategy, ValidationOptions};

use crate::SuiteError;

pub const TAXII_MEDIA_TYPE: &str = "application/taxii+json";
pub const TAXII_VERSION: &str = "version=2.1";

/// Media type the server must echo in `Content-Type`.
#[must_use]
pub fn full_media_type() -> String {
    format!("{TAXII_MEDIA_TYPE};{TAXII_VERSION}")
}

/// Everything a run needs to know about the server under test.
///
/// Loaded from an optional YAML file; unset keys keep the TestLab defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteSettings {
    pub url: String,
    pub proxy: Option<String>,
    pub discovery: String,
    pub api_root: String,
    pub read_only: String,
    pub write_only: String,
    pub read_write: String,
    pub username: String,
    pub password: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub match_strategy: MatchStrategy,
    pub compare_depth: CompareDepth,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            url: "https://127.0.0.1:8000/".to_string(),
            proxy: None,
            discovery: "taxii2".to_string(),
            api_root: "api1".to_string(),
            read_only: READ_ONLY_COLLECTION_ID.to_string(),
            write_only: WRITE_ONLY_COLLECTION_ID.to_string(),
            read_write: READ_WRITE_COLLECTION_ID.to_string(),
            username: String::new(),
            password: String::new(),
            connect_timeout_secs: 5,
            timeout_secs: 10,
            match_strategy: MatchStrategy::default(),
            compare_depth: CompareDepth::default(),
        }
    }
}

/// Values given on the command line; `Some` wins over the file.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SettingsOverrides {
    pub url: Option<String>,
    pub proxy: Option<String>,
    pub discovery: Option<String>,
    pub api_root: Option<String>,
    pub read_only: Option<String>,
    pub write_only: Option<String>,
    pub read_write: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub match_strategy: Option<MatchStrategy>,
    pub compare_depth: Option<CompareDepth>,
}

impl SuiteSettings {
    /// # Errors
    /// Returns [`SuiteError::Settings`] for malformed YAML or unknown keys.
    pub fn from_yaml_str(raw: &str) -> Result<Self, SuiteError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
            .map_err(|err| SuiteError::Settings(format!("invalid settings file: {err}")))
    }

    /// # Errors
    /// Returns [`SuiteError::Settings`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            SuiteError::Settings(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }

    #[must_use]
    pub fn apply(mut self, overrides: SettingsOverrides) -> Self {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        set(&mut self.url, overrides.url);
        if overrides.proxy.is_some() {
            self.proxy = overrides.proxy;
        }
        set(&mut self.discovery, overrides.discovery);
        set(&mut self.api_root, overrides.api_root);
        set(&mut self.read_only, overrides.read_only);
        set(&mut self.write_only, overrides.write_only);
        set(&mut self.read_write, overrides.read_write);
        set(&mut self.username, overrides.username);
        set(&mut self.password, overrides.password);
        set(&mut self.connect_timeout_secs, overrides.connect_timeout_secs);
        set(&mut self.timeout_secs, overrides.timeout_secs);
        set(&mut self.match_strategy, overrides.match_strategy);
        set(&mut self.compare_depth, overrides.compare_depth);
        self
    }

    /// # Errors
    /// Returns [`SuiteError::Settings`] when a required value is empty or a
    /// timeout is zero.
    pub fn validate(&self) -> Result<(), SuiteError> {
        let required = [
            ("url", &self.url),
            ("discovery", &self.discovery),
            ("api_root", &self.api_root),
            ("read_only", &self.read_only),
            ("write_only", &self.write_only),
            ("read_write", &self.read_write),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SuiteError::Settings(format!("{name} MUST NOT be empty")));
            }
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(SuiteError::Settings(format!("url `{}` is not an http(s) URL", self.url)));
        }
        if self.connect_timeout_secs == 0 || self.timeout_secs == 0 {
            return Err(SuiteError::Settings("timeouts MUST be at least one second".to_string()));
        }
        Ok(())
    }

    /// Discovery path with a leading and trailing slash.
    #[must_use]
    pub fn discovery_path(&self) -> String {
        normalize_endpoint(&self.discovery)
    }

    #[must_use]
    pub fn api_root_path(&self) -> String {
        normalize_endpoint(&self.api_root)
    }

    #[must_use]
    pub fn collections_path(&self) -> String {
        format!("{}collections/", self.api_root_path())
    }

    #[must_use]
    pub fn collection_path(&self, collection_id: &str) -> String {
        format!("{}{collection_id}/", self.collections_path())
    }

    #[must_use]
    pub fn objects_path(&self, collection_id: &str) -> String {
        format!("{}objects/", self.collection_path(collection_id))
    }

    #[must_use]
    pub fn object_path(&self, collection_id: &str, object_id: &str) -> String {
        format!("{}{object_id}/", self.objects_path(collection_id))
    }

    #[must_use]
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions { strategy: self.match_strategy, depth: self.compare_depth }
    }

    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.url).with_proxy(self.proxy.clone()).with_timeouts(
            Duration::from_secs(self.connect_timeout_secs),
            Duration::from_secs(self.timeout_secs),
        )
    }

    #[must_use]
    pub fn request_template(&self) -> RequestTemplate {
        RequestTemplate::new(&self.url, Credentials::new(&self.username, &self.password))
    }
}

/// `taxii2`, `/taxii2` and `taxii2/` all become `/taxii2/`.
#[must_use]
pub fn normalize_endpoint(name: &str) -> String {
    let trimmed = name.trim().trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    format!("/{trimmed}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_normalized_to_leading_and_trailing_slash() {
        assert_eq!(normalize_endpoint("taxii2"), "/taxii2/");
        assert_eq!(normalize_endpoint("/api1"), "/api1/");
        assert_eq!(normalize_endpoint("api1/"), "/api1/");
        assert_eq!(normalize_endpoint("/"), "/");
    }

    #[test]
    fn resource_paths_nest_under_the_api_root() {
        let settings = SuiteSettings::default();
        assert_eq!(settings.discovery_path(), "/taxii2/");
        assert_eq!(settings.collections_path(), "/api1/collections/");
        assert_eq!(
            settings.object_path("c1", "indicator--1"),
            "/api1/collections/c1/objects/indicator--1/"
        );
    }

    #[test]
    fn yaml_keys_override_defaults_and_flags_override_yaml() {
        let yaml = "url: https://taxii.example:9443/\napi_root: /shared\nmatch_strategy: keyed\n";
        let settings = SuiteSettings::from_yaml_str(yaml)
            .unwrap_or_else(|err| panic!("settings should parse: {err}"));
        assert_eq!(settings.api_root_path(), "/shared/");
        assert_eq!(settings.match_strategy, MatchStrategy::Keyed);
        assert_eq!(settings.discovery, "taxii2");

        let settings = settings.apply(SettingsOverrides {
            url: Some("http://localhost:8000".to_string()),
            compare_depth: Some(CompareDepth::Full),
            ..SettingsOverrides::default()
        });
        assert_eq!(settings.url, "http://localhost:8000");
        assert_eq!(settings.compare_depth, CompareDepth::Full);
        assert_eq!(settings.match_strategy, MatchStrategy::Keyed);
    }

    #[test]
    fn unknown_yaml_keys_are_rejected() {
        let err = SuiteSettings::from_yaml_str("colour: blue\n").err();
        assert!(matches!(err, Some(SuiteError::Settings(message)) if message.contains("colour")));
    }

    #[test]
    fn validation_rejects_empty_values_and_zero_timeouts() {
        assert!(SuiteSettings::default().validate().is_ok());
        let settings = SuiteSettings { api_root: " ".to_string(), ..SuiteSettings::default() };
        assert!(settings.validate().is_err());
        let settings = SuiteSettings { timeout_secs: 0, ..SuiteSettings::default() };
        assert!(settings.validate().is_err());
        let settings = SuiteSettings { url: "ftp://x/".to_string(), ..SuiteSettings::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn media_type_carries_the_version_parameter() {
        assert_eq!(full_media_type(), "application/taxii+json;version=2.1");
    }
}
