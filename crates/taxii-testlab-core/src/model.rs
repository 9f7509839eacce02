use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::CoreError;

/// RFC 3339 instant normalized to UTC.
///
/// Rendered with a `Z` suffix and at least millisecond precision, the form used
/// in `match[version]` values. Sub-millisecond digits are kept when present.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Parse an RFC 3339 timestamp.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] when the value is not a valid RFC 3339 instant.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        OffsetDateTime::parse(value.trim(), &Rfc3339)
            .map(|instant| Self(instant.to_offset(UtcOffset::UTC)))
            .map_err(|err| CoreError::Validation(format!("invalid timestamp `{value}`: {err}")))
    }

    #[must_use]
    pub fn as_offset_date_time(self) -> OffsetDateTime {
        self.0
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(instant: OffsetDateTime) -> Self {
        Self(instant.to_offset(UtcOffset::UTC))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let instant = self.0;
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            instant.year(),
            u8::from(instant.month()),
            instant.day(),
            instant.hour(),
            instant.minute(),
            instant.second(),
        )?;
        let nanos = instant.nanosecond();
        if nanos % 1_000_000 == 0 {
            write!(f, ".{:03}Z", nanos / 1_000_000)
        } else {
            let digits = format!("{nanos:09}");
            write!(f, ".{}Z", digits.trim_end_matches('0'))
        }
    }
}

impl Debug for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct KillChainPhase {
    pub kill_chain_name: String,
    pub phase_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ExternalReference {
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Properties shared by every STIX domain object.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CommonProperties {
    #[serde(rename = "type")]
    pub object_type: String,
    pub spec_version: String,
    pub id: String,
    pub created: Timestamp,
    pub modified: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_references: Vec<ExternalReference>,
}

impl CommonProperties {
    #[must_use]
    pub fn new(object_type: &str, id: &str, created: Timestamp) -> Self {
        Self {
            object_type: object_type.to_string(),
            spec_version: "2.1".to_string(),
            id: id.to_string(),
            created,
            modified: created,
            created_by_ref: None,
            lang: None,
            confidence: None,
            labels: Vec::new(),
            external_references: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Indicator {
    #[serde(flatten)]
    pub common: CommonProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indicator_types: Vec<String>,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_type: Option<String>,
    pub valid_from: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kill_chain_phases: Vec<KillChainPhase>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct AttackPattern {
    #[serde(flatten)]
    pub common: CommonProperties,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kill_chain_phases: Vec<KillChainPhase>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ThreatActor {
    #[serde(flatten)]
    pub common: CommonProperties,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threat_actor_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Campaign {
    #[serde(flatten)]
    pub common: CommonProperties,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A decoded STIX object.
///
/// `Unknown` keeps objects whose type tag has no registered decoder; they are
/// carried through untouched and never structurally compared.
#[derive(Debug, Clone, PartialEq)]
pub enum StixObject {
    Indicator(Indicator),
    AttackPattern(AttackPattern),
    ThreatActor(ThreatActor),
    Campaign(Campaign),
    Unknown { object_type: String, value: serde_json::Value },
}

impl StixObject {
    #[must_use]
    pub fn common(&self) -> Option<&CommonProperties> {
        match self {
            Self::Indicator(object) => Some(&object.common),
            Self::AttackPattern(object) => Some(&object.common),
            Self::ThreatActor(object) => Some(&object.common),
            Self::Campaign(object) => Some(&object.common),
            Self::Unknown { .. } => None,
        }
    }

    #[must_use]
    pub fn object_type(&self) -> &str {
        match self {
            Self::Unknown { object_type, .. } => object_type,
            _ => self.common().map_or("", |common| common.object_type.as_str()),
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Unknown { value, .. } => value.get("id").and_then(serde_json::Value::as_str),
            _ => self.common().map(|common| common.id.as_str()),
        }
    }

    #[must_use]
    pub fn modified(&self) -> Option<Timestamp> {
        match self {
            Self::Unknown { value, .. } => value
                .get("modified")
                .and_then(serde_json::Value::as_str)
                .and_then(|raw| Timestamp::parse(raw).ok()),
            _ => self.common().map(|common| common.modified),
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

impl Serialize for StixObject {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Indicator(object) => object.serialize(serializer),
            Self::AttackPattern(object) => object.serialize(serializer),
            Self::ThreatActor(object) => object.serialize(serializer),
            Self::Campaign(object) => object.serialize(serializer),
            Self::Unknown { value, .. } => value.serialize(serializer),
        }
    }
}

impl From<Indicator> for StixObject {
    fn from(value: Indicator) -> Self {
        Self::Indicator(value)
    }
}

impl From<AttackPattern> for StixObject {
    fn from(value: AttackPattern) -> Self {
        Self::AttackPattern(value)
    }
}

impl From<ThreatActor> for StixObject {
    fn from(value: ThreatActor) -> Self {
        Self::ThreatActor(value)
    }
}

impl From<Campaign> for StixObject {
    fn from(value: Campaign) -> Self {
        Self::Campaign(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CollectionResource {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub can_read: bool,
    pub can_write: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct Collections {
    #[serde(default)]
    pub collections: Vec<CollectionResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Discovery {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_roots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ApiRoot {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
    pub max_content_length: u64,
}
