use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use crate::model::{CollectionResource, StixObject, Timestamp};
use crate::CoreError;

/// One object identity with its full version history.
///
/// Versions are kept ascending by `modified`; two versions of the same identity
/// never share a timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedIdentity {
    id: String,
    object_type: String,
    versions: Vec<StixObject>,
}

impl VersionedIdentity {
    /// Build an identity from its versions, in any order.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] when no versions are supplied, when versions
    /// disagree on id or type, when a version has no parseable `modified` value, or
    /// when two versions share a timestamp.
    pub fn new(mut versions: Vec<StixObject>) -> Result<Self, CoreError> {
        let Some(first) = versions.first() else {
            return Err(CoreError::Validation(
                "an identity MUST have at least one version".to_string(),
            ));
        };
        let Some(id) = first.id().map(str::to_string) else {
            return Err(CoreError::Validation("version is missing an id".to_string()));
        };
        let object_type = first.object_type().to_string();

        for version in &versions {
            if version.id() != Some(id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "version id {:?} does not belong to identity {id}",
                    version.id()
                )));
            }
            if version.object_type() != object_type {
                return Err(CoreError::Validation(format!(
                    "identity {id} mixes types {object_type} and {}",
                    version.object_type()
                )));
            }
            if version.modified().is_none() {
                return Err(CoreError::Validation(format!(
                    "a version of {id} has no modified timestamp"
                )));
            }
        }

        versions.sort_by_key(StixObject::modified);
        for pair in versions.windows(2) {
            if pair[0].modified() == pair[1].modified() {
                return Err(CoreError::Validation(format!(
                    "identity {id} has two versions modified at {}",
                    pair[0].modified().map(|ts| ts.to_string()).unwrap_or_default()
                )));
            }
        }

        Ok(Self { id, object_type, versions })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    #[must_use]
    pub fn versions(&self) -> &[StixObject] {
        &self.versions
    }

    #[must_use]
    pub fn first(&self) -> &StixObject {
        &self.versions[0]
    }

    #[must_use]
    pub fn last(&self) -> &StixObject {
        &self.versions[self.versions.len() - 1]
    }

    /// Position of the version modified exactly at `timestamp`.
    #[must_use]
    pub fn position_of(&self, timestamp: Timestamp) -> Option<usize> {
        self.versions.binary_search_by_key(&Some(timestamp), StixObject::modified).ok()
    }
}

/// Immutable catalog of every identity the suite knows about, keyed by id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferencePopulation {
    identities: BTreeMap<String, VersionedIdentity>,
}

impl ReferencePopulation {
    /// # Errors
    /// Returns [`CoreError::Validation`] when two identities share an id.
    pub fn new(identities: Vec<VersionedIdentity>) -> Result<Self, CoreError> {
        let mut by_id = BTreeMap::new();
        for identity in identities {
            let id = identity.id.clone();
            if by_id.insert(id.clone(), identity).is_some() {
                return Err(CoreError::Validation(format!("identity {id} is defined twice")));
            }
        }
        Ok(Self { identities: by_id })
    }

    /// Group a flat list of object versions into identities.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] under the same conditions as
    /// [`VersionedIdentity::new`].
    pub fn from_objects(objects: Vec<StixObject>) -> Result<Self, CoreError> {
        let mut grouped: BTreeMap<String, Vec<StixObject>> = BTreeMap::new();
        for object in objects {
            let Some(id) = object.id().map(str::to_string) else {
                return Err(CoreError::Validation("object is missing an id".to_string()));
            };
            grouped.entry(id).or_default().push(object);
        }
        let identities =
            grouped.into_values().map(VersionedIdentity::new).collect::<Result<Vec<_>, _>>()?;
        Self::new(identities)
    }

    /// Identities ascending by identifier.
    pub fn identities(&self) -> impl Iterator<Item = &VersionedIdentity> {
        self.identities.values()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&VersionedIdentity> {
        self.identities.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    #[must_use]
    pub fn version_count(&self) -> usize {
        self.identities.values().map(|identity| identity.versions.len()).sum()
    }

    /// All versions in identity-then-timestamp order.
    pub fn all_versions(&self) -> impl Iterator<Item = &StixObject> {
        self.identities.values().flat_map(|identity| identity.versions.iter())
    }

    /// Digest over the canonical JSON of every version, in population order.
    ///
    /// # Errors
    /// Returns [`CoreError::Encode`] when a version cannot be serialized.
    pub fn fingerprint(&self) -> Result<String, CoreError> {
        let mut hasher = Sha256::new();
        for version in self.all_versions() {
            let encoded = serde_json::to_vec(version)
                .map_err(|err| CoreError::Encode(format!("failed to encode version: {err}")))?;
            hasher.update(&encoded);
            hasher.update(b"\n");
        }
        Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AccessScope {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::WriteOnly => "write-only",
            Self::ReadWrite => "read-write",
        }
    }
}

/// A collection resource together with the identities it exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionFixture {
    pub resource: CollectionResource,
    pub members: BTreeSet<String>,
}

impl CollectionFixture {
    #[must_use]
    pub fn new(resource: CollectionResource) -> Self {
        Self { resource, members: BTreeSet::new() }
    }

    #[must_use]
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.extend(members.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.resource.id
    }

    /// `None` for a collection that grants neither read nor write.
    #[must_use]
    pub fn access_scope(&self) -> Option<AccessScope> {
        match (self.resource.can_read, self.resource.can_write) {
            (true, true) => Some(AccessScope::ReadWrite),
            (true, false) => Some(AccessScope::ReadOnly),
            (false, true) => Some(AccessScope::WriteOnly),
            (false, false) => None,
        }
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommonProperties, Indicator};

    fn ts(value: &str) -> Timestamp {
        Timestamp::parse(value).unwrap_or_else(|err| panic!("fixture timestamp: {err}"))
    }

    fn mk_indicator(id: &str, modified: &str) -> StixObject {
        let mut common = CommonProperties::new("indicator", id, ts("2018-08-08T01:51:01.123Z"));
        common.modified = ts(modified);
        StixObject::Indicator(Indicator {
            common,
            name: None,
            description: None,
            indicator_types: vec!["compromised".to_string()],
            pattern: "[ ipv4-addr:value = '10.0.0.1' ]".to_string(),
            pattern_type: Some("stix".to_string()),
            valid_from: ts("2018-08-08T01:51:01.123Z"),
            valid_until: None,
            kill_chain_phases: Vec::new(),
        })
    }

    #[test]
    fn identity_sorts_versions_by_modified() {
        let identity = VersionedIdentity::new(vec![
            mk_indicator("indicator--a", "2018-08-08T01:53:01.345Z"),
            mk_indicator("indicator--a", "2018-08-08T01:51:01.123Z"),
            mk_indicator("indicator--a", "2018-08-08T01:52:01.234Z"),
        ])
        .unwrap_or_else(|err| panic!("identity should build: {err}"));

        assert_eq!(identity.first().modified(), Some(ts("2018-08-08T01:51:01.123Z")));
        assert_eq!(identity.last().modified(), Some(ts("2018-08-08T01:53:01.345Z")));
        assert_eq!(identity.position_of(ts("2018-08-08T01:52:01.234Z")), Some(1));
        assert!(identity.position_of(ts("2018-08-08T01:59:00.000Z")).is_none());
    }

    #[test]
    fn identity_rejects_timestamp_ties() {
        let err = VersionedIdentity::new(vec![
            mk_indicator("indicator--a", "2018-08-08T01:51:01.123Z"),
            mk_indicator("indicator--a", "2018-08-08T01:51:01.123Z"),
        ])
        .err();
        assert!(matches!(err, Some(CoreError::Validation(message)) if message.contains("two versions")));
    }

    #[test]
    fn identity_rejects_mixed_ids_and_empty_history() {
        assert!(VersionedIdentity::new(Vec::new()).is_err());
        assert!(VersionedIdentity::new(vec![
            mk_indicator("indicator--a", "2018-08-08T01:51:01.123Z"),
            mk_indicator("indicator--b", "2018-08-08T01:52:01.123Z"),
        ])
        .is_err());
    }

    #[test]
    fn population_groups_objects_and_iterates_by_id() {
        let population = ReferencePopulation::from_objects(vec![
            mk_indicator("indicator--b", "2018-08-08T01:51:01.123Z"),
            mk_indicator("indicator--a", "2018-08-08T01:52:01.123Z"),
            mk_indicator("indicator--a", "2018-08-08T01:51:01.123Z"),
        ])
        .unwrap_or_else(|err| panic!("population should build: {err}"));

        let ids = population.identities().map(VersionedIdentity::id).collect::<Vec<_>>();
        assert_eq!(ids, vec!["indicator--a", "indicator--b"]);
        assert_eq!(population.version_count(), 3);
    }

    #[test]
    fn population_rejects_duplicate_identities() {
        let a = VersionedIdentity::new(vec![mk_indicator("indicator--a", "2018-08-08T01:51:01.123Z")]);
        let b = VersionedIdentity::new(vec![mk_indicator("indicator--a", "2018-08-08T01:52:01.123Z")]);
        match (a, b) {
            (Ok(a), Ok(b)) => assert!(ReferencePopulation::new(vec![a, b]).is_err()),
            _ => panic!("identities should build"),
        }
    }

    #[test]
    fn fingerprint_is_stable_for_regenerated_population() {
        let build = || {
            ReferencePopulation::from_objects(vec![
                mk_indicator("indicator--a", "2018-08-08T01:51:01.123Z"),
                mk_indicator("indicator--a", "2018-08-08T01:52:01.123Z"),
            ])
            .unwrap_or_else(|err| panic!("population should build: {err}"))
        };
        let first = build().fingerprint();
        let second = build().fingerprint();
        assert!(matches!(&first, Ok(value) if value.starts_with("sha256:")));
        assert_eq!(first, second);
    }

    #[test]
    fn access_scope_follows_read_write_flags() {
        let resource = CollectionResource {
            id: "c1".to_string(),
            title: "c1".to_string(),
            description: None,
            alias: None,
            can_read: false,
            can_write: true,
            media_types: Vec::new(),
        };
        let fixture = CollectionFixture::new(resource).with_members(["indicator--a"]);
        assert_eq!(fixture.access_scope(), Some(AccessScope::WriteOnly));
        assert!(fixture.contains("indicator--a"));

        let closed = CollectionFixture::new(CollectionResource { can_write: false, ..fixture.resource });
        assert_eq!(closed.access_scope(), None);
    }
}
