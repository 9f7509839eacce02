//! Deterministic reference data for the TestLab collections.
//!
//! Every run regenerates the same identities, versions and collections from the
//! literals below; nothing is read from disk.

use crate::model::{
    AttackPattern, Campaign, CollectionResource, CommonProperties, ExternalReference, Indicator,
    KillChainPhase, StixObject, ThreatActor, Timestamp,
};
use crate::population::{CollectionFixture, ReferencePopulation};
use crate::CoreError;

pub const INDICATOR_1_ID: &str = "indicator--1efc6673-9d95-46c3-a09c-c29f926da9af";
pub const INDICATOR_2_ID: &str = "indicator--213dea46-8750-4b8b-b988-aae8f86a62d6";
pub const ATTACK_PATTERN_1_ID: &str = "attack-pattern--9a624a80-ac52-49e2-b4ef-6b5e5f26a50d";
pub const THREAT_ACTOR_1_ID: &str = "threat-actor--a6036137-f757-482e-bf63-fcb5e25efdd8";
pub const CAMPAIGN_1_ID: &str = "campaign--bba8b6c6-fa62-4767-8303-58390db33a19";
pub const IDENTITY_REF: &str = "identity--abd090f7-5ada-4506-b6d0-5feae5ff90bc";
pub const BUNDLE_ID: &str = "bundle--e5214f9b-ae28-4692-9394-2fd2ed85d78a";

pub const READ_ONLY_COLLECTION_ID: &str = "22f763c1-e478-4765-8635-e4c32db665ea";
pub const WRITE_ONLY_COLLECTION_ID: &str = "4f7327e2-f5b4-4269-b6e0-3564d174ce69";
pub const READ_WRITE_COLLECTION_ID: &str = "8c49f14d-8ea3-4f03-ab28-19dbca973dde";

pub const STIX_MEDIA_TYPE: &str = "application/stix+json;version=2.1";

const KILL_CHAIN: &str = "lockheed-martin-cyber-kill-chain";

fn kill_chain_delivery() -> KillChainPhase {
    KillChainPhase { kill_chain_name: KILL_CHAIN.to_string(), phase_name: "delivery".to_string() }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// Every indicator version, oldest first: five versions of indicator 1 followed
/// by the single version of indicator 2.
///
/// # Errors
/// Returns [`CoreError::Validation`] if a literal timestamp fails to parse.
pub fn indicators() -> Result<Vec<Indicator>, CoreError> {
    let created = Timestamp::parse("2018-08-08T01:51:01.123Z")?;
    let mut common = CommonProperties::new("indicator", INDICATOR_1_ID, created);
    common.created_by_ref = Some(IDENTITY_REF.to_string());
    common.lang = Some("en-us".to_string());
    common.confidence = Some(99);

    let base = Indicator {
        common,
        name: Some("TestLab Indicator 1".to_string()),
        description: Some("This is indicator 1 for Read-Only TestLab Collection".to_string()),
        indicator_types: labels(&["compromised"]),
        pattern: "[ ipv4-addr:value = '192.168.100.100' ]".to_string(),
        pattern_type: Some("stix".to_string()),
        valid_from: created,
        valid_until: Some(Timestamp::parse("2018-09-09T01:51:01.123Z")?),
        kill_chain_phases: vec![kill_chain_delivery()],
    };

    let revision = |modified: &str, label_set: &[&str]| -> Result<Indicator, CoreError> {
        let mut version = base.clone();
        version.common.modified = Timestamp::parse(modified)?;
        version.common.labels = labels(label_set);
        Ok(version)
    };

    let v2 = revision("2018-08-08T01:52:01.234Z", &["a"])?;
    let v3 = revision("2018-08-08T01:53:01.345Z", &["a", "b", "c"])?;
    let v4 = revision("2018-08-08T01:54:01.456Z", &["a", "b", "c"])?;
    let v5 = revision("2018-08-08T01:55:01.567Z", &["a", "b", "d"])?;

    let created_2 = Timestamp::parse("2018-08-08T02:51:02.123Z")?;
    let mut common_2 = CommonProperties::new("indicator", INDICATOR_2_ID, created_2);
    common_2.created_by_ref = Some(IDENTITY_REF.to_string());
    common_2.lang = Some("en-us".to_string());
    common_2.confidence = Some(99);
    common_2.external_references = vec![ExternalReference {
        source_name: "TestLab Indicators".to_string(),
        description: Some("This is from the TestLab".to_string()),
        url: Some("https://github.com/freetaxii/testlab".to_string()),
        external_id: Some("2".to_string()),
    }];
    let indicator_2 = Indicator {
        common: common_2,
        name: Some("TestLab Indicator 2".to_string()),
        description: Some("This is indicator 2 for Read-Only TestLab Collection".to_string()),
        indicator_types: labels(&["anonymization", "compromised"]),
        pattern: "[ ipv4-addr:value = '192.168.200.200' ]".to_string(),
        pattern_type: Some("stix".to_string()),
        valid_from: created_2,
        valid_until: Some(Timestamp::parse("2018-09-09T02:51:02.123Z")?),
        kill_chain_phases: vec![kill_chain_delivery()],
    };

    Ok(vec![base, v2, v3, v4, v5, indicator_2])
}

/// # Errors
/// Returns [`CoreError::Validation`] if a literal timestamp fails to parse.
pub fn attack_patterns() -> Result<Vec<AttackPattern>, CoreError> {
    let mut common = CommonProperties::new(
        "attack-pattern",
        ATTACK_PATTERN_1_ID,
        Timestamp::parse("2018-08-08T03:51:03.123Z")?,
    );
    common.external_references = vec![ExternalReference {
        source_name: "capec".to_string(),
        description: None,
        url: None,
        external_id: Some("CAPEC-163".to_string()),
    }];
    Ok(vec![AttackPattern {
        common,
        name: "TestLab Attack Pattern 1".to_string(),
        description: Some(
            "This is attack pattern 1 for Read-Only TestLab Collection".to_string(),
        ),
        kill_chain_phases: vec![kill_chain_delivery()],
    }])
}

/// # Errors
/// Returns [`CoreError::Validation`] if a literal timestamp fails to parse.
pub fn threat_actors() -> Result<Vec<ThreatActor>, CoreError> {
    Ok(vec![ThreatActor {
        common: CommonProperties::new(
            "threat-actor",
            THREAT_ACTOR_1_ID,
            Timestamp::parse("2018-08-08T04:51:04.123Z")?,
        ),
        name: "TestLab Threat Actor 1".to_string(),
        description: Some("This is threat actor 1 for Read-Only TestLab Collection".to_string()),
        threat_actor_types: labels(&["activist"]),
    }])
}

/// # Errors
/// Returns [`CoreError::Validation`] if a literal timestamp fails to parse.
pub fn campaigns() -> Result<Vec<Campaign>, CoreError> {
    Ok(vec![Campaign {
        common: CommonProperties::new(
            "campaign",
            CAMPAIGN_1_ID,
            Timestamp::parse("2018-08-08T05:51:05.123Z")?,
        ),
        name: "TestLab Campaign 1".to_string(),
        description: Some("This is campaign 1 for Read-Only TestLab Collection".to_string()),
    }])
}

fn collection(id: &str, title: &str, description: &str, can_read: bool, can_write: bool) -> CollectionResource {
    CollectionResource {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        alias: None,
        can_read,
        can_write,
        media_types: vec![STIX_MEDIA_TYPE.to_string()],
    }
}

#[must_use]
pub fn read_only_collection() -> CollectionResource {
    collection(
        READ_ONLY_COLLECTION_ID,
        "Read-Only TestLab Collection",
        "This is a Read-Only collection for use with the FreeTAXII TestLab tool",
        true,
        false,
    )
}

#[must_use]
pub fn write_only_collection() -> CollectionResource {
    collection(
        WRITE_ONLY_COLLECTION_ID,
        "Write-Only TestLab Collection",
        "This is a Write-Only collection for use with the FreeTAXII TestLab tool",
        false,
        true,
    )
}

#[must_use]
pub fn read_write_collection() -> CollectionResource {
    collection(
        READ_WRITE_COLLECTION_ID,
        "Read-Write TestLab Collection",
        "This is a Read-Write collection for use with the FreeTAXII TestLab tool",
        true,
        true,
    )
}

/// Every object version in the order the reference bundle lists them.
///
/// # Errors
/// Returns [`CoreError::Validation`] if a literal timestamp fails to parse.
pub fn all_objects(indicators_only: bool) -> Result<Vec<StixObject>, CoreError> {
    let mut objects = indicators()?.into_iter().map(StixObject::from).collect::<Vec<_>>();
    if !indicators_only {
        objects.extend(attack_patterns()?.into_iter().map(StixObject::from));
        objects.extend(threat_actors()?.into_iter().map(StixObject::from));
        objects.extend(campaigns()?.into_iter().map(StixObject::from));
    }
    Ok(objects)
}

/// The reference population plus the three TestLab collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Testlab {
    pub population: ReferencePopulation,
    pub read_only: CollectionFixture,
    pub write_only: CollectionFixture,
    pub read_write: CollectionFixture,
}

impl Testlab {
    /// Build the indicator-only TestLab the filtering scenarios run against.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] if the literal data violates a population invariant.
    pub fn build() -> Result<Self, CoreError> {
        Self::build_with(true)
    }

    /// # Errors
    /// Returns [`CoreError::Validation`] if the literal data violates a population invariant.
    pub fn build_with(indicators_only: bool) -> Result<Self, CoreError> {
        Self::from_objects(all_objects(indicators_only)?)
    }

    /// TestLab collections over an arbitrary object set, e.g. a decoded bundle.
    /// Every identity becomes a member of the read-only collection.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] if the objects violate a population invariant.
    pub fn from_objects(objects: Vec<StixObject>) -> Result<Self, CoreError> {
        let population = ReferencePopulation::from_objects(objects)?;
        let members = population.identities().map(|identity| identity.id().to_string()).collect::<Vec<_>>();
        Ok(Self {
            read_only: CollectionFixture::new(read_only_collection()).with_members(members),
            write_only: CollectionFixture::new(write_only_collection()),
            read_write: CollectionFixture::new(read_write_collection()),
            population,
        })
    }

    #[must_use]
    pub fn collections(&self) -> Vec<&CollectionFixture> {
        vec![&self.read_only, &self.write_only, &self.read_write]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::AccessScope;

    #[test]
    fn indicator_1_has_five_versions_with_label_history() {
        let indicators = indicators().unwrap_or_else(|err| panic!("fixtures: {err}"));
        assert_eq!(indicators.len(), 6);
        let history = indicators[..5]
            .iter()
            .map(|indicator| indicator.common.labels.join(","))
            .collect::<Vec<_>>();
        assert_eq!(history, vec!["", "a", "a,b,c", "a,b,c", "a,b,d"]);
        assert!(indicators[..5].iter().all(|indicator| indicator.common.id == INDICATOR_1_ID));
        assert_eq!(indicators[5].common.id, INDICATOR_2_ID);
        assert_eq!(indicators[5].common.external_references.len(), 1);
    }

    #[test]
    fn testlab_read_only_collection_exposes_both_indicators() {
        let lab = Testlab::build().unwrap_or_else(|err| panic!("testlab: {err}"));
        assert_eq!(lab.population.len(), 2);
        assert_eq!(lab.population.version_count(), 6);
        assert!(lab.read_only.contains(INDICATOR_1_ID));
        assert!(lab.read_only.contains(INDICATOR_2_ID));
        assert_eq!(lab.read_only.access_scope(), Some(AccessScope::ReadOnly));
        assert_eq!(lab.write_only.access_scope(), Some(AccessScope::WriteOnly));
        assert_eq!(lab.read_write.access_scope(), Some(AccessScope::ReadWrite));
        assert!(lab.write_only.members.is_empty());
    }

    #[test]
    fn full_testlab_adds_other_object_types() {
        let lab = Testlab::build_with(false).unwrap_or_else(|err| panic!("testlab: {err}"));
        assert_eq!(lab.population.len(), 5);
        assert!(lab.population.get(CAMPAIGN_1_ID).is_some());
        assert!(lab.read_only.contains(ATTACK_PATTERN_1_ID));
    }

    #[test]
    fn testlab_rebuilt_from_its_own_objects_is_identical() {
        let lab = Testlab::build().unwrap_or_else(|err| panic!("testlab: {err}"));
        let objects = lab.population.all_versions().cloned().collect::<Vec<_>>();
        let rebuilt = Testlab::from_objects(objects).unwrap_or_else(|err| panic!("rebuild: {err}"));
        assert_eq!(rebuilt, lab);
    }

    #[test]
    fn testlab_fingerprint_is_deterministic() {
        let first = Testlab::build().and_then(|lab| lab.population.fingerprint());
        let second = Testlab::build().and_then(|lab| lab.population.fingerprint());
        assert!(first.is_ok());
        assert_eq!(first, second);
    }
}
