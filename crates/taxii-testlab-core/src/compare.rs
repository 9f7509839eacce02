use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::model::{
    AttackPattern, Campaign, CollectionResource, CommonProperties, Indicator, StixObject,
    ThreatActor,
};

/// How far ordered-collection fields are compared.
///
/// `Shallow` checks the length and the first element only; `Full` checks the
/// length and then every position both sides have.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareDepth {
    #[default]
    Shallow,
    Full,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct CompareOutcome {
    pub is_match: bool,
    pub mismatch_count: usize,
    pub diff_lines: Vec<String>,
}

/// Mismatch accumulator. Every check runs; none stops the ones after it.
#[derive(Debug, Clone)]
pub struct Comparison {
    depth: CompareDepth,
    mismatch_count: usize,
    diff_lines: Vec<String>,
}

impl Comparison {
    #[must_use]
    pub fn new(depth: CompareDepth) -> Self {
        Self { depth, mismatch_count: 0, diff_lines: Vec::new() }
    }

    pub fn scalar<T>(&mut self, field: &str, expected: &T, actual: &T) -> &mut Self
    where
        T: PartialEq + Debug + ?Sized,
    {
        if expected != actual {
            self.record(field, expected, actual);
        }
        self
    }

    pub fn sequence<T>(&mut self, field: &str, expected: &[T], actual: &[T]) -> &mut Self
    where
        T: PartialEq + Debug,
    {
        if expected.len() != actual.len() {
            self.record(&format!("{field}.len"), &expected.len(), &actual.len());
        }
        match self.depth {
            CompareDepth::Shallow => {
                let (expected_first, actual_first) = (expected.first(), actual.first());
                if expected_first != actual_first {
                    self.record(&format!("{field}[0]"), &expected_first, &actual_first);
                }
            }
            CompareDepth::Full => {
                for (index, (lhs, rhs)) in expected.iter().zip(actual).enumerate() {
                    if lhs != rhs {
                        self.record(&format!("{field}[{index}]"), lhs, rhs);
                    }
                }
            }
        }
        self
    }

    #[must_use]
    pub fn finish(self) -> CompareOutcome {
        CompareOutcome {
            is_match: self.mismatch_count == 0,
            mismatch_count: self.mismatch_count,
            diff_lines: self.diff_lines,
        }
    }

    fn record<E, A>(&mut self, field: &str, expected: &E, actual: &A)
    where
        E: Debug + ?Sized,
        A: Debug + ?Sized,
    {
        self.mismatch_count += 1;
        self.diff_lines.push(format!("{field}: expected {expected:?}, actual {actual:?}"));
    }
}

pub trait StructuralCompare {
    /// Feed every modeled field pair into `comparison`.
    fn compare_fields(&self, actual: &Self, comparison: &mut Comparison);

    fn compare(&self, actual: &Self, depth: CompareDepth) -> CompareOutcome {
        let mut comparison = Comparison::new(depth);
        self.compare_fields(actual, &mut comparison);
        comparison.finish()
    }
}

impl StructuralCompare for CommonProperties {
    fn compare_fields(&self, actual: &Self, comparison: &mut Comparison) {
        comparison
            .scalar("type", &self.object_type, &actual.object_type)
            .scalar("spec_version", &self.spec_version, &actual.spec_version)
            .scalar("id", &self.id, &actual.id)
            .scalar("created", &self.created, &actual.created)
            .scalar("modified", &self.modified, &actual.modified)
            .scalar("created_by_ref", &self.created_by_ref, &actual.created_by_ref)
            .scalar("lang", &self.lang, &actual.lang)
            .scalar("confidence", &self.confidence, &actual.confidence)
            .sequence("labels", &self.labels, &actual.labels)
            .sequence("external_references", &self.external_references, &actual.external_references);
    }
}

impl StructuralCompare for Indicator {
    fn compare_fields(&self, actual: &Self, comparison: &mut Comparison) {
        self.common.compare_fields(&actual.common, comparison);
        comparison
            .scalar("name", &self.name, &actual.name)
            .scalar("description", &self.description, &actual.description)
            .sequence("indicator_types", &self.indicator_types, &actual.indicator_types)
            .scalar("pattern", &self.pattern, &actual.pattern)
            .scalar("pattern_type", &self.pattern_type, &actual.pattern_type)
            .scalar("valid_from", &self.valid_from, &actual.valid_from)
            .scalar("valid_until", &self.valid_until, &actual.valid_until)
            .sequence("kill_chain_phases", &self.kill_chain_phases, &actual.kill_chain_phases);
    }
}

impl StructuralCompare for AttackPattern {
    fn compare_fields(&self, actual: &Self, comparison: &mut Comparison) {
        self.common.compare_fields(&actual.common, comparison);
        comparison
            .scalar("name", &self.name, &actual.name)
            .scalar("description", &self.description, &actual.description)
            .sequence("kill_chain_phases", &self.kill_chain_phases, &actual.kill_chain_phases);
    }
}

impl StructuralCompare for ThreatActor {
    fn compare_fields(&self, actual: &Self, comparison: &mut Comparison) {
        self.common.compare_fields(&actual.common, comparison);
        comparison
            .scalar("name", &self.name, &actual.name)
            .scalar("description", &self.description, &actual.description)
            .sequence("threat_actor_types", &self.threat_actor_types, &actual.threat_actor_types);
    }
}

impl StructuralCompare for Campaign {
    fn compare_fields(&self, actual: &Self, comparison: &mut Comparison) {
        self.common.compare_fields(&actual.common, comparison);
        comparison
            .scalar("name", &self.name, &actual.name)
            .scalar("description", &self.description, &actual.description);
    }
}

impl StructuralCompare for CollectionResource {
    fn compare_fields(&self, actual: &Self, comparison: &mut Comparison) {
        comparison
            .scalar("id", &self.id, &actual.id)
            .scalar("title", &self.title, &actual.title)
            .scalar("description", &self.description, &actual.description)
            .scalar("can_read", &self.can_read, &actual.can_read)
            .scalar("can_write", &self.can_write, &actual.can_write)
            .sequence("media_types", &self.media_types, &actual.media_types);
    }
}

/// Compare two decoded objects.
///
/// Returns `None` when either side is an unknown type. Objects of different
/// modeled types count as a single `type` mismatch.
#[must_use]
pub fn compare_objects(
    expected: &StixObject,
    actual: &StixObject,
    depth: CompareDepth,
) -> Option<CompareOutcome> {
    let outcome = match (expected, actual) {
        (StixObject::Unknown { .. }, _) | (_, StixObject::Unknown { .. }) => return None,
        (StixObject::Indicator(lhs), StixObject::Indicator(rhs)) => lhs.compare(rhs, depth),
        (StixObject::AttackPattern(lhs), StixObject::AttackPattern(rhs)) => lhs.compare(rhs, depth),
        (StixObject::ThreatActor(lhs), StixObject::ThreatActor(rhs)) => lhs.compare(rhs, depth),
        (StixObject::Campaign(lhs), StixObject::Campaign(rhs)) => lhs.compare(rhs, depth),
        (lhs, rhs) => {
            let mut comparison = Comparison::new(depth);
            comparison.scalar("type", lhs.object_type(), rhs.object_type());
            comparison.finish()
        }
    };
    Some(outcome)
}
