use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::codec::decode_object;
use crate::compare::{compare_objects, CompareDepth};
use crate::filter::Selection;
use crate::model::{StixObject, Timestamp};

/// How returned objects are paired with expected ones.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Index `i` of the response is compared with index `i` of the expected list.
    #[default]
    Positional,
    /// Pairs are correlated by `(id, modified)`; missing and unexpected entries count.
    Keyed,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ValidationOptions {
    pub strategy: MatchStrategy,
    pub depth: CompareDepth,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ItemVerdict {
    Matched {
        position: usize,
        id: String,
    },
    Mismatched {
        position: usize,
        id: String,
        mismatch_count: usize,
        diff_lines: Vec<String>,
    },
    Skipped {
        position: usize,
        reason: String,
    },
    Unexpected {
        position: usize,
        id: String,
        modified: Option<Timestamp>,
    },
    Missing {
        id: String,
        modified: Option<Timestamp>,
    },
}

impl ItemVerdict {
    #[must_use]
    pub fn problems(&self) -> usize {
        match self {
            Self::Matched { .. } | Self::Skipped { .. } => 0,
            Self::Mismatched { mismatch_count, .. } => *mismatch_count,
            Self::Unexpected { .. } | Self::Missing { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct ValidationReport {
    pub expected_count: usize,
    pub actual_count: usize,
    pub verdicts: Vec<ItemVerdict>,
}

impl ValidationReport {
    #[must_use]
    pub fn problems(&self) -> usize {
        self.verdicts.iter().map(ItemVerdict::problems).sum()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.problems() == 0
    }

    pub fn diff_lines(&self) -> impl Iterator<Item = &str> {
        self.verdicts
            .iter()
            .flat_map(|verdict| match verdict {
                ItemVerdict::Mismatched { diff_lines, .. } => diff_lines.as_slice(),
                _ => [].as_slice(),
            })
            .map(String::as_str)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ItemVerdict> {
        self.verdicts.iter().filter(|verdict| matches!(verdict, ItemVerdict::Skipped { .. }))
    }
}

/// Check a response's raw objects against the expected selections.
///
/// Objects that fail to decode, and objects of unmodeled types, are skipped
/// without counting as problems.
#[must_use]
pub fn validate_objects(
    objects: &[Box<RawValue>],
    expected: &[Selection<'_>],
    options: ValidationOptions,
) -> ValidationReport {
    let verdicts = match options.strategy {
        MatchStrategy::Positional => positional(objects, expected, options.depth),
        MatchStrategy::Keyed => keyed(objects, expected, options.depth),
    };
    ValidationReport { expected_count: expected.len(), actual_count: objects.len(), verdicts }
}

fn decode_modeled(position: usize, raw: &RawValue) -> Result<StixObject, ItemVerdict> {
    match decode_object(raw) {
        Ok(object) if object.is_unknown() => Err(ItemVerdict::Skipped {
            position,
            reason: format!("type {} is not modeled", object.object_type()),
        }),
        Ok(object) => Ok(object),
        Err(err) => Err(ItemVerdict::Skipped { position, reason: err.to_string() }),
    }
}

fn verdict_for(
    position: usize,
    expected: &StixObject,
    actual: &StixObject,
    depth: CompareDepth,
) -> ItemVerdict {
    let id = actual.id().unwrap_or_default().to_string();
    match compare_objects(expected, actual, depth) {
        Some(outcome) if outcome.is_match => ItemVerdict::Matched { position, id },
        Some(outcome) => ItemVerdict::Mismatched {
            position,
            id,
            mismatch_count: outcome.mismatch_count,
            diff_lines: outcome.diff_lines,
        },
        None => ItemVerdict::Skipped {
            position,
            reason: format!("type {} is not modeled", expected.object_type()),
        },
    }
}

fn positional(
    objects: &[Box<RawValue>],
    expected: &[Selection<'_>],
    depth: CompareDepth,
) -> Vec<ItemVerdict> {
    objects
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            let actual = match decode_modeled(position, raw) {
                Ok(actual) => actual,
                Err(skipped) => return skipped,
            };
            match expected.get(position) {
                Some(selection) => verdict_for(position, selection.version, &actual, depth),
                None => ItemVerdict::Skipped {
                    position,
                    reason: format!("no expected object at position {position}"),
                },
            }
        })
        .collect()
}

fn keyed(
    objects: &[Box<RawValue>],
    expected: &[Selection<'_>],
    depth: CompareDepth,
) -> Vec<ItemVerdict> {
    let mut pending = expected
        .iter()
        .map(|selection| ((selection.id().to_string(), selection.modified()), selection))
        .collect::<BTreeMap<_, _>>();

    let mut verdicts = Vec::with_capacity(objects.len());
    for (position, raw) in objects.iter().enumerate() {
        let actual = match decode_modeled(position, raw) {
            Ok(actual) => actual,
            Err(skipped) => {
                verdicts.push(skipped);
                continue;
            }
        };
        let key = (actual.id().unwrap_or_default().to_string(), actual.modified());
        match pending.remove(&key) {
            Some(selection) => verdicts.push(verdict_for(position, selection.version, &actual, depth)),
            None => {
                let (id, modified) = key;
                verdicts.push(ItemVerdict::Unexpected { position, id, modified });
            }
        }
    }

    verdicts.extend(pending.into_values().map(|selection| ItemVerdict::Missing {
        id: selection.id().to_string(),
        modified: selection.modified(),
    }));
    verdicts
}
