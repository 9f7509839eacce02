use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::model::{StixObject, Timestamp};
use crate::population::{CollectionFixture, ReferencePopulation, VersionedIdentity};
use crate::CoreError;

pub const MATCH_ID_PARAM: &str = "match[id]";
pub const MATCH_TYPE_PARAM: &str = "match[type]";
pub const MATCH_VERSION_PARAM: &str = "match[version]";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum VersionKeyword {
    All,
    First,
    Last,
    At(Timestamp),
}

impl VersionKeyword {
    /// # Errors
    /// Returns [`CoreError::Filter`] when the value is neither a keyword nor an
    /// RFC 3339 timestamp.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim() {
            "all" => Ok(Self::All),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Timestamp::parse(other).map(Self::At).map_err(|_| {
                CoreError::Filter(format!(
                    "version keyword `{other}` is not all, first, last or a timestamp"
                ))
            }),
        }
    }

    fn select_into(self, identity: &VersionedIdentity, positions: &mut BTreeSet<usize>) {
        let count = identity.versions().len();
        match self {
            Self::All => positions.extend(0..count),
            Self::First => {
                positions.insert(0);
            }
            Self::Last => {
                positions.insert(count - 1);
            }
            Self::At(timestamp) => {
                if let Some(position) = identity.position_of(timestamp) {
                    positions.insert(position);
                }
            }
        }
    }
}

impl Display for VersionKeyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::First => f.write_str("first"),
            Self::Last => f.write_str("last"),
            Self::At(timestamp) => write!(f, "{timestamp}"),
        }
    }
}

/// Non-empty union of version keywords, as carried by `match[version]`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VersionSelector {
    keywords: Vec<VersionKeyword>,
}

impl VersionSelector {
    /// The selection a server applies when no `match[version]` is sent.
    #[must_use]
    pub fn last_only() -> Self {
        Self { keywords: vec![VersionKeyword::Last] }
    }

    /// # Errors
    /// Returns [`CoreError::Filter`] when `keywords` is empty.
    pub fn from_keywords<I>(keywords: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = VersionKeyword>,
    {
        let mut seen = HashSet::new();
        let keywords =
            keywords.into_iter().filter(|keyword| seen.insert(*keyword)).collect::<Vec<_>>();
        if keywords.is_empty() {
            return Err(CoreError::Filter("version selector MUST name at least one keyword".to_string()));
        }
        Ok(Self { keywords })
    }

    /// Parse a comma-separated keyword union such as `last,first,2018-08-08T01:53:01.345Z`.
    ///
    /// # Errors
    /// Returns [`CoreError::Filter`] for empty items or unrecognized keywords.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let mut keywords = Vec::new();
        for item in value.split(',') {
            if item.trim().is_empty() {
                return Err(CoreError::Filter(format!("empty version keyword in `{value}`")));
            }
            keywords.push(VersionKeyword::parse(item)?);
        }
        Self::from_keywords(keywords)
    }

    #[must_use]
    pub fn keywords(&self) -> &[VersionKeyword] {
        &self.keywords
    }

    fn select(&self, identity: &VersionedIdentity) -> BTreeSet<usize> {
        let mut positions = BTreeSet::new();
        for keyword in &self.keywords {
            keyword.select_into(identity, &mut positions);
        }
        positions
    }
}

impl Display for VersionSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered = self.keywords.iter().map(ToString::to_string).collect::<Vec<_>>();
        f.write_str(&rendered.join(","))
    }
}

impl FromStr for VersionSelector {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Conjunction of the id, type and version predicates of one objects query.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FilterExpression {
    pub ids: Option<Vec<String>>,
    pub types: Option<Vec<String>>,
    pub versions: Option<VersionSelector>,
}

impl FilterExpression {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter used by the object-by-id endpoint, where the path names the identity.
    #[must_use]
    pub fn for_object(id: &str) -> Self {
        Self::new().with_ids([id])
    }

    #[must_use]
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_versions(mut self, versions: VersionSelector) -> Self {
        self.versions = Some(versions);
        self
    }

    /// Parse the `match[...]` parameters of a query string; other parameters are ignored.
    ///
    /// # Errors
    /// Returns [`CoreError::Filter`] for empty lists or invalid version keywords.
    pub fn parse_query<I, K, V>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::new();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                MATCH_ID_PARAM => filter.ids = Some(split_list(MATCH_ID_PARAM, value)?),
                MATCH_TYPE_PARAM => filter.types = Some(split_list(MATCH_TYPE_PARAM, value)?),
                MATCH_VERSION_PARAM => filter.versions = Some(VersionSelector::parse(value)?),
                _ => {}
            }
        }
        Ok(filter)
    }

    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(ids) = &self.ids {
            pairs.push((MATCH_ID_PARAM.to_string(), ids.join(",")));
        }
        if let Some(types) = &self.types {
            pairs.push((MATCH_TYPE_PARAM.to_string(), types.join(",")));
        }
        if let Some(versions) = &self.versions {
            pairs.push((MATCH_VERSION_PARAM.to_string(), versions.to_string()));
        }
        pairs
    }

    fn admits(&self, identity: &VersionedIdentity) -> bool {
        let id_ok = self.ids.as_ref().map_or(true, |ids| ids.iter().any(|id| id == identity.id()));
        let type_ok = self
            .types
            .as_ref()
            .map_or(true, |types| types.iter().any(|kind| kind == identity.object_type()));
        id_ok && type_ok
    }
}

fn split_list(param: &str, value: &str) -> Result<Vec<String>, CoreError> {
    let items = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if items.is_empty() {
        return Err(CoreError::Filter(format!("{param} MUST list at least one value")));
    }
    Ok(items)
}

/// One expected (identity, version) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    pub identity: &'a VersionedIdentity,
    pub version: &'a StixObject,
}

impl Selection<'_> {
    #[must_use]
    pub fn id(&self) -> &str {
        self.identity.id()
    }

    #[must_use]
    pub fn modified(&self) -> Option<Timestamp> {
        self.version.modified()
    }
}

/// Compute the ordered result set a compliant server returns for `filter`.
///
/// Identity and type predicates narrow the identity set first; the version
/// selector then picks versions per identity, as a set union of its keywords.
/// The result is ascending by identifier, then by `modified`.
#[must_use]
pub fn evaluate<'a>(population: &'a ReferencePopulation, filter: &FilterExpression) -> Vec<Selection<'a>> {
    evaluate_scoped(population, filter, None)
}

/// Same as [`evaluate`], restricted to the identities a collection exposes.
#[must_use]
pub fn evaluate_in<'a>(
    population: &'a ReferencePopulation,
    collection: &CollectionFixture,
    filter: &FilterExpression,
) -> Vec<Selection<'a>> {
    evaluate_scoped(population, filter, Some(collection))
}

fn evaluate_scoped<'a>(
    population: &'a ReferencePopulation,
    filter: &FilterExpression,
    scope: Option<&CollectionFixture>,
) -> Vec<Selection<'a>> {
    let default_selector = VersionSelector::last_only();
    let selector = filter.versions.as_ref().unwrap_or(&default_selector);

    let mut selected = Vec::new();
    for identity in population.identities() {
        if scope.is_some_and(|collection| !collection.contains(identity.id())) {
            continue;
        }
        if !filter.admits(identity) {
            continue;
        }
        for position in selector.select(identity) {
            selected.push(Selection { identity, version: &identity.versions()[position] });
        }
    }

    selected.sort_by(|lhs, rhs| {
        lhs.id().cmp(rhs.id()).then_with(|| lhs.modified().cmp(&rhs.modified()))
    });
    selected
}
