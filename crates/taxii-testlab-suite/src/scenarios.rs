use taxii_testlab_core::testlab::{INDICATOR_1_ID, INDICATOR_2_ID};
use taxii_testlab_core::{CoreError, FilterExpression, VersionSelector};

/// One filtering test: the query sent, and for object-by-id requests the
/// identity named in the path.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FilterScenario {
    pub id: String,
    pub title: &'static str,
    pub summary: &'static str,
    pub query: FilterExpression,
    pub path_object: Option<String>,
}

impl FilterScenario {
    /// The filter the expected list is computed from.
    #[must_use]
    pub fn effective_filter(&self) -> FilterExpression {
        match &self.path_object {
            Some(id) => FilterExpression { ids: Some(vec![id.clone()]), ..self.query.clone() },
            None => self.query.clone(),
        }
    }
}

struct Template {
    title: &'static str,
    summary: &'static str,
    versions: Option<&'static str>,
}

const VERSION_TEMPLATES: [Template; 7] = [
    Template {
        title: "Test No Filtering",
        summary: "This test will not apply any filters to the read-only collection",
        versions: None,
    },
    Template {
        title: "Test Version Filtering Using All",
        summary: "This test will filter the read-only collection by versions using the all keyword",
        versions: Some("all"),
    },
    Template {
        title: "Test Version Filtering Using First",
        summary: "This test will filter the read-only collection by versions using the first keyword",
        versions: Some("first"),
    },
    Template {
        title: "Test Version Filtering Using Last",
        summary: "This test will filter the read-only collection by versions using the last keyword",
        versions: Some("last"),
    },
    Template {
        title: "Test Version Filtering Using First,Last",
        summary: "This test will filter the read-only collection by versions using the first and last keywords",
        versions: Some("first,last"),
    },
    Template {
        title: "Test Version Filtering Using Specific Version",
        summary: "This test will filter the read-only collection by version using the version 2018-08-08T01:52:01.234Z",
        versions: Some("2018-08-08T01:52:01.234Z"),
    },
    Template {
        title: "Test Version Filtering Using Last,First,Version",
        summary: "This test will filter the read-only collection by version using the last, first, and version",
        versions: Some("last,first,2018-08-08T01:53:01.345Z"),
    },
];

fn version_scenarios(path_object: Option<&str>) -> Result<Vec<FilterScenario>, CoreError> {
    VERSION_TEMPLATES
        .iter()
        .enumerate()
        .map(|(index, template)| -> Result<FilterScenario, CoreError> {
            let query = match template.versions {
                Some(raw) => FilterExpression::new().with_versions(VersionSelector::parse(raw)?),
                None => FilterExpression::new(),
            };
            Ok(FilterScenario {
                id: format!("Filter-{:02}", index + 1),
                title: template.title,
                summary: template.summary,
                query,
                path_object: path_object.map(str::to_string),
            })
        })
        .collect()
}

/// Filter-01 through Filter-10 against the read-only objects endpoint.
///
/// # Errors
/// Returns [`CoreError::Filter`] if a literal selector fails to parse.
pub fn objects_scenarios() -> Result<Vec<FilterScenario>, CoreError> {
    let mut scenarios = version_scenarios(None)?;
    scenarios.push(FilterScenario {
        id: "Filter-08".to_string(),
        title: "Test ID Filtering Using One ID",
        summary: "This test will filter the read-only collection by ID using a single STIX ID",
        query: FilterExpression::new().with_ids([INDICATOR_1_ID]),
        path_object: None,
    });
    scenarios.push(FilterScenario {
        id: "Filter-09".to_string(),
        title: "Test ID Filtering Using Two IDs",
        summary: "This test will filter the read-only collection by ID using two STIX IDs",
        query: FilterExpression::new().with_ids([INDICATOR_1_ID, INDICATOR_2_ID]),
        path_object: None,
    });
    scenarios.push(FilterScenario {
        id: "Filter-10".to_string(),
        title: "Test Type Filtering Using Indicator",
        summary: "This test will filter the read-only collection by type using Indicator",
        query: FilterExpression::new().with_types(["indicator"]),
        path_object: None,
    });
    Ok(scenarios)
}

/// Filter-01 through Filter-07 against the object-by-id endpoint of `object_id`.
///
/// # Errors
/// Returns [`CoreError::Filter`] if a literal selector fails to parse.
pub fn object_by_id_scenarios(object_id: &str) -> Result<Vec<FilterScenario>, CoreError> {
    version_scenarios(Some(object_id))
}
