use taxii_testlab_core::testlab::{self, Testlab, INDICATOR_1_ID, INDICATOR_2_ID};
use taxii_testlab_core::{
    evaluate_in, FilterExpression, Selection, MATCH_ID_PARAM, MATCH_TYPE_PARAM,
    MATCH_VERSION_PARAM,
};

fn lab() -> Testlab {
    Testlab::build().unwrap_or_else(|err| panic!("testlab should build: {err}"))
}

fn positions(selections: &[Selection<'_>]) -> Vec<usize> {
    let fixtures = testlab::indicators().unwrap_or_else(|err| panic!("fixtures: {err}"));
    selections
        .iter()
        .map(|selection| {
            fixtures
                .iter()
                .position(|fixture| {
                    fixture.common.id == selection.id()
                        && Some(fixture.common.modified) == selection.modified()
                })
                .unwrap_or_else(|| panic!("{} is not a fixture version", selection.id()))
        })
        .collect()
}

fn run(lab: &Testlab, query: &[(&str, String)]) -> Vec<usize> {
    let filter = FilterExpression::parse_query(query.iter().map(|(k, v)| (*k, v.as_str())))
        .unwrap_or_else(|err| panic!("query {query:?} should parse: {err}"));
    positions(&evaluate_in(&lab.population, &lab.read_only, &filter))
}

#[test]
fn objects_endpoint_scenarios_select_the_documented_versions() {
    let lab = lab();
    let version = |value: &str| (MATCH_VERSION_PARAM, value.to_string());
    let cases: Vec<(Vec<(&str, String)>, Vec<usize>)> = vec![
        (vec![], vec![4, 5]),
        (vec![version("all")], vec![0, 1, 2, 3, 4, 5]),
        (vec![version("first")], vec![0, 5]),
        (vec![version("last")], vec![4, 5]),
        (vec![version("first,last")], vec![0, 4, 5]),
        (vec![version("2018-08-08T01:52:01.234Z")], vec![1]),
        (vec![version("last,first,2018-08-08T01:53:01.345Z")], vec![0, 2, 4, 5]),
        (vec![(MATCH_ID_PARAM, INDICATOR_1_ID.to_string())], vec![4]),
        (vec![(MATCH_ID_PARAM, format!("{INDICATOR_1_ID},{INDICATOR_2_ID}"))], vec![4, 5]),
        (vec![(MATCH_TYPE_PARAM, "indicator".to_string())], vec![4, 5]),
    ];

    for (query, expected) in cases {
        assert_eq!(run(&lab, &query), expected, "query {query:?}");
    }
}

#[test]
fn object_by_id_scenarios_stay_within_one_identity() {
    let lab = lab();
    let cases = [
        (None, vec![4]),
        (Some("all"), vec![0, 1, 2, 3, 4]),
        (Some("first"), vec![0]),
        (Some("last"), vec![4]),
        (Some("first,last"), vec![0, 4]),
        (Some("2018-08-08T01:52:01.234Z"), vec![1]),
        (Some("last,first,2018-08-08T01:53:01.345Z"), vec![0, 2, 4]),
    ];

    for (selector, expected) in cases {
        let mut query = FilterExpression::for_object(INDICATOR_1_ID).to_query_pairs();
        if let Some(selector) = selector {
            query.push((MATCH_VERSION_PARAM.to_string(), selector.to_string()));
        }
        let filter = FilterExpression::parse_query(query)
            .unwrap_or_else(|err| panic!("selector {selector:?}: {err}"));
        let result = evaluate_in(&lab.population, &lab.read_only, &filter);
        assert_eq!(positions(&result), expected, "selector {selector:?}");
    }
}
