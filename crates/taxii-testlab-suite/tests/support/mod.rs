use serde::Serialize;
use serde_json::json;
use taxii_testlab_client::{Credentials, PreparedRequest, RawResponse, Transport, TransportError};
use taxii_testlab_core::testlab::{self, Testlab};
use taxii_testlab_core::{
    decode_bundle, decode_object, evaluate_in, ApiRoot, Collections, Discovery, FilterExpression,
    StixObject, MATCH_VERSION_PARAM,
};
use taxii_testlab_suite::{full_media_type, SuiteSettings, TAXII_MEDIA_TYPE};

/// Deliberate deviations from TAXII behavior.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Fault {
    IgnoreVersionFilter,
    ReverseOrder,
    WrongContentType,
    AcceptAnyAuth,
    ServeWithoutSlash,
    MalformedEnvelope,
    ArrayResources,
}

/// Indexes into `testlab::indicators()` served for each `match[version]` value
/// on the unfiltered objects endpoint.
const SERVED_VERSIONS: [(Option<&str>, &[usize]); 7] = [
    (None, &[4, 5]),
    (Some("all"), &[0, 1, 2, 3, 4, 5]),
    (Some("first"), &[0, 5]),
    (Some("last"), &[4, 5]),
    (Some("first,last"), &[0, 4, 5]),
    (Some("2018-08-08T01:52:01.234Z"), &[1]),
    (Some("last,first,2018-08-08T01:53:01.345Z"), &[0, 2, 4, 5]),
];

/// In-memory TAXII server holding the TestLab data.
pub struct ReferenceServer {
    settings: SuiteSettings,
    lab: Testlab,
    authorization: String,
    faults: Vec<Fault>,
    served: Option<Vec<StixObject>>,
}

impl ReferenceServer {
    pub fn new(settings: &SuiteSettings) -> Self {
        let lab = Testlab::build().unwrap_or_else(|err| panic!("testlab should build: {err}"));
        Self {
            authorization: Credentials::new(&settings.username, &settings.password).basic_header(),
            settings: settings.clone(),
            lab,
            faults: Vec::new(),
            served: Some(
                testlab::indicators()
                    .unwrap_or_else(|err| panic!("indicators should build: {err}"))
                    .into_iter()
                    .map(StixObject::from)
                    .collect(),
            ),
        }
    }

    /// Serve the objects of a STIX bundle, as a server loaded from
    /// `testlab testdata` would.
    pub fn from_bundle(settings: &SuiteSettings, body: &[u8]) -> Self {
        let objects = decode_bundle(body)
            .unwrap_or_else(|err| panic!("bundle should decode: {err}"))
            .iter()
            .map(|raw| decode_object(raw).unwrap_or_else(|err| panic!("bundle object should decode: {err}")))
            .collect();
        let lab = Testlab::from_objects(objects).unwrap_or_else(|err| panic!("bundle population: {err}"));
        Self {
            authorization: Credentials::new(&settings.username, &settings.password).basic_header(),
            settings: settings.clone(),
            lab,
            faults: Vec::new(),
            served: None,
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    fn has(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn json<T: Serialize>(&self, value: &T) -> RawResponse {
        let content_type = if self.has(Fault::WrongContentType) {
            "application/json".to_string()
        } else {
            full_media_type()
        };
        let body = serde_json::to_vec(value).unwrap_or_else(|err| panic!("serialize: {err}"));
        RawResponse::new(200).with_header("Content-Type", &content_type).with_body(body)
    }

    fn resource<T: Serialize>(&self, value: &T) -> RawResponse {
        if self.has(Fault::ArrayResources) {
            let value = serde_json::to_value(value).unwrap_or_else(|err| panic!("serialize: {err}"));
            let fields = value.as_object().map(|object| object.values().cloned().collect::<Vec<_>>());
            return self.json(&fields);
        }
        self.json(value)
    }

    /// Hand-listed answer for the version-only queries the objects group sends.
    fn served_versions(&self, query: &[(&str, &str)]) -> Option<Vec<&StixObject>> {
        let served = self.served.as_ref()?;
        let versions = match query {
            [] => None,
            [(key, value)] if *key == MATCH_VERSION_PARAM => Some(*value),
            _ => return None,
        };
        let (_, positions) = SERVED_VERSIONS.iter().find(|(listed, _)| *listed == versions)?;
        Some(positions.iter().map(|position| &served[*position]).collect())
    }

    fn envelope(&self, query: &[(String, String)], object_id: Option<&str>) -> RawResponse {
        if self.has(Fault::MalformedEnvelope) {
            return RawResponse::new(200)
                .with_header("Content-Type", &full_media_type())
                .with_body("{\"objects\": [");
        }
        let query = query
            .iter()
            .filter(|(key, _)| !(self.has(Fault::IgnoreVersionFilter) && key == MATCH_VERSION_PARAM))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect::<Vec<_>>();
        let listed = if object_id.is_none() { self.served_versions(&query) } else { None };
        let mut objects = if let Some(objects) = listed {
            objects
        } else {
            let Ok(mut filter) = FilterExpression::parse_query(query.iter().copied()) else {
                return RawResponse::new(400);
            };
            if let Some(id) = object_id {
                filter.ids = Some(vec![id.to_string()]);
            }
            evaluate_in(&self.lab.population, &self.lab.read_only, &filter)
                .into_iter()
                .map(|selection| selection.version)
                .collect::<Vec<&StixObject>>()
        };
        if self.has(Fault::ReverseOrder) {
            objects.reverse();
        }
        if object_id.is_some() && objects.is_empty() {
            return RawResponse::new(404);
        }
        self.json(&json!({ "more": false, "objects": objects }))
    }

    fn route(&self, request: &PreparedRequest, path: &str) -> RawResponse {
        let settings = &self.settings;
        if path == settings.discovery_path() {
            return self.resource(&Discovery {
                title: "TestLab Reference Server".to_string(),
                description: None,
                contact: None,
                default: Some(settings.api_root_path()),
                api_roots: vec![settings.api_root_path()],
            });
        }
        if path == settings.api_root_path() {
            return self.resource(&ApiRoot {
                title: "TestLab API Root".to_string(),
                description: None,
                versions: vec![full_media_type()],
                max_content_length: 10_485_760,
            });
        }
        if path == settings.collections_path() {
            return self.resource(&Collections {
                collections: self
                    .lab
                    .collections()
                    .into_iter()
                    .map(|fixture| fixture.resource.clone())
                    .collect(),
            });
        }
        for fixture in self.lab.collections() {
            if path == settings.collection_path(fixture.id()) {
                return self.json(&fixture.resource);
            }
        }
        let objects = settings.objects_path(&settings.read_only);
        if path == objects {
            return self.envelope(&request.query, None);
        }
        if let Some(rest) = path.strip_prefix(&objects) {
            let object_id = rest.trim_end_matches('/');
            if !object_id.is_empty() && !object_id.contains('/') {
                return self.envelope(&request.query, Some(object_id));
            }
        }
        RawResponse::new(404)
    }
}

impl Transport for ReferenceServer {
    fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        if !self.has(Fault::AcceptAnyAuth)
            && request.authorization.as_deref() != Some(self.authorization.as_str())
        {
            return Ok(RawResponse::new(401));
        }
        let path = if request.path.ends_with('/') {
            request.path.clone()
        } else if self.has(Fault::ServeWithoutSlash) {
            format!("{}/", request.path)
        } else {
            return Ok(RawResponse::new(404));
        };
        if let Some(accept) = request.accept.as_deref() {
            if accept != TAXII_MEDIA_TYPE && accept != full_media_type() {
                return Ok(RawResponse::new(406));
            }
        }
        Ok(self.route(request, &path))
    }
}

/// Settings pointing at the in-memory server.
pub fn settings() -> SuiteSettings {
    SuiteSettings {
        url: "https://testlab.invalid/".to_string(),
        username: "testlab".to_string(),
        password: "secret".to_string(),
        ..SuiteSettings::default()
    }
}

/// Route suite logs through the test harness; `RUST_LOG` narrows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
