use serde::de::DeserializeOwned;
use serde::Serialize;
use taxii_testlab_client::{PreparedRequest, RawResponse, RequestTemplate, Transport};
use taxii_testlab_core::testlab::{Testlab, INDICATOR_1_ID};
use taxii_testlab_core::{
    decode_envelope, decode_resource, encode_pretty, evaluate_in, validate_objects, ApiRoot,
    CollectionFixture, CollectionResource, Collections, Discovery, ItemVerdict, StructuralCompare, ValidationReport,
};

use crate::report::{Recorder, SuiteReport};
use crate::scenarios::{object_by_id_scenarios, objects_scenarios, FilterScenario};
use crate::settings::{full_media_type, SuiteSettings};
use crate::SuiteError;

/// Sequential conformance run against one TAXII server.
pub struct Suite<T: Transport> {
    pub(crate) settings: SuiteSettings,
    pub(crate) template: RequestTemplate,
    pub(crate) transport: T,
    pub(crate) lab: Testlab,
    pub(crate) recorder: Recorder,
}

impl<T: Transport> Suite<T> {
    /// # Errors
    /// Returns [`SuiteError::Settings`] for invalid settings and
    /// [`SuiteError::Core`] if the reference data cannot be built.
    pub fn new(settings: SuiteSettings, transport: T) -> Result<Self, SuiteError> {
        settings.validate()?;
        Ok(Self {
            template: settings.request_template(),
            lab: Testlab::build()?,
            settings,
            transport,
            recorder: Recorder::default(),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &SuiteSettings {
        &self.settings
    }

    /// Run every endpoint group in order.
    ///
    /// # Errors
    /// Returns [`SuiteError::Transport`] as soon as any request fails to get a
    /// response; later groups are not run.
    pub fn run(mut self) -> Result<SuiteReport, SuiteError> {
        let population_fingerprint = self.lab.population.fingerprint()?;
        tracing::info!(fingerprint = %population_fingerprint, url = %self.settings.url, "starting TestLab run");

        self.test_discovery()?;
        self.test_api_root()?;
        self.test_collections()?;
        let collections = [
            ("Read-Only Collection Service", "C2", self.settings.read_only.clone(), self.lab.read_only.clone()),
            ("Write-Only Collection Service", "C3", self.settings.write_only.clone(), self.lab.write_only.clone()),
            ("Read-Write Collection Service", "C4", self.settings.read_write.clone(), self.lab.read_write.clone()),
        ];
        for (group, id, collection_id, expected) in &collections {
            self.test_collection(group, id, collection_id, expected)?;
        }
        self.test_objects()?;
        self.test_object_by_id()?;

        let report = SuiteReport { population_fingerprint, tests: self.recorder.into_outcomes() };
        tracing::info!(
            tests = report.tests.len(),
            failed = report.failures().count(),
            problems = report.total_problems(),
            "TestLab run complete"
        );
        Ok(report)
    }

    pub(crate) fn send(&self, request: &PreparedRequest) -> Result<RawResponse, SuiteError> {
        tracing::debug!("++ Calling Path: {}", request.path);
        if !request.query.is_empty() {
            tracing::debug!("++ Query Params: {}", request.display_url());
        }
        Ok(self.transport.send(request)?)
    }

    fn test_discovery(&mut self) -> Result<(), SuiteError> {
        let path = self.settings.discovery_path();
        self.recorder.group("Discovery Service");
        self.basic_endpoint_tests(&path)?;
        self.resource_test::<Discovery>("D1", "Test successful response from discovery endpoint", &path)?;
        self.recorder.finish();
        Ok(())
    }

    fn test_api_root(&mut self) -> Result<(), SuiteError> {
        let path = self.settings.api_root_path();
        self.recorder.group("API Root Service");
        self.basic_endpoint_tests(&path)?;
        self.resource_test::<ApiRoot>("A1", "Test successful response from api root endpoint", &path)?;
        self.recorder.finish();
        Ok(())
    }

    fn test_collections(&mut self) -> Result<(), SuiteError> {
        let path = self.settings.collections_path();
        self.recorder.group("Collections Service");
        self.basic_endpoint_tests(&path)?;
        self.resource_test::<Collections>("C1", "Test successful response from collections endpoint", &path)?;
        self.recorder.finish();
        Ok(())
    }

    fn test_collection(
        &mut self,
        group: &str,
        id: &str,
        collection_id: &str,
        expected: &CollectionFixture,
    ) -> Result<(), SuiteError> {
        let path = self.settings.collection_path(collection_id);
        self.recorder.group(group);
        self.basic_endpoint_tests(&path)?;
        if let Some(scope) = expected.access_scope() {
            tracing::debug!("++ Expected access for collection {collection_id}: {}", scope.as_str());
        }

        let title = format!("Test successful response from {} endpoint", group.trim_end_matches(" Service").to_lowercase());
        if let Some(actual) = self.resource_test::<CollectionResource>(id, &title, &path)? {
            let outcome = expected.resource.compare(&actual, self.settings.compare_depth);
            for line in &outcome.diff_lines {
                tracing::trace!("-- {line}");
            }
            if !outcome.is_match {
                tracing::warn!("-- ERROR: Returned collection {} does not match expected", actual.id);
            }
            self.recorder.add(outcome.mismatch_count);
        }
        self.recorder.finish();
        Ok(())
    }

    /// GET a TAXII resource, check the status and decode it.
    ///
    /// Leaves the test open so callers can add checks before finishing it.
    fn resource_test<R>(&mut self, id: &str, title: &str, path: &str) -> Result<Option<R>, SuiteError>
    where
        R: DeserializeOwned + Serialize,
    {
        self.recorder.begin(id, title);
        let request = self.template.probe(path).accept(&full_media_type()).build();
        let response = self.send(&request)?;
        self.check_status(&response, &[200]);

        match decode_resource::<R>(&response.body) {
            Ok(resource) => {
                if let Ok(dump) = encode_pretty(&resource) {
                    tracing::trace!("++ Resource Returned:\n{dump}");
                }
                Ok(Some(resource))
            }
            Err(err) => {
                self.recorder.error(&format!("Invalid resource returned: {err}"));
                tracing::trace!("++ Body Returned:\n{}", response.body_text());
                Ok(None)
            }
        }
    }

    fn test_objects(&mut self) -> Result<(), SuiteError> {
        let path = self.settings.objects_path(&self.settings.read_only);
        self.recorder.group("Read-Only Objects Service");
        self.basic_endpoint_tests(&path)?;
        for scenario in objects_scenarios()? {
            self.filter_test(&path, &scenario)?;
        }
        Ok(())
    }

    fn test_object_by_id(&mut self) -> Result<(), SuiteError> {
        let path = self.settings.object_path(&self.settings.read_only, INDICATOR_1_ID);
        self.recorder.group("Read-Only Object By ID Service");
        self.basic_endpoint_tests(&path)?;
        for scenario in object_by_id_scenarios(INDICATOR_1_ID)? {
            self.filter_test(&path, &scenario)?;
        }
        Ok(())
    }

    fn filter_test(&mut self, path: &str, scenario: &FilterScenario) -> Result<(), SuiteError> {
        self.recorder.begin(&scenario.id, scenario.title);
        tracing::debug!("++ {}", scenario.summary);

        let request = self
            .template
            .probe(path)
            .accept(&full_media_type())
            .queries(scenario.query.to_query_pairs())
            .build();
        let response = self.send(&request)?;
        self.check_status(&response, &[200]);

        let envelope = match decode_envelope(&response.body) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.recorder.error(&format!("Invalid envelope returned: {err}"));
                tracing::trace!("++ Body Returned:\n{}", response.body_text());
                self.recorder.finish();
                return Ok(());
            }
        };

        let expected = evaluate_in(&self.lab.population, &self.lab.read_only, &scenario.effective_filter());
        let report = validate_objects(&envelope.objects, &expected, self.settings.validation_options());
        log_verdicts(&report);
        self.recorder.add(report.problems());

        tracing::debug!("++ Number objects returned: {}", report.actual_count);
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&response.body) {
            if let Ok(dump) = encode_pretty(&value) {
                tracing::trace!("++ Envelope Resource Returned:\n{dump}");
            }
        }
        self.recorder.finish();
        Ok(())
    }
}

fn log_verdicts(report: &ValidationReport) {
    for verdict in &report.verdicts {
        match verdict {
            ItemVerdict::Matched { position, id } => {
                tracing::debug!("++ Returned object {id} at position {position} matches expected");
            }
            ItemVerdict::Mismatched { position, id, diff_lines, .. } => {
                for line in diff_lines {
                    tracing::trace!("-- {line}");
                }
                tracing::warn!("-- ERROR: Returned object {id} at position {position} does not match expected");
            }
            ItemVerdict::Skipped { position, reason } => {
                tracing::debug!("++ Skipped object at position {position}: {reason}");
            }
            ItemVerdict::Unexpected { position, id, modified } => {
                tracing::warn!("-- ERROR: Returned object {id} version {modified:?} at position {position} was not expected");
            }
            ItemVerdict::Missing { id, modified } => {
                tracing::warn!("-- ERROR: Expected object {id} version {modified:?} was not returned");
            }
        }
    }
}
