use taxii_testlab_client::{AuthMode, RawResponse, Transport};

use crate::runner::Suite;
use crate::settings::{full_media_type, TAXII_MEDIA_TYPE};
use crate::SuiteError;

const INVALID_ACCEPT: [&str; 2] = ["", "application/foo"];

impl<T: Transport> Suite<T> {
    /// BE-01 through BE-07: authentication, trailing slash and content negotiation.
    ///
    /// Every probe is derived fresh from the request template.
    pub(crate) fn basic_endpoint_tests(&mut self, path: &str) -> Result<(), SuiteError> {
        let full = full_media_type();
        let valid_accept = [TAXII_MEDIA_TYPE.to_string(), full.clone()];

        self.recorder.begin("BE-01", "No authentication test");
        tracing::debug!("++ This test will send no credentials and check that a 401 or 404 status code is returned");
        let request = self.template.probe(path).accept(&full).auth(AuthMode::None).build();
        let response = self.send(&request)?;
        self.check_status(&response, &[401, 404]);
        self.recorder.finish();

        self.recorder.begin("BE-02", "Wrong authentication test");
        tracing::debug!("++ This test will send an incorrect password and check that a 401 or 404 status code is returned");
        let request = self.template.probe(path).accept(&full).auth(AuthMode::Wrong).build();
        let response = self.send(&request)?;
        self.check_status(&response, &[401, 404]);
        self.recorder.finish();

        self.recorder.begin("BE-03", "Test successful authentication");
        tracing::debug!("++ This test will send correct credentials and check that a 200 status code is returned");
        let request = self.template.probe(path).accept(&full).build();
        let response = self.send(&request)?;
        self.check_status(&response, &[200]);
        self.recorder.finish();

        self.recorder.begin("BE-04", "Test missing trailing slash");
        tracing::debug!("++ This test will request the path without its trailing slash and check that a 404 status code is returned");
        let request = self.template.probe(path).accept(&full).without_trailing_slash().build();
        let response = self.send(&request)?;
        self.check_status(&response, &[404]);
        self.recorder.finish();

        self.recorder.begin("BE-05", "Test invalid media types in Accept");
        tracing::debug!("++ This test will send invalid Accept media types and check that a 406 status code is returned for each");
        for accept in INVALID_ACCEPT {
            let request = self.template.probe(path).accept(accept).build();
            let response = self.send(&request)?;
            self.check_status(&response, &[406]);
        }
        self.recorder.finish();

        self.recorder.begin("BE-06", "Test valid media types in Accept");
        tracing::debug!("++ This test will send valid Accept media types and check that a 200 status code is returned for each");
        for accept in &valid_accept {
            let request = self.template.probe(path).accept(accept).build();
            let response = self.send(&request)?;
            self.check_status(&response, &[200]);
        }
        self.recorder.finish();

        self.recorder.begin("BE-07", "Test valid media type in Content-Type");
        tracing::debug!("++ This test will send valid Accept media types and check that the full media type is returned in Content-Type");
        for accept in &valid_accept {
            let request = self.template.probe(path).accept(accept).build();
            let response = self.send(&request)?;
            self.check_content_type(&response, &full);
        }
        self.recorder.finish();

        Ok(())
    }

    pub(crate) fn check_status(&mut self, response: &RawResponse, expected: &[u16]) {
        if expected.contains(&response.status) {
            return;
        }
        let wanted = expected.iter().map(ToString::to_string).collect::<Vec<_>>().join(" or ");
        self.recorder.error(&format!(
            "Expected HTTP response code {wanted}. Got {}",
            response.status
        ));
    }

    pub(crate) fn check_content_type(&mut self, response: &RawResponse, expected: &str) {
        let actual = response.content_type().unwrap_or_default();
        if actual != expected {
            self.recorder.error(&format!("Expected HTTP content type {expected}. Got {actual}"));
        }
    }
}
