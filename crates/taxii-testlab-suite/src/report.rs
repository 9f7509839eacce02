use serde::Serialize;

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct TestOutcome {
    pub group: String,
    pub id: String,
    pub title: String,
    pub problems: usize,
}

impl TestOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.problems == 0
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct SuiteReport {
    pub population_fingerprint: String,
    pub tests: Vec<TestOutcome>,
}

impl SuiteReport {
    #[must_use]
    pub fn total_problems(&self) -> usize {
        self.tests.iter().map(|test| test.problems).sum()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.total_problems() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.tests.iter().filter(|test| !test.passed())
    }

    #[must_use]
    pub fn find(&self, group: &str, id: &str) -> Option<&TestOutcome> {
        self.tests.iter().find(|test| test.group == group && test.id == id)
    }
}

/// Per-test problem counter.
///
/// Problems accumulate between [`Recorder::begin`] and [`Recorder::finish`];
/// `finish` logs the summary line, records the outcome and zeroes the counter.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    group: String,
    current: Option<(String, String)>,
    problems: usize,
    outcomes: Vec<TestOutcome>,
}

impl Recorder {
    pub(crate) fn group(&mut self, name: &str) {
        tracing::info!("== Testing {name}");
        self.group = name.to_string();
    }

    pub(crate) fn begin(&mut self, id: &str, title: &str) {
        tracing::info!("== Test {id}: {title}");
        self.current = Some((id.to_string(), title.to_string()));
        self.problems = 0;
    }

    pub(crate) fn add(&mut self, problems: usize) {
        self.problems += problems;
    }

    pub(crate) fn error(&mut self, message: &str) {
        tracing::warn!("-- ERROR: {message}");
        self.problems += 1;
    }

    #[cfg(test)]
    pub(crate) fn problems(&self) -> usize {
        self.problems
    }

    pub(crate) fn finish(&mut self) {
        match self.problems {
            0 => tracing::info!("== SUCCESS: This test completed successfully"),
            1 => tracing::info!("== FAILURE: 1 problem found in this test"),
            n => tracing::info!("== FAILURE: {n} problems found in this test"),
        }
        if let Some((id, title)) = self.current.take() {
            self.outcomes.push(TestOutcome {
                group: self.group.clone(),
                id,
                title,
                problems: self.problems,
            });
        }
        self.problems = 0;
    }

    pub(crate) fn into_outcomes(self) -> Vec<TestOutcome> {
        self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_records_the_outcome_and_zeroes_the_counter() {
        let mut recorder = Recorder::default();
        recorder.group("Discovery Service");
        recorder.begin("BE-01", "No authentication test");
        recorder.error("Expected HTTP response code 401. Got 200");
        recorder.add(2);
        assert_eq!(recorder.problems(), 3);
        recorder.finish();
        assert_eq!(recorder.problems(), 0);

        recorder.begin("BE-02", "Wrong authentication test");
        recorder.finish();

        let report = SuiteReport { population_fingerprint: String::new(), tests: recorder.into_outcomes() };
        assert_eq!(report.total_problems(), 3);
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.find("Discovery Service", "BE-02").map(TestOutcome::passed), Some(true));
    }
}
