use crate::analysis::range::Interval;

/// Observer for the pass's diagnostic surface.
///
/// Invoked once per function with the joined range summary, after the
/// rewrite completes. Observational only: implementations must not feed
/// anything back into compilation.
pub trait Reporter {
    /// `ranges` pairs each value's display name with its joined interval,
    /// ordered by declaration.
    fn ranges(&mut self, func: &str, ranges: &[(String, Interval)]);
}

/// Discards all reports. The default when no observer is injected.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn ranges(&mut self, _func: &str, _ranges: &[(String, Interval)]) {}
}

/// Collects reports into memory, for tooling and tests.
#[derive(Default)]
pub struct CollectingReporter {
    pub reports: Vec<(String, Vec<(String, Interval)>)>,
}

impl Reporter for CollectingReporter {
    fn ranges(&mut self, func: &str, ranges: &[(String, Interval)]) {
        self.reports.push((func.to_owned(), ranges.to_vec()));
    }
}
