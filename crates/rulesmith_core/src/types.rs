use std::fmt;
use std::time::Duration;

/// One source rule awaiting conversion. Created by the input enumerator,
/// consumed exactly once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleItem {
    /// Source identifier, typically the file name.
    pub name: String,
    /// Raw rule text, passed to the remote tool verbatim.
    pub content: String,
    /// Declared source format, e.g. the file extension, when known.
    pub format: Option<String>,
}

impl RuleItem {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStatus {
    /// Both sections generated.
    Success,
    /// One section generated, the other carries an inlined error note.
    Partial,
    /// No usable section was generated.
    Failed,
}

impl ConversionStatus {
    /// Whether this outcome counts toward `succeeded` in the run totals.
    /// Partial results carry an error and count as failed.
    pub fn counts_as_success(self) -> bool {
        matches!(self, ConversionStatus::Success)
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionStatus::Success => write!(f, "success"),
            ConversionStatus::Partial => write!(f, "partial"),
            ConversionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of converting one rule item. Exactly one exists per submitted item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub name: String,
    pub status: ConversionStatus,
    /// Assembled artifact text, present unless nothing was generated.
    pub artifact: Option<String>,
    /// Error detail for failed or partial conversions, verbatim.
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ConversionResult {
    pub fn success(name: impl Into<String>, artifact: String, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            status: ConversionStatus::Success,
            artifact: Some(artifact),
            error: None,
            elapsed,
        }
    }

    pub fn partial(
        name: impl Into<String>,
        artifact: String,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            status: ConversionStatus::Partial,
            artifact: Some(artifact),
            error: Some(error.into()),
            elapsed,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            status: ConversionStatus::Failed,
            artifact: None,
            error: Some(error.into()),
            elapsed,
        }
    }
}

/// Final, ordered record of every item's outcome for one batch execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Per-item results in original input order.
    pub results: Vec<ConversionResult>,
    pub duration: Duration,
}

impl RunSummary {
    /// Build the summary from results already sorted into input order.
    /// Counts are derived, so `succeeded + failed == total` by construction.
    pub fn from_results(results: Vec<ConversionResult>, duration: Duration) -> Self {
        let total = results.len();
        let succeeded = results
            .iter()
            .filter(|r| r.status.counts_as_success())
            .count();
        Self {
            total,
            succeeded,
            failed: total - succeeded,
            results,
            duration,
        }
    }

    pub fn success_rate(&self) -> f64 {
        (self.succeeded as f64 / self.total.max(1) as f64) * 100.0
    }
}
