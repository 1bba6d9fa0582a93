//! Check reports and result accounting
//!
//! A run reply carries a list of check records. Each record starts with a
//! status and may update the file, line and report text that carry over to
//! later records. Records are handed to a [`ResultSink`] one at a time, the
//! previous record being flushed when the next status arrives and the last
//! one when the list ends.
//!
//! Counting follows the agent's convention: a status of 0 is one failed
//! check, a status of N is N passed asserts.

use tracing::{error, info, warn};

/// File name reported when a record carries none
pub const NO_FILE: &str = "no_file";
/// Report text used when a record carries none
pub const NO_REPORT: &str = "no_report";

/// One completed check as reported by the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// 0 for a failed check, N > 0 for N passed asserts, negative when no
    /// check was recorded
    pub status: i64,
    /// Source file of the check
    pub file: String,
    /// Source line of the check
    pub line: u32,
    /// Failure text
    pub report: String,
}

impl CheckReport {
    /// Report that precedes any record
    pub fn initial() -> Self {
        CheckReport {
            status: -1,
            file: NO_FILE.to_string(),
            line: 0,
            report: NO_REPORT.to_string(),
        }
    }

    /// The check failed
    pub fn is_failure(&self) -> bool {
        self.status == 0
    }

    /// No check location was recorded
    pub fn is_error(&self) -> bool {
        self.status < 0
    }
}

/// Receiver of check reports
pub trait ResultSink {
    /// Called once per flushed check record
    fn report(&mut self, check: &CheckReport);
}

impl<F> ResultSink for F
where
    F: FnMut(&CheckReport),
{
    fn report(&mut self, check: &CheckReport) {
        self(check)
    }
}

/// Sink that logs every report
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn report(&mut self, check: &CheckReport) {
        if check.is_error() {
            error!(target: "ktf::results", status = check.status, "Test reported no check results");
        } else if check.is_failure() {
            warn!(
                target: "ktf::results",
                file = %check.file,
                line = check.line,
                report = %check.report,
                "Check failed"
            );
        } else {
            info!(target: "ktf::results", asserts = check.status, "Checks passed");
        }
    }
}

/// Totals for one test run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Reports delivered to the sink
    pub checks: usize,
    /// Asserts counted
    pub asserts: u64,
    /// Failed checks counted
    pub failures: u64,
    /// Execution status reported by the agent, 0 when it ran the test
    pub exec_status: u32,
}

impl RunSummary {
    /// Every counted check passed and the agent ran the test
    pub fn passed(&self) -> bool {
        self.failures == 0 && self.exec_status == 0
    }

    /// Add another run's totals; the first nonzero execution status sticks
    pub fn merge(&mut self, other: &RunSummary) {
        self.checks += other.checks;
        self.asserts += other.asserts;
        self.failures += other.failures;
        if self.exec_status == 0 {
            self.exec_status = other.exec_status;
        }
    }
}

/// Builds check reports from the records of one run reply
pub(crate) struct RunAccumulator<'s> {
    sink: &'s mut dyn ResultSink,
    current: CheckReport,
    pending: bool,
    summary: RunSummary,
}

impl<'s> RunAccumulator<'s> {
    pub(crate) fn new(sink: &'s mut dyn ResultSink) -> Self {
        RunAccumulator {
            sink,
            current: CheckReport::initial(),
            pending: false,
            summary: RunSummary::default(),
        }
    }

    /// A new record begins; the previous one is complete
    pub(crate) fn status(&mut self, status: u32) {
        if self.pending {
            self.flush();
        }
        self.current.status = i64::from(status);
        self.pending = true;
        if status == 0 {
            self.summary.failures += 1;
            self.summary.asserts += 1;
        } else {
            self.summary.asserts += u64::from(status);
        }
    }

    pub(crate) fn file(&mut self, file: String) {
        self.current.file = if file.is_empty() { NO_FILE.to_string() } else { file };
    }

    pub(crate) fn line(&mut self, line: u32) {
        self.current.line = line;
    }

    pub(crate) fn report(&mut self, report: String) {
        self.current.report = if report.is_empty() { NO_REPORT.to_string() } else { report };
    }

    /// The list ended: deliver the last record, or the initial report if
    /// there was none
    pub(crate) fn finish(mut self, exec_status: u32) -> RunSummary {
        self.flush();
        self.summary.exec_status = exec_status;
        self.summary
    }

    fn flush(&mut self) {
        self.sink.report(&self.current);
        self.summary.checks += 1;
    }
}
