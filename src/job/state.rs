//! Job kinds and lifecycle states

use std::fmt;

/// Kind of remote job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Query into the cache table
    Query,
    /// Export of the cache table to Cloud Storage
    Export,
}

impl JobKind {
    /// Logged when the job is submitted
    pub fn start_message(&self) -> &'static str {
        match self {
            JobKind::Query => "Query start",
            JobKind::Export => "Data extraction start",
        }
    }

    /// Logged when the job reaches `DONE`
    pub fn finish_message(&self) -> &'static str {
        match self {
            JobKind::Query => "Query finished",
            JobKind::Export => "Data extraction finished",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Query => write!(f, "query"),
            JobKind::Export => write!(f, "export"),
        }
    }
}

/// Local view of a job's lifecycle.
///
/// `Created -> Submitted -> {Pending <-> Running} -> Done`, or `Failed` from
/// any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Built, not sent yet
    Created,
    /// Submission accepted
    Submitted,
    /// Queued remotely
    Pending,
    /// Executing remotely
    Running,
    /// Finished without job-level errors
    Done,
    /// Failed remotely or locally
    Failed,
}

impl JobState {
    /// State reported in a job body's `status.state`.
    ///
    /// Anything other than `PENDING` or `RUNNING` ends polling.
    pub fn from_body(body: &serde_json::Value) -> Self {
        match body
            .get("status")
            .and_then(|status| status.get("state"))
            .and_then(|state| state.as_str())
        {
            Some("PENDING") => JobState::Pending,
            Some("RUNNING") => JobState::Running,
            _ => JobState::Done,
        }
    }

    /// Whether the remote job is still in progress
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Pending | JobState::Running)
    }
}
