//! Local mirror of a remote scan job and the state machine driven by polling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of remote scan being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    Spider,
    AjaxSpider,
    ActiveScan,
}

impl JobKind {
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Spider => "Spider",
            JobKind::AjaxSpider => "AJAX spider",
            JobKind::ActiveScan => "Active scan",
        }
    }

    /// The AJAX spider reports running/stopped instead of a percentage.
    pub fn reports_percent(&self) -> bool {
        !matches!(self, JobKind::AjaxSpider)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A started remote scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob {
    pub id: String,
    pub kind: JobKind,
    pub target: String,
}

impl ScanJob {
    /// Accept a start handle only if it is a non-empty run of ASCII digits.
    pub fn from_handle(kind: JobKind, target: &str, handle: &str) -> Option<ScanJob> {
        let handle = handle.trim();
        is_valid_handle(handle).then(|| ScanJob {
            id: handle.to_string(),
            kind,
            target: target.to_string(),
        })
    }

    /// The AJAX spider is a singleton on the scanner side and has no id.
    pub fn ajax(target: &str) -> ScanJob {
        ScanJob {
            id: String::new(),
            kind: JobKind::AjaxSpider,
            target: target.to_string(),
        }
    }
}

pub fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty() && handle.bytes().all(|b| b.is_ascii_digit())
}

/// One status read, interpreted for the job's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReading {
    Progress(u8),
    Running,
    Finished,
    /// Eviction sentinel such as `does_not_exist`, or anything else unexpected.
    Unrecognized(String),
}

impl StatusReading {
    pub fn parse(kind: JobKind, raw: &str) -> StatusReading {
        let value = raw.trim();
        if kind.reports_percent() {
            if !is_valid_handle(value) {
                return StatusReading::Unrecognized(value.to_string());
            }
            // Digits only, so the parse can only fail on overflow.
            let pct = value.parse::<u64>().unwrap_or(u64::MAX).min(100) as u8;
            StatusReading::Progress(pct)
        } else {
            match value {
                "running" => StatusReading::Running,
                "stopped" => StatusReading::Finished,
                other => StatusReading::Unrecognized(other.to_string()),
            }
        }
    }
}

/// `NotStarted -> Running -> {Completed, Vanished, TimedOut}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    NotStarted,
    Running { progress: Option<u8>, polls: u32 },
    Completed { polls: u32 },
    Vanished { status: String, polls: u32 },
    TimedOut { polls: u32 },
}

impl JobState {
    pub fn start() -> JobState {
        JobState::Running {
            progress: None,
            polls: 0,
        }
    }

    /// Apply one status read. Terminal states absorb further reads.
    pub fn observe(self, reading: StatusReading) -> JobState {
        let (progress, polls) = match self {
            JobState::Running { progress, polls } => (progress, polls),
            other => return other,
        };
        let polls = polls + 1;
        match reading {
            StatusReading::Progress(pct) if pct >= 100 => JobState::Completed { polls },
            // Progress never goes backwards once observed.
            StatusReading::Progress(pct) => JobState::Running {
                progress: Some(progress.map_or(pct, |prev| prev.max(pct))),
                polls,
            },
            StatusReading::Running => JobState::Running { progress, polls },
            StatusReading::Finished => JobState::Completed { polls },
            StatusReading::Unrecognized(status) => JobState::Vanished { status, polls },
        }
    }

    /// Give up on a running job once its wall-clock ceiling has passed.
    pub fn time_out(self) -> JobState {
        match self {
            JobState::Running { polls, .. } => JobState::TimedOut { polls },
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed { .. } | JobState::Vanished { .. } | JobState::TimedOut { .. }
        )
    }

    pub fn progress(&self) -> Option<u8> {
        match self {
            JobState::Running { progress, .. } => *progress,
            JobState::Completed { .. } => Some(100),
            _ => None,
        }
    }

    pub fn polls(&self) -> u32 {
        match self {
            JobState::NotStarted => 0,
            JobState::Running { polls, .. }
            | JobState::Completed { polls }
            | JobState::Vanished { polls, .. }
            | JobState::TimedOut { polls } => *polls,
        }
    }
}

/// How a phase ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PhaseOutcome {
    /// The start call returned an unusable handle; the phase was skipped.
    NotStarted { handle: String },
    Completed { polls: u32 },
    Vanished { status: String, polls: u32 },
    TimedOut { polls: u32, elapsed_secs: u64 },
}

impl PhaseOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PhaseOutcome::NotStarted { .. } => "not started",
            PhaseOutcome::Completed { .. } => "completed",
            PhaseOutcome::Vanished { .. } => "vanished",
            PhaseOutcome::TimedOut { .. } => "timed out",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PhaseOutcome::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(kind: JobKind, statuses: &[&str]) -> (JobState, usize) {
        let mut state = JobState::start();
        for (i, raw) in statuses.iter().enumerate() {
            state = state.observe(StatusReading::parse(kind, raw));
            if state.is_terminal() {
                return (state, i + 1);
            }
        }
        (state, statuses.len())
    }

    #[test]
    fn test_handle_validation() {
        assert!(ScanJob::from_handle(JobKind::ActiveScan, "http://t", "3").is_some());
        assert!(ScanJob::from_handle(JobKind::ActiveScan, "http://t", " 12 ").is_some());
        assert!(ScanJob::from_handle(JobKind::ActiveScan, "http://t", "").is_none());
        assert!(ScanJob::from_handle(JobKind::ActiveScan, "http://t", "url_not_found").is_none());
        assert!(ScanJob::from_handle(JobKind::Spider, "http://t", "-1").is_none());
    }

    #[test]
    fn test_completes_on_first_hundred() {
        let (state, reads) = run(JobKind::Spider, &["0", "40", "100", "100"]);
        assert_eq!(state, JobState::Completed { polls: 3 });
        assert_eq!(reads, 3);
    }

    #[test]
    fn test_vanishes_on_first_non_numeric() {
        let (state, reads) = run(JobKind::ActiveScan, &["0", "does_not_exist", "50"]);
        assert_eq!(
            state,
            JobState::Vanished {
                status: "does_not_exist".into(),
                polls: 2
            }
        );
        assert_eq!(reads, 2);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let state = JobState::start()
            .observe(StatusReading::Progress(60))
            .observe(StatusReading::Progress(30));
        assert_eq!(state.progress(), Some(60));
        assert_eq!(state.polls(), 2);
    }

    #[test]
    fn test_ajax_running_then_stopped() {
        let (state, _) = run(JobKind::AjaxSpider, &["running", "running", "stopped"]);
        assert_eq!(state, JobState::Completed { polls: 3 });
        let (state, _) = run(JobKind::AjaxSpider, &["running", "weird"]);
        assert!(matches!(state, JobState::Vanished { .. }));
    }

    #[test]
    fn test_time_out_only_from_running() {
        let running = JobState::start().observe(StatusReading::Running);
        assert_eq!(running.time_out(), JobState::TimedOut { polls: 1 });
        let done = JobState::Completed { polls: 4 };
        assert_eq!(done.clone().time_out(), done);
        assert_eq!(JobState::NotStarted.observe(StatusReading::Finished), JobState::NotStarted);
    }

    #[test]
    fn test_percent_overflow_clamps() {
        assert_eq!(
            StatusReading::parse(JobKind::Spider, "250"),
            StatusReading::Progress(100)
        );
        assert_eq!(
            StatusReading::parse(JobKind::Spider, "99999999999999999999999"),
            StatusReading::Progress(100)
        );
    }
}
