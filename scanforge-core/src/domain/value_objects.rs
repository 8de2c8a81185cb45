//! Scan job value objects

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight characters of the hyphenated id, used for worker names.
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(8).collect()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job record created, no worker yet
    Queued,
    /// Worker process launched
    Dispatched,
    /// Worker reported that it started scanning
    Running,
    /// Scan finished and results were written
    Completed,
    /// Scan failed, `error_message` is set
    Failed,
    /// Cancelled by the caller
    Cancelled,
}

impl JobStatus {
    /// Returns the set of valid target states from the current state.
    ///
    /// ```text
    /// Queued ──► Dispatched ──► Running ──► Completed
    ///   │  └──────────────────────►│
    ///   └──► Failed / Cancelled ◄──┘
    /// ```
    ///
    /// `Queued → Running` exists because a worker can report that it started
    /// before the dispatcher has recorded its container handle.
    pub fn valid_transitions(&self) -> &[JobStatus] {
        match self {
            Self::Queued => &[Self::Dispatched, Self::Running, Self::Failed, Self::Cancelled],
            Self::Dispatched => &[Self::Running, Self::Failed, Self::Cancelled],
            Self::Running => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    /// Check whether transitioning to `target` is allowed from the current state.
    pub fn can_transition_to(&self, target: &JobStatus) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Whether this status represents a terminal (final) state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Dispatched => "dispatched",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an invalid status transition is attempted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid job transition from {from} to {to}")]
pub struct JobTransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Where the job request came from. Never changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobSource {
    /// Requested through the tool interface
    #[serde(rename = "mcp")]
    Mcp,
    /// Requested by the application scanner, usually with a linked scan record
    #[serde(rename = "app-scanner")]
    AppScanner,
}

/// Scan intensity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanLevel {
    /// Crawl plus passive analysis only
    #[default]
    Light,
    /// Crawl plus active scan with a duration ceiling
    Deep,
    /// Crawl plus active scan without a duration ceiling
    Aggressive,
}

impl ScanLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Deep => "deep",
            Self::Aggressive => "aggressive",
        }
    }

    /// Whether this level runs the active vulnerability scan.
    pub fn runs_active_scan(&self) -> bool {
        !matches!(self, Self::Light)
    }
}

impl fmt::Display for ScanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised scan level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid scan_level: {0}. Use light, deep, or aggressive.")]
pub struct InvalidScanLevel(pub String);

impl FromStr for ScanLevel {
    type Err = InvalidScanLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "deep" => Ok(Self::Deep),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(InvalidScanLevel(s.to_string())),
        }
    }
}

/// Named sub-stage of a scan, reported through progress.
///
/// Unknown phase names survive a round trip as [`ScanPhase::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScanPhase {
    #[default]
    Queued,
    Starting,
    Crawling,
    Scanning,
    Completed,
    Failed,
    Other(String),
}

impl ScanPhase {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Starting => "starting",
            Self::Crawling => "crawling",
            Self::Scanning => "scanning",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ScanPhase {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => Self::Queued,
            "starting" => Self::Starting,
            "crawling" => Self::Crawling,
            "scanning" => Self::Scanning,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<ScanPhase> for String {
    fn from(value: ScanPhase) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A percentage clamped to `0..=100`.
///
/// Clamping also applies on deserialization, so out-of-range values read
/// back from a store are normalised at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const COMPLETE: Percent = Percent(100);

    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 >= 100
    }
}

impl From<i64> for Percent {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_transitions() {
        for status in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(status.valid_transitions().is_empty());
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        assert!(JobStatus::Queued.can_transition_to(&JobStatus::Dispatched));
        assert!(JobStatus::Dispatched.can_transition_to(&JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(&JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(&JobStatus::Failed));
    }

    #[test]
    fn test_completed_only_reachable_from_running() {
        assert!(!JobStatus::Queued.can_transition_to(&JobStatus::Completed));
        assert!(!JobStatus::Dispatched.can_transition_to(&JobStatus::Completed));
    }

    #[test]
    fn test_cancel_from_every_pre_terminal_state() {
        for status in [JobStatus::Queued, JobStatus::Dispatched, JobStatus::Running] {
            assert!(status.can_transition_to(&JobStatus::Cancelled));
        }
    }

    #[test]
    fn test_no_backwards_transitions() {
        assert!(!JobStatus::Running.can_transition_to(&JobStatus::Dispatched));
        assert!(!JobStatus::Dispatched.can_transition_to(&JobStatus::Queued));
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Dispatched).unwrap(),
            "\"dispatched\""
        );
        let status: JobStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, JobStatus::Cancelled);
    }

    #[test]
    fn test_scan_level_parsing() {
        assert_eq!("LIGHT".parse::<ScanLevel>().unwrap(), ScanLevel::Light);
        assert_eq!(" Deep ".parse::<ScanLevel>().unwrap(), ScanLevel::Deep);
        assert_eq!(
            "aggressive".parse::<ScanLevel>().unwrap(),
            ScanLevel::Aggressive
        );

        let err = "invalid".parse::<ScanLevel>().unwrap_err();
        assert!(err.to_string().contains("Invalid scan_level: invalid"));
    }

    #[test]
    fn test_source_wire_format() {
        assert_eq!(serde_json::to_string(&JobSource::Mcp).unwrap(), "\"mcp\"");
        assert_eq!(
            serde_json::to_string(&JobSource::AppScanner).unwrap(),
            "\"app-scanner\""
        );
    }

    #[test]
    fn test_unknown_phase_round_trips() {
        let phase: ScanPhase = serde_json::from_str("\"analysing\"").unwrap();
        assert_eq!(phase, ScanPhase::Other("analysing".into()));
        assert_eq!(serde_json::to_string(&phase).unwrap(), "\"analysing\"");

        let phase: ScanPhase = serde_json::from_str("\"crawling\"").unwrap();
        assert_eq!(phase, ScanPhase::Crawling);
    }

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(Percent::new(-5).value(), 0);
        assert_eq!(Percent::new(250).value(), 100);
        assert_eq!(Percent::new(42).value(), 42);

        let parsed: Percent = serde_json::from_str("140").unwrap();
        assert_eq!(parsed, Percent::COMPLETE);
        assert_eq!(serde_json::to_string(&Percent::new(7)).unwrap(), "7");
    }

    proptest::proptest! {
        #[test]
        fn prop_percent_always_in_range(raw in proptest::num::i64::ANY) {
            let percent = Percent::new(raw);
            proptest::prop_assert!(percent.value() <= 100);
            if (0..=100).contains(&raw) {
                proptest::prop_assert_eq!(i64::from(percent.value()), raw);
            }
        }
    }

    #[test]
    fn test_job_id_short() {
        let id: JobId = "abcdef12-3456-7890-abcd-ef1234567890".parse().unwrap();
        assert_eq!(id.short(), "abcdef12");
    }
}
