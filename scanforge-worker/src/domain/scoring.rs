//! Finding classification and security score
//!
//! Score is `100 - (high×10 + medium×5 + low×2 + informational×0.5)`, rounded
//! half to even and floored at zero. 100 is a clean target.

use scanforge_core::domain::{Percent, ScanAlert, ScanResults};

const HIGH_WEIGHT: f64 = 10.0;
const MEDIUM_WEIGHT: f64 = 5.0;
const LOW_WEIGHT: f64 = 2.0;
const INFORMATIONAL_WEIGHT: f64 = 0.5;

/// Ceiling reported while passive analysis still has records queued
const PASSIVE_CEILING: u64 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
    Informational,
}

impl Severity {
    /// Case-insensitive match on the engine's risk label. Anything unknown is
    /// informational.
    pub fn classify(risk: &str) -> Self {
        match risk.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Informational,
        }
    }
}

pub fn compute_score(high: u32, medium: u32, low: u32, informational: u32) -> u8 {
    let penalty = f64::from(high) * HIGH_WEIGHT
        + f64::from(medium) * MEDIUM_WEIGHT
        + f64::from(low) * LOW_WEIGHT
        + f64::from(informational) * INFORMATIONAL_WEIGHT;

    (100.0 - penalty).round_ties_even().clamp(0.0, 100.0) as u8
}

/// Count findings by severity and score them.
pub fn summarize(alerts: &[ScanAlert]) -> ScanResults {
    let (mut high, mut medium, mut low, mut informational) = (0u32, 0u32, 0u32, 0u32);
    for alert in alerts {
        match Severity::classify(&alert.severity) {
            Severity::High => high += 1,
            Severity::Medium => medium += 1,
            Severity::Low => low += 1,
            Severity::Informational => informational += 1,
        }
    }

    ScanResults {
        high,
        medium,
        low,
        informational,
        score: compute_score(high, medium, low, informational),
    }
}

/// Map the passive queue depth to a percentage that only reaches 100 once
/// the queue is empty.
pub fn passive_progress(remaining: u64) -> Percent {
    if remaining == 0 {
        return Percent::COMPLETE;
    }
    let value = 100u64.saturating_sub(remaining).min(PASSIVE_CEILING);
    Percent::new(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn alert(severity: &str) -> ScanAlert {
        ScanAlert {
            name: "Finding".into(),
            severity: severity.into(),
            url: String::new(),
            description: String::new(),
            solution: String::new(),
            cweid: String::new(),
            wascid: String::new(),
            confidence: String::new(),
            reference: String::new(),
        }
    }

    #[test]
    fn test_score_reference_points() {
        assert_eq!(compute_score(0, 0, 0, 0), 100);
        assert_eq!(compute_score(1, 0, 0, 0), 90);
        assert_eq!(compute_score(11, 0, 0, 0), 0);
        assert_eq!(compute_score(0, 2, 5, 0), 80);
    }

    #[test]
    fn test_half_points_round_to_even() {
        // 99.5 -> 100, 98.5 -> 98, 97.5 -> 98
        assert_eq!(compute_score(0, 0, 0, 1), 100);
        assert_eq!(compute_score(0, 0, 0, 3), 98);
        assert_eq!(compute_score(0, 0, 0, 5), 98);
    }

    #[test]
    fn test_classify_ignores_case() {
        assert_eq!(Severity::classify("HIGH"), Severity::High);
        assert_eq!(Severity::classify("Medium"), Severity::Medium);
        assert_eq!(Severity::classify("low"), Severity::Low);
        assert_eq!(Severity::classify("Informational"), Severity::Informational);
        assert_eq!(Severity::classify(""), Severity::Informational);
        assert_eq!(Severity::classify("critical"), Severity::Informational);
    }

    #[test]
    fn test_summarize_counts() {
        let alerts = vec![
            alert("High"),
            alert("medium"),
            alert("Medium"),
            alert("Low"),
            alert("Informational"),
            alert("False Positive"),
        ];
        let results = summarize(&alerts);
        assert_eq!(results.high, 1);
        assert_eq!(results.medium, 2);
        assert_eq!(results.low, 1);
        assert_eq!(results.informational, 2);
        assert_eq!(results.score, 100 - 10 - 10 - 2 - 1);
    }

    #[test]
    fn test_passive_progress_edges() {
        assert_eq!(passive_progress(0), Percent::COMPLETE);
        assert_eq!(passive_progress(1).value(), 95);
        assert_eq!(passive_progress(5).value(), 95);
        assert_eq!(passive_progress(40).value(), 60);
        assert_eq!(passive_progress(100).value(), 0);
        assert_eq!(passive_progress(10_000).value(), 0);
    }

    proptest! {
        #[test]
        fn prop_score_in_range(h in 0u32..500, m in 0u32..500, l in 0u32..500, i in 0u32..500) {
            let score = compute_score(h, m, l, i);
            prop_assert!(score <= 100);
        }

        #[test]
        fn prop_more_findings_never_raise_score(h in 0u32..50, m in 0u32..50, l in 0u32..50, i in 0u32..50) {
            let base = compute_score(h, m, l, i);
            prop_assert!(compute_score(h + 1, m, l, i) <= base);
            prop_assert!(compute_score(h, m + 1, l, i) <= base);
            prop_assert!(compute_score(h, m, l + 1, i) <= base);
            prop_assert!(compute_score(h, m, l, i + 1) <= base);
        }

        #[test]
        fn prop_passive_never_complete_while_queued(remaining in 1u64..1_000_000) {
            prop_assert!(!passive_progress(remaining).is_complete());
        }
    }
}
