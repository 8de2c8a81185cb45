//! Scan-level engine policy

use serde::Serialize;

use scanforge_core::domain::ScanLevel;

/// Engine knobs derived from the requested scan level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanPolicy {
    /// Active scanner threads per host
    pub threads_per_host: u32,
    /// Active scan ceiling in minutes, 0 for unlimited
    pub max_duration_minutes: u32,
    /// Crawl breadth limit
    pub max_children: u32,
}

impl ScanPolicy {
    pub fn for_level(level: ScanLevel) -> Self {
        match level {
            ScanLevel::Light => Self {
                threads_per_host: 2,
                max_duration_minutes: 10,
                max_children: 10,
            },
            ScanLevel::Deep => Self {
                threads_per_host: 5,
                max_duration_minutes: 30,
                max_children: 50,
            },
            ScanLevel::Aggressive => Self {
                threads_per_host: 10,
                max_duration_minutes: 0,
                max_children: 100,
            },
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_duration_minutes == 0
    }
}
