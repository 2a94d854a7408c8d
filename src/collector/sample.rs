use serde::Serialize;

use super::memory::MemoryDelta;
use crate::http::body::RequestOutcome;

/// One request's timing, memory, and status observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    pub request_id: String,
    /// Unix epoch milliseconds at request entry.
    pub started_at_ms: u64,
    pub method: String,
    pub route: String,
    pub status_code: u16,
    pub duration_ms: u64,
    pub memory_delta: MemoryDelta,
    pub slow: bool,
    pub caller_role: String,
    pub outcome: RequestOutcome,
}

impl PerformanceSample {
    pub fn level(&self) -> PerformanceLevel {
        PerformanceLevel::from_duration_ms(self.duration_ms)
    }
}

/// Coarse latency grade reported in `X-Performance-Level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceLevel {
    pub fn from_duration_ms(duration_ms: u64) -> Self {
        match duration_ms {
            d if d > 1000 => Self::Poor,
            d if d > 500 => Self::Fair,
            d if d > 200 => Self::Good,
            _ => Self::Excellent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}
