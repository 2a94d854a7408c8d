//! Process memory probing.
//!
//! # Responsibilities
//! - Read resident and virtual size from the process table
//! - Read heap counters from the tracking allocator
//! - Diff two snapshots counter by counter

use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, System};

use super::alloc;

/// Point-in-time process memory counters, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub heap_live_bytes: u64,
    pub heap_allocated_bytes: u64,
}

/// Signed per-counter difference between two `MemoryUsage` snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDelta {
    pub rss_bytes: i64,
    pub virtual_bytes: i64,
    pub heap_live_bytes: i64,
    pub heap_allocated_bytes: i64,
}

impl MemoryUsage {
    /// `self - earlier`, per counter.
    pub fn delta_since(&self, earlier: &MemoryUsage) -> MemoryDelta {
        MemoryDelta {
            rss_bytes: signed_diff(self.rss_bytes, earlier.rss_bytes),
            virtual_bytes: signed_diff(self.virtual_bytes, earlier.virtual_bytes),
            heap_live_bytes: signed_diff(self.heap_live_bytes, earlier.heap_live_bytes),
            heap_allocated_bytes: signed_diff(
                self.heap_allocated_bytes,
                earlier.heap_allocated_bytes,
            ),
        }
    }
}

fn signed_diff(now: u64, then: u64) -> i64 {
    (now as i128 - then as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Source of memory snapshots.
pub trait MemoryProbe: Send + Sync {
    fn snapshot(&self) -> MemoryUsage;
}

/// Probe for the current process.
pub struct ProcessMemoryProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "Cannot resolve current pid; RSS will read as zero");
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn snapshot(&self) -> MemoryUsage {
        let heap = alloc::heap_stats();
        let mut usage = MemoryUsage {
            heap_live_bytes: heap.live_bytes,
            heap_allocated_bytes: heap.allocated_bytes,
            ..MemoryUsage::default()
        };

        if let Some(pid) = self.pid {
            let mut system = self.system.lock();
            system.refresh_process_specifics(pid, ProcessRefreshKind::new().with_memory());
            if let Some(process) = system.process(pid) {
                usage.rss_bytes = process.memory();
                usage.virtual_bytes = process.virtual_memory();
            }
        }
        usage
    }
}

/// Probe used when memory profiling is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMemoryProbe;

impl MemoryProbe for NoopMemoryProbe {
    fn snapshot(&self) -> MemoryUsage {
        MemoryUsage::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_is_signed_per_counter() {
        let start = MemoryUsage {
            rss_bytes: 1000,
            virtual_bytes: 5000,
            heap_live_bytes: 300,
            heap_allocated_bytes: 900,
        };
        let end = MemoryUsage {
            rss_bytes: 800,
            virtual_bytes: 5000,
            heap_live_bytes: 700,
            heap_allocated_bytes: 1900,
        };
        assert_eq!(
            end.delta_since(&start),
            MemoryDelta {
                rss_bytes: -200,
                virtual_bytes: 0,
                heap_live_bytes: 400,
                heap_allocated_bytes: 1000,
            }
        );
    }

    #[test]
    fn test_process_probe_reads_rss() {
        let usage = ProcessMemoryProbe::new().snapshot();
        assert!(usage.rss_bytes > 0);
    }
}
