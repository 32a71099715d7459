use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::ingest::Collector;
use crate::models::RawStatus;

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub connections_configured: u32,
    pub addresses_tracked: u32,
    pub addresses_online: u32,
    pub memory_usage_mb: f32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self { start_time: Instant::now() }
    }

    pub fn get_health(&self, collector: &Collector) -> KernelHealth {
        let online = collector
            .liveness()
            .iter()
            .filter(|v| v.effective_status == RawStatus::Online)
            .count();

        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            connections_configured: collector.registry().len() as u32,
            addresses_tracked: collector.tracked_addresses() as u32,
            addresses_online: online as u32,
            memory_usage_mb: get_memory_usage_mb(),
        }
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|l| l.starts_with("VmRSS:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok());
            if let Some(kb) = rss_kb {
                return kb as f32 / 1024.0; // KB -> MB
            }
        }
    }

    // non mesuré
    0.0
}
