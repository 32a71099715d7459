//! Periodic status reporter
//!
//! Each cycle probes every configured process, then sends one report per
//! name, sequentially. Delivery is at-most-once: a failed send is logged
//! and dropped, the next cycle supersedes it. The period is measured from
//! the end of one cycle to the start of the next, so cycles never overlap.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::probe::ProcessProbe;
use crate::transport::{StatusReport, StatusSender, WireStatus};

/// What happened during one reporting cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub sent: usize,
    pub failed: usize,
    /// probe unavailable, nothing was sent
    pub skipped: bool,
}

pub struct Reporter<P, S> {
    probe: P,
    sender: S,
    process_names: Vec<String>,
    interval: Duration,
    local_ip: String,
}

impl<P, S> Reporter<P, S>
where
    P: ProcessProbe,
    S: StatusSender,
{
    pub fn new(probe: P, sender: S, process_names: Vec<String>, interval: Duration) -> Self {
        Self {
            probe,
            sender,
            process_names,
            interval,
            local_ip: String::new(),
        }
    }

    pub fn with_local_ip(mut self, ip: String) -> Self {
        self.local_ip = ip;
        self
    }

    /// Probe then report every configured process once
    pub async fn run_cycle(&self) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();

        let statuses = match self.probe.probe(&self.process_names) {
            Ok(statuses) => statuses,
            Err(e) => {
                // never report a false OFFLINE when we could not look
                warn!("Skipping report cycle: {}", e);
                outcome.skipped = true;
                return outcome;
            }
        };

        for name in &self.process_names {
            let Some(&running) = statuses.get(name) else {
                warn!("No probe result for {}, not reported", name);
                continue;
            };

            let report = StatusReport {
                ip: self.local_ip.clone(),
                process: name.clone(),
                status: WireStatus::from(running),
            };

            match self.sender.send(&report).await {
                Ok(()) => {
                    info!("Sent: {} - {:?}", report.process, report.status);
                    outcome.sent += 1;
                }
                Err(e) => {
                    warn!("Failed to send status of {}: {}", report.process, e);
                    outcome.failed += 1;
                }
            }
        }

        debug!("Cycle done: {} sent, {} failed", outcome.sent, outcome.failed);
        outcome
    }

    /// Report forever
    pub async fn run(self) {
        info!(
            "Reporter started - monitoring {:?} every {}s",
            self.process_names,
            self.interval.as_secs()
        );
        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
