//! Process presence probe
//!
//! Answers "is at least one process named exactly X running?" for each
//! configured name. Matching is case-insensitive on the full process name
//! (extension included); no substring matching.

use std::collections::{HashMap, HashSet};
use sysinfo::System;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("process table unavailable: {0}")]
    Unavailable(String),
}

/// Seam between the reporter and the OS process table
pub trait ProcessProbe {
    fn probe(&self, names: &[String]) -> Result<HashMap<String, bool>, ProbeError>;
}

/// Process probe backed by `sysinfo`
#[derive(Debug, Default)]
pub struct SysinfoProbe;

impl ProcessProbe for SysinfoProbe {
    fn probe(&self, names: &[String]) -> Result<HashMap<String, bool>, ProbeError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ProbeError::Unavailable("unsupported platform".into()));
        }

        let mut sys = System::new();
        sys.refresh_processes();

        // this agent is always in the table: an empty one means it could not be read
        if sys.processes().is_empty() {
            return Err(ProbeError::Unavailable("empty process table".into()));
        }

        debug!(count = sys.processes().len(), "process table refreshed");
        Ok(match_running(names, sys.processes().values().map(|p| p.name())))
    }
}

/// Pure matching step: one entry per requested name
pub fn match_running<'a, I>(names: &[String], running: I) -> HashMap<String, bool>
where
    I: IntoIterator<Item = &'a str>,
{
    let running: HashSet<String> = running.into_iter().map(str::to_lowercase).collect();
    names
        .iter()
        .map(|n| (n.clone(), running.contains(&n.to_lowercase())))
        .collect()
}
