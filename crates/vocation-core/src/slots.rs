//! In-process slot counter.
//!
//! [`SlotCounter`] is the reference [`SlotTracker`]: a per-job usage count
//! behind a single mutex, so concurrent takes and releases on the same job
//! from different actors never lose an update.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;
use vocation_types::JobId;

use crate::collaborators::SlotTracker;
use crate::error::JobsError;
use crate::progression::lock;

/// Counts how many actors currently occupy each job.
#[derive(Debug, Default)]
pub struct SlotCounter {
    used: Mutex<HashMap<JobId, u32>>,
}

impl SlotCounter {
    /// An empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots currently taken in `job`.
    pub fn used(&self, job: &JobId) -> u32 {
        lock(&self.used).get(job).copied().unwrap_or(0)
    }
}

impl SlotTracker for SlotCounter {
    fn take_slot(&self, job: &JobId) -> Result<(), JobsError> {
        let mut used = lock(&self.used);
        let count = used.entry(job.clone()).or_insert(0);
        *count = count.saturating_add(1);
        debug!(job = %job, used = *count, "slot taken");
        Ok(())
    }

    fn release_slot(&self, job: &JobId) -> Result<(), JobsError> {
        let mut used = lock(&self.used);
        if let Some(count) = used.get_mut(job) {
            *count = count.saturating_sub(1);
            debug!(job = %job, used = *count, "slot released");
            if *count == 0 {
                used.remove(job);
            }
        }
        Ok(())
    }
}
