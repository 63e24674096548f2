//! Persisted progression rows and full actor snapshots.
//!
//! These are the shapes exchanged with the persistence gateway. A
//! [`ProgressionRecord`] refers to its job by [`JobId`] only; resolving it to
//! a live [`Job`](crate::Job) definition is the registry's concern.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, JobId};

/// One actor's stored progress in one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionRecord {
    /// The job this row belongs to.
    pub job: JobId,
    /// Current level (1-based).
    pub level: u32,
    /// Experience gathered toward the next level.
    pub experience: Decimal,
}

impl ProgressionRecord {
    /// A fresh row for a job that was just joined: level 1, no experience.
    pub fn joined(job: JobId) -> Self {
        Self {
            job,
            level: 1,
            experience: Decimal::ZERO,
        }
    }
}

/// The full persisted state of one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    /// The actor this snapshot describes.
    pub actor: ActorId,
    /// Every job progression the actor holds.
    pub progressions: Vec<ProgressionRecord>,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
}
