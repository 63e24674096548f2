//! In-memory persistence gateway.
//!
//! [`MemoryGateway`] keeps every actor's stored progressions in a map. It is
//! what the host binary runs with until a durable backend is wired in, and
//! what the tests inspect to check what actually reached storage.

use std::collections::BTreeMap;
use std::sync::Mutex;

use vocation_types::{ActorId, ActorSnapshot, JobId, ProgressionRecord};

use crate::collaborators::PersistenceGateway;
use crate::error::JobsError;
use crate::progression::lock;

type Rows = BTreeMap<JobId, ProgressionRecord>;

/// Persistence gateway backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    actors: Mutex<BTreeMap<ActorId, Rows>>,
}

impl MemoryGateway {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `actor`'s stored rows, replacing anything already there.
    pub fn seed(&self, actor: &ActorId, records: impl IntoIterator<Item = ProgressionRecord>) {
        let rows = records.into_iter().map(|r| (r.job.clone(), r)).collect();
        lock(&self.actors).insert(actor.clone(), rows);
    }

    /// The rows currently stored for `actor`, ordered by job id.
    pub fn stored(&self, actor: &ActorId) -> Vec<ProgressionRecord> {
        lock(&self.actors)
            .get(actor)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of actors with any stored state.
    pub fn actor_count(&self) -> usize {
        lock(&self.actors).len()
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load_progressions(&self, actor: &ActorId) -> Result<Vec<ProgressionRecord>, JobsError> {
        Ok(self.stored(actor))
    }

    fn persist_join(&self, actor: &ActorId, job: &JobId) -> Result<(), JobsError> {
        lock(&self.actors)
            .entry(actor.clone())
            .or_default()
            .entry(job.clone())
            .or_insert_with(|| ProgressionRecord::joined(job.clone()));
        Ok(())
    }

    fn persist_quit(&self, actor: &ActorId, job: &JobId) -> Result<(), JobsError> {
        let mut actors = lock(&self.actors);
        if let Some(rows) = actors.get_mut(actor) {
            rows.remove(job);
            if rows.is_empty() {
                actors.remove(actor);
            }
        }
        Ok(())
    }

    fn persist_full_state(&self, snapshot: &ActorSnapshot) -> Result<(), JobsError> {
        let rows: Rows = snapshot
            .progressions
            .iter()
            .map(|r| (r.job.clone(), r.clone()))
            .collect();
        let mut actors = lock(&self.actors);
        if rows.is_empty() {
            actors.remove(&snapshot.actor);
        } else {
            actors.insert(snapshot.actor.clone(), rows);
        }
        Ok(())
    }
}
