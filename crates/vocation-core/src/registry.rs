//! The progression registry.
//!
//! Tracks the [`ActorProgression`] of every connected (and recently
//! disconnected) actor. Membership is guarded by one registry lock; each
//! entry's content by its own entity lock. Whenever both are needed the
//! registry lock is taken first.
//!
//! # Lifecycle
//!
//! - [`Registry::connect`] loads on first contact and marks the actor online.
//! - [`Registry::disconnect`] marks the actor offline, and with
//!   `save_on_disconnect` also saves and evicts it immediately.
//! - [`Registry::save_all`] saves every dirty entry and evicts those that are
//!   offline with nothing left to write.
//! - [`Registry::reload`] rebinds every entry to the live job catalogue.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use vocation_types::ActorId;

use crate::collaborators::ServiceContext;
use crate::error::JobsError;
use crate::progression::{ActorProgression, JobProgression, ProgressionState, lock};

/// Outcome of one [`Registry::save_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Entries whose dirty state was written.
    pub persisted: usize,
    /// Entries whose save failed; they stay registered and dirty.
    pub failed: usize,
    /// Entries removed from the registry.
    pub evicted: usize,
}

/// In-memory registry of actor progressions.
#[derive(Debug)]
pub struct Registry {
    ctx: Arc<ServiceContext>,
    actors: Mutex<HashMap<ActorId, Arc<ActorProgression>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            actors: Mutex::new(HashMap::new()),
        }
    }

    /// Register `actor` as connected, loading their state if not tracked.
    ///
    /// The first-contact load runs under the registry lock, so two racing
    /// connects for the same actor load once and share one entry.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if loading fails (nothing is
    /// registered) or the permission error from the recompute (the actor
    /// stays registered and online).
    pub fn connect(&self, actor: &ActorId) -> Result<Arc<ActorProgression>, JobsError> {
        let mut actors = lock(&self.actors);
        let entry = match actors.entry(actor.clone()) {
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            Entry::Vacant(vacant) => {
                let state = load(&self.ctx, actor)?;
                Arc::clone(vacant.insert(Arc::new(ActorProgression::new(state))))
            }
        };

        let mut state = entry.lock();
        drop(actors);
        state.set_online(true);
        state.reload_honorific();
        let records = state.records();
        self.ctx.permissions.recompute(actor, &records)?;
        drop(state);

        info!(actor = %actor, jobs = records.len(), "actor connected");
        Ok(entry)
    }

    /// Mark `actor` as disconnected.
    ///
    /// With `save_on_disconnect` the entry is marked offline and saved while
    /// still registered, then evicted if it is still offline and saved. A
    /// reconnect during the save therefore reuses the same entry. If the save
    /// fails the entry stays registered so a later
    /// [`save_all`](Self::save_all) retries. Otherwise the entry stays
    /// registered, offline.
    ///
    /// Unknown actors are ignored.
    ///
    /// # Errors
    ///
    /// Returns the persistence error from the disconnect save.
    pub fn disconnect(&self, actor: &ActorId) -> Result<(), JobsError> {
        let Some(entry) = self.get(actor) else {
            return Ok(());
        };

        if !self.ctx.config.save_on_disconnect() {
            entry.lock().set_online(false);
            debug!(actor = %actor, "actor disconnected");
            return Ok(());
        }

        let saved = {
            let mut state = entry.lock();
            state.set_online(false);
            state.save(self.ctx.persistence.as_ref())
        };
        if let Err(err) = saved {
            warn!(actor = %actor, error = %err, "disconnect save failed, keeping actor registered");
            return Err(err);
        }

        let mut actors = lock(&self.actors);
        let idle = actors.get(actor).is_some_and(|current| {
            let state = current.lock();
            Arc::ptr_eq(current, &entry) && !state.is_online() && state.is_saved()
        });
        if idle {
            actors.remove(actor);
        }
        drop(actors);

        info!(actor = %actor, evicted = idle, "actor disconnected and saved");
        Ok(())
    }

    /// The tracked entry for `actor`, or a freshly loaded detached one.
    ///
    /// A detached entry is not registered; changes made through it are only
    /// kept if the caller saves them.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if loading fails.
    pub fn lookup(&self, actor: &ActorId) -> Result<Arc<ActorProgression>, JobsError> {
        let existing = lock(&self.actors).get(actor).cloned();
        if let Some(entry) = existing {
            return Ok(entry);
        }
        let state = load(&self.ctx, actor)?;
        Ok(Arc::new(ActorProgression::new(state)))
    }

    /// Save every dirty entry, then evict offline entries that are saved.
    ///
    /// Saves run outside the registry lock so connects and mutations keep
    /// flowing. A failed save is logged and skipped; that entry stays
    /// registered until a later pass succeeds.
    pub fn save_all(&self) -> SaveReport {
        let entries: Vec<Arc<ActorProgression>> = lock(&self.actors).values().cloned().collect();

        let mut report = SaveReport::default();
        for entry in &entries {
            match entry.save(self.ctx.persistence.as_ref()) {
                Ok(true) => report.persisted = report.persisted.saturating_add(1),
                Ok(false) => {}
                Err(err) => {
                    report.failed = report.failed.saturating_add(1);
                    warn!(actor = %entry.actor(), error = %err, "save failed");
                }
            }
        }

        let mut actors = lock(&self.actors);
        let before = actors.len();
        actors.retain(|_, entry| {
            let state = entry.lock();
            state.is_online() || !state.is_saved()
        });
        report.evicted = before.saturating_sub(actors.len());
        let remaining = actors.len();
        drop(actors);

        info!(
            persisted = report.persisted,
            failed = report.failed,
            evicted = report.evicted,
            remaining,
            "save pass complete"
        );
        report
    }

    /// Rebind every entry to the live job catalogue.
    ///
    /// Holds the registry lock for the whole pass, so no entry is added or
    /// evicted halfway through. Jobs missing from the catalogue keep their
    /// previous definition. Titles are re-resolved for every entry; online
    /// actors also get a permission recompute, whose failures are logged and
    /// skipped.
    pub fn reload(&self) {
        let actors = lock(&self.actors);
        let config = self.ctx.config.as_ref();

        for entry in actors.values() {
            let mut state = entry.lock();
            for progression in state.progressions_mut() {
                match config.job(progression.job_id()) {
                    Some(job) => progression.set_job(job),
                    None => debug!(
                        actor = %entry.actor(),
                        job = %progression.job_id(),
                        "job missing from catalogue, keeping previous definition"
                    ),
                }
            }
            state.refresh_all_titles(config);

            if state.is_online() {
                if let Err(err) = self.ctx.permissions.recompute(entry.actor(), &state.records()) {
                    warn!(
                        actor = %entry.actor(),
                        error = %err,
                        "permission recompute failed on reload"
                    );
                }
            }
        }

        info!(actors = actors.len(), "registry reloaded");
    }

    /// The tracked entry for `actor`, without loading.
    pub fn get(&self, actor: &ActorId) -> Option<Arc<ActorProgression>> {
        lock(&self.actors).get(actor).cloned()
    }

    /// Whether `actor` is tracked.
    pub fn contains(&self, actor: &ActorId) -> bool {
        lock(&self.actors).contains_key(actor)
    }

    /// Number of tracked actors.
    pub fn len(&self) -> usize {
        lock(&self.actors).len()
    }

    /// Whether no actors are tracked.
    pub fn is_empty(&self) -> bool {
        lock(&self.actors).is_empty()
    }

    /// Number of tracked actors currently online.
    pub fn online_count(&self) -> usize {
        let entries: Vec<Arc<ActorProgression>> = lock(&self.actors).values().cloned().collect();
        entries.iter().filter(|entry| entry.is_online()).count()
    }
}

/// Build an actor's state from storage, bound to the live job catalogue.
///
/// Rows for jobs the catalogue no longer knows are dropped.
fn load(ctx: &ServiceContext, actor: &ActorId) -> Result<ProgressionState, JobsError> {
    let records = ctx.persistence.load_progressions(actor)?;
    let mut progressions = Vec::with_capacity(records.len());
    for record in &records {
        let Some(job) = ctx.config.job(&record.job) else {
            debug!(actor = %actor, job = %record.job, "skipping stored row for unknown job");
            continue;
        };
        let mut progression = JobProgression::from_record(job, record);
        progression.set_title(ctx.config.title_for_level(&record.job, progression.level()));
        progressions.push(progression);
    }
    debug!(actor = %actor, jobs = progressions.len(), "loaded progressions");
    Ok(ProgressionState::loaded(actor.clone(), progressions))
}
