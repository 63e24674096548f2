//! Job operations on a single actor.
//!
//! Every method takes the actor's entity lock for its whole duration, so
//! persistence and slot calls for one actor never interleave with another
//! mutation of the same actor. Operations on different actors run in
//! parallel.
//!
//! Requests that make no sense for the actor's current state (leaving a job
//! they do not hold, adding experience to a missing progression) are no-ops
//! and return `Ok(false)`. Collaborator failures propagate; in-memory changes
//! made before the failure are kept.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;
use vocation_types::{Job, JobId};

use crate::collaborators::ServiceContext;
use crate::error::JobsError;
use crate::leveling::perform_level_up;
use crate::progression::{ActorProgression, JobProgression};

/// Mutating API over actor progressions.
#[derive(Debug, Clone)]
pub struct JobOperations {
    ctx: Arc<ServiceContext>,
}

impl JobOperations {
    /// Create the API over `ctx`.
    pub const fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Join `job` at level 1, persisting the join and taking a slot.
    ///
    /// Returns `false` without side effects if the actor already holds it.
    pub fn join_job(&self, actor: &ActorProgression, job: &Arc<Job>) -> Result<bool, JobsError> {
        let mut state = actor.lock();
        if !state.join_job(Arc::clone(job)) {
            return Ok(false);
        }
        state.refresh_title(&job.id, self.ctx.config.as_ref());

        self.ctx.persistence.persist_join(actor.actor(), &job.id)?;
        self.ctx.slots.take_slot(&job.id)?;
        debug!(actor = %actor.actor(), job = %job.id, "joined job");
        Ok(true)
    }

    /// Leave `job`, persisting the quit and releasing its slot.
    ///
    /// Returns `false` without side effects if the actor does not hold it.
    pub fn leave_job(&self, actor: &ActorProgression, job: &JobId) -> Result<bool, JobsError> {
        let mut state = actor.lock();
        if !state.leave_job(job) {
            return Ok(false);
        }

        self.ctx.persistence.persist_quit(actor.actor(), job)?;
        self.ctx.slots.release_slot(job)?;
        debug!(actor = %actor.actor(), job = %job, "left job");
        Ok(true)
    }

    /// Leave every held job, one quit and one slot release per job.
    ///
    /// Returns the number of jobs left.
    pub fn leave_all_jobs(&self, actor: &ActorProgression) -> Result<usize, JobsError> {
        let mut state = actor.lock();
        for progression in state.progressions() {
            let job = progression.job_id();
            self.ctx.persistence.persist_quit(actor.actor(), job)?;
            self.ctx.slots.release_slot(job)?;
        }
        let left = state.leave_all_jobs().len();
        debug!(actor = %actor.actor(), jobs = left, "left all jobs");
        Ok(left)
    }

    /// Move the progression held in `old` over to `new`, then save.
    ///
    /// Rejected as a no-op when `old` is not held or `new` already is. Slot
    /// counts are left untouched.
    pub fn transfer_job(
        &self,
        actor: &ActorProgression,
        old: &JobId,
        new: &Arc<Job>,
    ) -> Result<bool, JobsError> {
        let mut state = actor.lock();
        if !state.transfer_job(old, Arc::clone(new)) {
            return Ok(false);
        }
        state.refresh_title(&new.id, self.ctx.config.as_ref());

        self.ctx.persistence.persist_quit(actor.actor(), old)?;
        self.ctx.persistence.persist_join(actor.actor(), &new.id)?;
        state.save(self.ctx.persistence.as_ref())?;
        debug!(actor = %actor.actor(), from = %old, to = %new.id, "transferred job");
        Ok(true)
    }

    /// Raise the level in `job` by `levels`, then save.
    ///
    /// No announcement is made; the title is re-resolved silently. Returns
    /// whether the level changed.
    pub fn promote_job(
        &self,
        actor: &ActorProgression,
        job: &JobId,
        levels: u32,
    ) -> Result<bool, JobsError> {
        self.shift_level(actor, job, |progression| progression.promote(levels))
    }

    /// Lower the level in `job` by `levels`, then save.
    ///
    /// No announcement is made; the title is re-resolved silently. Returns
    /// whether the level changed.
    pub fn demote_job(
        &self,
        actor: &ActorProgression,
        job: &JobId,
        levels: u32,
    ) -> Result<bool, JobsError> {
        self.shift_level(actor, job, |progression| progression.demote(levels))
    }

    /// Grant `amount` experience in `job`, then save.
    ///
    /// If the level rose the level-up sequence runs once, whatever the
    /// number of levels gained. Returns whether the level rose.
    pub fn add_experience(
        &self,
        actor: &ActorProgression,
        job: &JobId,
        amount: Decimal,
    ) -> Result<bool, JobsError> {
        let mut state = actor.lock();
        let Some(progression) = state.progression_mut(job) else {
            return Ok(false);
        };
        let leveled = progression.add_experience(amount);
        state.mark_changed();

        if leveled {
            perform_level_up(&self.ctx, &mut state, job)?;
        }
        state.save(self.ctx.persistence.as_ref())?;
        Ok(leveled)
    }

    /// Take `amount` experience away in `job`, then save.
    ///
    /// Experience floors at zero and the level never drops. Returns whether
    /// the actor holds `job`.
    pub fn remove_experience(
        &self,
        actor: &ActorProgression,
        job: &JobId,
        amount: Decimal,
    ) -> Result<bool, JobsError> {
        let mut state = actor.lock();
        let Some(progression) = state.progression_mut(job) else {
            return Ok(false);
        };
        progression.remove_experience(amount);
        state.mark_changed();
        state.save(self.ctx.persistence.as_ref())?;
        Ok(true)
    }

    fn shift_level(
        &self,
        actor: &ActorProgression,
        job: &JobId,
        shift: impl FnOnce(&mut JobProgression) -> bool,
    ) -> Result<bool, JobsError> {
        let mut state = actor.lock();
        let changed = state.progression_mut(job).is_some_and(shift);
        if changed {
            state.mark_changed();
            state.refresh_title(job, self.ctx.config.as_ref());
        }
        state.save(self.ctx.persistence.as_ref())?;
        Ok(changed)
    }
}
