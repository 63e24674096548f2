//! Per-actor progression state and its entity lock.
//!
//! An [`ActorProgression`] is the registry's unit of storage: an actor id
//! plus a [`Mutex`] guarding that actor's [`ProgressionState`]. The state
//! holds one [`JobProgression`] per joined job together with the online and
//! saved flags and the derived honorific.
//!
//! # Leveling
//!
//! A progression stores its level and the experience gathered toward the
//! next level. Advancing from level N to N+1 costs `experience_base * N`
//! (see [`Job::max_experience`]). A single gain may cross several levels;
//! the caller learns only *whether* the level rose, so the level-up
//! sequence runs once per gain. At the job's `max_level` further experience
//! is discarded. Experience never drops below zero and removals never lower
//! the level.
//!
//! # Dirty tracking
//!
//! Every mutation clears the `saved` flag. [`ProgressionState::save`] writes
//! through the persistence gateway only when the flag is clear, and sets it
//! once the write succeeds.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;
use vocation_types::{ActorId, ActorSnapshot, Job, JobId, ProgressionRecord, Title};

use crate::collaborators::{ConfigProvider, PersistenceGateway};
use crate::error::JobsError;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// JobProgression
// ---------------------------------------------------------------------------

/// One actor's progress in one job.
#[derive(Debug, Clone)]
pub struct JobProgression {
    job: Arc<Job>,
    experience: Decimal,
    level: u32,
    title: Option<Title>,
}

impl JobProgression {
    /// A freshly joined progression: level 1, no experience, no title.
    pub(crate) const fn new(job: Arc<Job>) -> Self {
        Self {
            job,
            experience: Decimal::ZERO,
            level: 1,
            title: None,
        }
    }

    /// Rebuild a progression from a stored row, clamping it into range.
    pub(crate) fn from_record(job: Arc<Job>, record: &ProgressionRecord) -> Self {
        let mut progression = Self {
            level: job.clamp_level(record.level),
            job,
            experience: record.experience.max(Decimal::ZERO),
            title: None,
        };
        progression.normalize();
        progression
    }

    /// The job definition this progression is bound to.
    pub const fn job(&self) -> &Arc<Job> {
        &self.job
    }

    /// The bound job's id.
    pub fn job_id(&self) -> &JobId {
        &self.job.id
    }

    /// Experience gathered toward the next level.
    pub const fn experience(&self) -> Decimal {
        self.experience
    }

    /// Current level (1-based).
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Current title, if one has been committed.
    pub const fn title(&self) -> Option<&Title> {
        self.title.as_ref()
    }

    /// Experience required to reach the next level, or `None` at the cap.
    pub fn max_experience(&self) -> Option<Decimal> {
        if self.job.is_max_level(self.level) {
            return None;
        }
        self.job.max_experience(self.level)
    }

    /// The row persisted for this progression.
    pub fn record(&self) -> ProgressionRecord {
        ProgressionRecord {
            job: self.job.id.clone(),
            level: self.level,
            experience: self.experience,
        }
    }

    pub(crate) fn set_job(&mut self, job: Arc<Job>) {
        self.job = job;
    }

    pub(crate) fn set_title(&mut self, title: Option<Title>) {
        self.title = title;
    }

    /// Apply an experience delta (negative to remove).
    ///
    /// Experience is floored at zero. Returns `true` if the level rose,
    /// however many thresholds were crossed.
    pub(crate) fn add_experience(&mut self, amount: Decimal) -> bool {
        let original_level = self.level;
        self.experience = self
            .experience
            .checked_add(amount)
            .unwrap_or(self.experience)
            .max(Decimal::ZERO);

        if self.job.is_max_level(self.level) {
            self.experience = Decimal::ZERO;
            return false;
        }
        let rising = self
            .max_experience()
            .is_some_and(|threshold| threshold > Decimal::ZERO && self.experience >= threshold);
        if !rising {
            return false;
        }

        // Highest reachable level, found by bisection over the cumulative cost.
        let mut low = self.level;
        let mut high = self.job.max_level.unwrap_or(u32::MAX).max(low);
        while low < high {
            let mid = low.saturating_add(high.saturating_sub(low).div_ceil(2));
            let affordable = self
                .job
                .experience_between(self.level, mid)
                .is_some_and(|cost| cost <= self.experience);
            if affordable {
                low = mid;
            } else {
                high = mid.saturating_sub(1);
            }
        }

        let spent = self
            .job
            .experience_between(self.level, low)
            .unwrap_or(Decimal::ZERO);
        self.experience = self
            .experience
            .checked_sub(spent)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);
        self.level = low;
        if self.job.is_max_level(self.level) {
            self.experience = Decimal::ZERO;
        }

        self.level > original_level
    }

    /// Take `amount` of experience away, flooring at zero.
    ///
    /// The sign of `amount` is ignored and the level never drops.
    pub(crate) fn remove_experience(&mut self, amount: Decimal) {
        self.experience = self
            .experience
            .checked_sub(amount.abs())
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);
    }

    /// Raise the level by `levels`, capped at the job's `max_level`.
    ///
    /// Returns `true` if the level changed.
    pub(crate) fn promote(&mut self, levels: u32) -> bool {
        let before = self.level;
        self.level = self.job.clamp_level(self.level.saturating_add(levels));
        self.normalize();
        self.level != before
    }

    /// Lower the level by `levels`, floored at 1.
    ///
    /// Returns `true` if the level changed.
    pub(crate) fn demote(&mut self, levels: u32) -> bool {
        let before = self.level;
        self.level = self.job.clamp_level(self.level.saturating_sub(levels));
        self.normalize();
        self.level != before
    }

    /// Keep experience strictly below the current level's requirement.
    fn normalize(&mut self) {
        self.level = self.job.clamp_level(self.level);
        let full = self
            .max_experience()
            .is_none_or(|threshold| self.experience >= threshold);
        if full {
            self.experience = Decimal::ZERO;
        }
    }
}

// ---------------------------------------------------------------------------
// ProgressionState
// ---------------------------------------------------------------------------

/// Everything the registry tracks for one actor. Guarded by the entity lock.
#[derive(Debug, Clone)]
pub struct ProgressionState {
    actor: ActorId,
    progressions: Vec<JobProgression>,
    online: bool,
    saved: bool,
    honorific: String,
    display_name: String,
}

impl ProgressionState {
    /// State freshly loaded from storage: offline and saved.
    pub(crate) fn loaded(actor: ActorId, progressions: Vec<JobProgression>) -> Self {
        let mut state = Self {
            display_name: actor.to_string(),
            actor,
            progressions,
            online: false,
            saved: true,
            honorific: String::new(),
        };
        state.reload_honorific();
        state
    }

    /// The actor this state belongs to.
    pub const fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Whether the actor is connected.
    pub const fn is_online(&self) -> bool {
        self.online
    }

    /// Whether the stored state matches memory.
    pub const fn is_saved(&self) -> bool {
        self.saved
    }

    /// Colored title/job prefix derived from the progressions.
    pub fn honorific(&self) -> &str {
        &self.honorific
    }

    /// Honorific followed by the actor id, or the bare id.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Every held progression, in join order.
    pub fn progressions(&self) -> &[JobProgression] {
        &self.progressions
    }

    /// Whether the actor holds `job`.
    pub fn is_in_job(&self, job: &JobId) -> bool {
        self.progressions.iter().any(|p| p.job_id() == job)
    }

    /// The progression for `job`, if held.
    pub fn progression(&self, job: &JobId) -> Option<&JobProgression> {
        self.progressions.iter().find(|p| p.job_id() == job)
    }

    /// Stored rows for every progression.
    pub fn records(&self) -> Vec<ProgressionRecord> {
        self.progressions.iter().map(JobProgression::record).collect()
    }

    /// Full snapshot handed to the persistence gateway.
    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            actor: self.actor.clone(),
            progressions: self.records(),
            saved_at: Utc::now(),
        }
    }

    pub(crate) fn progression_mut(&mut self, job: &JobId) -> Option<&mut JobProgression> {
        self.progressions.iter_mut().find(|p| p.job_id() == job)
    }

    pub(crate) fn progressions_mut(&mut self) -> impl Iterator<Item = &mut JobProgression> {
        self.progressions.iter_mut()
    }

    pub(crate) const fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub(crate) const fn mark_changed(&mut self) {
        self.saved = false;
    }

    /// Add a level-1 progression for `job`. Returns `false` if already held.
    pub(crate) fn join_job(&mut self, job: Arc<Job>) -> bool {
        if self.is_in_job(&job.id) {
            return false;
        }
        self.progressions.push(JobProgression::new(job));
        self.mark_changed();
        self.reload_honorific();
        true
    }

    /// Drop the progression for `job`. Returns `false` if not held.
    pub(crate) fn leave_job(&mut self, job: &JobId) -> bool {
        let before = self.progressions.len();
        self.progressions.retain(|p| p.job_id() != job);
        if self.progressions.len() == before {
            return false;
        }
        self.mark_changed();
        self.reload_honorific();
        true
    }

    /// Drop every progression, returning the jobs that were held.
    pub(crate) fn leave_all_jobs(&mut self) -> Vec<Arc<Job>> {
        let left: Vec<Arc<Job>> = self
            .progressions
            .drain(..)
            .map(|p| p.job)
            .collect();
        if !left.is_empty() {
            self.mark_changed();
            self.reload_honorific();
        }
        left
    }

    /// Move the progression held in `old` over to `new`.
    ///
    /// Rejected (returns `false`) when `old` is not held or `new` already
    /// is. The level is clamped to the new job's cap.
    pub(crate) fn transfer_job(&mut self, old: &JobId, new: Arc<Job>) -> bool {
        if self.is_in_job(&new.id) {
            return false;
        }
        let Some(progression) = self.progression_mut(old) else {
            return false;
        };
        progression.set_job(new);
        progression.normalize();
        self.mark_changed();
        true
    }

    /// Re-resolve the title of `job` from live configuration without any
    /// announcement, then refresh the honorific.
    pub(crate) fn refresh_title(&mut self, job: &JobId, config: &dyn ConfigProvider) {
        if let Some(progression) = self.progression_mut(job) {
            let title = config.title_for_level(job, progression.level());
            progression.set_title(title);
        }
        self.reload_honorific();
    }

    /// Re-resolve every progression's title from live configuration.
    pub(crate) fn refresh_all_titles(&mut self, config: &dyn ConfigProvider) {
        for progression in &mut self.progressions {
            let title = config.title_for_level(progression.job_id(), progression.level());
            progression.set_title(title);
        }
        self.reload_honorific();
    }

    /// Recompute the honorific and display name.
    ///
    /// With a single job, `Full`/`Job`/`Title` jobs render full names
    /// separated by a space; with several jobs every job renders its short
    /// names run together.
    pub(crate) fn reload_honorific(&mut self) {
        let several = self.progressions.len() > 1;
        let mut parts = Vec::with_capacity(self.progressions.len());

        for progression in &self.progressions {
            let job = progression.job();
            let method = job.display_method;
            let short = several || method.is_short();
            let mut piece = String::new();

            if method.shows_title() {
                if let Some(title) = progression.title() {
                    let name = if short { title.short_name() } else { title.name.as_str() };
                    piece.push_str(&title.color.paint(name));
                }
            }
            if method.shows_job() {
                if !piece.is_empty() && !short {
                    piece.push(' ');
                }
                let name = if short { job.short_name() } else { job.name() };
                piece.push_str(&job.color.paint(name));
            }
            if !piece.is_empty() {
                parts.push(piece);
            }
        }

        self.honorific = parts.join(" ");
        self.display_name = if self.honorific.is_empty() {
            self.actor.to_string()
        } else {
            format!("{} {}", self.honorific, self.actor)
        };
    }

    /// Persist the full state if it is dirty.
    ///
    /// Returns `true` if a write happened.
    ///
    /// # Errors
    ///
    /// Propagates the gateway's error; the state then stays dirty.
    pub(crate) fn save(&mut self, gateway: &dyn PersistenceGateway) -> Result<bool, JobsError> {
        if self.saved {
            return Ok(false);
        }
        gateway.persist_full_state(&self.snapshot())?;
        self.saved = true;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// ActorProgression
// ---------------------------------------------------------------------------

/// A registry entry: an actor id and the lock guarding its state.
///
/// Shared as `Arc<ActorProgression>`. A reference may outlive the entry's
/// registration (after eviction, or for a transient [`lookup`]); mutating it
/// then still works but nothing will save it unless the caller does.
///
/// [`lookup`]: crate::Registry::lookup
#[derive(Debug)]
pub struct ActorProgression {
    actor: ActorId,
    state: Mutex<ProgressionState>,
}

impl ActorProgression {
    pub(crate) fn new(state: ProgressionState) -> Self {
        Self {
            actor: state.actor().clone(),
            state: Mutex::new(state),
        }
    }

    /// The actor id.
    pub const fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Take the entity lock.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ProgressionState> {
        lock(&self.state)
    }

    /// Run `f` against the state under the entity lock.
    pub fn read<R>(&self, f: impl FnOnce(&ProgressionState) -> R) -> R {
        f(&self.lock())
    }

    /// Whether the actor holds `job`.
    pub fn is_in_job(&self, job: &JobId) -> bool {
        self.lock().is_in_job(job)
    }

    /// Whether the actor is connected.
    pub fn is_online(&self) -> bool {
        self.lock().is_online()
    }

    /// Whether the stored state matches memory.
    pub fn is_saved(&self) -> bool {
        self.lock().is_saved()
    }

    /// Current display name.
    pub fn display_name(&self) -> String {
        self.lock().display_name().to_owned()
    }

    /// Number of held jobs.
    pub fn job_count(&self) -> usize {
        self.lock().progressions().len()
    }

    /// Level in `job`, if held.
    pub fn level(&self, job: &JobId) -> Option<u32> {
        self.lock().progression(job).map(JobProgression::level)
    }

    /// Experience toward the next level in `job`, if held.
    pub fn experience(&self, job: &JobId) -> Option<Decimal> {
        self.lock().progression(job).map(JobProgression::experience)
    }

    /// Committed title in `job`, if held and titled.
    pub fn title(&self, job: &JobId) -> Option<Title> {
        self.lock().progression(job).and_then(|p| p.title().cloned())
    }

    /// Full snapshot of the current state.
    pub fn snapshot(&self) -> ActorSnapshot {
        self.lock().snapshot()
    }

    /// Persist the full state under the entity lock if it is dirty.
    ///
    /// # Errors
    ///
    /// Propagates the gateway's error.
    pub fn save(&self, gateway: &dyn PersistenceGateway) -> Result<bool, JobsError> {
        self.lock().save(gateway)
    }
}
