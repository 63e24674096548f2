//! Collaborator traits and the service context that bundles them.
//!
//! The registry and job operations never reach for global state. Everything
//! they need from the outside world -- storage, slot accounting, permission
//! recompute, chat delivery, configuration and message templates -- arrives
//! through a [`ServiceContext`] handed over at construction time.
//!
//! All collaborator methods are synchronous and may block. They are invoked
//! while the target actor's entity lock is held, so a slow collaborator
//! delays further mutations of *that* actor only.

use std::sync::Arc;

use vocation_types::{ActorId, ActorSnapshot, Job, JobId, ProgressionRecord, Title};

use crate::error::JobsError;
use crate::messages::MessageKey;

/// Durable storage for job progressions.
pub trait PersistenceGateway: Send + Sync {
    /// Load every stored progression row for `actor`.
    ///
    /// An actor with no stored state yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`JobsError::Persistence`] if the store cannot be read.
    fn load_progressions(&self, actor: &ActorId) -> Result<Vec<ProgressionRecord>, JobsError>;

    /// Record that `actor` joined `job`.
    ///
    /// # Errors
    ///
    /// Returns [`JobsError::Persistence`] if the write fails.
    fn persist_join(&self, actor: &ActorId, job: &JobId) -> Result<(), JobsError>;

    /// Record that `actor` left `job`.
    ///
    /// # Errors
    ///
    /// Returns [`JobsError::Persistence`] if the write fails.
    fn persist_quit(&self, actor: &ActorId, job: &JobId) -> Result<(), JobsError>;

    /// Overwrite the stored state of `snapshot.actor` with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`JobsError::Persistence`] if the write fails.
    fn persist_full_state(&self, snapshot: &ActorSnapshot) -> Result<(), JobsError>;
}

/// Global per-job slot accounting.
///
/// Two actors joining the same job call into the tracker concurrently; the
/// implementation must make `take_slot`/`release_slot` atomic on its own.
pub trait SlotTracker: Send + Sync {
    /// Consume one unit of `job`'s capacity.
    ///
    /// # Errors
    ///
    /// Returns [`JobsError::Slots`] if the tracker fails.
    fn take_slot(&self, job: &JobId) -> Result<(), JobsError>;

    /// Return one unit of `job`'s capacity.
    ///
    /// # Errors
    ///
    /// Returns [`JobsError::Slots`] if the tracker fails.
    fn release_slot(&self, job: &JobId) -> Result<(), JobsError>;
}

/// External permission computation.
pub trait PermissionEngine: Send + Sync {
    /// Recompute the permissions `actor` derives from `progressions`.
    ///
    /// # Errors
    ///
    /// Returns [`JobsError::Permissions`] if recomputation fails.
    fn recompute(&self, actor: &ActorId, progressions: &[ProgressionRecord])
    -> Result<(), JobsError>;
}

/// Chat delivery.
pub trait MessageDelivery: Send + Sync {
    /// Send `line` to every connected actor.
    ///
    /// # Errors
    ///
    /// Returns [`JobsError::Delivery`] if the broadcast fails.
    fn broadcast(&self, line: &str) -> Result<(), JobsError>;

    /// Send `line` to `actor` only.
    ///
    /// # Errors
    ///
    /// Returns [`JobsError::Delivery`] if the send fails.
    fn send_to(&self, actor: &ActorId, line: &str) -> Result<(), JobsError>;
}

/// Live, hot-reloadable configuration and job catalogue.
///
/// Every call reads the *current* configuration; callers must not cache the
/// answers across operations.
pub trait ConfigProvider: Send + Sync {
    /// Whether an actor's state is saved and evicted as they disconnect.
    fn save_on_disconnect(&self) -> bool;

    /// Whether level-up messages go to everyone rather than the actor only.
    fn broadcast_levelups(&self) -> bool;

    /// Whether title-change messages go to everyone rather than the actor only.
    fn broadcast_skillups(&self) -> bool;

    /// The title that applies to `job` at `level`, if any.
    fn title_for_level(&self, job: &JobId, level: u32) -> Option<Title>;

    /// The currently loaded definition of `job`, if it exists.
    fn job(&self, job: &JobId) -> Option<Arc<Job>>;
}

/// Localized message templates.
pub trait MessageTemplates: Send + Sync {
    /// The template registered for `key`, placeholders unexpanded.
    fn template_for(&self, key: MessageKey) -> String;
}

/// Every collaborator the registry and job operations need.
///
/// Cheap to clone; share one instance behind an [`Arc`] between the
/// [`Registry`](crate::Registry) and [`JobOperations`](crate::JobOperations).
#[derive(Clone)]
pub struct ServiceContext {
    /// Durable storage.
    pub persistence: Arc<dyn PersistenceGateway>,
    /// Slot accounting.
    pub slots: Arc<dyn SlotTracker>,
    /// Permission recompute.
    pub permissions: Arc<dyn PermissionEngine>,
    /// Chat delivery.
    pub delivery: Arc<dyn MessageDelivery>,
    /// Live configuration.
    pub config: Arc<dyn ConfigProvider>,
    /// Message templates.
    pub templates: Arc<dyn MessageTemplates>,
}

impl core::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceContext").finish_non_exhaustive()
    }
}
