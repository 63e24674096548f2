//! Actor registry, job operations, and leveling engine for Vocation.
//!
//! This crate tracks every connected actor's job progressions in memory,
//! serializes mutations per actor, and drives persistence, slot accounting,
//! chat announcements and permission recompute through pluggable
//! collaborators.
//!
//! # Modules
//!
//! - [`collaborators`] -- Collaborator traits and the [`ServiceContext`]
//!   bundling them.
//! - [`config`] -- Configuration loading from `vocation-config.yaml` and the
//!   hot-swappable [`ConfigStore`].
//! - [`error`] -- [`JobsError`].
//! - [`leveling`] -- The level-up sequence.
//! - [`messages`] -- Level-up and skill-up templates.
//! - [`operations`] -- [`JobOperations`], the per-actor mutation API.
//! - [`progression`] -- Per-actor state behind the entity lock.
//! - [`registry`] -- [`Registry`]: connect, disconnect, save and reload.
//! - [`slots`] -- [`SlotCounter`], an in-process slot tracker.
//! - [`store`] -- [`MemoryGateway`], an in-memory persistence gateway.
//!
//! # Locking
//!
//! Two lock domains exist: the registry lock over membership and one entity
//! lock per actor. Code that needs both takes the registry lock first.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod leveling;
pub mod messages;
pub mod operations;
pub mod progression;
pub mod registry;
pub mod slots;
pub mod store;

pub use collaborators::{
    ConfigProvider, MessageDelivery, MessageTemplates, PermissionEngine, PersistenceGateway,
    ServiceContext, SlotTracker,
};
pub use config::{ConfigError, ConfigStore, JobsConfig};
pub use error::JobsError;
pub use messages::MessageKey;
pub use operations::JobOperations;
pub use progression::{ActorProgression, JobProgression, ProgressionState};
pub use registry::{Registry, SaveReport};
pub use slots::SlotCounter;
pub use store::MemoryGateway;
