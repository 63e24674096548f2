//! Shared type definitions for the Vocation job-progression registry.
//!
//! This crate is the single source of truth for the data that crosses the
//! boundary between the core registry and its collaborators (persistence,
//! configuration, permission and delivery adapters).
//!
//! # Modules
//!
//! - [`ids`] -- String-keyed identifier newtypes for actors and jobs
//! - [`job`] -- Job and title definitions, chat colors, display methods
//! - [`records`] -- Persisted progression rows and full actor snapshots

pub mod ids;
pub mod job;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use ids::{ActorId, JobId};
pub use job::{ChatColor, DisplayMethod, Job, Title};
pub use records::{ActorSnapshot, ProgressionRecord};
