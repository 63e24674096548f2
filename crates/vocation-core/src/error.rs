//! Error types for the vocation-core crate.
//!
//! The core itself treats invalid-but-expected requests (leaving a job the
//! actor does not hold, adding experience to a missing progression) as
//! silent no-ops. The variants below exist to carry failures raised by
//! collaborators back to whoever triggered the operation.

use vocation_types::{ActorId, JobId};

use crate::config::ConfigError;

/// Errors surfaced through the registry and job operations.
#[derive(Debug, thiserror::Error)]
pub enum JobsError {
    /// The persistence gateway failed to load or store an actor's state.
    #[error("persistence failed for actor {actor}: {message}")]
    Persistence {
        /// The actor whose state was being loaded or stored.
        actor: ActorId,
        /// Description of the failure.
        message: String,
    },

    /// The slot tracker rejected a take or release.
    #[error("slot accounting failed for job {job}: {message}")]
    Slots {
        /// The job whose slot counter was being updated.
        job: JobId,
        /// Description of the failure.
        message: String,
    },

    /// The permission engine failed to recompute an actor's permissions.
    #[error("permission recompute failed for actor {actor}: {message}")]
    Permissions {
        /// The actor whose permissions were being recomputed.
        actor: ActorId,
        /// Description of the failure.
        message: String,
    },

    /// A broadcast or private message could not be delivered.
    #[error("message delivery failed: {message}")]
    Delivery {
        /// Description of the failure.
        message: String,
    },

    /// Configuration could not be loaded or failed validation.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },
}
