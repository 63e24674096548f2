//! Log-backed collaborators.
//!
//! The engine has no chat transport or permission backend of its own, so
//! announcements and permission recomputes are written to the log. Swapping
//! in real ones only changes how [`Engine`](crate::engine::Engine) builds
//! its [`ServiceContext`](vocation_core::ServiceContext).

use tracing::{debug, info};
use vocation_core::{JobsError, MessageDelivery, PermissionEngine};
use vocation_types::{ActorId, ProgressionRecord};

/// Writes every announcement to the log under the `chat` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

impl MessageDelivery for LogDelivery {
    fn broadcast(&self, line: &str) -> Result<(), JobsError> {
        info!(target: "chat", line, "broadcast");
        Ok(())
    }

    fn send_to(&self, actor: &ActorId, line: &str) -> Result<(), JobsError> {
        info!(target: "chat", actor = %actor, line, "private message");
        Ok(())
    }
}

/// Logs each recompute request with the actor's current job levels.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPermissions;

impl PermissionEngine for LogPermissions {
    fn recompute(
        &self,
        actor: &ActorId,
        progressions: &[ProgressionRecord],
    ) -> Result<(), JobsError> {
        let jobs: Vec<String> = progressions
            .iter()
            .map(|p| format!("{}:{}", p.job, p.level))
            .collect();
        debug!(actor = %actor, jobs = ?jobs, "permissions recomputed");
        Ok(())
    }
}
