//! The level-up sequence.
//!
//! Runs once per experience gain that raised a progression's level, with
//! the actor's entity lock held by the caller. The sequence announces the
//! new level, announces a new title if one now applies, commits the title,
//! refreshes the honorific and asks the permission engine to recompute.

use tracing::debug;
use vocation_types::{ActorId, JobId};

use crate::collaborators::ServiceContext;
use crate::error::JobsError;
use crate::messages::{MessageArgs, MessageKey};
use crate::progression::ProgressionState;

/// Run the level-up sequence for `job` on an already-locked actor state.
///
/// Does nothing if the actor no longer holds `job`.
///
/// # Errors
///
/// Propagates delivery and permission failures. Anything already sent or
/// committed stays in place.
pub(crate) fn perform_level_up(
    ctx: &ServiceContext,
    state: &mut ProgressionState,
    job: &JobId,
) -> Result<(), JobsError> {
    let Some(progression) = state.progression(job) else {
        return Ok(());
    };
    let definition = std::sync::Arc::clone(progression.job());
    let level = progression.level();
    let current_title = progression.title().cloned();
    let actor = state.actor().clone();
    let online = state.is_online();
    let player = state.display_name().to_owned();

    debug!(actor = %actor, job = %job, level, "level up");

    let broadcast = ctx.config.broadcast_levelups();
    let template = ctx.templates.template_for(MessageKey::level_up(broadcast));
    let message = MessageArgs {
        job: &definition,
        title: current_title.as_ref(),
        player: &player,
        level,
    }
    .render(&template);
    deliver(ctx, &actor, online, broadcast, &message)?;

    let new_title = ctx.config.title_for_level(job, level);
    if let Some(title) = &new_title {
        let changed = current_title
            .as_ref()
            .is_none_or(|current| !current.same_rank(title));
        if changed {
            debug!(actor = %actor, job = %job, title = %title.name, "skill up");
            let broadcast = ctx.config.broadcast_skillups();
            let template = ctx.templates.template_for(MessageKey::skill_up(broadcast));
            let message = MessageArgs {
                job: &definition,
                title: Some(title),
                player: &player,
                level,
            }
            .render(&template);
            deliver(ctx, &actor, online, broadcast, &message)?;
        }
    }

    if let Some(progression) = state.progression_mut(job) {
        progression.set_title(new_title);
    }
    state.reload_honorific();
    ctx.permissions.recompute(&actor, &state.records())
}

/// Send each line of `message` to everyone, or to `actor` if connected.
fn deliver(
    ctx: &ServiceContext,
    actor: &ActorId,
    online: bool,
    broadcast: bool,
    message: &str,
) -> Result<(), JobsError> {
    for line in message.lines() {
        if broadcast {
            ctx.delivery.broadcast(line)?;
        } else if online {
            ctx.delivery.send_to(actor, line)?;
        }
    }
    Ok(())
}
