//! Line-based operator console on standard input.
//!
//! One command per line, words separated by whitespace:
//!
//! ```text
//! connect <actor>                   disconnect <actor>
//! join <actor> <job>                leave <actor> <job>
//! leaveall <actor>                  transfer <actor> <old> <new>
//! promote <actor> <job> <levels>    demote <actor> <job> <levels>
//! exp <actor> <job> <amount>        unexp <actor> <job> <amount>
//! show <actor>                      jobs
//! save                              reload
//! help
//! ```
//!
//! Commands run on the blocking pool; the registry and job operations
//! never run on an async worker.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use vocation_core::{ConfigProvider, JobProgression};
use vocation_types::{ActorId, Job, JobId};

use crate::engine::Engine;
use crate::error::EngineError;

const HELP: &str = "commands: connect, disconnect, join, leave, leaveall, transfer, \
                    promote, demote, exp, unexp, show, jobs, save, reload, help";

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Register an actor as online.
    Connect(ActorId),
    /// Mark an actor offline.
    Disconnect(ActorId),
    /// Join a job.
    Join(ActorId, JobId),
    /// Leave a job.
    Leave(ActorId, JobId),
    /// Leave every job.
    LeaveAll(ActorId),
    /// Move a progression from one job to another.
    Transfer(ActorId, JobId, JobId),
    /// Raise a level.
    Promote(ActorId, JobId, u32),
    /// Lower a level.
    Demote(ActorId, JobId, u32),
    /// Grant experience.
    AddExperience(ActorId, JobId, Decimal),
    /// Take experience away.
    RemoveExperience(ActorId, JobId, Decimal),
    /// Print an actor's progressions.
    Show(ActorId),
    /// List the job catalogue.
    Jobs,
    /// Run a bulk save.
    Save,
    /// Reload the configuration file.
    Reload,
    /// Print the command list.
    Help,
}

impl FromStr for Command {
    type Err = EngineError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["connect", actor] => Self::Connect(ActorId::from(*actor)),
            ["disconnect", actor] => Self::Disconnect(ActorId::from(*actor)),
            ["join", actor, job] => Self::Join(ActorId::from(*actor), JobId::from(*job)),
            ["leave", actor, job] => Self::Leave(ActorId::from(*actor), JobId::from(*job)),
            ["leaveall", actor] => Self::LeaveAll(ActorId::from(*actor)),
            ["transfer", actor, old, new] => {
                Self::Transfer(ActorId::from(*actor), JobId::from(*old), JobId::from(*new))
            }
            ["promote", actor, job, levels] => {
                Self::Promote(ActorId::from(*actor), JobId::from(*job), levels_arg(levels)?)
            }
            ["demote", actor, job, levels] => {
                Self::Demote(ActorId::from(*actor), JobId::from(*job), levels_arg(levels)?)
            }
            ["exp", actor, job, amount] => {
                Self::AddExperience(ActorId::from(*actor), JobId::from(*job), amount_arg(amount)?)
            }
            ["unexp", actor, job, amount] => Self::RemoveExperience(
                ActorId::from(*actor),
                JobId::from(*job),
                amount_arg(amount)?,
            ),
            ["show", actor] => Self::Show(ActorId::from(*actor)),
            ["jobs"] => Self::Jobs,
            ["save"] => Self::Save,
            ["reload"] => Self::Reload,
            ["help"] => Self::Help,
            _ => {
                return Err(EngineError::Command {
                    message: format!("unrecognized command: {line}"),
                });
            }
        };
        Ok(command)
    }
}

fn levels_arg(raw: &str) -> Result<u32, EngineError> {
    raw.parse().map_err(|err| EngineError::Command {
        message: format!("invalid level count {raw}: {err}"),
    })
}

fn amount_arg(raw: &str) -> Result<Decimal, EngineError> {
    let amount = Decimal::from_str(raw).map_err(|err| EngineError::Command {
        message: format!("invalid experience amount {raw}: {err}"),
    })?;
    if amount.is_sign_negative() {
        return Err(EngineError::Command {
            message: format!("experience amount must not be negative: {raw}"),
        });
    }
    Ok(amount)
}

/// Read commands from standard input until it closes.
pub async fn run(engine: Arc<Engine>) -> Result<(), EngineError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                warn!(error = %err, "{HELP}");
                continue;
            }
        };
        let engine = Arc::clone(&engine);
        match tokio::task::spawn_blocking(move || execute(&engine, command)).await? {
            Ok(output) => info!(target: "console", "{output}"),
            Err(err) => warn!(target: "console", error = %err, "command failed"),
        }
    }
    info!("console input closed");
    Ok(())
}

/// Run one command against the engine and describe the outcome.
pub fn execute(engine: &Engine, command: Command) -> Result<String, EngineError> {
    let registry = engine.registry();
    let ops = engine.ops();

    let output = match command {
        Command::Connect(actor) => {
            let entry = registry.connect(&actor)?;
            format!("{} connected with {} job(s)", entry.display_name(), entry.job_count())
        }
        Command::Disconnect(actor) => {
            registry.disconnect(&actor)?;
            format!("{actor} disconnected")
        }
        Command::Join(actor, job) => {
            let definition = known_job(engine, &job)?;
            let entry = registry.lookup(&actor)?;
            let joined = ops.join_job(&entry, &definition)?;
            outcome(joined, format!("{actor} joined {job}"), format!("{actor} already in {job}"))
        }
        Command::Leave(actor, job) => {
            let entry = registry.lookup(&actor)?;
            let left = ops.leave_job(&entry, &job)?;
            outcome(left, format!("{actor} left {job}"), format!("{actor} not in {job}"))
        }
        Command::LeaveAll(actor) => {
            let entry = registry.lookup(&actor)?;
            let count = ops.leave_all_jobs(&entry)?;
            format!("{actor} left {count} job(s)")
        }
        Command::Transfer(actor, old, new) => {
            let definition = known_job(engine, &new)?;
            let entry = registry.lookup(&actor)?;
            let moved = ops.transfer_job(&entry, &old, &definition)?;
            outcome(
                moved,
                format!("{actor} transferred from {old} to {new}"),
                format!("{actor} cannot transfer from {old} to {new}"),
            )
        }
        Command::Promote(actor, job, levels) => {
            let entry = registry.lookup(&actor)?;
            ops.promote_job(&entry, &job, levels)?;
            level_line(&actor, &job, entry.level(&job))
        }
        Command::Demote(actor, job, levels) => {
            let entry = registry.lookup(&actor)?;
            ops.demote_job(&entry, &job, levels)?;
            level_line(&actor, &job, entry.level(&job))
        }
        Command::AddExperience(actor, job, amount) => {
            let entry = registry.lookup(&actor)?;
            ops.add_experience(&entry, &job, amount)?;
            level_line(&actor, &job, entry.level(&job))
        }
        Command::RemoveExperience(actor, job, amount) => {
            let entry = registry.lookup(&actor)?;
            ops.remove_experience(&entry, &job, amount)?;
            level_line(&actor, &job, entry.level(&job))
        }
        Command::Show(actor) => {
            let entry = registry.lookup(&actor)?;
            entry.read(|state| {
                let mut out = format!(
                    "{} [{}]",
                    state.display_name(),
                    if state.is_online() { "online" } else { "offline" }
                );
                for progression in state.progressions() {
                    out.push_str("\n  ");
                    out.push_str(&describe(progression));
                }
                out
            })
        }
        Command::Jobs => {
            let mut out = String::from("jobs:");
            for job in engine.store().jobs() {
                let cap = job
                    .max_slots
                    .map_or_else(|| String::from("unlimited"), |max| max.to_string());
                out.push_str(&format!(
                    "\n  {} ({}), slots {}/{}",
                    job.id,
                    job.name(),
                    engine.slots().used(&job.id),
                    cap
                ));
            }
            out
        }
        Command::Save => {
            let report = engine.save_all();
            format!(
                "saved {}, failed {}, evicted {}",
                report.persisted, report.failed, report.evicted
            )
        }
        Command::Reload => {
            let jobs = engine.reload()?;
            format!("reloaded {jobs} job(s)")
        }
        Command::Help => String::from(HELP),
    };
    Ok(output)
}

fn known_job(engine: &Engine, job: &JobId) -> Result<Arc<Job>, EngineError> {
    engine.store().job(job).ok_or_else(|| EngineError::Command {
        message: format!("unknown job {job}"),
    })
}

fn outcome(changed: bool, done: String, skipped: String) -> String {
    if changed { done } else { skipped }
}

fn level_line(actor: &ActorId, job: &JobId, level: Option<u32>) -> String {
    level.map_or_else(
        || format!("{actor} not in {job}"),
        |level| format!("{actor} is level {level} in {job}"),
    )
}

fn describe(progression: &JobProgression) -> String {
    let next = progression
        .max_experience()
        .map_or_else(|| String::from("max"), |max| max.to_string());
    let title = progression
        .title()
        .map_or_else(String::new, |title| format!(" {}", title.name));
    format!(
        "{} level {} ({}/{}){}",
        progression.job_id(),
        progression.level(),
        progression.experience(),
        next,
        title
    )
}
