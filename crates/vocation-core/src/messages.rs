//! Level-up and skill-up message templates.
//!
//! Templates are plain strings with `%placeholder%` markers and may span
//! several lines; each line is delivered separately.
//!
//! | Placeholder | Expands to |
//! |-------------|------------|
//! | `%jobname%` | job name in the job's color |
//! | `%titlename%` | title name in the title's color (left as-is when there is no title) |
//! | `%playername%` | the actor's display name |
//! | `%joblevel%` | the progression's level |

use vocation_types::{Job, Title};

/// Identifies one of the level-up/skill-up templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Level-up announced to everyone.
    LevelUpBroadcast,
    /// Level-up told to the actor only.
    LevelUpPrivate,
    /// New title announced to everyone.
    SkillUpBroadcast,
    /// New title told to the actor only.
    SkillUpPrivate,
}

impl MessageKey {
    /// The level-up key for the given broadcast mode.
    pub const fn level_up(broadcast: bool) -> Self {
        if broadcast {
            Self::LevelUpBroadcast
        } else {
            Self::LevelUpPrivate
        }
    }

    /// The skill-up key for the given broadcast mode.
    pub const fn skill_up(broadcast: bool) -> Self {
        if broadcast {
            Self::SkillUpBroadcast
        } else {
            Self::SkillUpPrivate
        }
    }

    /// The configuration key this template is stored under.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LevelUpBroadcast => "message.levelup.broadcast",
            Self::LevelUpPrivate => "message.levelup.nobroadcast",
            Self::SkillUpBroadcast => "message.skillup.broadcast",
            Self::SkillUpPrivate => "message.skillup.nobroadcast",
        }
    }

    /// Built-in English template used when configuration has no override.
    pub const fn default_template(self) -> &'static str {
        match self {
            Self::LevelUpBroadcast => "%playername% is now a level %joblevel% %jobname%.",
            Self::LevelUpPrivate => "You are now a level %joblevel% %jobname%.",
            Self::SkillUpBroadcast => "%playername% has been promoted to a %titlename% %jobname%.",
            Self::SkillUpPrivate => {
                "Congratulations, you have been promoted to a %titlename% %jobname%."
            }
        }
    }
}

impl core::fmt::Display for MessageKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct MessageArgs<'a> {
    /// The job that leveled.
    pub job: &'a Job,
    /// The title to name, if any.
    pub title: Option<&'a Title>,
    /// The actor's display name.
    pub player: &'a str,
    /// The progression's level.
    pub level: u32,
}

impl MessageArgs<'_> {
    /// Expand every placeholder in `template`.
    pub fn render(&self, template: &str) -> String {
        let mut message = template.replace("%jobname%", &self.job.colored_name());
        if let Some(title) = self.title {
            message = message.replace("%titlename%", &title.colored_name());
        }
        message
            .replace("%playername%", self.player)
            .replace("%joblevel%", &self.level.to_string())
    }
}
