//! Job and title definitions.
//!
//! A [`Job`] is a progression track an actor can join. Each job carries its
//! own leveling curve (`experience_base`), an optional level cap, an optional
//! global slot capacity, and an ordered table of [`Title`]s unlocked at level
//! thresholds. Job definitions are owned by configuration and may be swapped
//! wholesale on reload; code that holds a job compares it by [`JobId`], never
//! by pointer identity.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::JobId;

// ---------------------------------------------------------------------------
// ChatColor
// ---------------------------------------------------------------------------

/// Legacy chat color used to decorate job and title names in messages.
///
/// Renders as a two-character `§x` code, where `x` is [`ChatColor::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatColor {
    /// `§0`
    Black,
    /// `§1`
    DarkBlue,
    /// `§2`
    DarkGreen,
    /// `§3`
    DarkAqua,
    /// `§4`
    DarkRed,
    /// `§5`
    DarkPurple,
    /// `§6`
    Gold,
    /// `§7`
    Gray,
    /// `§8`
    DarkGray,
    /// `§9`
    Blue,
    /// `§a`
    Green,
    /// `§b`
    Aqua,
    /// `§c`
    Red,
    /// `§d`
    LightPurple,
    /// `§e`
    Yellow,
    /// `§f`, also used to reset color after a decorated name.
    #[default]
    White,
}

impl ChatColor {
    /// The section-sign prefix that introduces a color code.
    pub const PREFIX: char = '\u{a7}';

    /// Return the single-character color code.
    pub const fn code(self) -> char {
        match self {
            Self::Black => '0',
            Self::DarkBlue => '1',
            Self::DarkGreen => '2',
            Self::DarkAqua => '3',
            Self::DarkRed => '4',
            Self::DarkPurple => '5',
            Self::Gold => '6',
            Self::Gray => '7',
            Self::DarkGray => '8',
            Self::Blue => '9',
            Self::Green => 'a',
            Self::Aqua => 'b',
            Self::Red => 'c',
            Self::LightPurple => 'd',
            Self::Yellow => 'e',
            Self::White => 'f',
        }
    }

    /// Wrap `text` in this color, resetting to white afterwards.
    pub fn paint(self, text: &str) -> String {
        format!("{self}{text}{}", Self::White)
    }
}

impl fmt::Display for ChatColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.code())
    }
}

// ---------------------------------------------------------------------------
// DisplayMethod
// ---------------------------------------------------------------------------

/// How a job contributes to an actor's honorific.
///
/// The `Full`, `Job` and `Title` methods use full names when the actor holds
/// a single job and fall back to short names when they hold several. The
/// `Short*` methods always use short names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMethod {
    /// Title followed by job name.
    #[default]
    Full,
    /// Job name only.
    Job,
    /// Title only.
    Title,
    /// Contributes nothing.
    None,
    /// Short title followed by short job name.
    ShortFull,
    /// Short job name only.
    ShortJob,
    /// Short title only.
    ShortTitle,
}

impl DisplayMethod {
    /// Whether this method shows the title.
    pub const fn shows_title(self) -> bool {
        matches!(self, Self::Full | Self::Title | Self::ShortFull | Self::ShortTitle)
    }

    /// Whether this method shows the job name.
    pub const fn shows_job(self) -> bool {
        matches!(self, Self::Full | Self::Job | Self::ShortFull | Self::ShortJob)
    }

    /// Whether this method always renders short names.
    pub const fn is_short(self) -> bool {
        matches!(self, Self::ShortFull | Self::ShortJob | Self::ShortTitle)
    }
}

// ---------------------------------------------------------------------------
// Title
// ---------------------------------------------------------------------------

/// A named rank unlocked at a job-specific level threshold.
///
/// The `name` is the title's identifier: two titles with the same name are
/// the same rank even if loaded from different configuration generations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    /// Identifier and full display name.
    pub name: String,
    /// Abbreviated name used in multi-job honorifics.
    #[serde(default)]
    pub short_name: Option<String>,
    /// Display color.
    #[serde(default)]
    pub color: ChatColor,
    /// Minimum job level at which the title applies.
    pub min_level: u32,
}

impl Title {
    /// Whether `other` denotes the same rank (compared by name).
    pub fn same_rank(&self, other: &Self) -> bool {
        self.name == other.name
    }

    /// Short name, falling back to the full name.
    pub fn short_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.name)
    }

    /// Full name wrapped in the title's color.
    pub fn colored_name(&self) -> String {
        self.color.paint(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Default experience needed per level step (`base * level`).
pub const DEFAULT_EXPERIENCE_BASE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// A job definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Stable identifier used for persistence and reload rebinding.
    pub id: JobId,
    /// Display name. Defaults to the identifier when omitted.
    #[serde(default)]
    pub name: Option<String>,
    /// Abbreviated name used in multi-job honorifics.
    #[serde(default)]
    pub short_name: Option<String>,
    /// Display color.
    #[serde(default)]
    pub color: ChatColor,
    /// How the job shows up in the honorific.
    #[serde(default)]
    pub display_method: DisplayMethod,
    /// Highest reachable level, if capped.
    #[serde(default)]
    pub max_level: Option<u32>,
    /// Global slot capacity, if limited. Accounting is external.
    #[serde(default)]
    pub max_slots: Option<u32>,
    /// Experience needed to advance from level N to N+1 is `base * N`.
    #[serde(default = "default_experience_base")]
    pub experience_base: Decimal,
    /// Titles unlocked by level; need not be sorted.
    #[serde(default)]
    pub titles: Vec<Title>,
}

impl Job {
    /// Create an uncapped job with default curve and no titles.
    pub fn new(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            short_name: None,
            color: ChatColor::White,
            display_method: DisplayMethod::Full,
            max_level: None,
            max_slots: None,
            experience_base: DEFAULT_EXPERIENCE_BASE,
            titles: Vec::new(),
        }
    }

    /// Display name, falling back to the identifier.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.id.as_str())
    }

    /// Short name, falling back to the display name.
    pub fn short_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or_else(|| self.name())
    }

    /// Display name wrapped in the job's color.
    pub fn colored_name(&self) -> String {
        self.color.paint(self.name())
    }

    /// Experience required to advance from `level` to `level + 1`.
    ///
    /// Returns `None` on overflow.
    pub fn max_experience(&self, level: u32) -> Option<Decimal> {
        self.experience_base.checked_mul(Decimal::from(level))
    }

    /// Total experience required to climb from level `from` to level `to`.
    ///
    /// The per-level thresholds form an arithmetic series, so this is
    /// `experience_base * (to(to-1) - from(from-1)) / 2`. Returns `None` on
    /// overflow or if `to` is below `from`.
    pub fn experience_between(&self, from: u32, to: u32) -> Option<Decimal> {
        let steps = triangular(to)?.checked_sub(triangular(from)?)?;
        if steps < Decimal::ZERO {
            return None;
        }
        self.experience_base
            .checked_mul(steps)?
            .checked_div(Decimal::TWO)
    }

    /// Whether `level` is at or above the cap.
    pub fn is_max_level(&self, level: u32) -> bool {
        self.max_level.is_some_and(|max| level >= max)
    }

    /// Clamp `level` into `1..=max_level`.
    pub fn clamp_level(&self, level: u32) -> u32 {
        let capped = self.max_level.map_or(level, |max| level.min(max));
        capped.max(1)
    }

    /// The highest-threshold title whose `min_level` is at most `level`.
    pub fn title_for_level(&self, level: u32) -> Option<&Title> {
        self.titles
            .iter()
            .filter(|title| title.min_level <= level)
            .max_by_key(|title| title.min_level)
    }
}

/// `level * (level - 1)`, twice the number of base units below `level`.
fn triangular(level: u32) -> Option<Decimal> {
    let level = Decimal::from(level);
    level.checked_mul(level.checked_sub(Decimal::ONE)?)
}

fn default_experience_base() -> Decimal {
    DEFAULT_EXPERIENCE_BASE
}
