/// Crawl lifecycle phases
///
/// A crawl starts `Idle`, becomes `Running` when the loop is entered and ends
/// in one of the exit phases. `Paused` is an exit too: the state is written to
/// a checkpoint and control returns to the caller.
use std::fmt;

/// Represents where a crawl is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Constructed, loop not yet entered
    Idle,

    /// Main loop is executing
    Running,

    // ===== Exit Phases =====
    /// Exited by operator decision or interrupt, resumable from a checkpoint
    Paused,

    /// Frontier exhausted, finalized
    Completed,

    /// Stopped by operator decision, finalized
    Stopped,
}

impl CrawlPhase {
    /// Returns true if the loop has been exited
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paused | Self::Completed | Self::Stopped)
    }

    /// Returns true for exits that persist and export the discovered list
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Paused)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Stopped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
