//! Operator decision port
//!
//! The controller suspends at page-count thresholds and at a robots denial
//! of the seed, and asks an [`Operator`] what to do. The binary provides a
//! terminal prompt; tests and non-interactive runs use the fixed and
//! scripted implementations here.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Why the controller is asking for a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// `page_count` reached `max_pages`; `Continue` raises the limit
    MaxPages { page_count: u32, max_pages: u32 },

    /// `page_count` is a positive multiple of the checkpoint interval
    Interval { page_count: u32 },
}

impl Threshold {
    pub fn page_count(&self) -> u32 {
        match self {
            Self::MaxPages { page_count, .. } | Self::Interval { page_count } => *page_count,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxPages {
                page_count,
                max_pages,
            } => write!(f, "reached page limit ({} of {})", page_count, max_pages),
            Self::Interval { page_count } => write!(f, "crawled {} pages", page_count),
        }
    }
}

/// What the operator wants the crawl to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Pause,
    Stop,
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" | "continue" => Ok(Self::Continue),
            "p" | "pause" => Ok(Self::Pause),
            "s" | "stop" => Ok(Self::Stop),
            other => Err(format!("unknown decision: {:?}", other)),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Continue => "continue",
            Self::Pause => "pause",
            Self::Stop => "stop",
        };
        write!(f, "{}", name)
    }
}

/// Source of operator decisions
pub trait Operator {
    /// Called synchronously when a threshold is hit
    fn on_threshold(&mut self, threshold: &Threshold) -> Decision;

    /// Called when robots.txt disallows the seed; true proceeds anyway
    fn override_robots(&mut self, seed: &Url) -> bool;
}

/// Answers every threshold with the same decision
#[derive(Debug, Clone, Copy)]
pub struct FixedOperator {
    decision: Decision,
    override_robots: bool,
}

impl FixedOperator {
    /// Creates an operator that never overrides robots.txt
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            override_robots: false,
        }
    }

    pub fn with_robots_override(mut self, override_robots: bool) -> Self {
        self.override_robots = override_robots;
        self
    }
}

impl Operator for FixedOperator {
    fn on_threshold(&mut self, _threshold: &Threshold) -> Decision {
        self.decision
    }

    fn override_robots(&mut self, _seed: &Url) -> bool {
        self.override_robots
    }
}

/// Replays a list of decisions, then falls back to a default
///
/// Every threshold it was asked about is recorded.
#[derive(Debug, Clone)]
pub struct ScriptedOperator {
    script: VecDeque<Decision>,
    fallback: Decision,
    override_robots: bool,
    seen: Vec<Threshold>,
}

impl ScriptedOperator {
    pub fn new(script: impl IntoIterator<Item = Decision>, fallback: Decision) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
            override_robots: false,
            seen: Vec::new(),
        }
    }

    pub fn with_robots_override(mut self, override_robots: bool) -> Self {
        self.override_robots = override_robots;
        self
    }

    /// Thresholds received so far, in order
    pub fn seen(&self) -> &[Threshold] {
        &self.seen
    }
}

impl Operator for ScriptedOperator {
    fn on_threshold(&mut self, threshold: &Threshold) -> Decision {
        self.seen.push(*threshold);
        self.script.pop_front().unwrap_or(self.fallback)
    }

    fn override_robots(&mut self, _seed: &Url) -> bool {
        self.override_robots
    }
}
