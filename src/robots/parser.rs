//! Robots.txt parser implementation
//!
//! Only `User-agent` and `Disallow` are understood. `Allow`, wildcards and
//! `Crawl-delay` are ignored.

/// Disallow rules that apply to this crawler on one host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRuleSet {
    /// `Disallow: /` was seen in an applicable group
    pub disallow_all: bool,

    /// Path prefixes disallowed by applicable groups, in file order
    pub disallowed_paths: Vec<String>,
}

impl RobotsRuleSet {
    /// Creates a rule set that allows everything
    ///
    /// This is what a missing, unreachable or unreadable robots.txt maps to.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses robots.txt content for the given user-agent
    ///
    /// Directive names and agent values are matched case-insensitively. A
    /// `User-agent` line starts a new group, which applies when its value is
    /// `*` or contains `user_agent` as a substring. Path values keep their
    /// case, since URL paths are case-sensitive: `Disallow: /Private` blocks
    /// `/Private/x` but not `/private/x`. Only directive names and agents are
    /// lowercased, never the rule paths.
    ///
    /// # Examples
    ///
    /// ```
    /// use gleaner::robots::RobotsRuleSet;
    ///
    /// let rules = RobotsRuleSet::parse("User-agent: *\nDisallow: /private\n", "Gleaner/1.0");
    /// assert!(!rules.is_allowed("/private/x"));
    /// assert!(rules.is_allowed("/public"));
    /// ```
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let agent = user_agent.to_lowercase();
        let mut rules = Self::default();
        let mut applicable = false;

        for line in content.lines() {
            let trimmed = line.trim();

            // Skip comments and empty lines
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    let group = value.to_lowercase();
                    applicable = group == "*" || (!group.is_empty() && group.contains(&agent));
                }
                "disallow" if applicable => {
                    if value == "/" {
                        rules.disallow_all = true;
                    } else if !value.is_empty() {
                        rules.disallowed_paths.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        rules
    }

    /// Checks whether a URL path may be fetched
    pub fn is_allowed(&self, path: &str) -> bool {
        if self.disallow_all {
            return false;
        }

        !self
            .disallowed_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}
