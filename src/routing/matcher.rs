//! Topic filter matching.
//!
//! # Responsibilities
//! - Match concrete topics against subscription filters
//! - Support `+` (one level) and `#` (remaining levels)
//!
//! # Design Decisions
//! - Filters are parsed once and matched level by level
//! - `#` is only honoured as the last level
//! - No regex, matching is O(levels)

use crate::routing::topic::{MULTI_LEVEL_WILDCARD, SINGLE_LEVEL_WILDCARD};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Level {
    Exact(String),
    Single,
    Multi,
}

/// A parsed subscription filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    raw: String,
    levels: Vec<Level>,
}

impl TopicFilter {
    /// Parse a filter such as `+/msg/gauge/+`.
    pub fn new(filter: impl Into<String>) -> Self {
        let raw = filter.into();
        let levels = raw
            .split('/')
            .map(|level| match level {
                SINGLE_LEVEL_WILDCARD => Level::Single,
                MULTI_LEVEL_WILDCARD => Level::Multi,
                other => Level::Exact(other.to_string()),
            })
            .collect();
        Self { raw, levels }
    }

    /// The filter as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if the filter contains any wildcard level.
    pub fn has_wildcards(&self) -> bool {
        self.levels.iter().any(|l| !matches!(l, Level::Exact(_)))
    }

    /// Returns true if `topic` matches this filter.
    pub fn matches(&self, topic: &str) -> bool {
        let mut parts = topic.split('/');
        for (i, level) in self.levels.iter().enumerate() {
            match level {
                Level::Multi => return i == self.levels.len() - 1,
                Level::Single => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Level::Exact(expected) => match parts.next() {
                    Some(part) if part == expected => {}
                    _ => return false,
                },
            }
        }
        parts.next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let filter = TopicFilter::new("core/msg/gauge/start");
        assert!(filter.matches("core/msg/gauge/start"));
        assert!(!filter.matches("core/msg/gauge/stop"));
        assert!(!filter.matches("core/msg/gauge"));
        assert!(!filter.has_wildcards());
    }

    #[test]
    fn test_single_level_wildcard() {
        let filter = TopicFilter::new("+/msg/gauge/+");
        assert!(filter.matches("core/msg/gauge/start"));
        assert!(filter.matches("other/msg/gauge/configs"));
        assert!(!filter.matches("core/msg/other/start"));
        assert!(!filter.matches("core/msg/gauge/start/extra"));
        assert!(filter.has_wildcards());
    }

    #[test]
    fn test_multi_level_wildcard() {
        assert!(TopicFilter::new("gauge/#").matches("gauge/msg/core/alive"));
        assert!(TopicFilter::new("#").matches("anything/at/all"));
        assert!(!TopicFilter::new("gauge/#").matches("core/msg/gauge/alive"));
        // Only valid as the last level
        assert!(!TopicFilter::new("#/alive").matches("gauge/msg/core/alive"));
    }
}
