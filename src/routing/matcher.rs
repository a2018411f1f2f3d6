//! Path prefix matching.
//!
//! # Design Decisions
//! - Literal string prefix at position 0, no segment awareness
//!   (`/api/v1/users` matches `/api/v1/users2`)
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

/// Matches a request path, without its query string, against a literal prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Specificity used for ordering; longer prefixes win.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api/v1/users");

        assert!(matcher.matches("/api/v1/users"));
        assert!(matcher.matches("/api/v1/users/login"));
        assert!(!matcher.matches("/api/v1/timelines"));
        assert!(!matcher.matches("/API/v1/users"));
        assert!(!matcher.matches("/x/api/v1/users"));
    }
}
