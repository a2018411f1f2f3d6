//! Service lookup by path prefix.
//!
//! # Responsibilities
//! - Store compiled prefix matchers
//! - Look up the service key for a request path
//! - Return matched key or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Matchers sorted by descending prefix length: longest prefix wins
//! - Ties broken by service key so resolution never depends on map order

use crate::routing::matcher::PathPrefixMatcher;

/// Immutable prefix table mapping paths to service keys.
#[derive(Debug, Default)]
pub struct PrefixRouter {
    routes: Vec<(PathPrefixMatcher, String)>,
}

impl PrefixRouter {
    /// Compile `(service_key, prefix)` pairs into a router.
    pub fn new<I, K, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<String>,
    {
        let mut routes: Vec<(PathPrefixMatcher, String)> = entries
            .into_iter()
            .map(|(key, prefix)| (PathPrefixMatcher::new(prefix), key.into()))
            .collect();

        routes.sort_by(|(a, a_key), (b, b_key)| {
            b.specificity()
                .cmp(&a.specificity())
                .then_with(|| a_key.cmp(b_key))
        });

        Self { routes }
    }

    /// Find the service key whose prefix is the longest match for `path`.
    pub fn resolve(&self, path: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|(matcher, _)| matcher.matches(path))
            .map(|(_, key)| key.as_str())
    }
}
