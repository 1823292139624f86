//! Route pattern matching.
//!
//! # Responsibilities
//! - Parse route patterns into literal, prefix or segment variants
//! - Match request paths against a pattern
//!
//! # Syntax
//! - `/a/b` matches only `/a/b`
//! - `/a/*` matches anything starting with `/a/`
//! - `/a/*/b` matches anything under `/a/` containing the segment `/b`,
//!   where the segment ends the path or is followed by `/`
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - At most one `*`; it either ends the pattern or precedes a segment
//! - No regex to guarantee O(n) matching

use std::fmt;
use std::str::FromStr;

use super::RouteError;

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutePattern {
    /// Matches only the identical path.
    Exact(String),
    /// Matches any path starting with the literal prefix.
    Prefix(String),
    /// Matches any path under `prefix` that contains `segment` as whole
    /// path components.
    Segment { prefix: String, segment: String },
}

impl RoutePattern {
    /// Returns true if `path` matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            RoutePattern::Exact(literal) => path == literal,
            RoutePattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            RoutePattern::Segment { prefix, segment } => {
                if !path.starts_with(prefix.as_str()) {
                    return false;
                }
                // A prefix ending in '/' lends that slash to the segment.
                let from = prefix.len() - usize::from(prefix.ends_with('/'));
                path[from..].match_indices(segment.as_str()).any(|(idx, _)| {
                    let end = from + idx + segment.len();
                    end == path.len() || segment.ends_with('/') || path[end..].starts_with('/')
                })
            }
        }
    }

    /// The literal part of the pattern that a matching path starts with.
    pub fn literal(&self) -> &str {
        match self {
            RoutePattern::Exact(literal) | RoutePattern::Prefix(literal) => literal,
            RoutePattern::Segment { prefix, .. } => prefix,
        }
    }
}

impl FromStr for RoutePattern {
    type Err = RouteError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        if !pattern.starts_with('/') {
            return Err(RouteError::InvalidPattern(pattern.to_string()));
        }
        match pattern.find('*') {
            None => Ok(RoutePattern::Exact(pattern.to_string())),
            Some(idx) if idx == pattern.len() - 1 => {
                Ok(RoutePattern::Prefix(pattern[..idx].to_string()))
            }
            Some(idx) => {
                let segment = &pattern[idx + 1..];
                if !segment.starts_with('/') || segment.contains('*') {
                    return Err(RouteError::InvalidPattern(pattern.to_string()));
                }
                Ok(RoutePattern::Segment {
                    prefix: pattern[..idx].to_string(),
                    segment: segment.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePattern::Exact(literal) => f.write_str(literal),
            RoutePattern::Prefix(prefix) => write!(f, "{}*", prefix),
            RoutePattern::Segment { prefix, segment } => write!(f, "{}*{}", prefix, segment),
        }
    }
}
