//! Exclusion patterns for transitive dependency filtering.
//!
//! A pattern is a `group:name` pair where either side may be a glob
//! (`commons-logging:*`, `org.slf4j:slf4j-*`). A bare `group` with no
//! colon excludes every module of that group.

use globset::{Glob, GlobMatcher};

use crate::errors::GirderError;

/// A compiled `group:name` exclusion glob.
///
/// Equality and hashing use the raw pattern text, so values holding
/// patterns stay comparable.
#[derive(Debug, Clone)]
pub struct ExcludePattern {
    raw: String,
    group: GlobMatcher,
    name: GlobMatcher,
}

impl ExcludePattern {
    /// Compile a pattern from `group[:name]` text.
    pub fn parse(pattern: &str) -> Result<Self, GirderError> {
        let (group, name) = match pattern.split_once(':') {
            Some((g, n)) => (g, n),
            None => (pattern, "*"),
        };
        if group.is_empty() || name.is_empty() {
            return Err(GirderError::Coordinate {
                message: format!("exclusion pattern `{pattern}` has an empty side"),
            });
        }
        Ok(Self {
            raw: pattern.to_string(),
            group: compile(group)?,
            name: compile(name)?,
        })
    }

    /// The original pattern text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether a `(group, name)` module identity is excluded.
    pub fn matches(&self, group: &str, name: &str) -> bool {
        self.group.is_match(group) && self.name.is_match(name)
    }
}

impl PartialEq for ExcludePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ExcludePattern {}

impl std::hash::Hash for ExcludePattern {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Display for ExcludePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn compile(side: &str) -> Result<GlobMatcher, GirderError> {
    Glob::new(side)
        .map(|g| g.compile_matcher())
        .map_err(|e| GirderError::Coordinate {
            message: format!("invalid exclusion glob `{side}`: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern() {
        let p = ExcludePattern::parse("commons-logging:commons-logging").unwrap();
        assert!(p.matches("commons-logging", "commons-logging"));
        assert!(!p.matches("commons-logging", "commons-codec"));
    }

    #[test]
    fn group_only_excludes_whole_group() {
        let p = ExcludePattern::parse("commons-logging").unwrap();
        assert!(p.matches("commons-logging", "commons-logging"));
        assert!(p.matches("commons-logging", "anything"));
        assert!(!p.matches("org.slf4j", "slf4j-api"));
    }

    #[test]
    fn name_glob() {
        let p = ExcludePattern::parse("org.slf4j:slf4j-*").unwrap();
        assert!(p.matches("org.slf4j", "slf4j-api"));
        assert!(p.matches("org.slf4j", "slf4j-simple"));
        assert!(!p.matches("org.slf4j", "jul-to-slf4j"));
    }

    #[test]
    fn empty_side_rejected() {
        assert!(ExcludePattern::parse(":name").is_err());
        assert!(ExcludePattern::parse("group:").is_err());
    }

    #[test]
    fn equality_on_raw_text() {
        let a = ExcludePattern::parse("g:*").unwrap();
        let b = ExcludePattern::parse("g:*").unwrap();
        assert_eq!(a, b);
    }
}
