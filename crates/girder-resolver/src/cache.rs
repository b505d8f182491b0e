//! Per-resolution memoization.
//!
//! A module re-encountered at an identical `(ModuleId, version)` pair is
//! never re-expanded, which guarantees termination across repeated
//! diamonds. The set is owned by one resolution run and never shared.

use std::collections::HashSet;

use girder_core::coordinate::ModuleId;
use girder_core::version::ExactVersion;

/// Tracks which module/version pairs have already been expanded.
#[derive(Debug, Default)]
pub struct VisitedSet {
    visited: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a pair as expanded. Returns `false` if already expanded.
    pub fn visit(&mut self, id: &ModuleId, version: &ExactVersion) -> bool {
        self.visited.insert(key(id, version))
    }

    pub fn contains(&self, id: &ModuleId, version: &ExactVersion) -> bool {
        self.visited.contains(&key(id, version))
    }
}

fn key(id: &ModuleId, version: &ExactVersion) -> String {
    format!("{id}:{}", version.original)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visited_tracking() {
        let mut set = VisitedSet::new();
        let id = ModuleId::new("org.example", "lib");
        let v1 = ExactVersion::parse("1.0");
        let v2 = ExactVersion::parse("2.0");
        assert!(set.visit(&id, &v1));
        assert!(!set.visit(&id, &v1));
        assert!(set.contains(&id, &v1));
        assert!(!set.contains(&id, &v2));
    }
}
