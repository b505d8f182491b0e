//! Version conflict detection and resolution reporting.
//!
//! Losing candidates are recorded, never silently dropped, together with
//! the chain of modules that pulled each one in.

use std::fmt;

use girder_core::coordinate::ModuleId;
use girder_core::version::ExactVersion;

/// All version conflicts encountered during one resolution.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// One losing candidate: the version that was requested and the version
/// the module actually resolved to.
#[derive(Debug, Clone)]
pub struct VersionConflict {
    pub id: ModuleId,
    pub requested: ExactVersion,
    pub resolved: ExactVersion,
    pub reason: String,
    /// The chain of modules that pulled the losing candidate in; empty for
    /// a direct declaration.
    pub path: Vec<ModuleId>,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// The losing candidates recorded for one module.
    pub fn losers_of(&self, id: &ModuleId) -> Vec<&VersionConflict> {
        self.conflicts.iter().filter(|c| &c.id == id).collect()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requested {} but resolved {} ({})",
            self.id, self.requested, self.resolved, self.reason
        )?;
        if !self.path.is_empty() {
            let chain: Vec<String> = self.path.iter().map(|id| id.to_string()).collect();
            write!(f, " via {}", chain.join(" -> "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let report = ConflictReport::new();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "No version conflicts.");
    }

    #[test]
    fn report_with_path() {
        let mut report = ConflictReport::new();
        report.add(VersionConflict {
            id: ModuleId::new("org.example", "lib"),
            requested: ExactVersion::parse("1.0"),
            resolved: ExactVersion::parse("2.0"),
            reason: "highest version wins".to_string(),
            path: vec![ModuleId::new("org.example", "app")],
        });
        assert_eq!(report.len(), 1);
        let s = report.to_string();
        assert!(s.contains("org.example:lib"));
        assert!(s.contains("requested 1.0 but resolved 2.0"));
        assert!(s.contains("via org.example:app"));
    }

    #[test]
    fn losers_filtered_by_module() {
        let mut report = ConflictReport::new();
        report.add(VersionConflict {
            id: ModuleId::new("g", "a"),
            requested: ExactVersion::parse("1.0"),
            resolved: ExactVersion::parse("2.0"),
            reason: "highest version wins".to_string(),
            path: Vec::new(),
        });
        assert_eq!(report.losers_of(&ModuleId::new("g", "a")).len(), 1);
        assert!(report.losers_of(&ModuleId::new("g", "b")).is_empty());
    }
}
