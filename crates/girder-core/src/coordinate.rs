//! Dependency coordinate parsing.
//!
//! A coordinate is colon-delimited text: `group:name[:version][:classifier][:kind]`.
//! Group and name are mandatory; an empty version segment defers the choice
//! to the managed-version provider.

use std::fmt;

use serde::{Deserialize, Serialize};

use girder_util::errors::GirderError;

use crate::version::VersionReq;

/// The `(group, name)` identity of a module, independent of version.
///
/// This is the conflict-resolution key: two entries with the same
/// `ModuleId` are the same module regardless of requested version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId {
    pub group: String,
    pub name: String,
}

impl ModuleId {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// A fully parsed dependency coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub id: ModuleId,
    /// `None` defers to the managed-version provider.
    pub version: Option<VersionReq>,
    pub classifier: Option<String>,
    /// Artifact kind; `None` means the repository default (`jar`).
    pub kind: Option<String>,
}

impl Coordinate {
    /// Parse `group:name[:version][:classifier][:kind]`.
    ///
    /// Empty optional segments are allowed: `org.example:lib::sources`
    /// defers the version and requests the `sources` classifier.
    pub fn parse(text: &str) -> Result<Self, GirderError> {
        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() < 2 || parts.len() > 5 {
            return Err(GirderError::Coordinate {
                message: format!(
                    "`{text}` has {} segment(s), expected group:name[:version][:classifier][:kind]",
                    parts.len()
                ),
            });
        }
        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(GirderError::Coordinate {
                message: format!("`{text}` has an empty group or name"),
            });
        }

        let version = match parts.get(2) {
            Some(v) if !v.is_empty() => Some(VersionReq::parse(v)?),
            _ => None,
        };
        let optional = |i: usize| parts.get(i).filter(|s| !s.is_empty()).map(|s| s.to_string());

        Ok(Self {
            id: ModuleId::new(parts[0], parts[1]),
            version,
            classifier: optional(3),
            kind: optional(4),
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(ref v) = self.version {
            write!(f, ":{v}")?;
        } else if self.classifier.is_some() || self.kind.is_some() {
            write!(f, ":")?;
        }
        if let Some(ref c) = self.classifier {
            write!(f, ":{c}")?;
        } else if self.kind.is_some() {
            write!(f, ":")?;
        }
        if let Some(ref k) = self.kind {
            write!(f, ":{k}")?;
        }
        Ok(())
    }
}
