//! The repository abstraction and the metadata values it serves.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use girder_core::coordinate::ModuleId;
use girder_core::interpolate::{interpolate, DEFAULT_MAX_DEPTH};
use girder_core::version::ExactVersion;
use girder_util::errors::GirderResult;
use girder_util::pattern::ExcludePattern;

/// A source of module metadata and artifacts.
///
/// One handle is constructed per process (or per resolution context) and
/// passed by parameter; implementations own their transport, caching, and
/// retry policy. Absence is `Ok(None)`/an empty listing; `Err` means the
/// source itself failed and the enclosing resolution must abort.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Stable display name, used in diagnostics.
    fn name(&self) -> &str;

    /// Known versions of a module, in any order. Empty if unknown here.
    async fn list_versions(&self, id: &ModuleId) -> GirderResult<Vec<ExactVersion>>;

    /// The module's descriptor at an exact version.
    async fn fetch_metadata(
        &self,
        id: &ModuleId,
        version: &ExactVersion,
    ) -> GirderResult<Option<ModuleMetadata>>;

    /// A local handle to the module's artifact file.
    async fn fetch_artifact(
        &self,
        id: &ModuleId,
        version: &ExactVersion,
        classifier: Option<&str>,
        kind: Option<&str>,
    ) -> GirderResult<Option<PathBuf>>;
}

/// A module's declared metadata: its own dependency list, the
/// configurations each is exposed under, its property bag, and its
/// managed-version table.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleMetadata {
    pub id: ModuleId,
    pub version: ExactVersion,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<MetadataDependency>,
    pub managed: Vec<ManagedDependency>,
}

/// A dependency declared by a published module.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDependency {
    pub id: ModuleId,
    /// Raw version text; may be a range or carry `${token}` references.
    /// `None` defers to the publisher's managed table or the resolution's
    /// version provider.
    pub version: Option<String>,
    /// Configurations of the publisher that expose this dependency.
    pub configurations: Vec<String>,
    pub optional: bool,
    pub exclusions: Vec<ExcludePattern>,
}

/// A managed-version row from a descriptor (the BOM surface).
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedDependency {
    pub id: ModuleId,
    pub version: String,
}

impl Default for ModuleMetadata {
    fn default() -> Self {
        Self {
            id: ModuleId::new("", ""),
            version: ExactVersion::parse("0"),
            properties: BTreeMap::new(),
            dependencies: Vec::new(),
            managed: Vec::new(),
        }
    }
}

impl ModuleMetadata {
    /// Expand `${token}` references in dependency and managed versions
    /// against this module's own properties. Unknown tokens are left in
    /// place (the resolution's provider may still cover the module).
    pub fn resolve_properties(&mut self) {
        let properties = self.properties.clone();
        let expand = |raw: &str| match interpolate(raw, &properties, DEFAULT_MAX_DEPTH) {
            Ok(out) => out.text,
            Err(e) => {
                tracing::warn!("skipping interpolation in descriptor for {}: {e}", self.id);
                raw.to_string()
            }
        };
        for dep in &mut self.dependencies {
            if let Some(ref v) = dep.version {
                dep.version = Some(expand(v));
            }
        }
        for row in &mut self.managed {
            row.version = expand(&row.version);
        }
    }

    /// The publisher's managed version for a module, if fully expanded.
    pub fn managed_version(&self, id: &ModuleId) -> Option<&str> {
        self.managed
            .iter()
            .find(|row| &row.id == id && !row.version.contains("${"))
            .map(|row| row.version.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_properties_expands_versions() {
        let mut meta = ModuleMetadata {
            id: ModuleId::new("org.example", "lib"),
            version: ExactVersion::parse("1.0"),
            properties: BTreeMap::from([("v".to_string(), "2.0.13".to_string())]),
            dependencies: vec![MetadataDependency {
                id: ModuleId::new("org.slf4j", "slf4j-api"),
                version: Some("${v}".to_string()),
                configurations: vec!["default".to_string()],
                optional: false,
                exclusions: Vec::new(),
            }],
            managed: vec![ManagedDependency {
                id: ModuleId::new("org.slf4j", "slf4j-simple"),
                version: "${v}".to_string(),
            }],
        };
        meta.resolve_properties();
        assert_eq!(meta.dependencies[0].version.as_deref(), Some("2.0.13"));
        assert_eq!(
            meta.managed_version(&ModuleId::new("org.slf4j", "slf4j-simple")),
            Some("2.0.13")
        );
    }

    #[test]
    fn unexpanded_managed_version_not_served() {
        let meta = ModuleMetadata {
            managed: vec![ManagedDependency {
                id: ModuleId::new("g", "a"),
                version: "${unknown}".to_string(),
            }],
            ..Default::default()
        };
        assert!(meta.managed_version(&ModuleId::new("g", "a")).is_none());
    }
}
