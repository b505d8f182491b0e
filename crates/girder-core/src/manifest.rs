//! The `Girder.toml` build description.
//!
//! A build description declares the module's identity, its dependencies
//! (shorthand coordinate strings or detailed tables), a managed-version
//! table, interpolation properties, and custom scope edges. Parsing one
//! yields the engine's inputs: a `DependencySet`, a `ScopeGraph`, and a
//! `VersionProvider`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use girder_util::errors::{GirderError, GirderResult};
use girder_util::pattern::ExcludePattern;

use crate::coordinate::{Coordinate, ModuleId};
use crate::dependency::{DependencyEntry, DependencySet, Transitivity};
use crate::provider::VersionProvider;
use crate::scope::{ScopeGraph, ScopeMapping};

/// The parsed representation of a `Girder.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub module: ModuleSection,

    #[serde(default)]
    pub dependencies: BTreeMap<String, Dependency>,

    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: BTreeMap<String, Dependency>,

    /// `"group:name" = "version"` managed-version table.
    #[serde(default)]
    pub managed: BTreeMap<String, String>,

    /// Property bag for `${token}` interpolation in managed versions.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Custom scope inheritance edges: `scope = ["inherited", ...]`.
    #[serde(default)]
    pub scopes: BTreeMap<String, Vec<String>>,
}

/// Module identity from the `[module]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSection {
    pub group: String,
    pub name: String,
    pub version: String,
}

/// A dependency declaration, either a shorthand coordinate string or a
/// detailed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Short(String),
    Detailed(DetailedDependency),
}

/// A dependency with explicit fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedDependency {
    pub group: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    /// Scope-to-configuration mapping; mutually exclusive with `scopes`.
    #[serde(default)]
    pub mapping: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, rename = "default-configs")]
    pub default_configs: Option<Vec<String>>,
    /// `"none"`, `"declared"`, or `"full"`.
    #[serde(default)]
    pub transitive: Option<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

impl Manifest {
    /// Load and parse a `Girder.toml` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GirderError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_str(&content)
    }

    /// Parse a `Girder.toml` from a string.
    pub fn from_str(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            GirderError::Manifest {
                message: format!("Failed to parse Girder.toml: {e}"),
            }
            .into()
        })
    }

    /// The identity of the module being built.
    pub fn module_id(&self) -> ModuleId {
        ModuleId::new(self.module.group.clone(), self.module.name.clone())
    }

    /// Build the ordered dependency set: `[dependencies]` entries first,
    /// then `[dev-dependencies]` under the `test` scope, each table in
    /// alias order.
    pub fn dependency_set(&self) -> GirderResult<DependencySet> {
        let mut set = DependencySet::of();
        for (alias, dep) in &self.dependencies {
            set = set.push(to_entry(alias, dep, None)?);
        }
        for (alias, dep) in &self.dev_dependencies {
            set = set.push(to_entry(alias, dep, Some("test"))?);
        }
        Ok(set)
    }

    /// The scope graph: built-in edges plus any `[scopes]` additions.
    pub fn scope_graph(&self) -> GirderResult<ScopeGraph> {
        let mut graph = ScopeGraph::built_in();
        for (scope, inherited) in &self.scopes {
            for parent in inherited {
                graph.add_inherits(scope, parent)?;
            }
        }
        Ok(graph)
    }

    /// The managed-version provider from `[managed]` and `[properties]`.
    pub fn version_provider(&self) -> GirderResult<VersionProvider> {
        let mut builder = VersionProvider::builder().properties(
            self.properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        for (key, version) in &self.managed {
            let id = parse_managed_key(key)?;
            builder = builder.managed(id, version.clone());
        }
        builder.build()
    }
}

fn parse_managed_key(key: &str) -> GirderResult<ModuleId> {
    match key.split_once(':') {
        Some((group, name)) if !group.is_empty() && !name.is_empty() => {
            Ok(ModuleId::new(group, name))
        }
        _ => Err(GirderError::Manifest {
            message: format!("managed key `{key}` is not of the form group:name"),
        }),
    }
}

fn to_entry(
    alias: &str,
    dep: &Dependency,
    forced_scope: Option<&str>,
) -> GirderResult<DependencyEntry> {
    let mut entry = match dep {
        Dependency::Short(text) => DependencyEntry::module(Coordinate::parse(text)?),
        Dependency::Detailed(d) => {
            let mut coordinate = Coordinate {
                id: ModuleId::new(d.group.clone(), d.name.clone()),
                version: None,
                classifier: d.classifier.clone(),
                kind: d.kind.clone(),
            };
            if let Some(ref v) = d.version {
                coordinate.version = Some(crate::version::VersionReq::parse(v)?);
            }
            let mut entry = DependencyEntry::module(coordinate);

            if let Some(ref mapping) = d.mapping {
                if d.scopes.is_some() {
                    return Err(GirderError::Manifest {
                        message: format!(
                            "dependency `{alias}` declares both `scopes` and `mapping`"
                        ),
                    });
                }
                let mut m = ScopeMapping::new();
                for (from, configs) in mapping {
                    let configs: Vec<&str> = configs.iter().map(|c| c.as_str()).collect();
                    m = m.map(from, &configs);
                }
                if let Some(ref defaults) = d.default_configs {
                    let defaults: Vec<&str> = defaults.iter().map(|c| c.as_str()).collect();
                    m = m.with_default(&defaults);
                }
                entry = entry.with_mapping(m);
            } else if let Some(ref scopes) = d.scopes {
                if scopes.is_empty() {
                    return Err(GirderError::Manifest {
                        message: format!("dependency `{alias}` has an empty scope list"),
                    });
                }
                entry = entry.with_scopes(scopes.iter().cloned());
            }

            if let Some(ref level) = d.transitive {
                entry = entry.with_transitivity(parse_transitivity(alias, level)?);
            }
            if !d.exclusions.is_empty() {
                let patterns: Result<Vec<_>, _> = d
                    .exclusions
                    .iter()
                    .map(|p| ExcludePattern::parse(p))
                    .collect();
                entry = entry.with_exclusions(patterns?);
            }
            entry
        }
    };

    if let Some(scope) = forced_scope {
        entry = entry.with_scopes([scope]);
    }
    Ok(entry)
}

fn parse_transitivity(alias: &str, level: &str) -> GirderResult<Transitivity> {
    match level {
        "none" => Ok(Transitivity::None),
        "declared" => Ok(Transitivity::DeclaredScope),
        "full" => Ok(Transitivity::Full),
        other => Err(GirderError::Manifest {
            message: format!(
                "dependency `{alias}` has unknown transitivity `{other}` (expected none, declared, or full)"
            ),
        }),
    }
}
