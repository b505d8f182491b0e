//! Managed versions: a module-to-version table layered under declarations
//! that carry no version of their own.
//!
//! A provider is built once per resolution context (explicit overrides
//! and/or a bill-of-materials import) and queried read-only afterwards.
//! Version text is interpolated against the property bag at insertion, so
//! lookups never re-expand.

use std::collections::BTreeMap;

use girder_util::errors::GirderError;

use crate::coordinate::ModuleId;
use crate::interpolate::{interpolate, DEFAULT_MAX_DEPTH};
use crate::version::VersionReq;

/// A read-only managed-version table with `${token}` properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionProvider {
    managed: BTreeMap<ModuleId, VersionReq>,
    properties: BTreeMap<String, String>,
    unresolved: Vec<String>,
}

impl VersionProvider {
    pub fn builder() -> VersionProviderBuilder {
        VersionProviderBuilder::default()
    }

    /// The managed version for a module, if any. Overrides any range the
    /// declaration itself carries.
    pub fn version_for(&self, id: &ModuleId) -> Option<&VersionReq> {
        self.managed.get(id)
    }

    pub fn manages(&self, id: &ModuleId) -> bool {
        self.managed.contains_key(id)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    /// Tokens that could not be expanded while the provider was built.
    pub fn unresolved_tokens(&self) -> &[String] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.managed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managed.is_empty()
    }
}

/// Accumulates properties and managed versions, interpolating as it goes.
#[derive(Debug, Clone, Default)]
pub struct VersionProviderBuilder {
    managed: Vec<(ModuleId, String)>,
    properties: BTreeMap<String, String>,
}

impl VersionProviderBuilder {
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in pairs {
            self.properties.insert(k.into(), v.into());
        }
        self
    }

    /// Manage `id` at `version`, which may contain `${token}` references.
    /// A later entry for the same module wins (override semantics).
    pub fn managed(mut self, id: ModuleId, version: impl Into<String>) -> Self {
        self.managed.push((id, version.into()));
        self
    }

    /// Interpolate and parse every managed version.
    ///
    /// Unknown tokens leave the entry unmanaged (its raw text would not
    /// parse as a version) and are reported via `unresolved_tokens`.
    pub fn build(self) -> Result<VersionProvider, GirderError> {
        let mut managed = BTreeMap::new();
        let mut unresolved = Vec::new();

        for (id, raw) in self.managed {
            let expanded = interpolate(&raw, &self.properties, DEFAULT_MAX_DEPTH)?;
            for token in expanded.unresolved {
                tracing::warn!("unresolved token `${{{token}}}` in managed version for {id}");
                if !unresolved.contains(&token) {
                    unresolved.push(token);
                }
            }
            if expanded.text.contains("${") {
                continue;
            }
            managed.insert(id, VersionReq::parse(&expanded.text)?);
        }

        Ok(VersionProvider {
            managed,
            properties: self.properties,
            unresolved,
        })
    }
}
