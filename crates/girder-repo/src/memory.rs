//! An in-memory repository: descriptors registered programmatically,
//! artifacts materialized as files in a private temp directory.
//!
//! Used as the fixture repository in tests and for project-local modules
//! whose outputs never leave the machine.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::TempDir;

use girder_core::coordinate::ModuleId;
use girder_core::version::ExactVersion;
use girder_util::errors::{GirderError, GirderResult};

use crate::descriptor::parse_descriptor;
use crate::repository::{ModuleMetadata, Repository};

/// A repository backed entirely by memory and a temp directory.
pub struct InMemoryRepository {
    name: String,
    /// module -> version literal -> descriptor
    modules: BTreeMap<ModuleId, BTreeMap<String, ModuleMetadata>>,
    /// (module, version literal, classifier, kind) -> artifact file
    artifacts: BTreeMap<(ModuleId, String, String, String), PathBuf>,
    dir: TempDir,
}

impl InMemoryRepository {
    pub fn new(name: impl Into<String>) -> GirderResult<Self> {
        Ok(Self {
            name: name.into(),
            modules: BTreeMap::new(),
            artifacts: BTreeMap::new(),
            dir: TempDir::new().map_err(GirderError::Io)?,
        })
    }

    /// Register a descriptor and a stub artifact for its default kind.
    pub fn insert(&mut self, metadata: ModuleMetadata) -> GirderResult<()> {
        self.insert_with_artifact(metadata, b"")
    }

    /// Register a descriptor parsed from XML, with a stub artifact.
    pub fn insert_descriptor(&mut self, xml: &str) -> GirderResult<()> {
        self.insert(parse_descriptor(xml)?)
    }

    /// Register a descriptor plus its main artifact bytes.
    pub fn insert_with_artifact(
        &mut self,
        metadata: ModuleMetadata,
        bytes: &[u8],
    ) -> GirderResult<()> {
        let id = metadata.id.clone();
        let version = metadata.version.original.clone();
        self.write_artifact(&id, &version, None, None, bytes)?;
        self.modules
            .entry(id)
            .or_default()
            .insert(version, metadata);
        Ok(())
    }

    /// Register an auxiliary artifact (a classifier and/or non-default kind).
    pub fn insert_artifact(
        &mut self,
        id: &ModuleId,
        version: &ExactVersion,
        classifier: Option<&str>,
        kind: Option<&str>,
        bytes: &[u8],
    ) -> GirderResult<()> {
        self.write_artifact(id, &version.original, classifier, kind, bytes)
    }

    fn write_artifact(
        &mut self,
        id: &ModuleId,
        version: &str,
        classifier: Option<&str>,
        kind: Option<&str>,
        bytes: &[u8],
    ) -> GirderResult<()> {
        let kind = kind.unwrap_or("jar");
        // Group prefix keeps same-named modules from colliding in the dir.
        let file_name = match classifier {
            Some(c) => format!("{}_{}-{version}-{c}.{kind}", id.group, id.name),
            None => format!("{}_{}-{version}.{kind}", id.group, id.name),
        };
        let path = self.dir.path().join(&file_name);
        std::fs::write(&path, bytes).map_err(GirderError::Io)?;
        self.artifacts.insert(
            (
                id.clone(),
                version.to_string(),
                classifier.unwrap_or("").to_string(),
                kind.to_string(),
            ),
            path,
        );
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_versions(&self, id: &ModuleId) -> GirderResult<Vec<ExactVersion>> {
        Ok(self
            .modules
            .get(id)
            .map(|versions| {
                versions
                    .keys()
                    .map(|v| ExactVersion::parse(v))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default())
    }

    async fn fetch_metadata(
        &self,
        id: &ModuleId,
        version: &ExactVersion,
    ) -> GirderResult<Option<ModuleMetadata>> {
        Ok(self
            .modules
            .get(id)
            .and_then(|versions| versions.get(&version.original))
            .cloned())
    }

    async fn fetch_artifact(
        &self,
        id: &ModuleId,
        version: &ExactVersion,
        classifier: Option<&str>,
        kind: Option<&str>,
    ) -> GirderResult<Option<PathBuf>> {
        let key = (
            id.clone(),
            version.original.clone(),
            classifier.unwrap_or("").to_string(),
            kind.unwrap_or("jar").to_string(),
        );
        Ok(self.artifacts.get(&key).cloned())
    }
}
