//! Bill-of-materials import.
//!
//! A BOM is an ordinary module descriptor consumed for its property table
//! and managed-dependency list rather than for an artifact. Importing one
//! yields a read-only `VersionProvider`.

use girder_core::coordinate::ModuleId;
use girder_core::provider::VersionProvider;
use girder_core::version::ExactVersion;
use girder_util::errors::{GirderError, GirderResult};

use crate::repository::Repository;

/// Fetch one descriptor and turn its managed table into a provider.
///
/// Managed versions are interpolated against the BOM's own properties;
/// unknown tokens leave the module unmanaged and are reported through
/// `VersionProvider::unresolved_tokens`.
pub async fn import_bom(
    repo: &dyn Repository,
    id: &ModuleId,
    version: &ExactVersion,
) -> GirderResult<VersionProvider> {
    let metadata = repo
        .fetch_metadata(id, version)
        .await?
        .ok_or_else(|| GirderError::RepositoryFetch {
            module: format!("{id}:{version}"),
            sources: repo.name().to_string(),
            message: "bill of materials not found".to_string(),
        })?;

    tracing::debug!(
        "importing BOM {id}:{version}: {} managed entries",
        metadata.managed.len()
    );

    let mut builder = VersionProvider::builder().properties(
        metadata
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    for row in &metadata.managed {
        builder = builder.managed(row.id.clone(), row.version.clone());
    }
    builder.build()
}
