//! Core dependency resolution: scope-filtered seeding, level-ordered BFS,
//! transitivity control, exclusion accumulation, managed-version
//! overrides, and highest-version-wins conflict arbitration.
//!
//! Metadata for each depth level is prefetched through a bounded worker
//! pool and merged serially in queue order, so the result is
//! deterministic regardless of fetch completion order. Dropping the
//! returned future aborts in-flight fetches.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use girder_core::coordinate::ModuleId;
use girder_core::dependency::{
    DependencySet, DependencyTarget, ScopeSpec, Transitivity,
};
use girder_core::provider::VersionProvider;
use girder_core::scope::{ScopeGraph, ScopeMapping, DEFAULT_CONFIG};
use girder_core::version::{ExactVersion, VersionReq};
use girder_repo::repository::{ModuleMetadata, Repository};
use girder_util::errors::{GirderError, GirderResult};
use girder_util::pattern::ExcludePattern;

use crate::cache::VisitedSet;
use crate::conflict::{ConflictReport, VersionConflict};
use crate::graph::DependencyGraph;

const MAX_CONCURRENT_FETCHES: usize = 8;

/// The resolution engine: repositories consulted in declaration order, a
/// scope graph fixed before resolution begins, and an optional
/// managed-version provider.
///
/// One handle is constructed per resolution context and passed by
/// reference; it holds no mutable state across runs.
pub struct Resolver {
    repos: Vec<Arc<dyn Repository>>,
    scopes: ScopeGraph,
    provider: Option<VersionProvider>,
}

/// The output of dependency resolution.
pub struct Resolution {
    /// Resolved artifacts in first-discovery order, one per module.
    pub artifacts: Vec<ResolvedArtifact>,
    /// Winning and losing versions per module, with discovery paths.
    pub conflicts: ConflictReport,
    /// The requester graph, for tree rendering and path diagnostics.
    pub graph: DependencyGraph,
    /// Every version requested per `group:name` during the walk.
    pub version_requests: BTreeMap<String, BTreeSet<String>>,
    /// Interpolation tokens the provider could not expand.
    pub unresolved_tokens: Vec<String>,
}

/// A single resolved artifact.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub location: PathBuf,
    pub source: ArtifactSource,
}

/// Where a resolved artifact came from.
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    /// Fetched from a repository.
    Module {
        id: ModuleId,
        version: ExactVersion,
        classifier: Option<String>,
        kind: Option<String>,
        repository: String,
    },
    /// A sibling project's build output.
    Project { id: ModuleId, version: ExactVersion },
    /// A file declared directly in the dependency set.
    File,
}

impl ResolvedArtifact {
    pub fn module_id(&self) -> Option<&ModuleId> {
        match &self.source {
            ArtifactSource::Module { id, .. } | ArtifactSource::Project { id, .. } => Some(id),
            ArtifactSource::File => None,
        }
    }

    pub fn version(&self) -> Option<&ExactVersion> {
        match &self.source {
            ArtifactSource::Module { version, .. } | ArtifactSource::Project { version, .. } => {
                Some(version)
            }
            ArtifactSource::File => None,
        }
    }
}

/// Version state of a queued module before settling.
#[derive(Debug, Clone)]
enum PendingVersion {
    Req(VersionReq),
    /// No declared version; the provider must cover it (direct
    /// declarations) or the child is skipped (remote metadata).
    Deferred,
}

/// Entry in the BFS queue.
struct PendingItem {
    target: PendingTarget,
    depth: usize,
    /// Chain of modules that pulled this item in; empty for direct
    /// declarations.
    path: Vec<ModuleId>,
    /// Exclusions accumulated down the path.
    exclusions: Vec<ExcludePattern>,
}

enum PendingTarget {
    Module {
        id: ModuleId,
        version: PendingVersion,
        classifier: Option<String>,
        kind: Option<String>,
        transitivity: Transitivity,
        mapping: Option<ScopeMapping>,
        /// Pre-resolved location (project outputs); never fetched.
        location: Option<PathBuf>,
    },
    File {
        location: PathBuf,
    },
}

/// A queue entry whose version has been settled to an exact version.
enum SettledItem {
    Module(SettledModule),
    File { location: PathBuf },
}

struct SettledModule {
    id: ModuleId,
    version: ExactVersion,
    classifier: Option<String>,
    kind: Option<String>,
    transitivity: Transitivity,
    mapping: Option<ScopeMapping>,
    location: Option<PathBuf>,
    depth: usize,
    path: Vec<ModuleId>,
    exclusions: Vec<ExcludePattern>,
}

/// The current arbitration winner for a module.
struct Winner {
    version: ExactVersion,
    classifier: Option<String>,
    kind: Option<String>,
    path: Vec<ModuleId>,
    location: Option<PathBuf>,
}

/// Discovery-ordered output slots.
enum OrderKey {
    Module(ModuleId),
    File(usize),
}

/// Outcome of comparing a dequeued module against the current winner.
enum Arbitration {
    First,
    Replaces {
        prior: ExactVersion,
        prior_path: Vec<ModuleId>,
    },
    Loses {
        winner: ExactVersion,
    },
    Duplicate,
}

impl Resolver {
    pub fn new(repos: Vec<Arc<dyn Repository>>, scopes: ScopeGraph) -> Self {
        Self {
            repos,
            scopes,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: VersionProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    fn sources(&self) -> String {
        let names: Vec<&str> = self.repos.iter().map(|r| r.name()).collect();
        names.join(", ")
    }

    /// Resolve a dependency set for one requested scope.
    pub async fn resolve(&self, set: &DependencySet, scope: &str) -> miette::Result<Resolution> {
        if !self.scopes.contains(scope) {
            return Err(GirderError::UnknownScope {
                scope: scope.to_string(),
            }
            .into());
        }

        let mut graph = DependencyGraph::new();
        let mut conflicts = ConflictReport::new();
        let mut visited = VisitedSet::new();
        let mut winners: HashMap<ModuleId, Winner> = HashMap::new();
        let mut order: Vec<OrderKey> = Vec::new();
        let mut ordered: HashSet<ModuleId> = HashSet::new();
        let mut files: Vec<PathBuf> = Vec::new();
        let mut file_seen: HashSet<PathBuf> = HashSet::new();
        let mut version_requests: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut metadata_cache: HashMap<String, (ModuleMetadata, String)> = HashMap::new();

        let mut queue: VecDeque<PendingItem> = VecDeque::new();
        for entry in set.iter().filter(|e| e.is_requested_by(scope, &self.scopes)) {
            let target = match &entry.target {
                DependencyTarget::Module {
                    id,
                    version,
                    classifier,
                    kind,
                } => PendingTarget::Module {
                    id: id.clone(),
                    version: version
                        .clone()
                        .map(PendingVersion::Req)
                        .unwrap_or(PendingVersion::Deferred),
                    classifier: classifier.clone(),
                    kind: kind.clone(),
                    transitivity: entry.transitivity,
                    mapping: match &entry.scopes {
                        ScopeSpec::Mapped(m) => Some(m.clone()),
                        ScopeSpec::Scopes(_) => None,
                    },
                    location: None,
                },
                DependencyTarget::File { path } => PendingTarget::File {
                    location: path.clone(),
                },
                DependencyTarget::Project {
                    id,
                    version,
                    artifact,
                } => PendingTarget::Module {
                    id: id.clone(),
                    version: PendingVersion::Req(VersionReq::Exact(version.clone())),
                    classifier: None,
                    kind: None,
                    transitivity: Transitivity::None,
                    mapping: None,
                    location: Some(artifact.clone()),
                },
            };
            queue.push_back(PendingItem {
                target,
                depth: 1,
                path: Vec::new(),
                exclusions: entry.exclusions.clone(),
            });
        }

        tracing::debug!("resolving scope `{scope}`: {} direct entries", queue.len());
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));

        while !queue.is_empty() {
            // Drain the current depth level from the front of the queue
            let current_depth = queue.front().map(|e| e.depth).unwrap_or(0);
            let mut level: Vec<PendingItem> = Vec::new();
            while queue.front().is_some_and(|e| e.depth == current_depth) {
                level.push(queue.pop_front().unwrap());
            }

            let settled = self
                .settle_level(level, &semaphore)
                .await
                .map_err(miette::Report::from)?;

            self.prefetch_metadata(&settled, &visited, &mut metadata_cache, &semaphore)
                .await?;

            // Serial merge in queue order keeps arbitration deterministic
            for item in settled {
                let m = match item {
                    SettledItem::File { location } => {
                        if file_seen.insert(location.clone()) {
                            order.push(OrderKey::File(files.len()));
                            files.push(location);
                        }
                        continue;
                    }
                    SettledItem::Module(m) => m,
                };

                version_requests
                    .entry(m.id.to_string())
                    .or_default()
                    .insert(m.version.original.clone());

                let node = graph.ensure_node(&m.id, &m.version);
                if let Some(parent) = m.path.last() {
                    if let Some(parent_idx) = graph.find(parent) {
                        graph.add_edge(parent_idx, node);
                    }
                }

                let verdict = match winners.get(&m.id) {
                    None => Arbitration::First,
                    Some(current) if m.version > current.version => Arbitration::Replaces {
                        prior: current.version.clone(),
                        prior_path: current.path.clone(),
                    },
                    Some(current) if m.version < current.version => Arbitration::Loses {
                        winner: current.version.clone(),
                    },
                    // Equal versions (possibly distinct literals): the
                    // first-discovered declaration is kept.
                    Some(_) => Arbitration::Duplicate,
                };

                let expand = match verdict {
                    Arbitration::First => {
                        winners.insert(
                            m.id.clone(),
                            Winner {
                                version: m.version.clone(),
                                classifier: m.classifier.clone(),
                                kind: m.kind.clone(),
                                path: m.path.clone(),
                                location: m.location.clone(),
                            },
                        );
                        if ordered.insert(m.id.clone()) {
                            order.push(OrderKey::Module(m.id.clone()));
                        }
                        true
                    }
                    Arbitration::Replaces { prior, prior_path } => {
                        conflicts.add(VersionConflict {
                            id: m.id.clone(),
                            requested: prior,
                            resolved: m.version.clone(),
                            reason: "highest version wins".to_string(),
                            path: prior_path,
                        });
                        winners.insert(
                            m.id.clone(),
                            Winner {
                                version: m.version.clone(),
                                classifier: m.classifier.clone(),
                                kind: m.kind.clone(),
                                path: m.path.clone(),
                                location: m.location.clone(),
                            },
                        );
                        graph.update_version(node, &m.version);
                        true
                    }
                    Arbitration::Loses { winner } => {
                        conflicts.add(VersionConflict {
                            id: m.id.clone(),
                            requested: m.version.clone(),
                            resolved: winner,
                            reason: "highest version wins".to_string(),
                            path: m.path.clone(),
                        });
                        false
                    }
                    Arbitration::Duplicate => false,
                };

                if expand
                    && m.transitivity != Transitivity::None
                    && m.location.is_none()
                    && visited.visit(&m.id, &m.version)
                {
                    self.expand_children(&m, scope, &metadata_cache, &mut queue)?;
                }
            }
        }

        let locations = self
            .fetch_artifacts(&order, &winners, &semaphore)
            .await
            .map_err(miette::Report::from)?;

        let mut artifacts = Vec::new();
        for key in &order {
            match key {
                OrderKey::File(i) => artifacts.push(ResolvedArtifact {
                    location: files[*i].clone(),
                    source: ArtifactSource::File,
                }),
                OrderKey::Module(id) => {
                    let winner = &winners[id];
                    match &winner.location {
                        Some(location) => artifacts.push(ResolvedArtifact {
                            location: location.clone(),
                            source: ArtifactSource::Project {
                                id: id.clone(),
                                version: winner.version.clone(),
                            },
                        }),
                        None => {
                            let (location, repository) =
                                locations.get(id).ok_or_else(|| GirderError::Resolution {
                                    message: format!("no artifact location recorded for {id}"),
                                })?;
                            artifacts.push(ResolvedArtifact {
                                location: location.clone(),
                                source: ArtifactSource::Module {
                                    id: id.clone(),
                                    version: winner.version.clone(),
                                    classifier: winner.classifier.clone(),
                                    kind: winner.kind.clone(),
                                    repository: repository.clone(),
                                },
                            });
                        }
                    }
                }
            }
        }

        tracing::debug!(
            "scope `{scope}` resolved: {} artifacts, {} conflicts",
            artifacts.len(),
            conflicts.len()
        );

        Ok(Resolution {
            artifacts,
            conflicts,
            graph,
            version_requests,
            unresolved_tokens: self
                .provider
                .as_ref()
                .map(|p| p.unresolved_tokens().to_vec())
                .unwrap_or_default(),
        })
    }

    /// Settle every module in a level to an exact version.
    ///
    /// Provider-managed modules are fixed first; ranges resolve against
    /// the union of all repositories' version listings.
    async fn settle_level(
        &self,
        level: Vec<PendingItem>,
        semaphore: &Arc<Semaphore>,
    ) -> GirderResult<Vec<SettledItem>> {
        // Which modules need a candidate listing for range resolution
        let mut need_listing: BTreeSet<ModuleId> = BTreeSet::new();
        for item in &level {
            if let PendingTarget::Module {
                id,
                version,
                location,
                ..
            } = &item.target
            {
                let req = self.effective_req(id, version, location.is_some());
                if matches!(
                    req,
                    Some(VersionReq::Prefix(_)) | Some(VersionReq::Interval { .. })
                ) {
                    need_listing.insert(id.clone());
                }
            }
        }

        let mut listings: HashMap<ModuleId, Vec<ExactVersion>> = HashMap::new();
        if !need_listing.is_empty() {
            let mut join_set = JoinSet::new();
            for id in need_listing {
                let repos = self.repos.clone();
                let sem = semaphore.clone();
                join_set.spawn(async move {
                    let _permit = sem.acquire().await;
                    let result = list_versions_union(&repos, &id).await;
                    (id, result)
                });
            }
            while let Some(joined) = join_set.join_next().await {
                let (id, result) = joined.map_err(|e| GirderError::Resolution {
                    message: format!("version listing task failed: {e}"),
                })?;
                listings.insert(id, result?);
            }
        }

        let mut settled = Vec::new();
        for item in level {
            let PendingItem {
                target,
                depth,
                path,
                exclusions,
            } = item;
            match target {
                PendingTarget::File { location } => {
                    settled.push(SettledItem::File { location });
                }
                PendingTarget::Module {
                    id,
                    version,
                    classifier,
                    kind,
                    transitivity,
                    mapping,
                    location,
                } => {
                    let req = match self.effective_req(&id, &version, location.is_some()) {
                        Some(req) => req.clone(),
                        None if depth == 1 => {
                            return Err(GirderError::MissingVersion {
                                module: id.to_string(),
                                path: "direct declaration".to_string(),
                            });
                        }
                        None => {
                            // Incomplete remote metadata; skip the child
                            tracing::warn!(
                                "skipping {id}: no version declared or managed (via {})",
                                join_path(&path)
                            );
                            continue;
                        }
                    };
                    let exact = match req {
                        VersionReq::Exact(v) => v,
                        ranged => {
                            let empty = Vec::new();
                            let candidates = listings.get(&id).unwrap_or(&empty);
                            ranged.resolve(&id.to_string(), candidates)?
                        }
                    };
                    settled.push(SettledItem::Module(SettledModule {
                        id,
                        version: exact,
                        classifier,
                        kind,
                        transitivity,
                        mapping,
                        location,
                        depth,
                        path,
                        exclusions,
                    }));
                }
            }
        }
        Ok(settled)
    }

    /// The requirement that actually governs a module: the provider's
    /// managed version when present (fixed before arbitration), else the
    /// declared one. Pre-resolved project outputs keep their own version.
    fn effective_req<'a>(
        &'a self,
        id: &ModuleId,
        declared: &'a PendingVersion,
        pre_resolved: bool,
    ) -> Option<&'a VersionReq> {
        if !pre_resolved {
            if let Some(req) = self.provider.as_ref().and_then(|p| p.version_for(id)) {
                return Some(req);
            }
        }
        match declared {
            PendingVersion::Req(req) => Some(req),
            PendingVersion::Deferred => None,
        }
    }

    /// Prefetch descriptors for every expandable module in the level.
    async fn prefetch_metadata(
        &self,
        settled: &[SettledItem],
        visited: &VisitedSet,
        cache: &mut HashMap<String, (ModuleMetadata, String)>,
        semaphore: &Arc<Semaphore>,
    ) -> GirderResult<()> {
        let mut wanted: Vec<(ModuleId, ExactVersion)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for item in settled {
            let SettledItem::Module(m) = item else {
                continue;
            };
            if m.transitivity == Transitivity::None || m.location.is_some() {
                continue;
            }
            if visited.contains(&m.id, &m.version) {
                continue;
            }
            let key = coordinate_key(&m.id, &m.version);
            if cache.contains_key(&key) || !seen.insert(key) {
                continue;
            }
            wanted.push((m.id.clone(), m.version.clone()));
        }
        if wanted.is_empty() {
            return Ok(());
        }

        let mut join_set = JoinSet::new();
        for (id, version) in wanted {
            let repos = self.repos.clone();
            let sem = semaphore.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire().await;
                let result = fetch_metadata_any(&repos, &id, &version).await;
                (coordinate_key(&id, &version), result)
            });
        }
        while let Some(joined) = join_set.join_next().await {
            let (key, result) = joined.map_err(|e| GirderError::Resolution {
                message: format!("metadata fetch task failed: {e}"),
            })?;
            if let Some((metadata, source)) = result? {
                cache.insert(key, (metadata, source));
            }
        }
        Ok(())
    }

    /// Enqueue the children a settled module exposes for the requested
    /// scope, filtered by transitivity and accumulated exclusions.
    fn expand_children(
        &self,
        m: &SettledModule,
        scope: &str,
        metadata_cache: &HashMap<String, (ModuleMetadata, String)>,
        queue: &mut VecDeque<PendingItem>,
    ) -> Result<(), GirderError> {
        let key = coordinate_key(&m.id, &m.version);
        let Some((metadata, _source)) = metadata_cache.get(&key) else {
            return Err(GirderError::RepositoryFetch {
                module: key,
                sources: self.sources(),
                message: format!("module metadata not found (via {})", join_path(&m.path)),
            });
        };
        let mut metadata = metadata.clone();
        metadata.resolve_properties();

        // Configurations of the dependency that expose children for the
        // requested scope; only consulted for declared-scope transitivity.
        let target_configs: Vec<String> = match &m.mapping {
            Some(mapping) => mapping.target_configs(scope),
            None => vec![scope.to_string(), DEFAULT_CONFIG.to_string()],
        };

        for dep in &metadata.dependencies {
            if dep.optional {
                continue;
            }
            if m.transitivity == Transitivity::DeclaredScope
                && !dep
                    .configurations
                    .iter()
                    .any(|c| target_configs.contains(c))
            {
                continue;
            }
            if m.exclusions
                .iter()
                .any(|p| p.matches(&dep.id.group, &dep.id.name))
            {
                tracing::debug!("excluding {} below {}", dep.id, m.id);
                continue;
            }

            let version = match dep.version.as_deref().filter(|v| !v.contains("${")) {
                Some(raw) => PendingVersion::Req(parse_remote_req(&dep.id, raw)?),
                None => match metadata.managed_version(&dep.id) {
                    Some(raw) => PendingVersion::Req(parse_remote_req(&dep.id, raw)?),
                    None => PendingVersion::Deferred,
                },
            };

            let mut exclusions = m.exclusions.clone();
            for pattern in &dep.exclusions {
                if !exclusions.contains(pattern) {
                    exclusions.push(pattern.clone());
                }
            }
            let mut path = m.path.clone();
            path.push(m.id.clone());

            queue.push_back(PendingItem {
                target: PendingTarget::Module {
                    id: dep.id.clone(),
                    version,
                    classifier: None,
                    kind: None,
                    transitivity: m.transitivity,
                    mapping: None,
                    location: None,
                },
                depth: m.depth + 1,
                path,
                exclusions,
            });
        }
        Ok(())
    }

    /// Fetch artifacts for every repository-backed winner, in parallel,
    /// keyed so assembly stays in discovery order.
    async fn fetch_artifacts(
        &self,
        order: &[OrderKey],
        winners: &HashMap<ModuleId, Winner>,
        semaphore: &Arc<Semaphore>,
    ) -> GirderResult<HashMap<ModuleId, (PathBuf, String)>> {
        let mut join_set = JoinSet::new();
        for key in order {
            let OrderKey::Module(id) = key else {
                continue;
            };
            let winner = &winners[id];
            if winner.location.is_some() {
                continue;
            }
            let repos = self.repos.clone();
            let sem = semaphore.clone();
            let id = id.clone();
            let version = winner.version.clone();
            let classifier = winner.classifier.clone();
            let kind = winner.kind.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire().await;
                let result = fetch_artifact_any(
                    &repos,
                    &id,
                    &version,
                    classifier.as_deref(),
                    kind.as_deref(),
                )
                .await;
                (id, version, result)
            });
        }

        let mut locations = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            let (id, version, result) = joined.map_err(|e| GirderError::Resolution {
                message: format!("artifact fetch task failed: {e}"),
            })?;
            match result? {
                Some(found) => {
                    locations.insert(id, found);
                }
                None => {
                    return Err(GirderError::RepositoryFetch {
                        module: coordinate_key(&id, &version),
                        sources: self.sources(),
                        message: "artifact not found".to_string(),
                    });
                }
            }
        }
        Ok(locations)
    }
}

fn coordinate_key(id: &ModuleId, version: &ExactVersion) -> String {
    format!("{id}:{}", version.original)
}

fn join_path(path: &[ModuleId]) -> String {
    if path.is_empty() {
        return "direct declaration".to_string();
    }
    let chain: Vec<String> = path.iter().map(|id| id.to_string()).collect();
    chain.join(" -> ")
}

fn parse_remote_req(id: &ModuleId, raw: &str) -> GirderResult<VersionReq> {
    VersionReq::parse(raw).map_err(|e| GirderError::Coordinate {
        message: format!("invalid version `{raw}` in metadata of {id}: {e}"),
    })
}

/// Union of all repositories' version listings, first repository first.
async fn list_versions_union(
    repos: &[Arc<dyn Repository>],
    id: &ModuleId,
) -> GirderResult<Vec<ExactVersion>> {
    let mut seen = HashSet::new();
    let mut versions = Vec::new();
    for repo in repos {
        for version in repo.list_versions(id).await? {
            if seen.insert(version.original.clone()) {
                versions.push(version);
            }
        }
    }
    Ok(versions)
}

/// Fetch a descriptor from the first repository that has it.
async fn fetch_metadata_any(
    repos: &[Arc<dyn Repository>],
    id: &ModuleId,
    version: &ExactVersion,
) -> GirderResult<Option<(ModuleMetadata, String)>> {
    for repo in repos {
        if let Some(metadata) = repo.fetch_metadata(id, version).await? {
            return Ok(Some((metadata, repo.name().to_string())));
        }
    }
    Ok(None)
}

/// Fetch an artifact from the first repository that has it.
async fn fetch_artifact_any(
    repos: &[Arc<dyn Repository>],
    id: &ModuleId,
    version: &ExactVersion,
    classifier: Option<&str>,
    kind: Option<&str>,
) -> GirderResult<Option<(PathBuf, String)>> {
    for repo in repos {
        if let Some(path) = repo.fetch_artifact(id, version, classifier, kind).await? {
            return Ok(Some((path, repo.name().to_string())));
        }
    }
    Ok(None)
}
