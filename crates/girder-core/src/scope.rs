//! Scope inheritance graph and scope-to-configuration mapping.
//!
//! Scopes are named build phases (`compile`, `runtime`, `test`, ...). An
//! edge `A -> B` means requesting A also requests B. The graph is fixed
//! once resolution begins; edge insertion validates acyclicity.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use girder_util::errors::GirderError;

/// The configuration a dependency's metadata exposes when nothing more
/// specific is mapped.
pub const DEFAULT_CONFIG: &str = "default";

/// A DAG of named scopes with an inherits relation.
#[derive(Debug, Clone, Default)]
pub struct ScopeGraph {
    /// scope -> scopes it directly inherits
    inherits: BTreeMap<String, BTreeSet<String>>,
}

impl ScopeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in graph: `runtime -> compile`, `test -> runtime`,
    /// plus a standalone `provided`.
    pub fn built_in() -> Self {
        let mut graph = Self::new();
        graph.add_scope("compile");
        graph.add_scope("provided");
        graph
            .add_inherits("runtime", "compile")
            .expect("built-in scope graph is acyclic");
        graph
            .add_inherits("test", "runtime")
            .expect("built-in scope graph is acyclic");
        graph
    }

    /// Register a scope with no inheritance edges. Idempotent.
    pub fn add_scope(&mut self, scope: &str) {
        self.inherits.entry(scope.to_string()).or_default();
    }

    /// Add `scope -> inherits`, registering both scopes as needed.
    ///
    /// Fails without modifying the graph if the edge would create a cycle.
    pub fn add_inherits(&mut self, scope: &str, inherits: &str) -> Result<(), GirderError> {
        if scope == inherits || self.reachable_from(inherits).contains(scope) {
            return Err(GirderError::ScopeCycle {
                scope: scope.to_string(),
                inherits: inherits.to_string(),
            });
        }
        self.add_scope(inherits);
        self.inherits
            .entry(scope.to_string())
            .or_default()
            .insert(inherits.to_string());
        Ok(())
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.inherits.contains_key(scope)
    }

    /// `scope` plus everything it transitively inherits.
    ///
    /// An unregistered scope reaches only itself.
    pub fn reachable_from(&self, scope: &str) -> BTreeSet<String> {
        let mut reached = BTreeSet::new();
        let mut queue = VecDeque::from([scope.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !reached.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = self.inherits.get(&current) {
                queue.extend(parents.iter().cloned());
            }
        }
        reached
    }

    /// All registered scope names.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.inherits.keys().map(|s| s.as_str())
    }
}

/// Translation of local scopes into the configuration names a dependency's
/// own metadata exposes.
///
/// A dependency declared with a mapping is requested by scope `S` when the
/// mapping's "from" side contains `S`; the transitive fetch then uses the
/// configurations mapped for `S`, or the default fallback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeMapping {
    mappings: BTreeMap<String, Vec<String>>,
    default: Vec<String>,
}

impl ScopeMapping {
    pub fn new() -> Self {
        Self {
            mappings: BTreeMap::new(),
            default: vec![DEFAULT_CONFIG.to_string()],
        }
    }

    /// Map a local scope to the target configuration names.
    pub fn map(mut self, scope: &str, configs: &[&str]) -> Self {
        self.mappings.insert(
            scope.to_string(),
            configs.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Replace the fallback used for unmapped scopes.
    pub fn with_default(mut self, configs: &[&str]) -> Self {
        self.default = configs.iter().map(|c| c.to_string()).collect();
        self
    }

    /// The local scopes this mapping declares ("from" side).
    pub fn from_scopes(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(|s| s.as_str())
    }

    pub fn declares(&self, scope: &str) -> bool {
        self.mappings.contains_key(scope)
    }

    /// The configuration names to fetch for a requested scope: the explicit
    /// mapping if present, else the default fallback.
    pub fn target_configs(&self, scope: &str) -> Vec<String> {
        self.mappings
            .get(scope)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
