//! The ordered dependency model: entries, matchers, positional hints, and
//! the persistently immutable `DependencySet`.
//!
//! Order inside a set is meaningful: it is classpath precedence and the
//! tie-breaker during conflict arbitration. Every mutation returns a new
//! set; no entry is ever mutated in place.

use std::collections::BTreeSet;
use std::path::PathBuf;

use girder_util::errors::GirderError;
use girder_util::pattern::ExcludePattern;

use crate::coordinate::{Coordinate, ModuleId};
use crate::scope::{ScopeGraph, ScopeMapping};
use crate::version::{ExactVersion, VersionReq};

/// How much of a dependency's own graph is pulled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transitivity {
    /// The module itself only; none of its declared dependencies.
    None,
    /// Children exposed under the requested scope's configurations.
    DeclaredScope,
    /// All children regardless of their declared configuration.
    Full,
}

/// What a dependency entry points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    /// A module resolved through a repository.
    Module {
        id: ModuleId,
        /// `None` defers to the managed-version provider.
        version: Option<VersionReq>,
        classifier: Option<String>,
        kind: Option<String>,
    },
    /// A file already on disk; never fetched, never expanded.
    File { path: PathBuf },
    /// A build-time artifact produced by a sibling project.
    Project {
        id: ModuleId,
        version: ExactVersion,
        artifact: PathBuf,
    },
}

/// The scopes an entry is active under: a plain name set, or a mapping
/// into the dependency's own configuration names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeSpec {
    Scopes(BTreeSet<String>),
    Mapped(ScopeMapping),
}

/// One declared dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    pub target: DependencyTarget,
    pub scopes: ScopeSpec,
    pub transitivity: Transitivity,
    /// Excluded from this entry's transitive closure only.
    pub exclusions: Vec<ExcludePattern>,
}

impl DependencyEntry {
    /// An entry for a parsed coordinate, active under `compile`, with
    /// declared-scope transitivity and no exclusions.
    pub fn module(coordinate: Coordinate) -> Self {
        Self {
            target: DependencyTarget::Module {
                id: coordinate.id,
                version: coordinate.version,
                classifier: coordinate.classifier,
                kind: coordinate.kind,
            },
            scopes: ScopeSpec::Scopes(BTreeSet::from(["compile".to_string()])),
            transitivity: Transitivity::DeclaredScope,
            exclusions: Vec::new(),
        }
    }

    /// An entry for a file on disk.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: DependencyTarget::File { path: path.into() },
            scopes: ScopeSpec::Scopes(BTreeSet::from(["compile".to_string()])),
            transitivity: Transitivity::None,
            exclusions: Vec::new(),
        }
    }

    /// An entry for a sibling project's build output.
    pub fn project(id: ModuleId, version: ExactVersion, artifact: impl Into<PathBuf>) -> Self {
        Self {
            target: DependencyTarget::Project {
                id,
                version,
                artifact: artifact.into(),
            },
            scopes: ScopeSpec::Scopes(BTreeSet::from(["compile".to_string()])),
            transitivity: Transitivity::None,
            exclusions: Vec::new(),
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = ScopeSpec::Scopes(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_mapping(mut self, mapping: ScopeMapping) -> Self {
        self.scopes = ScopeSpec::Mapped(mapping);
        self
    }

    pub fn with_transitivity(mut self, transitivity: Transitivity) -> Self {
        self.transitivity = transitivity;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<ExcludePattern>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// The module identity, if the target has one (files do not).
    pub fn module_id(&self) -> Option<&ModuleId> {
        match &self.target {
            DependencyTarget::Module { id, .. } | DependencyTarget::Project { id, .. } => Some(id),
            DependencyTarget::File { .. } => None,
        }
    }

    /// Whether this entry participates in a resolution for `requested`.
    ///
    /// Plain scope sets match against the requested scope's inheritance
    /// closure; a scope mapping matches on its declared "from" scopes.
    pub fn is_requested_by(&self, requested: &str, graph: &ScopeGraph) -> bool {
        match &self.scopes {
            ScopeSpec::Scopes(scopes) => {
                let reachable = graph.reachable_from(requested);
                scopes.iter().any(|s| reachable.contains(s))
            }
            ScopeSpec::Mapped(mapping) => mapping.declares(requested),
        }
    }
}

/// Selects entries by module identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Exact(ModuleId),
    /// Every module of a group.
    Group(String),
}

impl Matcher {
    pub fn module(group: impl Into<String>, name: impl Into<String>) -> Self {
        Matcher::Exact(ModuleId::new(group, name))
    }

    pub fn group(group: impl Into<String>) -> Self {
        Matcher::Group(group.into())
    }

    pub fn matches(&self, entry: &DependencyEntry) -> bool {
        match (self, entry.module_id()) {
            (Matcher::Exact(id), Some(entry_id)) => id == entry_id,
            (Matcher::Group(group), Some(entry_id)) => *group == entry_id.group,
            (_, None) => false,
        }
    }
}

impl std::fmt::Display for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Matcher::Exact(id) => write!(f, "{id}"),
            Matcher::Group(group) => write!(f, "{group}:*"),
        }
    }
}

/// An addressing directive for mutation operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hint {
    Append,
    Prepend,
    Before(Matcher),
    After(Matcher),
}

/// Identity used by `merge`/`minus` set algebra. Module and project
/// targets are keyed by `ModuleId`; file targets by path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum EntryKey {
    Module(ModuleId),
    File(PathBuf),
}

fn entry_key(entry: &DependencyEntry) -> EntryKey {
    match &entry.target {
        DependencyTarget::Module { id, .. } | DependencyTarget::Project { id, .. } => {
            EntryKey::Module(id.clone())
        }
        DependencyTarget::File { path } => EntryKey::File(path.clone()),
    }
}

/// An ordered sequence of dependency entries with pure mutation operations.
///
/// A given `ModuleId` may appear more than once (once per scope, say); the
/// resolver arbitrates one winning version per module afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencySet {
    entries: Vec<DependencyEntry>,
}

impl DependencySet {
    pub fn of() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<DependencyEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[DependencyEntry] {
        &self.entries
    }

    /// Append an entry.
    pub fn push(&self, entry: DependencyEntry) -> Self {
        let mut entries = self.entries.clone();
        entries.push(entry);
        Self { entries }
    }

    /// Insert an entry at the hinted position.
    ///
    /// `Before`/`After` fail unless the anchor matches exactly one entry.
    pub fn insert(&self, entry: DependencyEntry, hint: Hint) -> Result<Self, GirderError> {
        let index = self.hint_index(&hint)?;
        let mut entries = self.entries.clone();
        entries.insert(index, entry);
        Ok(Self { entries })
    }

    /// Remove all entries the matcher selects. No-op if nothing matches.
    pub fn remove(&self, matcher: &Matcher) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| !matcher.matches(e))
                .cloned()
                .collect(),
        }
    }

    /// Remove the matching entries and re-insert them at the hinted
    /// position, preserving their relative order.
    ///
    /// Strict: fails if the matcher selects nothing, or if the hint's
    /// anchor does not select exactly one of the remaining entries.
    pub fn reorder(&self, matcher: &Matcher, hint: Hint) -> Result<Self, GirderError> {
        let (moved, remaining): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .cloned()
            .partition(|e| matcher.matches(e));
        if moved.is_empty() {
            return Err(GirderError::AmbiguousHint {
                message: format!("`{matcher}` matches no entries to move"),
            });
        }
        let rest = Self { entries: remaining };
        let index = rest.hint_index(&hint)?;
        let mut entries = rest.entries;
        entries.splice(index..index, moved);
        Ok(Self { entries })
    }

    /// Augment the local exclusions of every matching entry.
    /// No-op if nothing matches.
    pub fn with_exclusions(&self, matcher: &Matcher, patterns: &[ExcludePattern]) -> Self {
        self.map_matching(matcher, |entry| {
            for pattern in patterns {
                if !entry.exclusions.contains(pattern) {
                    entry.exclusions.push(pattern.clone());
                }
            }
        })
    }

    /// Replace the transitivity of every matching entry.
    /// No-op if nothing matches.
    pub fn with_transitivity(&self, matcher: &Matcher, transitivity: Transitivity) -> Self {
        self.map_matching(matcher, |entry| entry.transitivity = transitivity)
    }

    /// Receiver's entries, then `other`'s entries whose identity the
    /// receiver does not already contain.
    pub fn merge(&self, other: &Self) -> Self {
        let known: BTreeSet<_> = self.entries.iter().map(entry_key).collect();
        let mut entries = self.entries.clone();
        entries.extend(
            other
                .entries
                .iter()
                .filter(|e| !known.contains(&entry_key(e)))
                .cloned(),
        );
        Self { entries }
    }

    /// Receiver's entries whose identity `other` does not contain, in the
    /// receiver's original order.
    pub fn minus(&self, other: &Self) -> Self {
        let removed: BTreeSet<_> = other.entries.iter().map(entry_key).collect();
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| !removed.contains(&entry_key(e)))
                .cloned()
                .collect(),
        }
    }

    fn map_matching(&self, matcher: &Matcher, f: impl Fn(&mut DependencyEntry)) -> Self {
        let mut entries = self.entries.clone();
        for entry in entries.iter_mut().filter(|e| matcher.matches(e)) {
            f(entry);
        }
        Self { entries }
    }

    fn hint_index(&self, hint: &Hint) -> Result<usize, GirderError> {
        match hint {
            Hint::Append => Ok(self.entries.len()),
            Hint::Prepend => Ok(0),
            Hint::Before(anchor) => self.anchor_index(anchor),
            Hint::After(anchor) => self.anchor_index(anchor).map(|i| i + 1),
        }
    }

    fn anchor_index(&self, anchor: &Matcher) -> Result<usize, GirderError> {
        let mut positions = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| anchor.matches(e))
            .map(|(i, _)| i);
        match (positions.next(), positions.next()) {
            (Some(index), None) => Ok(index),
            (None, _) => Err(GirderError::AmbiguousHint {
                message: format!("anchor `{anchor}` matches no entries"),
            }),
            (Some(_), Some(_)) => Err(GirderError::AmbiguousHint {
                message: format!("anchor `{anchor}` matches multiple entries"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(group: &str, name: &str, version: &str) -> DependencyEntry {
        DependencyEntry::module(
            Coordinate::parse(&format!("{group}:{name}:{version}")).unwrap(),
        )
    }

    fn names(set: &DependencySet) -> Vec<String> {
        set.iter()
            .map(|e| e.module_id().unwrap().name.clone())
            .collect()
    }

    #[test]
    fn push_preserves_order() {
        let set = DependencySet::of()
            .push(entry("org.a", "a", "1.0"))
            .push(entry("org.b", "b", "1.0"));
        assert_eq!(names(&set), ["a", "b"]);
    }

    #[test]
    fn insert_before_and_after() {
        // of().add(A).add(B, AFTER(A)).add(C, BEFORE(B)) yields [A, C, B]
        let set = DependencySet::of()
            .push(entry("org.x", "a", "1.0"))
            .insert(entry("org.x", "b", "1.0"), Hint::After(Matcher::module("org.x", "a")))
            .unwrap()
            .insert(entry("org.x", "c", "1.0"), Hint::Before(Matcher::module("org.x", "b")))
            .unwrap();
        assert_eq!(names(&set), ["a", "c", "b"]);
    }

    #[test]
    fn insert_prepend() {
        let set = DependencySet::of()
            .push(entry("org.x", "a", "1.0"))
            .insert(entry("org.x", "b", "1.0"), Hint::Prepend)
            .unwrap();
        assert_eq!(names(&set), ["b", "a"]);
    }

    #[test]
    fn insert_missing_anchor_fails() {
        let set = DependencySet::of().push(entry("org.x", "a", "1.0"));
        let err = set
            .insert(entry("org.x", "b", "1.0"), Hint::After(Matcher::module("org.x", "zz")))
            .unwrap_err();
        assert!(matches!(err, GirderError::AmbiguousHint { .. }));
    }

    #[test]
    fn insert_multi_match_anchor_fails() {
        let set = DependencySet::of()
            .push(entry("org.x", "a", "1.0"))
            .push(entry("org.x", "b", "1.0"));
        let err = set
            .insert(entry("org.x", "c", "1.0"), Hint::Before(Matcher::group("org.x")))
            .unwrap_err();
        assert!(matches!(err, GirderError::AmbiguousHint { .. }));
    }

    #[test]
    fn remove_is_noop_without_match() {
        let set = DependencySet::of().push(entry("org.x", "a", "1.0"));
        let same = set.remove(&Matcher::module("org.x", "zz"));
        assert_eq!(set, same);
    }

    #[test]
    fn remove_drops_all_matches() {
        let set = DependencySet::of()
            .push(entry("org.x", "a", "1.0"))
            .push(entry("org.y", "b", "1.0"))
            .push(entry("org.x", "c", "1.0"));
        let removed = set.remove(&Matcher::group("org.x"));
        assert_eq!(names(&removed), ["b"]);
    }

    #[test]
    fn reorder_to_front() {
        // add(e, APPEND) then move(matchOf(e), FIRST): e first, rest unchanged
        let set = DependencySet::of()
            .push(entry("org.x", "a", "1.0"))
            .push(entry("org.x", "b", "1.0"))
            .push(entry("org.y", "e", "1.0"));
        let moved = set
            .reorder(&Matcher::module("org.y", "e"), Hint::Prepend)
            .unwrap();
        assert_eq!(names(&moved), ["e", "a", "b"]);
    }

    #[test]
    fn reorder_after_anchor() {
        let set = DependencySet::of()
            .push(entry("org.x", "a", "1.0"))
            .push(entry("org.x", "b", "1.0"))
            .push(entry("org.x", "c", "1.0"));
        let moved = set
            .reorder(&Matcher::module("org.x", "c"), Hint::After(Matcher::module("org.x", "a")))
            .unwrap();
        assert_eq!(names(&moved), ["a", "c", "b"]);
    }

    #[test]
    fn reorder_without_match_fails() {
        let set = DependencySet::of().push(entry("org.x", "a", "1.0"));
        assert!(set
            .reorder(&Matcher::module("org.x", "zz"), Hint::Prepend)
            .is_err());
    }

    #[test]
    fn with_exclusions_noop_without_match() {
        let set = DependencySet::of().push(entry("org.x", "a", "1.0"));
        let patterns = [ExcludePattern::parse("commons-logging:*").unwrap()];
        let same = set.with_exclusions(&Matcher::module("org.x", "zz"), &patterns);
        assert_eq!(set, same);
    }

    #[test]
    fn with_exclusions_augments_matching() {
        let set = DependencySet::of()
            .push(entry("org.x", "a", "1.0"))
            .push(entry("org.y", "b", "1.0"));
        let patterns = [ExcludePattern::parse("commons-logging:*").unwrap()];
        let updated = set.with_exclusions(&Matcher::group("org.x"), &patterns);
        assert_eq!(updated.entries()[0].exclusions.len(), 1);
        assert!(updated.entries()[1].exclusions.is_empty());
    }

    #[test]
    fn with_transitivity_replaces_level() {
        let set = DependencySet::of().push(entry("org.x", "a", "1.0"));
        let updated = set.with_transitivity(&Matcher::module("org.x", "a"), Transitivity::None);
        assert_eq!(updated.entries()[0].transitivity, Transitivity::None);
    }

    #[test]
    fn merge_keeps_receiver_order_and_appends_new() {
        let s = DependencySet::of()
            .push(entry("org.x", "a", "1.0"))
            .push(entry("org.x", "b", "1.0"));
        let t = DependencySet::of()
            .push(entry("org.x", "b", "2.0"))
            .push(entry("org.x", "c", "1.0"));
        let merged = s.merge(&t);
        assert_eq!(names(&merged), ["a", "b", "c"]);
        // Receiver's b wins; t's b at 2.0 is not appended
        assert!(matches!(
            &merged.entries()[1].target,
            DependencyTarget::Module { version: Some(VersionReq::Exact(v)), .. }
                if v.original == "1.0"
        ));
    }

    #[test]
    fn merge_then_minus_membership_law() {
        let s = DependencySet::of()
            .push(entry("org.x", "a", "1.0"))
            .push(entry("org.x", "b", "1.0"));
        let t = DependencySet::of().push(entry("org.x", "b", "2.0"));
        let result = s.merge(&t).minus(&t);
        assert_eq!(names(&result), ["a"]);
    }

    #[test]
    fn matcher_ignores_file_entries() {
        let set = DependencySet::of().push(DependencyEntry::file("libs/local.jar"));
        let same = set.remove(&Matcher::group("org.x"));
        assert_eq!(set, same);
    }

    #[test]
    fn scope_membership_uses_inheritance() {
        let graph = ScopeGraph::built_in();
        let compile_entry = entry("org.x", "a", "1.0");
        assert!(compile_entry.is_requested_by("test", &graph));
        assert!(compile_entry.is_requested_by("compile", &graph));

        let test_entry = entry("org.x", "b", "1.0").with_scopes(["test"]);
        assert!(test_entry.is_requested_by("test", &graph));
        assert!(!test_entry.is_requested_by("compile", &graph));
    }

    #[test]
    fn mapped_entry_matches_on_from_side() {
        let graph = ScopeGraph::built_in();
        let mapped = entry("org.x", "a", "1.0")
            .with_mapping(ScopeMapping::new().map("compile", &["api"]));
        assert!(mapped.is_requested_by("compile", &graph));
        assert!(!mapped.is_requested_by("test", &graph));
    }
}
