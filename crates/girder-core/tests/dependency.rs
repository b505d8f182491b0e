use girder_core::coordinate::{Coordinate, ModuleId};
use girder_core::dependency::{DependencyEntry, DependencySet, Hint, Matcher};
use girder_core::scope::ScopeGraph;
use girder_util::pattern::ExcludePattern;

fn entry(coordinate: &str) -> DependencyEntry {
    DependencyEntry::module(Coordinate::parse(coordinate).unwrap())
}

fn names(set: &DependencySet) -> Vec<String> {
    set.iter()
        .map(|e| e.module_id().unwrap().name.clone())
        .collect()
}

#[test]
fn remove_without_match_is_identity() {
    let set = DependencySet::of()
        .push(entry("org.a:a:1.0"))
        .push(entry("org.b:b:1.0"));
    let no_match = Matcher::module("org.zz", "zz");
    assert_eq!(set.remove(&no_match), set);
}

#[test]
fn with_exclusions_without_match_is_identity() {
    let set = DependencySet::of().push(entry("org.a:a:1.0"));
    let no_match = Matcher::group("org.zz");
    let patterns = [ExcludePattern::parse("commons-logging:*").unwrap()];
    assert_eq!(set.with_exclusions(&no_match, &patterns), set);
}

#[test]
fn with_transitivity_without_match_is_identity() {
    let set = DependencySet::of().push(entry("org.a:a:1.0"));
    let no_match = Matcher::module("org.zz", "zz");
    assert_eq!(
        set.with_transitivity(&no_match, girder_core::dependency::Transitivity::Full),
        set
    );
}

#[test]
fn append_then_move_to_front_preserves_the_rest() {
    let base = DependencySet::of()
        .push(entry("org.a:a:1.0"))
        .push(entry("org.b:b:1.0"));
    let appended = base.push(entry("org.e:e:1.0"));
    let moved = appended
        .reorder(&Matcher::module("org.e", "e"), Hint::Prepend)
        .unwrap();

    assert_eq!(names(&moved), ["e", "a", "b"]);
    // The remainder equals the original set in original order
    assert_eq!(moved.remove(&Matcher::module("org.e", "e")), base);
}

#[test]
fn hint_chain_scenario() {
    // of().add(A).add(B, AFTER(matchA)).add(C, BEFORE(matchB)) -> [A, C, B]
    let set = DependencySet::of()
        .push(entry("org.x:a:1.0"))
        .insert(entry("org.x:b:1.0"), Hint::After(Matcher::module("org.x", "a")))
        .unwrap()
        .insert(entry("org.x:c:1.0"), Hint::Before(Matcher::module("org.x", "b")))
        .unwrap();
    assert_eq!(names(&set), ["a", "c", "b"]);
}

#[test]
fn merge_minus_membership_law() {
    // s.merge(t).minus(t) == modules of s not in t, in s's order
    let s = DependencySet::of()
        .push(entry("org.x:a:1.0"))
        .push(entry("org.x:b:1.0"))
        .push(entry("org.x:c:1.0"));
    let t = DependencySet::of()
        .push(entry("org.x:b:9.9"))
        .push(entry("org.x:d:1.0"));

    let result = s.merge(&t).minus(&t);
    assert_eq!(names(&result), ["a", "c"]);
}

#[test]
fn merge_appends_only_unknown_modules() {
    let s = DependencySet::of().push(entry("org.x:a:1.0"));
    let t = DependencySet::of()
        .push(entry("org.x:a:2.0"))
        .push(entry("org.x:b:1.0"));
    assert_eq!(names(&s.merge(&t)), ["a", "b"]);
}

#[test]
fn duplicate_module_ids_are_allowed_per_scope() {
    let set = DependencySet::of()
        .push(entry("org.x:a:1.0"))
        .push(entry("org.x:a:1.0").with_scopes(["test"]));
    assert_eq!(set.len(), 2);

    let graph = ScopeGraph::built_in();
    let requested: Vec<bool> = set
        .iter()
        .map(|e| e.is_requested_by("compile", &graph))
        .collect();
    assert_eq!(requested, [true, false]);
}

#[test]
fn matcher_group_wildcard_selects_whole_group() {
    let set = DependencySet::of()
        .push(entry("org.x:a:1.0"))
        .push(entry("org.x:b:1.0"))
        .push(entry("org.y:c:1.0"));
    let removed = set.remove(&Matcher::group("org.x"));
    assert_eq!(names(&removed), ["c"]);
    assert_eq!(
        removed.entries()[0].module_id(),
        Some(&ModuleId::new("org.y", "c"))
    );
}
