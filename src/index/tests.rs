use std::sync::Arc;

use semver::Version;

use super::*;
use crate::error::Error;
use crate::version::VersionRange;

// ── fixtures ───────────────────────────────────────────────

struct Person {
    id: &'static str,
    version: &'static str,
    tags: Vec<&'static str>,
    emails: Vec<&'static str>,
}

fn person(id: &'static str, version: &'static str) -> Person {
    Person {
        id,
        version,
        tags: Vec::new(),
        emails: Vec::new(),
    }
}

struct Keys {
    id: IdentityKey,
    version: SemverKey,
    tags: StringKey,
    email: StringKey,
}

fn schema() -> (Arc<IndexSchema<Person>>, Keys) {
    let mut schema = IndexSchema::new();
    let id = schema.identity_key("id", |p: &Person| vec![p.id.to_string()]);
    let version = schema.semver_key("version", |p: &Person| Version::parse(p.version).ok());
    let tags = schema.string_key("tags", |p: &Person| {
        p.tags.iter().map(|t| t.to_string()).collect()
    });
    let email = schema.namespace("contacts", |ns| {
        ns.string_key("email", |p: &Person| {
            p.emails.iter().map(|e| e.to_string()).collect()
        })
    });
    (
        Arc::new(schema),
        Keys {
            id,
            version,
            tags,
            email,
        },
    )
}

/// The four-record example: bob, wham/blam/sam, tom, sam/blam/bam.
fn sample() -> (Index<Person>, Keys) {
    let (schema, keys) = schema();
    let mut index = Index::new(schema);
    let mut bob = person("bob", "1.2.3");
    bob.tags = vec!["builder", "tools"];
    bob.emails = vec!["bob@contoso.com"];
    index.insert(&bob, "bob.json");
    index.insert(&person("wham/blam/sam", "0.0.4"), "wham/blam/sam.json");
    let mut tom = person("tom", "2.3.4");
    tom.tags = vec!["tools"];
    index.insert(&tom, "tom.json");
    index.insert(&person("sam/blam/bam", "0.3.1"), "sam/blam/bam.json");
    index.done_insertion();
    (index, keys)
}

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

// ── semver predicates ──────────────────────────────────────

#[test]
fn test_greater_than_orders_by_version() {
    let (index, keys) = sample();
    let items = index
        .query()
        .semver(keys.version)
        .greater_than(&v("0.3.0"))
        .items();
    assert_eq!(items, vec!["sam/blam/bam.json", "bob.json", "tom.json"]);
}

#[test]
fn test_greater_than_is_strict() {
    let (index, keys) = sample();
    let items = index
        .query()
        .semver(keys.version)
        .greater_than(&v("1.2.3"))
        .items();
    assert_eq!(items, vec!["tom.json"]);
}

#[test]
fn test_less_than_and_equals() {
    let (index, keys) = sample();
    let below = index.query().semver(keys.version).less_than(&v("1.2.3")).items();
    assert_eq!(below, vec!["wham/blam/sam.json", "sam/blam/bam.json"]);

    let exact = index.query().semver(keys.version).equals(&v("2.3.4")).items();
    assert_eq!(exact, vec!["tom.json"]);
}

#[test]
fn test_semver_order_is_not_lexical() {
    let (schema, keys) = schema();
    let mut index = Index::new(schema);
    index.insert(&person("a", "10.0.0"), "ten");
    index.insert(&person("a", "9.0.0"), "nine");
    index.insert(&person("a", "9.0.0-rc.1"), "nine-rc");
    index.done_insertion();

    let items = index.query().semver(keys.version).greater_than(&v("0.0.0")).items();
    assert_eq!(items, vec!["nine-rc", "nine", "ten"]);
}

#[test]
fn test_build_metadata_does_not_affect_precedence() {
    let (schema, keys) = schema();
    let mut index = Index::new(schema);
    index.insert(&person("a", "1.2.3+build.5"), "built");
    index.insert(&person("a", "1.2.4"), "next");
    index.insert(&person("a", "1.2.3"), "plain");
    index.insert(&person("a", "1.2.2"), "prev");
    index.done_insertion();

    let semver = || index.query().semver(keys.version);
    assert_eq!(semver().equals(&v("1.2.3")).items(), vec!["plain", "built"]);
    assert_eq!(semver().greater_than(&v("1.2.3")).items(), vec!["next"]);
    assert_eq!(semver().less_than(&v("1.2.3")).items(), vec!["prev"]);
    assert_eq!(semver().equals(&v("1.2.3+other")).items(), vec!["plain", "built"]);

    let above = VersionRange::parse(">1.2.3").unwrap();
    assert_eq!(semver().range_match(&above).items(), vec!["next"]);
    let up_to = VersionRange::parse("<=1.2.3").unwrap();
    assert_eq!(semver().range_match(&up_to).items(), vec!["prev", "plain", "built"]);

    // The reloaded index keeps the same answers.
    let mut reloaded = Index::new(index.schema().clone());
    reloaded.load_serialized(index.serialize()).unwrap();
    let items = reloaded.query().semver(keys.version).equals(&v("1.2.3")).items();
    assert_eq!(items, vec!["plain", "built"]);
}

#[test]
fn test_range_match_at_largest_major() {
    let (schema, keys) = schema();
    let mut index = Index::new(schema);
    index.insert(&person("a", "18446744073709551615.0.0"), "max");
    index.insert(&person("a", "18446744073709551615.4.1"), "max-later");
    index.insert(&person("a", "1.0.0"), "small");
    index.done_insertion();

    let range = VersionRange::parse("^18446744073709551615.0.0").unwrap();
    let items = index.query().semver(keys.version).range_match(&range).items();
    assert_eq!(items, vec!["max", "max-later"]);
}

#[test]
fn test_range_match() {
    let (index, keys) = sample();
    let range = VersionRange::parse(">=0.3.0 <2.0.0").unwrap();
    let items = index.query().semver(keys.version).range_match(&range).items();
    assert_eq!(items, vec!["sam/blam/bam.json", "bob.json"]);
}

#[test]
fn test_range_match_excludes_prerelease_by_default() {
    let (schema, keys) = schema();
    let mut index = Index::new(schema);
    index.insert(&person("x", "1.0.0"), "release");
    index.insert(&person("x", "1.1.0-beta.1"), "beta");
    index.done_insertion();

    let caret = VersionRange::parse("^1.0.0").unwrap();
    let items = index.query().semver(keys.version).range_match(&caret).items();
    assert_eq!(items, vec!["release"]);

    let pre = VersionRange::parse(">=1.1.0-beta.0").unwrap();
    let items = index.query().semver(keys.version).range_match(&pre).items();
    assert_eq!(items, vec!["beta"]);
}

// ── string predicates ──────────────────────────────────────

#[test]
fn test_short_name_resolution() {
    let (index, keys) = sample();
    let items = index.query().identity(keys.id).short_name_is("sam").items();
    assert_eq!(items, vec!["wham/blam/sam.json"]);

    let items = index.query().identity(keys.id).short_name_is("bob").items();
    assert_eq!(items, vec!["bob.json"]);
}

#[test]
fn test_short_name_with_path_suffix() {
    let (index, keys) = sample();
    let items = index.query().identity(keys.id).short_name_is("blam/bam").items();
    assert_eq!(items, vec!["sam/blam/bam.json"]);

    let none = index.query().identity(keys.id).short_name_is("am").items();
    assert!(none.is_empty());
}

#[test]
fn test_short_name_of_deep_identity() {
    let (schema, keys) = schema();
    let mut index = Index::new(schema);
    index.insert(&person("a/b/c", "1.0.0"), "abc");
    index.done_insertion();
    assert_eq!(
        index.query().identity(keys.id).short_name_is("c").items(),
        vec!["abc"]
    );
}

#[test]
fn test_string_equals_and_multi_valued_keys() {
    let (index, keys) = sample();
    let items = index.query().string(keys.tags).equals("tools").items();
    assert_eq!(items, vec!["bob.json", "tom.json"]);
}

#[test]
fn test_starts_with_contains_ends_with() {
    let (index, keys) = sample();
    assert_eq!(
        index.query().identity(keys.id).starts_with("wham/").items(),
        vec!["wham/blam/sam.json"]
    );
    assert_eq!(
        index.query().identity(keys.id).contains("blam").items(),
        vec!["sam/blam/bam.json", "wham/blam/sam.json"]
    );
    assert_eq!(
        index.query().identity(keys.id).ends_with("am").items(),
        vec!["sam/blam/bam.json", "wham/blam/sam.json"]
    );
}

#[test]
fn test_nested_key_by_dotted_name() {
    let (index, keys) = sample();
    let by_handle = index.query().string(keys.email).contains("contoso").items();
    assert_eq!(by_handle, vec!["bob.json"]);

    let named = index.string_key_named("contacts.email").unwrap();
    assert_eq!(named, keys.email);
    assert!(index.semver_key_named("contacts.email").is_none());
}

// ── composition ────────────────────────────────────────────

#[test]
fn test_predicates_intersect() {
    let (index, keys) = sample();
    let items = index
        .query()
        .string(keys.tags)
        .equals("tools")
        .semver(keys.version)
        .greater_than(&v("2.0.0"))
        .items();
    assert_eq!(items, vec!["tom.json"]);
}

#[test]
fn test_no_predicates_yields_all_targets() {
    let (index, _) = sample();
    assert_eq!(
        index.query().items(),
        vec![
            "bob.json",
            "wham/blam/sam.json",
            "tom.json",
            "sam/blam/bam.json"
        ]
    );
}

#[test]
fn test_empty_schema_yields_all_targets() {
    let mut index: Index<Person> = Index::new(Arc::new(IndexSchema::new()));
    index.insert(&person("a", "1.0.0"), "one");
    index.insert(&person("b", "1.0.0"), "two");
    index.done_insertion();
    assert_eq!(index.query().items(), vec!["one", "two"]);
}

#[test]
fn test_reinsert_replaces_previous_entries() {
    let (schema, keys) = schema();
    let mut index = Index::new(schema);
    index.insert(&person("tool", "1.0.0"), "tool.json");
    index.done_insertion();
    index.insert(&person("tool", "2.0.0"), "tool.json");
    index.done_insertion();

    assert_eq!(index.len(), 1);
    assert!(index.query().semver(keys.version).equals(&v("1.0.0")).items().is_empty());
    assert_eq!(
        index.query().semver(keys.version).equals(&v("2.0.0")).items(),
        vec!["tool.json"]
    );
}

#[test]
#[should_panic(expected = "done_insertion")]
fn test_query_before_finalize_panics() {
    let (schema, _) = schema();
    let mut index = Index::new(schema);
    index.insert(&person("a", "1.0.0"), "a");
    let _ = index.query();
}

#[test]
#[should_panic(expected = "registered twice")]
fn test_duplicate_key_name_panics() {
    let mut schema: IndexSchema<Person> = IndexSchema::new();
    schema.string_key("id", |p| vec![p.id.to_string()]);
    schema.identity_key("id", |p| vec![p.id.to_string()]);
}

// ── serialization ──────────────────────────────────────────

#[test]
fn test_serialized_roundtrip_answers_identically() {
    let (index, keys) = sample();
    let json = serde_json::to_string(&index.serialize()).unwrap();
    let data: SerializedIndex = serde_json::from_str(&json).unwrap();
    let restored = Index::deserialize(index.schema().clone(), data).unwrap();

    let range = VersionRange::parse("^0.3 || ^2").unwrap();
    for (a, b) in [
        (
            index.query().semver(keys.version).greater_than(&v("0.3.0")).items(),
            restored.query().semver(keys.version).greater_than(&v("0.3.0")).items(),
        ),
        (
            index.query().semver(keys.version).range_match(&range).items(),
            restored.query().semver(keys.version).range_match(&range).items(),
        ),
        (
            index.query().identity(keys.id).short_name_is("sam").items(),
            restored.query().identity(keys.id).short_name_is("sam").items(),
        ),
        (
            index.query().string(keys.tags).equals("tools").items(),
            restored.query().string(keys.tags).equals("tools").items(),
        ),
        (
            index.query().string(keys.email).equals("bob@contoso.com").items(),
            restored.query().string(keys.email).equals("bob@contoso.com").items(),
        ),
        (index.query().items(), restored.query().items()),
    ] {
        assert_eq!(a, b);
    }
}

#[test]
fn test_serialized_form_has_parallel_sorted_arrays() {
    let (index, _) = sample();
    let data = index.serialize();
    let version = &data.keys["version"];
    assert_eq!(version.kind, KeyKind::Semver);
    assert_eq!(version.values, vec!["0.0.4", "0.3.1", "1.2.3", "2.3.4"]);
    assert_eq!(version.values.len(), version.targets.len());
    let first = version.targets[0] as usize;
    assert_eq!(data.targets[first], "wham/blam/sam.json");
}

#[test]
fn test_malformed_index_leaves_state_untouched() {
    let (mut index, keys) = sample();
    let mut data = index.serialize();
    data.keys.get_mut("version").unwrap().targets.pop();

    match index.load_serialized(data) {
        Err(Error::MalformedIndex(msg)) => assert!(msg.contains("version"), "{}", msg),
        other => panic!("expected MalformedIndex, got {:?}", other.err()),
    }
    assert_eq!(index.len(), 4);
    assert_eq!(
        index.query().semver(keys.version).greater_than(&v("2.0.0")).items(),
        vec!["tom.json"]
    );
}

#[test]
fn test_malformed_index_variants() {
    let (index, _) = sample();
    let schema = index.schema().clone();

    let mut wrong_kind = index.serialize();
    wrong_kind.keys.get_mut("tags").unwrap().kind = KeyKind::Semver;
    assert!(Index::deserialize(schema.clone(), wrong_kind).is_err());

    let mut bad_version = index.serialize();
    bad_version.keys.get_mut("version").unwrap().values[0] = "not-a-version".to_string();
    assert!(Index::deserialize(schema.clone(), bad_version).is_err());

    let mut dangling = index.serialize();
    dangling.keys.get_mut("id").unwrap().targets[0] = 99;
    assert!(Index::deserialize(schema.clone(), dangling).is_err());

    let mut missing = index.serialize();
    missing.keys.remove("contacts.email");
    assert!(Index::deserialize(schema.clone(), missing).is_err());

    let mut future = index.serialize();
    future.format = INDEX_FORMAT + 1;
    assert!(Index::deserialize(schema, future).is_err());
}
