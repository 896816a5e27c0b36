use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::registry::{LocalFileFetcher, LocalRegistry, RegistryScope};

fn metadata(document: serde_json::Value) -> ArtifactMetadata {
    serde_json::from_value(document).unwrap()
}

fn linux_x64() -> HostContext {
    HostContext::new("linux", "x86_64")
}

fn windows_x64() -> HostContext {
    HostContext::new("windows", "x86_64")
}

// ── host conditions ────────────────────────────────────────

#[test]
fn test_host_conditions() {
    let host = windows_x64();
    assert!(host.matches("windows"));
    assert!(host.matches("windows and x64"));
    assert!(host.matches("windows x64"));
    assert!(host.matches("!linux"));
    assert!(host.matches("not osx and x64"));
    assert!(host.matches(""));
    assert!(!host.matches("linux"));
    assert!(!host.matches("windows and arm64"));
    assert!(!host.matches("not windows"));
    assert!(!host.matches("solaris"));

    let mac = HostContext::new("macos", "aarch64");
    assert!(mac.matches("osx and arm64"));
    assert!(mac.matches("macos"));
}

// ── metadata document ──────────────────────────────────────

#[test]
fn test_document_defaults() {
    let m = metadata(json!({ "id": "compilers/arm/gcc", "version": "9.3.0" }));
    assert_eq!(m.short_name(), "gcc");
    assert_eq!(m.priority, 0);
    assert!(m.requires.is_empty());
    assert!(m.summary.is_none());
}

#[test]
fn test_document_requires_parse_references() {
    let m = metadata(json!({
        "id": "app",
        "version": "1.0.0",
        "requires": { "tools:cmake": "^3.20 3.24.1", "ninja": "*" }
    }));
    let cmake = &m.requires["tools:cmake"];
    assert_eq!(cmake.resolved.as_ref().map(|v| v.to_string()).as_deref(), Some("3.24.1"));
    assert!(m.requires["ninja"].resolved.is_none());
}

#[test]
fn test_document_rejects_bad_version() {
    let err = ArtifactMetadata::from_json("x.json", r#"{ "id": "x", "version": "one" }"#).unwrap_err();
    assert!(err.to_string().contains("x.json"), "{}", err);
}

#[test]
fn test_applicable_demands_merge_matching_blocks() {
    let m = metadata(json!({
        "id": "toolchain",
        "version": "1.0.0",
        "requires": { "cmake": "^3" },
        "demands": {
            "windows": { "requires": { "msvc": "*" } },
            "linux": { "requires": { "gcc": "*" } },
            "windows and arm64": { "requires": { "arm-sdk": "*" } }
        }
    }));

    let on_windows = m.applicable_demands(&windows_x64()).unwrap();
    let keys: Vec<&str> = on_windows.requires.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["cmake", "msvc"]);

    let on_linux = m.applicable_demands(&linux_x64()).unwrap();
    let keys: Vec<&str> = on_linux.requires.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["cmake", "gcc"]);
}

#[test]
fn test_single_install_block_is_selected() {
    let m = metadata(json!({
        "id": "tool",
        "version": "1.0.0",
        "demands": {
            "windows": { "install": { "unzip": "https://contoso.com/tool-win.zip" } },
            "linux": { "install": { "untar": "https://contoso.com/tool-linux.tar.gz" } }
        }
    }));
    let applied = m.applicable_demands(&linux_x64()).unwrap();
    assert_eq!(
        applied.install,
        Some(json!({ "untar": "https://contoso.com/tool-linux.tar.gz" }))
    );
}

#[test]
fn test_ambiguous_installation() {
    let m = metadata(json!({
        "id": "tool",
        "version": "1.0.0",
        "install": { "unzip": "https://contoso.com/tool.zip" },
        "demands": { "x64": { "install": { "unzip": "https://contoso.com/tool-x64.zip" } } }
    }));
    match m.applicable_demands(&linux_x64()) {
        Err(Error::AmbiguousInstallation { id, conditions }) => {
            assert_eq!(id, "tool");
            assert_eq!(conditions.len(), 2);
        }
        other => panic!("expected AmbiguousInstallation, got {:?}", other),
    }
    // Only one install applies on 32-bit hosts.
    assert!(m.applicable_demands(&HostContext::new("linux", "x86")).is_ok());
}

// ── dependency specs ───────────────────────────────────────

#[test]
fn test_dependency_spec_parse() {
    assert_eq!(
        DependencySpec::parse("tools:compilers/gcc"),
        DependencySpec {
            registry: Some("tools".to_string()),
            id: "compilers/gcc".to_string()
        }
    );
    assert_eq!(DependencySpec::parse("cmake").registry, None);
    assert_eq!(DependencySpec::parse(":cmake").id, "cmake");
    assert_eq!(DependencySpec::parse("tools:cmake").to_string(), "tools:cmake");
}

// ── artifact handles ───────────────────────────────────────

#[test]
fn test_artifact_unique_id_and_declared_scope() {
    let dir = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let database = Arc::new(RegistryDatabase::new(cache.path(), Arc::new(LocalFileFetcher)));
    let location = Location::from_path(dir.path()).unwrap();
    let registry: Arc<dyn Registry> = Arc::new(LocalRegistry::new(location.clone(), dir.path()));

    let m = Arc::new(metadata(json!({
        "id": "compilers/gcc",
        "version": "10.2.0",
        "registries": { "extra": "../extra", "remote": "https://contoso.com/r.tar.gz" }
    })));
    let artifact = Artifact::new(m, registry, "gcc.json", database).unwrap();

    assert_eq!(
        artifact.unique_id(),
        format!("{}::compilers/gcc::10.2.0", location)
    );
    let extra = artifact.scope.location_for_name("extra").unwrap();
    assert_eq!(
        extra,
        Location::from_path(&dir.path().parent().unwrap().join("extra")).unwrap()
    );
    assert_eq!(
        artifact.scope.location_for_name("remote").unwrap().as_str(),
        "https://contoso.com/r.tar.gz"
    );
}
