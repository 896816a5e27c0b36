//! End-to-end resolution through a session: a project folder registry, a
//! sibling folder registry declared by a document, and a global `.tar.gz`
//! snapshot registry.

use std::fs;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;

use quiver::artifact::HostContext;
use quiver::registry::{Registry, RegistryScope, INDEX_FILE};
use quiver::resolve::render_plan;
use quiver::session::{Session, SessionOptions};
use quiver::Error;

fn write_doc(folder: &Path, name: &str, document: serde_json::Value) {
    fs::create_dir_all(folder).unwrap();
    fs::write(folder.join(name), document.to_string()).unwrap();
}

fn write_snapshot(path: &Path, files: &[(&str, serde_json::Value)]) {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, document) in files {
        let body = document.to_string();
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, name, body.as_bytes()).unwrap();
    }
    let bytes = builder.into_inner().unwrap().finish().unwrap();
    fs::write(path, bytes).unwrap();
}

/// ```text
/// <tmp>/home/config.toml          default = snapshot.tar.gz
/// <tmp>/snapshot.tar.gz           zlib 1.2.13, 1.3.0
/// <tmp>/app/quiver.toml           main = ./registry; requires main:app, zlib
/// <tmp>/app/registry/             app 1.0.0 -> tools:cmake ^3.20
/// <tmp>/app/tools/                cmake 3.20.0, 3.24.1 (linux -> ninja), ninja
/// ```
fn workspace(root: &Path) {
    let home = root.join("home");
    fs::create_dir_all(&home).unwrap();
    let snapshot = root.join("snapshot.tar.gz");
    fs::write(
        home.join("config.toml"),
        format!("[registries]\ndefault = \"{}\"\n", snapshot.display()),
    )
    .unwrap();
    write_snapshot(
        &snapshot,
        &[
            ("zlib-1.2.13.json", json!({"id": "zlib", "version": "1.2.13"})),
            (
                "zlib-1.3.0.json",
                json!({"id": "zlib", "version": "1.3.0", "summary": "Compression library"}),
            ),
        ],
    );

    let project = root.join("app");
    fs::create_dir_all(&project).unwrap();
    fs::write(
        project.join("quiver.toml"),
        r#"[project]
name = "demo"

[registries]
main = "./registry"

[requires]
"main:app" = "^1"
zlib = "*"
"#,
    )
    .unwrap();

    write_doc(
        &project.join("registry"),
        "app.json",
        json!({
            "id": "app",
            "version": "1.0.0",
            "registries": {"tools": "../tools"},
            "requires": {"tools:cmake": "^3.20"}
        }),
    );
    let tools = project.join("tools");
    write_doc(&tools, "cmake-3.20.json", json!({"id": "cmake", "version": "3.20.0"}));
    write_doc(
        &tools,
        "cmake-3.24.json",
        json!({
            "id": "cmake",
            "version": "3.24.1",
            "demands": {"linux": {"requires": {"ninja": "*"}}}
        }),
    );
    write_doc(&tools, "ninja.json", json!({"id": "ninja", "version": "1.11.1"}));
}

fn session(root: &Path, os: &str) -> Session {
    Session::new(SessionOptions {
        home: Some(root.join("home")),
        project_dir: Some(root.join("app")),
        host: Some(HostContext::new(os, "x86_64")),
        ..SessionOptions::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_project_requirements_resolve_across_registries() {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path());
    let session = session(dir.path(), "linux");

    let project = session.project().unwrap();
    assert_eq!(project.name(), "demo");

    let plan = session.resolve(&project.requirements(), 2).await.unwrap();
    let entries: Vec<(String, String, usize, bool)> = plan
        .iter()
        .map(|r| {
            (
                r.artifact.id().to_string(),
                r.artifact.version().to_string(),
                r.depth,
                r.initial_selection,
            )
        })
        .collect();
    assert_eq!(
        entries,
        vec![
            ("ninja".to_string(), "1.11.1".to_string(), 3, false),
            ("cmake".to_string(), "3.24.1".to_string(), 2, false),
            ("app".to_string(), "1.0.0".to_string(), 1, true),
            ("zlib".to_string(), "1.3.0".to_string(), 1, true),
        ]
    );

    // The snapshot was unpacked into the cache inside the explicit home.
    let cache = dir.path().join("home").join("cache").join("registries");
    let unpacked: Vec<_> = fs::read_dir(&cache).unwrap().collect();
    assert_eq!(unpacked.len(), 1);

    let scope = session.scope();
    let rendered = render_plan(&plan, scope.as_ref());
    assert!(rendered.contains("main:app"));
    assert!(rendered.contains("default:zlib"));
    // tools is only named inside app's own declarations.
    assert!(rendered.contains("[file://"));
}

#[tokio::test]
async fn test_other_host_skips_conditional_requirements() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path());
    let session = session(dir.path(), "windows");

    let plan = session
        .resolve(&session.project().unwrap().requirements(), 2)
        .await
        .unwrap();
    let ids: Vec<&str> = plan.iter().map(|r| r.artifact.id()).collect();
    assert_eq!(ids, vec!["cmake", "app", "zlib"]);
}

#[tokio::test]
async fn test_loaded_folder_registry_persists_index() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path());
    let first = session(dir.path(), "linux");

    let registry = first.scope().registry_by_name("main").await.unwrap().unwrap();
    assert!(registry.is_loaded());
    assert_eq!(registry.count(), 1);
    registry.save().await.unwrap();
    assert!(dir.path().join("app").join("registry").join(INDEX_FILE).is_file());

    // A second session answers from the saved index.
    let again = session(dir.path(), "linux");
    let registry = again.scope().registry_by_name("main").await.unwrap().unwrap();
    assert_eq!(registry.count(), 1);
}

#[tokio::test]
async fn test_unqualified_requirement_without_default_registry() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path());
    fs::write(dir.path().join("home").join("config.toml"), "").unwrap();
    let session = session(dir.path(), "linux");

    let err = session
        .resolve(&session.project().unwrap().requirements(), 2)
        .await
        .unwrap_err();
    match err {
        Error::UnresolvableRegistry { name, requester } => {
            assert_eq!(name, "default");
            assert_eq!(requester, "demo");
        }
        other => panic!("unexpected error: {other}"),
    }
}
