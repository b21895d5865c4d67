use std::collections::BTreeMap;

use super::*;

fn hash(tag: &str) -> ContentHash {
    ContentHash::of(tag.as_bytes())
}

fn write_manifest(dir: &Path, pkg: &Package) {
    std::fs::create_dir_all(dir).unwrap();
    save_package_file(pkg, &dir.join(PKG_FILE_NAME)).unwrap();
}

// ── manifest I/O ───────────────────────────────────────────

#[test]
fn test_load_preserves_passthrough_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(PKG_FILE_NAME);
    let json = format!(
        r#"{{
  "name": "app",
  "version": "1.2.3",
  "language": "go",
  "author": "someone",
  "license": "MIT",
  "gx": {{ "dvcsimport": "github.com/x/app" }},
  "dependencies": [
    {{ "name": "lib", "hash": "{}", "version": "0.1.0", "author": "other" }}
  ]
}}"#,
        hash("lib").to_hex()
    );
    std::fs::write(&path, json).unwrap();

    let pkg = load_package_file(&path).unwrap();
    assert_eq!(pkg.name, "app");
    assert_eq!(pkg.language, "go");
    assert!(!pkg.subtool_required);
    assert_eq!(pkg.dependencies.len(), 1);
    assert_eq!(pkg.dependencies[0].author.as_deref(), Some("other"));
    assert_eq!(pkg.extra["license"], "MIT");

    save_package_file(&pkg, &path).unwrap();
    let reloaded = load_package_file(&path).unwrap();
    assert_eq!(reloaded, pkg);
    assert_eq!(
        reloaded.extra["gx"]["dvcsimport"],
        serde_json::json!("github.com/x/app")
    );
}

#[test]
fn test_load_rejects_malformed_hash() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(PKG_FILE_NAME);
    std::fs::write(
        &path,
        r#"{"name":"app","dependencies":[{"name":"lib","hash":"QmShort"}]}"#,
    )
    .unwrap();
    let err = load_package_file(&path).unwrap_err();
    assert!(matches!(err, Error::Manifest { .. }), "got {:?}", err);
}

#[test]
fn test_save_omits_empty_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(PKG_FILE_NAME);
    save_package_file(&Package::new("bare", ""), &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"name\": \"bare\""));
    assert!(!text.contains("version"));
    assert!(!text.contains("dependencies"));
    assert!(!text.contains("subtoolRequired"));
    assert!(text.ends_with('\n'));
}

#[test]
fn test_find_dep_by_name_or_hash() {
    let mut pkg = Package::new("app", "1.0.0");
    pkg.dependencies.push(Package::new("lib", "0.1.0").as_dependency(hash("lib")));
    pkg.dependencies.push(Package::new("util", "2.0.0").as_dependency(hash("util")));

    assert_eq!(pkg.find_dep("util").unwrap().hash, hash("util"));
    assert_eq!(pkg.find_dep(&hash("lib").to_hex()).unwrap().name, "lib");
    assert!(pkg.find_dep("missing").is_none());
    assert!(pkg.depends_on(&hash("lib")));

    pkg.find_dep_mut("lib").unwrap().version = "0.2.0".to_string();
    assert_eq!(pkg.dependencies[0].version, "0.2.0");
}

#[test]
fn test_find_package_root_walks_up() {
    let tmp = tempfile::tempdir().unwrap();
    write_manifest(tmp.path(), &Package::new("root", "1.0.0"));
    let nested = tmp.path().join("src").join("deep");
    std::fs::create_dir_all(&nested).unwrap();
    assert_eq!(find_package_root(&nested).unwrap(), tmp.path());
}

// ── find_package_in_dir ────────────────────────────────────

#[test]
fn test_find_package_missing_dir_is_none() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(find_package_in_dir(&tmp.path().join("absent")).unwrap().is_none());
}

#[test]
fn test_find_package_under_single_child() {
    let tmp = tempfile::tempdir().unwrap();
    write_manifest(&tmp.path().join("lib"), &Package::new("lib", "0.1.0"));
    std::fs::create_dir_all(tmp.path().join(META_DIR)).unwrap();

    let found = find_package_in_dir(tmp.path()).unwrap().unwrap();
    assert_eq!(found.package.name, "lib");
    assert_eq!(found.local_name.as_deref(), Some("lib"));
    assert_eq!(found.package_dir(tmp.path()), tmp.path().join("lib"));
}

#[test]
fn test_find_package_direct_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    write_manifest(tmp.path(), &Package::new("flat", "0.1.0"));
    std::fs::create_dir_all(tmp.path().join("src")).unwrap();

    let found = find_package_in_dir(tmp.path()).unwrap().unwrap();
    assert_eq!(found.package.name, "flat");
    assert!(found.local_name.is_none());
    assert_eq!(found.package_dir(tmp.path()), tmp.path());
}

#[test]
fn test_find_package_empty_dir_is_ambiguous() {
    let tmp = tempfile::tempdir().unwrap();
    let err = find_package_in_dir(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::AmbiguousStoreState { candidates: 0, .. }
    ));
}

#[test]
fn test_find_package_multiple_children_is_ambiguous() {
    let tmp = tempfile::tempdir().unwrap();
    write_manifest(&tmp.path().join("a"), &Package::new("a", "1.0.0"));
    write_manifest(&tmp.path().join("b"), &Package::new("b", "1.0.0"));
    let err = find_package_in_dir(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::AmbiguousStoreState { candidates: 2, .. }
    ));
}

#[test]
fn test_find_package_named_like_staging_dir() {
    // staging dirs are siblings of hash dirs, so a child with the suffix
    // is an ordinary package
    let tmp = tempfile::tempdir().unwrap();
    let name = format!("lib{}", STAGING_SUFFIX);
    write_manifest(&tmp.path().join(&name), &Package::new(&name, "0.1.0"));
    let found = find_package_in_dir(tmp.path()).unwrap().unwrap();
    assert_eq!(found.package.name, name);
    assert_eq!(found.local_name.as_deref(), Some(name.as_str()));
}

// ── lockfile ───────────────────────────────────────────────

#[test]
fn test_lockfile_roundtrip_and_count() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(LOCK_FILE_NAME);

    let mut nested = LockDeps::new();
    nested.entry("go".to_string()).or_default().insert(
        "github.com/x/leaf".to_string(),
        LockDep {
            reference: hash("leaf"),
            deps: None,
        },
    );
    let mut lock = LockFile::new("go");
    let go: &mut BTreeMap<String, LockDep> = lock.deps.entry("go".to_string()).or_default();
    go.insert(
        "github.com/x/mid".to_string(),
        LockDep {
            reference: hash("mid"),
            deps: Some(nested),
        },
    );
    go.insert(
        "github.com/x/side".to_string(),
        LockDep {
            reference: hash("side"),
            deps: None,
        },
    );
    assert_eq!(lock.entry_count(), 3);

    save_lockfile(&path, &lock).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"lockVersion\": 1"));
    assert!(text.contains("\"ref\""));
    assert_eq!(load_lockfile(&path).unwrap(), lock);
}

#[test]
fn test_lockfile_rejects_unknown_version() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(LOCK_FILE_NAME);
    std::fs::write(&path, r#"{"language":"go","lockVersion":2,"deps":{}}"#).unwrap();
    let err = load_lockfile(&path).unwrap_err();
    assert!(matches!(err, Error::UnsupportedLockVersion(2)));
}

#[test]
fn test_legacy_dependency_key_is_accepted() {
    let json = format!(
        r#"{{"name":"old","gxDependencies":[{{"name":"lib","hash":"{}"}}]}}"#,
        hash("lib").to_hex()
    );
    let pkg: Package = serde_json::from_str(&json).unwrap();
    assert_eq!(pkg.dependencies.len(), 1);
    assert!(pkg.extra.is_empty());
    let out = serde_json::to_string(&pkg).unwrap();
    assert!(out.contains("\"dependencies\""));
    assert!(!out.contains("gxDependencies"));
}
