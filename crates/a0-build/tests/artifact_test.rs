use std::collections::BTreeMap;
use std::path::{Component, Path};

use a0_build::artifact::{PackageError, create_artifact};
use flate2::read::GzDecoder;
use proptest::prelude::*;
use tempfile::TempDir;

/// Relative path → content (None for directories) of every archive entry.
fn read_entries(archive: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    use std::io::Read;

    let file = std::fs::File::open(archive).unwrap();
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    let mut out = BTreeMap::new();
    for entry in tar.entries().unwrap() {
        let mut entry = entry.unwrap();
        let path = entry.path().unwrap().to_string_lossy().into_owned();
        if entry.header().entry_type().is_dir() {
            out.insert(path.trim_end_matches('/').to_owned(), None);
        } else {
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf).unwrap();
            out.insert(path, Some(buf));
        }
    }
    out
}

/// Relative path → content for files on disk, skipping dot-prefixed entries.
fn visible_files(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                out.insert(
                    rel.to_string_lossy().replace('\\', "/"),
                    std::fs::read(&path).unwrap(),
                );
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

fn sample_project(dir: &Path) {
    std::fs::create_dir_all(dir.join("src/lib")).unwrap();
    std::fs::create_dir_all(dir.join(".git/objects")).unwrap();
    std::fs::create_dir_all(dir.join(".a0")).unwrap();
    std::fs::create_dir_all(dir.join("src/.cache")).unwrap();
    std::fs::write(dir.join("server.js"), "require('http')").unwrap();
    std::fs::write(dir.join("package.json"), "{}").unwrap();
    std::fs::write(dir.join("src/lib/util.js"), "module.exports = {}").unwrap();
    std::fs::write(dir.join(".env"), "SECRET=1").unwrap();
    std::fs::write(dir.join(".git/objects/abc"), "blob").unwrap();
    std::fs::write(dir.join(".a0/app.json"), "{}").unwrap();
    std::fs::write(dir.join("src/.cache/x"), "cached").unwrap();
    std::fs::write(dir.join("src/.hidden.js"), "hidden").unwrap();
}

#[test]
fn round_trip_reproduces_visible_files() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    sample_project(src.path());

    let target = out.path().join("artifact.tar.gz");
    let summary = create_artifact(src.path(), &target).unwrap();
    assert_eq!(summary.path, target);
    assert!(summary.bytes > 0);

    let entries = read_entries(&target);
    let files: BTreeMap<String, Vec<u8>> = entries
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect();

    assert_eq!(files, visible_files(src.path()));
}

#[test]
fn no_entry_has_a_dot_component() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    sample_project(src.path());

    let target = out.path().join("artifact.tar.gz");
    create_artifact(src.path(), &target).unwrap();

    for name in read_entries(&target).keys() {
        assert!(
            !Path::new(name).components().any(|c| matches!(
                c,
                Component::Normal(s) if s.to_string_lossy().starts_with('.')
            )),
            "unexpected hidden entry {name}"
        );
    }
}

#[test]
fn root_is_not_an_entry_and_dirs_are() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    sample_project(src.path());

    let target = out.path().join("artifact.tar.gz");
    let summary = create_artifact(src.path(), &target).unwrap();
    let entries = read_entries(&target);

    assert!(!entries.contains_key(""));
    assert!(!entries.contains_key("."));
    assert_eq!(entries.get("src"), Some(&None));
    assert_eq!(entries.get("src/lib"), Some(&None));
    assert_eq!(summary.entries, entries.len());
}

#[test]
fn target_inside_source_is_not_archived() {
    let src = TempDir::new().unwrap();
    sample_project(src.path());

    let target = src.path().join("artifact.tar.gz");
    create_artifact(src.path(), &target).unwrap();

    assert!(!read_entries(&target).contains_key("artifact.tar.gz"));
}

#[test]
fn missing_source_fails_without_creating_target() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("artifact.tar.gz");

    let result = create_artifact(&tmp.path().join("missing"), &target);
    assert!(matches!(result, Err(PackageError::SourceNotFound(_))));
    assert!(!target.exists());
}

#[test]
fn unwritable_target_is_create_error() {
    let src = TempDir::new().unwrap();
    sample_project(src.path());

    let target = src.path().join("no-such-dir/artifact.tar.gz");
    let result = create_artifact(src.path(), &target);
    assert!(matches!(result, Err(PackageError::Create { .. })));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn hidden_entries_never_reach_the_archive(
        files in proptest::collection::vec(
            ("\\.?[a-z]{1,6}", "\\.?[a-z]{1,6}", any::<bool>()),
            1..12,
        )
    ) {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        for (dir, file, nested) in &files {
            let path = if *nested {
                let d = src.path().join(dir);
                if d.is_file() {
                    continue;
                }
                std::fs::create_dir_all(&d).unwrap();
                d.join(file)
            } else {
                src.path().join(file)
            };
            if path.is_dir() {
                continue;
            }
            std::fs::write(&path, file.as_bytes()).unwrap();
        }

        let target = out.path().join("a.tar.gz");
        create_artifact(src.path(), &target).unwrap();

        let entries = read_entries(&target);
        for name in entries.keys() {
            prop_assert!(!name.split('/').any(|c| c.starts_with('.')));
        }

        let files: BTreeMap<String, Vec<u8>> = entries
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();
        prop_assert_eq!(files, visible_files(src.path()));
    }
}
