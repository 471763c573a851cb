use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

/// Outcome of a successful [`create_artifact`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub path: PathBuf,
    /// Number of archive entries (files, directories, links)
    pub entries: usize,
    /// Compressed size on disk
    pub bytes: u64,
}

/// Packages `source_dir` into a gzip-compressed tar at `target`.
///
/// - Every entry is named relative to `source_dir`; the root itself is never
///   written.
/// - Any file or directory whose name starts with `.` is skipped, and skipped
///   directories are not descended into.
/// - The target archive is skipped if it lives inside `source_dir`.
///
/// On any failure the partially written archive is removed, so a returned
/// error never leaves a usable-looking file behind.
pub fn create_artifact(source_dir: &Path, target: &Path) -> Result<ArtifactSummary, PackageError> {
    if !source_dir.is_dir() {
        return Err(PackageError::SourceNotFound(source_dir.to_path_buf()));
    }

    let file = File::create(target).map_err(|e| PackageError::Create {
        path: target.to_path_buf(),
        source: e,
    })?;

    match write_archive(source_dir, target, file) {
        Ok(entries) => {
            let bytes = std::fs::metadata(target)
                .map_err(|e| PackageError::Finish {
                    path: target.to_path_buf(),
                    source: e,
                })?
                .len();
            tracing::info!(
                source = %source_dir.display(),
                target = %target.display(),
                entries,
                bytes,
                "artifact packaged"
            );
            Ok(ArtifactSummary {
                path: target.to_path_buf(),
                entries,
                bytes,
            })
        }
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(target) {
                tracing::warn!(path = %target.display(), error = %rm, "failed to remove partial artifact");
            }
            Err(e)
        }
    }
}

fn write_archive(source_dir: &Path, target: &Path, file: File) -> Result<usize, PackageError> {
    let root = source_dir
        .canonicalize()
        .map_err(|e| PackageError::ReadDir {
            path: source_dir.to_path_buf(),
            source: e,
        })?;
    let skip = target.canonicalize().map_err(|e| PackageError::Create {
        path: target.to_path_buf(),
        source: e,
    })?;

    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    let mut entries = 0;
    append_tree(&mut builder, &root, Path::new(""), &skip, &mut entries)?;

    let encoder = builder.into_inner().map_err(|e| PackageError::Finish {
        path: target.to_path_buf(),
        source: e,
    })?;
    let file = encoder.finish().map_err(|e| PackageError::Finish {
        path: target.to_path_buf(),
        source: e,
    })?;
    file.sync_all().map_err(|e| PackageError::Finish {
        path: target.to_path_buf(),
        source: e,
    })?;

    Ok(entries)
}

fn append_tree<W: Write>(
    builder: &mut tar::Builder<W>,
    root: &Path,
    rel_dir: &Path,
    skip: &Path,
    entries: &mut usize,
) -> Result<(), PackageError> {
    let dir = root.join(rel_dir);
    let read_dir = std::fs::read_dir(&dir).map_err(|e| PackageError::ReadDir {
        path: dir.clone(),
        source: e,
    })?;

    let mut children = read_dir
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PackageError::ReadDir {
            path: dir.clone(),
            source: e,
        })?;
    // Stable archive order regardless of filesystem iteration order
    children.sort_by_key(|entry| entry.file_name());

    for child in children {
        let name = child.file_name();
        if is_hidden(&name) {
            continue;
        }

        let path = child.path();
        if path == skip {
            continue;
        }

        let file_type = child.file_type().map_err(|e| PackageError::Entry {
            path: path.clone(),
            source: e,
        })?;

        let rel = rel_dir.join(&name);
        builder
            .append_path_with_name(&path, &rel)
            .map_err(|e| PackageError::Entry {
                path: path.clone(),
                source: e,
            })?;
        *entries += 1;

        if file_type.is_dir() {
            append_tree(builder, root, &rel, skip, entries)?;
        }
    }

    Ok(())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("artifact source {0} is not a directory")]
    SourceNotFound(PathBuf),

    #[error("failed to create artifact at {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory {path}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to archive {path}")]
    Entry {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to finalize artifact {path}")]
    Finish {
        path: PathBuf,
        source: std::io::Error,
    },
}
