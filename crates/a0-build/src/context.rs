use std::io::Write;
use std::path::{Path, PathBuf};

/// Write the project directory to `out` as an uncompressed tar build context.
///
/// Entries are rooted at `.` so the Dockerfile can be referenced by its base
/// name. Nothing is filtered here: the engine applies `.dockerignore` when it
/// unpacks the context. Symlinks are archived as links, not followed.
///
/// The archive is written entry by entry, so `out` can be a pipe into the
/// engine. Returns the writer once the archive is finished.
pub fn write_context<W: Write>(working_dir: &Path, out: W) -> Result<W, ContextError> {
    if !working_dir.is_dir() {
        return Err(ContextError::NotADirectory(working_dir.to_path_buf()));
    }

    let mut builder = tar::Builder::new(out);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(".", working_dir)
        .map_err(|e| ContextError::Archive {
            path: working_dir.to_path_buf(),
            source: e,
        })?;

    let out = builder.into_inner().map_err(|e| ContextError::Archive {
        path: working_dir.to_path_buf(),
        source: e,
    })?;

    tracing::debug!(dir = %working_dir.display(), "build context written");
    Ok(out)
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("build context {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to archive build context {path}")]
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },
}
