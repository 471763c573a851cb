use std::path::{Path, PathBuf};

/// Candidate names, checked in order. Both spellings are probed explicitly so
/// lookups behave the same on case-sensitive and case-insensitive filesystems.
const DOCKERFILE_NAMES: &[&str] = &["Dockerfile", "dockerfile"];

const IGNORE_FILE: &str = ".dockerignore";

/// Locate the build recipe at the project root.
///
/// Returns `None` when neither `Dockerfile` nor `dockerfile` exists; the caller
/// decides how to report that.
pub fn resolve_dockerfile(project_dir: &Path) -> Option<PathBuf> {
    DOCKERFILE_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|path| path.is_file())
}

/// Locate `.dockerignore` at the project root, if any.
pub fn resolve_ignore_file(project_dir: &Path) -> Option<PathBuf> {
    let path = project_dir.join(IGNORE_FILE);
    path.is_file().then_some(path)
}
