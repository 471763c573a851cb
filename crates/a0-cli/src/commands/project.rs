use std::path::{Path, PathBuf};

use a0_core::AppDescriptor;
use anyhow::Context;

/// A linked project directory with its resolved descriptor.
pub struct Project {
    pub dir: PathBuf,
    pub app: AppDescriptor,
}

impl Project {
    /// Absolutize `path` and load `.a0/app.json` from it.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let dir = std::path::absolute(path)
            .with_context(|| format!("failed to resolve app path {}", path.display()))?;
        println!("app working directory: {}", dir.display());

        let app = AppDescriptor::resolve(&dir).context("failed to resolve app config")?;
        Ok(Self { dir, app })
    }

    /// Dockerfile at the project root; absence is a user error.
    pub fn dockerfile(&self) -> anyhow::Result<PathBuf> {
        match a0_build::resolve_dockerfile(&self.dir) {
            Some(path) => Ok(path),
            None => anyhow::bail!("no Dockerfile found at {}", self.dir.display()),
        }
    }
}
