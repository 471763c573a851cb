use std::path::Path;

use a0_core::AppDescriptor;

/// Write `.a0/app.json` for the project at `path`.
pub fn init(path: &Path, name: &str, region: &str, force: bool) -> anyhow::Result<()> {
    if !path.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }

    let app = AppDescriptor::new(name, region)?;
    let config_dir = app.init(path, force)?;

    println!("Linked {} ({}) in {}", app.name, app.region, config_dir.display());
    println!();
    println!("Next steps:");
    println!("  a0ctl build {}", path.display());
    println!("  a0ctl run {} --tag <label> --port 8080:80", path.display());
    Ok(())
}
