use std::path::Path;

use a0_cloud::pipeline::{ARTIFACT_SUFFIX, DeployRequest};
use a0_core::Settings;
use anyhow::Context;
use tokio_util::sync::CancellationToken;

pub struct DeployOptions {
    pub server: String,
    pub target: String,
    pub version: String,
}

/// Package the project directory and deploy it to `opts.server`.
pub async fn deploy(
    path: &Path,
    opts: DeployOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let source_dir = std::path::absolute(path)
        .with_context(|| format!("failed to resolve app path {}", path.display()))?;
    if !source_dir.is_dir() {
        anyhow::bail!("{} is not a directory", source_dir.display());
    }

    let settings = Settings::load().context("failed to read settings")?;
    let client = a0_cloud::authenticated_client(&settings)?;

    let artifact_dir = settings.local_config_dir();
    std::fs::create_dir_all(artifact_dir)
        .with_context(|| format!("failed to create {}", artifact_dir.display()))?;

    let request = DeployRequest {
        source_dir,
        artifact_path: artifact_dir.join(format!("artifact.{ARTIFACT_SUFFIX}")),
        server_id: opts.server,
        target: opts.target,
        version: opts.version,
        suffix: ARTIFACT_SUFFIX.to_owned(),
    };

    println!("Deploying {} to server {}...", request.source_dir.display(), request.server_id);
    let outcome = a0_cloud::deploy(&client, &request, cancel).await?;

    println!();
    println!("Artifact:      {} ({} bytes)", outcome.grant.artifact_key, outcome.uploaded_bytes);
    println!("Deployment ID: {}", outcome.deployment.deployment_id);
    println!("Status:        {}", outcome.deployment.status);
    println!("Created at:    {}", outcome.deployment.created_at);
    Ok(())
}
