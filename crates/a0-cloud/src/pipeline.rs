use std::path::PathBuf;

use a0_build::artifact::{ArtifactSummary, PackageError, create_artifact};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::deploy::{ArtifactUploadGrant, DeployInvoker, DeploymentRecord};
use crate::error::{ApiError, UploadError};
use crate::upload::upload_artifact;

pub const DEFAULT_TARGET: &str = "DEVELOPMENT";
pub const DEFAULT_VERSION: &str = "latest";
pub const ARTIFACT_SUFFIX: &str = "tar.gz";

#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Project directory to package.
    pub source_dir: PathBuf,
    /// Where the archive is written before upload.
    pub artifact_path: PathBuf,
    pub server_id: String,
    pub target: String,
    pub version: String,
    pub suffix: String,
}

#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub artifact: ArtifactSummary,
    pub grant: ArtifactUploadGrant,
    pub uploaded_bytes: u64,
    pub deployment: DeploymentRecord,
}

/// Package, request a slot, upload, start the deployment.
///
/// Each step's failure aborts the sequence. An uploaded artifact is not
/// rolled back when a later step fails.
pub async fn deploy(
    client: &ApiClient,
    request: &DeployRequest,
    cancel: &CancellationToken,
) -> Result<DeployOutcome, PipelineError> {
    // 1. Package
    let source = request.source_dir.clone();
    let target = request.artifact_path.clone();
    let packaging = tokio::task::spawn_blocking(move || create_artifact(&source, &target));
    let artifact = tokio::select! {
        joined = packaging => joined.map_err(PipelineError::Task)??,
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled { stage: "package" }),
    };
    tracing::info!(
        path = %artifact.path.display(),
        entries = artifact.entries,
        bytes = artifact.bytes,
        "artifact created"
    );

    // 2. Request upload slot
    let invoker = DeployInvoker::new(client);
    let grant = tokio::select! {
        result = invoker.request_artifact_slot(&request.server_id, &request.version, &request.suffix) => {
            result.map_err(PipelineError::RequestSlot)?
        }
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled { stage: "request slot" }),
    };
    tracing::info!(
        host = %upload_host(&grant.upload_url),
        expires = grant.expires_at_unix,
        artifact_key = %grant.artifact_key,
        "upload grant"
    );

    // 3. Upload
    let uploaded_bytes = tokio::select! {
        result = upload_artifact(client.http(), &artifact.path, &grant.upload_url) => result?,
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled { stage: "upload" }),
    };

    // 4. Start deployment
    let deployment = tokio::select! {
        result = invoker.start_deployment(&request.server_id, &request.target, &grant.artifact_key) => {
            result.map_err(PipelineError::StartDeployment)?
        }
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled { stage: "start deployment" }),
    };

    Ok(DeployOutcome {
        artifact,
        grant,
        uploaded_bytes,
        deployment,
    })
}

/// Host of a pre-signed URL; the query carries the signature and stays out of logs.
fn upload_host(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.host_str().unwrap_or("<none>").to_owned(),
        Err(e) => format!("<unparsable: {e}>"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to package artifact")]
    Package(#[from] PackageError),

    #[error("failed to get upload URL")]
    RequestSlot(#[source] ApiError),

    #[error("failed to upload artifact")]
    Upload(#[from] UploadError),

    #[error("failed to start deployment")]
    StartDeployment(#[source] ApiError),

    #[error("deploy cancelled during {stage}")]
    Cancelled { stage: &'static str },

    #[error("packaging task failed")]
    Task(#[source] tokio::task::JoinError),
}
