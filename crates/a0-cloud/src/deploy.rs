use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::ApiError;

pub const ARTIFACTS_PATH: &str = "/v1/artifacts";
pub const DEPLOYMENTS_PATH: &str = "/v1/deployments";

/// Single-use, time-bounded upload slot issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactUploadGrant {
    pub upload_url: String,
    /// Unix seconds. Informational only; expiry is never checked locally.
    #[serde(rename = "expires")]
    pub expires_at_unix: i64,
    pub artifact_key: String,
}

/// Initial state of a deployment as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub deployment_id: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactSlotRequest<'a> {
    server_id: &'a str,
    version: &'a str,
    suffix: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartDeploymentRequest<'a> {
    server_id: &'a str,
    target: &'a str,
    artifact_key: &'a str,
}

/// Backend calls that register an artifact and start a deployment from it.
///
/// Neither call retries.
pub struct DeployInvoker<'a> {
    client: &'a ApiClient,
}

impl<'a> DeployInvoker<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn request_artifact_slot(
        &self,
        server_id: &str,
        version: &str,
        suffix: &str,
    ) -> Result<ArtifactUploadGrant, ApiError> {
        let grant: ArtifactUploadGrant = self
            .client
            .post_json(
                ARTIFACTS_PATH,
                &ArtifactSlotRequest {
                    server_id,
                    version,
                    suffix,
                },
            )
            .await?;
        tracing::info!(
            artifact_key = %grant.artifact_key,
            expires = grant.expires_at_unix,
            "artifact slot granted"
        );
        Ok(grant)
    }

    pub async fn start_deployment(
        &self,
        server_id: &str,
        target: &str,
        artifact_key: &str,
    ) -> Result<DeploymentRecord, ApiError> {
        let record: DeploymentRecord = self
            .client
            .post_json(
                DEPLOYMENTS_PATH,
                &StartDeploymentRequest {
                    server_id,
                    target,
                    artifact_key,
                },
            )
            .await?;
        tracing::info!(
            deployment_id = %record.deployment_id,
            status = %record.status,
            "deployment started"
        );
        Ok(record)
    }
}
