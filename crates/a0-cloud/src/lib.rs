//! a0 backend access for a0ctl.
//!
//! ```text
//! deploy:  create_artifact ─► POST /v1/artifacts ─► PUT <uploadUrl> ─► POST /v1/deployments
//!          (a0-build)          DeployInvoker         upload_artifact      DeployInvoker
//! ```
//!
//! [`ApiClient`] carries the bearer token for backend calls. The pre-signed
//! upload goes through the bare HTTP client so no credentials leak to the
//! storage host.

pub mod auth;
pub mod client;
pub mod deploy;
pub mod error;
pub mod pipeline;
pub mod upload;

pub use auth::{TOKEN_ENV, authenticated_client, is_token_valid, resolve_token};
pub use client::ApiClient;
pub use deploy::{ArtifactUploadGrant, DeployInvoker, DeploymentRecord};
pub use error::{ApiError, AuthError, UploadError};
pub use pipeline::{DeployOutcome, DeployRequest, PipelineError, deploy};
pub use upload::upload_artifact;
