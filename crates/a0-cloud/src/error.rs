use std::path::PathBuf;

/// Backend request failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to create HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed")]
    Http { url: String, source: reqwest::Error },

    #[error("request to {url} failed with status {status}: {message}")]
    Remote {
        url: String,
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("unexpected response from {url}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("failed to read {path} for upload")]
    UploadSource {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ApiError {
    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Artifact upload failures.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to open artifact {path}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("upload request failed")]
    Request(#[source] reqwest::Error),

    #[error("upload failed: status {status}, response: {body}")]
    Rejected { status: u16, body: String },
}

/// Token resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(
        "token in {var} env var is invalid. Update the env var with a valid value, or unset it to use a token from the settings file"
    )]
    InvalidEnvToken { var: &'static str },

    #[error("not logged in: set {var} or add a valid token to {settings}")]
    NotLoggedIn {
        var: &'static str,
        settings: PathBuf,
    },

    #[error(transparent)]
    Client(#[from] ApiError),
}
