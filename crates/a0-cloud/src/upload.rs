use std::path::Path;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio_util::io::ReaderStream;

use crate::error::UploadError;

/// PUT the archive at `path` to a pre-signed `upload_url`.
///
/// The body is streamed from disk. Only `200 OK` counts as success; any other
/// status is returned with the response body. Returns the bytes sent.
pub async fn upload_artifact(
    http: &reqwest::Client,
    path: &Path,
    upload_url: &str,
) -> Result<u64, UploadError> {
    let open_err = |e| UploadError::Open {
        path: path.to_path_buf(),
        source: e,
    };
    let file = tokio::fs::File::open(path).await.map_err(open_err)?;
    let size = file.metadata().await.map_err(open_err)?.len();

    tracing::info!(path = %path.display(), bytes = size, "uploading artifact");

    let response = http
        .put(upload_url)
        .header(CONTENT_TYPE, "application/octet-stream")
        .header(CONTENT_LENGTH, size)
        .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
        .send()
        .await
        .map_err(UploadError::Request)?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "failed to read upload response body");
            String::new()
        });
        return Err(UploadError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    tracing::info!(bytes = size, "artifact uploaded");
    Ok(size)
}
