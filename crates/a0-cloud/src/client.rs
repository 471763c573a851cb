use std::path::Path;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::error::ApiError;

/// Header carrying the CLI version on every backend request.
pub const VERSION_HEADER: &str = "a0ctlversion";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffer between the multipart producer task and the HTTP body.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Authenticated backend client.
///
/// Every request carries `Authorization: Bearer <token>`, the CLI version
/// header, and a `User-Agent` naming the platform. Non-2xx responses become
/// [`ApiError::Remote`] with the backend's `{error, code}` message when one
/// can be decoded.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
    username: Option<String>,
    version: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .field("username", &self.username)
            .field("version", &self.version)
            .finish()
    }
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        token: SecretString,
        username: Option<String>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            http,
            base_url,
            token,
            username,
            version: env!("CARGO_PKG_VERSION").to_owned(),
        })
    }

    /// Override the reported CLI version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Plain HTTP client without backend credentials, for pre-signed URLs.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn user_agent(&self) -> String {
        format!(
            "a0ctl/{} ({}/{})",
            self.version.trim_start_matches('v'),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    // ── JSON requests ──

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let request = self.request(Method::GET, url.clone());
        self.send_json(request, url).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let request = self.request(Method::POST, url.clone()).json(body);
        self.send_json(request, url).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let request = self.request(Method::PUT, url.clone()).json(body);
        self.send_json(request, url).await
    }

    // ── Multipart upload ──

    /// POST `file` as the `file` field of a multipart form.
    ///
    /// A producer task writes the multipart body into an in-process pipe and
    /// the HTTP client streams the other end, so the file is never held in
    /// memory as a whole.
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        path: &str,
        file: &Path,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let source_err = |e| ApiError::UploadSource {
            path: file.to_path_buf(),
            source: e,
        };

        let mut source = tokio::fs::File::open(file).await.map_err(source_err)?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        let boundary = format!("a0ctl-{}", uuid::Uuid::now_v7().simple());

        let head = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        );
        let tail = format!("\r\n--{boundary}--\r\n");

        let (mut writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let producer = tokio::spawn(async move {
            writer.write_all(head.as_bytes()).await?;
            tokio::io::copy(&mut source, &mut writer).await?;
            writer.write_all(tail.as_bytes()).await?;
            writer.shutdown().await
        });

        let request = self
            .request(Method::POST, url.clone())
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(reqwest::Body::wrap_stream(ReaderStream::new(reader)));
        let result = self.send_json(request, url).await;
        let produced = producer.await;

        // A failed request drops the pipe reader; report the request error.
        let value = result?;
        match produced {
            Ok(Ok(())) => Ok(value),
            Ok(Err(e)) => Err(source_err(e)),
            Err(e) => Err(source_err(std::io::Error::other(e))),
        }
    }

    // ── Internals ──

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            reason: e.to_string(),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.token.expose_secret())
            .header(VERSION_HEADER, &self.version)
            .header(USER_AGENT, self.user_agent())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: Url,
    ) -> Result<T, ApiError> {
        let url = url.to_string();
        let response = request.send().await.map_err(|e| ApiError::Http {
            url: url.clone(),
            source: e,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Http {
            url: url.clone(),
            source: e,
        })?;
        tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), "backend response");

        if !status.is_success() {
            let (message, code) = parse_error_body(status, &body);
            return Err(ApiError::Remote {
                url,
                status: status.as_u16(),
                message,
                code,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode { url, source: e })
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<serde_json::Value>,
    code: Option<String>,
}

/// Message and code from a `{"error": ..., "code": ...}` body, falling back
/// to the status line.
fn parse_error_body(status: reqwest::StatusCode, body: &str) -> (String, Option<String>) {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(error),
            code,
        }) if !error.is_null() => {
            let message = match error {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (message, code)
        }
        Ok(ErrorBody { code, .. }) => (format!("response failed with status {status}"), code),
        Err(e) => {
            tracing::debug!(error = %e, "error response is not JSON");
            (format!("response failed with status {status}"), None)
        }
    }
}
