use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use a0_build::context::{ContextError, write_context};
use a0_build::tag::split_tag;
use tokio_util::sync::CancellationToken;

use crate::client::{BuildRequest, DockerClient, ProbeError};
use crate::engine::EngineError;
use crate::executor::{DockerExecutor, RealExecutor, StdinWriter};

/// Registry that accepts anonymous, short-lived pushes.
pub const PUBLISH_REGISTRY: &str = "ttl.sh";

pub const DEFAULT_PLATFORM: &str = "linux/amd64";

/// Everything one build needs. Constructed once per invocation.
#[derive(Debug, Clone)]
pub struct ImageBuildSpec {
    pub app_name: String,
    pub working_dir: PathBuf,
    pub dockerfile_path: PathBuf,
    pub ignore_file_path: Option<PathBuf>,
    pub tag: String,
    pub labels: BTreeMap<String, String>,
    pub platform: String,
    pub build_output_dir: PathBuf,
}

/// Image produced by a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    pub reference: String,
}

/// Capability to turn an [`ImageBuildSpec`] into an image.
///
/// [`EngineImageBuilder`] is the shipped strategy: it drives the container
/// engine's native build with the project as a tar context. A strategy backed
/// by an external build orchestrator (BuildKit/Dagger-style pipelines that
/// export or publish directly) plugs in by implementing this trait.
#[allow(async_fn_in_trait)]
pub trait ImageBuilder {
    async fn build(
        &self,
        spec: &ImageBuildSpec,
        cancel: &CancellationToken,
    ) -> Result<BuiltImage, BuildError>;
}

/// Engine-native image builder.
pub struct EngineImageBuilder<E: DockerExecutor = RealExecutor> {
    client: DockerClient<E>,
}

impl<E: DockerExecutor> EngineImageBuilder<E> {
    pub fn new(client: DockerClient<E>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DockerClient<E> {
        &self.client
    }

    /// Save a built image as `<app>-<label>.tar` in `out_dir`.
    pub async fn export(&self, image: &BuiltImage, out_dir: &Path) -> Result<PathBuf, BuildError> {
        let file_name = match split_tag(&image.reference) {
            Some((repo, label)) => format!("{}-{label}.tar", repo.replace('/', "_")),
            None => format!("{}.tar", image.reference.replace(['/', ':'], "_")),
        };
        let path = out_dir.join(file_name);

        self.client
            .save_image(&image.reference, &path)
            .await
            .map_err(|e| BuildError::Export {
                tag: image.reference.clone(),
                source: e,
            })?;

        tracing::info!(image = %image.reference, path = %path.display(), "image exported");
        Ok(path)
    }

    /// Retag under [`PUBLISH_REGISTRY`] and push; returns the pushed reference.
    pub async fn publish(&self, image: &BuiltImage) -> Result<BuiltImage, BuildError> {
        let target = format!("{PUBLISH_REGISTRY}/{}", image.reference);
        let publish_err = |e| BuildError::Publish {
            tag: target.clone(),
            source: e,
        };

        self.client
            .tag_image(&image.reference, &target)
            .await
            .map_err(publish_err)?;
        self.client.push_image(&target).await.map_err(publish_err)?;

        Ok(BuiltImage { reference: target })
    }
}

impl<E: DockerExecutor> ImageBuilder for EngineImageBuilder<E> {
    async fn build(
        &self,
        spec: &ImageBuildSpec,
        cancel: &CancellationToken,
    ) -> Result<BuiltImage, BuildError> {
        self.client.check_available().await?;

        let dockerfile = dockerfile_in_context(spec)?;
        if !spec.working_dir.is_dir() {
            return Err(ContextError::NotADirectory(spec.working_dir.clone()).into());
        }

        tracing::info!(
            tag = %spec.tag,
            dockerfile = %dockerfile,
            platform = %spec.platform,
            ignore_file = ?spec.ignore_file_path,
            "building image"
        );

        let context_dir = spec.working_dir.clone();
        let context: StdinWriter = Box::new(move |out: &mut dyn std::io::Write| {
            write_context(&context_dir, out)
                .map(|_| ())
                .map_err(std::io::Error::other)
        });

        let request = BuildRequest {
            tag: &spec.tag,
            dockerfile: &dockerfile,
            platform: Some(spec.platform.as_str()),
            labels: &spec.labels,
        };

        tokio::select! {
            result = self.client.build_image(context, &request) => {
                result.map_err(|e| BuildError::Build {
                    tag: spec.tag.clone(),
                    source: e,
                })?;
            }
            _ = cancel.cancelled() => {
                return Err(BuildError::Cancelled { tag: spec.tag.clone() });
            }
        }

        Ok(BuiltImage {
            reference: spec.tag.clone(),
        })
    }
}

/// Dockerfile path relative to the context root, `/`-separated.
fn dockerfile_in_context(spec: &ImageBuildSpec) -> Result<String, BuildError> {
    let relative = spec
        .dockerfile_path
        .strip_prefix(&spec.working_dir)
        .map_err(|_| BuildError::DockerfileOutsideContext {
            dockerfile: spec.dockerfile_path.clone(),
            context: spec.working_dir.clone(),
        })?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return Err(BuildError::DockerfileOutsideContext {
            dockerfile: spec.dockerfile_path.clone(),
            context: spec.working_dir.clone(),
        });
    }
    Ok(parts.join("/"))
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Dockerfile {dockerfile} is not inside the build context {context}")]
    DockerfileOutsideContext { dockerfile: PathBuf, context: PathBuf },

    #[error("failed to prepare build context")]
    Context(#[from] ContextError),

    #[error("image build failed for {tag}")]
    Build { tag: String, source: EngineError },

    #[error("build of {tag} was cancelled")]
    Cancelled { tag: String },

    #[error("failed to export image {tag}")]
    Export { tag: String, source: EngineError },

    #[error("failed to publish image {tag}")]
    Publish { tag: String, source: EngineError },
}
