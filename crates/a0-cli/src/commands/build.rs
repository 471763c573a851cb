use std::collections::BTreeMap;
use std::path::Path;

use a0_engine::{DockerClient, EngineImageBuilder, ImageBuildSpec, ImageBuilder};
use tokio_util::sync::CancellationToken;

use super::project::Project;

pub struct BuildOptions {
    pub tag: String,
    pub platform: String,
    pub export: bool,
    pub publish: bool,
}

/// Build the app image, then optionally export or publish it.
pub async fn build(
    path: &Path,
    opts: &BuildOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let project = Project::open(path)?;
    let dockerfile_path = project.dockerfile()?;
    let build_output_dir = a0_core::build_output_dir(&project.dir)?;
    println!("build output directory: {}", build_output_dir.display());

    let mut labels = BTreeMap::new();
    labels.insert("run.a0.app".to_owned(), project.app.name.clone());
    labels.insert("run.a0.region".to_owned(), project.app.region.clone());

    let spec = ImageBuildSpec {
        app_name: project.app.name.clone(),
        working_dir: project.dir.clone(),
        dockerfile_path,
        ignore_file_path: a0_build::resolve_ignore_file(&project.dir),
        tag: a0_build::build_tag(&project.app.name, &opts.tag),
        labels,
        platform: opts.platform.clone(),
        build_output_dir,
    };

    let builder = EngineImageBuilder::new(DockerClient::new());
    let image = builder.build(&spec, cancel).await?;
    println!("built image: {}", image.reference);

    if opts.export {
        let tarball = builder.export(&image, &spec.build_output_dir).await?;
        println!("exported image: {}", tarball.display());
    }
    if opts.publish {
        let published = builder.publish(&image).await?;
        println!("published image: {}", published.reference);
    }

    Ok(())
}
