use std::path::Path;

use a0_engine::{ContainerRunner, ContainerState, DockerClient, RunSpec};
use tokio_util::sync::CancellationToken;

use super::project::Project;

pub struct RunOptions {
    pub tag: String,
    pub ports: Vec<String>,
    pub env: Vec<String>,
    pub detach: bool,
    pub auto_remove: bool,
}

/// Run `<app>:<tag>` as a container named after the app.
pub async fn run(path: &Path, opts: RunOptions, cancel: &CancellationToken) -> anyhow::Result<()> {
    let project = Project::open(path)?;

    let spec = RunSpec {
        app_name: project.app.name.clone(),
        working_dir: project.dir.clone(),
        tag: opts.tag,
        ports: opts.ports,
        env: opts.env,
        detach: opts.detach,
        auto_remove: opts.auto_remove,
    };

    let runner = ContainerRunner::new(DockerClient::new());
    let outcome = runner.run(&spec, cancel).await?;

    match outcome.state {
        ContainerState::Detached => {
            println!("{}", outcome.container_id);
        }
        ContainerState::Exited(0) => {
            println!("container {} exited", short_id(&outcome.container_id));
        }
        ContainerState::Exited(code) => {
            anyhow::bail!(
                "container {} exited with code {code}",
                short_id(&outcome.container_id)
            );
        }
        other => {
            tracing::debug!(state = ?other, "run finished");
        }
    }

    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
