mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "a0ctl", about = "Build, run, and deploy apps to a0")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link a directory to an a0 app (.a0/app.json)
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
        /// App name (no whitespace)
        #[arg(long)]
        name: String,
        /// Hosting region
        #[arg(long, default_value = "us-east-1", value_parser = clap::builder::PossibleValuesParser::new(a0_core::REGIONS.iter().copied()))]
        region: String,
        /// Overwrite an existing descriptor
        #[arg(long)]
        force: bool,
    },
    /// Build the app image from its Dockerfile
    Build {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Image label; generated as build-<id> when omitted
        #[arg(long, short = 't', default_value = "")]
        tag: String,
        /// Target platform
        #[arg(long, default_value = a0_engine::builder::DEFAULT_PLATFORM)]
        platform: String,
        /// Save the image as a tarball in .a0/builds
        #[arg(long)]
        export: bool,
        /// Push the image to the ephemeral public registry
        #[arg(long)]
        publish: bool,
    },
    /// Run a built image locally
    Run {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Image label to run, as given to `build --tag` (e.g. --tag latest)
        #[arg(long, short = 't')]
        tag: String,
        /// Port mapping hostPort:containerPort (repeatable)
        #[arg(long = "port", short = 'p')]
        ports: Vec<String>,
        /// Environment variable KEY=VALUE (repeatable)
        #[arg(long = "env", short = 'e')]
        env: Vec<String>,
        /// Return once the container has started
        #[arg(long, short = 'd')]
        detach: bool,
        /// Remove the container when it exits (`--rm=false` keeps it)
        #[arg(
            long,
            default_value_t = true,
            default_missing_value = "true",
            num_args = 0..=1,
            require_equals = true,
            action = clap::ArgAction::Set
        )]
        rm: bool,
    },
    /// Package the project and deploy it to a server
    Deploy {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Target server id
        #[arg(long, env = "A0_SERVER_ID")]
        server: String,
        /// Deployment target
        #[arg(long, default_value = a0_cloud::pipeline::DEFAULT_TARGET)]
        target: String,
        /// Artifact version
        #[arg(long, default_value = a0_cloud::pipeline::DEFAULT_VERSION)]
        version: String,
    },
    /// Check container engine, app setup, and credentials
    Doctor {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("interrupt received, shutting down");
                    cancel.cancel();
                }
                Err(e) => tracing::warn!(error = %e, "failed to listen for interrupt"),
            }
        }
    });

    match cli.command {
        Commands::Init {
            path,
            name,
            region,
            force,
        } => commands::init(&path, &name, &region, force)?,
        Commands::Build {
            path,
            tag,
            platform,
            export,
            publish,
        } => {
            let opts = commands::BuildOptions {
                tag,
                platform,
                export,
                publish,
            };
            commands::build(&path, &opts, &cancel).await?
        }
        Commands::Run {
            path,
            tag,
            ports,
            env,
            detach,
            rm,
        } => {
            let opts = commands::RunOptions {
                tag,
                ports,
                env,
                detach,
                auto_remove: rm,
            };
            commands::run(&path, opts, &cancel).await?
        }
        Commands::Deploy {
            path,
            server,
            target,
            version,
        } => {
            let opts = commands::DeployOptions {
                server,
                target,
                version,
            };
            commands::deploy(&path, opts, &cancel).await?
        }
        Commands::Doctor { path } => commands::doctor(&path).await?,
    }

    Ok(())
}
