//! Container engine operations for a0ctl.
//!
//! Every engine interaction goes through [`DockerExecutor`], so the probe,
//! builder, and runner can be exercised against a mock engine.
//!
//! ```text
//! build:  probe → tar context → docker build (context on stdin) → BuiltImage
//! run:    ports → probe → image inspect → rm -f <same name> → create → start
//!         → (detach: hand off) | (logs task + wait → stop/rm via guard)
//! ```

pub mod builder;
pub mod client;
pub mod engine;
pub mod executor;
pub mod logs;
pub mod ports;
pub mod runner;

pub use builder::{BuildError, BuiltImage, EngineImageBuilder, ImageBuildSpec, ImageBuilder};
pub use client::{CreateOptions, DockerClient, ProbeError};
pub use engine::EngineError;
pub use executor::{DockerExecutor, RealExecutor, StdinWriter};
pub use ports::{PortMapping, PortMappingError};
pub use runner::{ContainerGuard, ContainerRunner, ContainerState, RunError, RunOutcome, RunSpec};
