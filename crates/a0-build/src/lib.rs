//! Build inputs and deploy artifacts for a0ctl.
//!
//! # Pipelines
//!
//! ```text
//! a0ctl build / run
//!   1. Descriptor  ── .a0/app.json (a0-core)
//!   2. Dockerfile   ── resolve_dockerfile(): Dockerfile, then dockerfile
//!   3. Tag          ── build_tag(): <app>:<label> or <app>:build-<id>
//!   4. Context      ── write_context(): uncompressed tar streamed to the engine
//!
//! a0ctl deploy
//!   1. Artifact     ── create_artifact(): tar.gz, dot-entries skipped
//!   2. Upload/deploy (a0-cloud)
//! ```
//!
//! # Context vs. artifact
//!
//! The build context is handed to the container engine untouched: the engine
//! applies `.dockerignore` itself. The deploy artifact is the project source
//! minus every dot-prefixed file or directory.

pub mod artifact;
pub mod context;
pub mod dockerfile;
pub mod tag;

pub use artifact::{ArtifactSummary, PackageError, create_artifact};
pub use context::{ContextError, write_context};
pub use dockerfile::{resolve_dockerfile, resolve_ignore_file};
pub use tag::build_tag;
