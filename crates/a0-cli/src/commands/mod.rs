mod build;
mod deploy;
mod doctor;
mod init;
mod project;
mod run;

pub use build::{BuildOptions, build};
pub use deploy::{DeployOptions, deploy};
pub use doctor::doctor;
pub use init::init;
pub use run::{RunOptions, run};
