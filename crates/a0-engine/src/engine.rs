#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("`{program}` could not be executed; is Docker installed and on PATH?")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("docker command failed: {args:?}\n{stderr}")]
    CommandFailed { args: Vec<String>, stderr: String },

    #[error("docker output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[error("failed to write to docker stdin")]
    StdinWrite { source: std::io::Error },
}

impl EngineError {
    /// Stderr of a failed command, empty for other variants.
    pub fn stderr(&self) -> &str {
        match self {
            Self::CommandFailed { stderr, .. } => stderr,
            _ => "",
        }
    }
}
