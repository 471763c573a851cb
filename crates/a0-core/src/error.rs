use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── App descriptor ──
    #[error("app is not initialized: {path} not found, run `a0ctl init` first")]
    ConfigMissing { path: PathBuf },

    #[error("failed to read app descriptor at {path}")]
    DescriptorRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid app descriptor at {path}: {reason}")]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("invalid app name {name:?}: {reason}")]
    InvalidAppName { name: String, reason: &'static str },

    #[error("app descriptor already exists at {0} (pass --force to overwrite)")]
    AlreadyInitialized(PathBuf),

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── User settings ──
    #[error("could not determine a config directory for this user; set A0_CONFIG_PATH")]
    NoConfigDir,

    #[error("failed to read settings from {path}")]
    SettingsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings at {path}")]
    SettingsParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize settings")]
    SettingsSerialize { source: toml::ser::Error },
}
