use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Overrides the settings directory.
pub const CONFIG_PATH_ENV: &str = "A0_CONFIG_PATH";

/// Overrides the backend base URL.
pub const BASE_URL_ENV: &str = "A0_API_BASEURL";

pub const DEFAULT_BASE_URL: &str = "https://api.a0.run";

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    token: Option<String>,
    username: Option<String>,
    base_url: Option<String>,
}

/// User-level settings (`<config dir>/a0/settings.toml`).
///
/// Loaded by the commands that talk to the backend and passed down by reference.
/// The access token is wrapped in [`SecretString`] so it never ends up in
/// debug output.
#[derive(Clone)]
pub struct Settings {
    dir: PathBuf,
    token: Option<SecretString>,
    username: Option<String>,
    base_url: Option<String>,
    base_url_override: Option<String>,
    changed: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("dir", &self.dir)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .field("base_url", &self.base_url())
            .finish()
    }
}

impl Settings {
    /// Load settings from the default directory, honoring
    /// `A0_CONFIG_PATH` and `A0_API_BASEURL`.
    pub fn load() -> crate::Result<Self> {
        let dir = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => dirs::config_dir()
                .map(|d| d.join("a0"))
                .ok_or(crate::Error::NoConfigDir)?,
        };

        let mut settings = Self::load_from(&dir)?;
        settings.base_url_override = std::env::var(BASE_URL_ENV)
            // arch-lint: allow(no-silent-result-drop) reason="an unset override means the file or default URL applies"
            .ok()
            .filter(|u| !u.trim().is_empty());
        Ok(settings)
    }

    /// Load settings from an explicit directory. A missing file yields defaults.
    pub fn load_from(dir: &Path) -> crate::Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        let file = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|e| crate::Error::SettingsRead {
                    path: path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::SettingsParse {
                path: path.clone(),
                source: e,
            })?
        } else {
            SettingsFile::default()
        };

        tracing::debug!(path = %path.display(), "settings loaded");

        Ok(Self {
            dir: dir.to_path_buf(),
            token: file.token.filter(|t| !t.is_empty()).map(SecretString::from),
            username: file.username,
            base_url: file.base_url.filter(|u| !u.is_empty()),
            base_url_override: None,
            changed: false,
        })
    }

    /// Directory holding `settings.toml` and local artifacts.
    pub fn local_config_dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn set_token(&mut self, token: &str) {
        self.token = Some(SecretString::from(token.to_owned()));
        self.changed = true;
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_username(&mut self, username: &str) {
        self.username = Some(username.to_owned());
        self.changed = true;
    }

    /// Effective backend URL: env override, then file, then default.
    pub fn base_url(&self) -> &str {
        self.base_url_override
            .as_deref()
            .or(self.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn set_base_url(&mut self, url: &str) {
        self.base_url = Some(url.to_owned());
        self.changed = true;
    }

    /// Persist settings if any setter was called since loading.
    pub fn save(&mut self) -> crate::Result<()> {
        if !self.changed {
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| crate::Error::CreateDir {
            path: self.dir.clone(),
            source: e,
        })?;

        let file = SettingsFile {
            token: self.token.as_ref().map(|t| t.expose_secret().to_owned()),
            username: self.username.clone(),
            base_url: self.base_url.clone(),
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| crate::Error::SettingsSerialize { source: e })?;

        let path = self.dir.join(SETTINGS_FILE);
        std::fs::write(&path, content).map_err(|e| crate::Error::Write { path, source: e })?;
        self.changed = false;
        Ok(())
    }
}
