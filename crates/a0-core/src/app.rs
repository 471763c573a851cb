use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Hidden per-project directory created by `a0ctl init`.
pub const CONFIG_DIR: &str = ".a0";

/// Descriptor file inside [`CONFIG_DIR`].
pub const DESCRIPTOR_FILE: &str = "app.json";

/// Regions offered by `a0ctl init`.
pub const REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-2",
    "eu-central-1",
    "ap-south-1",
    "ap-southeast-2",
];

const README_TXT: &str = r#"> Why do I have a folder named ".a0" in my project?
The ".a0" folder is created when you link a directory to an a0 app.

> What does the "app.json" file contain?
The "app.json" file contains:
- The name of the a0 app.
- The region where the app is hosted.

> Should I commit the ".a0" folder?
No, you should not share the ".a0" folder with anyone.
"#;

/// `.a0/app.json` descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// App name, also used as image repository and container name
    #[serde(default)]
    pub name: String,
    /// Hosting region
    #[serde(default)]
    pub region: String,
}

impl AppDescriptor {
    /// Build a descriptor, validating the app name.
    pub fn new(name: &str, region: &str) -> crate::Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_owned(),
            region: region.to_owned(),
        })
    }

    /// Load `.a0/app.json` from the project directory.
    ///
    /// Pure read: never creates the config directory.
    pub fn resolve(project_dir: &Path) -> crate::Result<Self> {
        let config_dir = project_dir.join(CONFIG_DIR);
        if !config_dir.is_dir() {
            return Err(crate::Error::ConfigMissing { path: config_dir });
        }

        let path = config_dir.join(DESCRIPTOR_FILE);
        if !path.is_file() {
            return Err(crate::Error::ConfigMissing { path });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::DescriptorRead {
            path: path.clone(),
            source: e,
        })?;

        let descriptor: Self =
            serde_json::from_str(&content).map_err(|e| crate::Error::InvalidDescriptor {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if descriptor.name.is_empty() {
            return Err(crate::Error::InvalidDescriptor {
                path,
                reason: "name field is required".to_owned(),
            });
        }
        if descriptor.region.is_empty() {
            return Err(crate::Error::InvalidDescriptor {
                path,
                reason: "region field is required".to_owned(),
            });
        }
        if descriptor.name.chars().any(char::is_whitespace) {
            return Err(crate::Error::InvalidDescriptor {
                path,
                reason: "name must not contain whitespace".to_owned(),
            });
        }

        tracing::debug!(name = %descriptor.name, region = %descriptor.region, "app descriptor loaded");
        Ok(descriptor)
    }

    /// Write `.a0/app.json` and `.a0/README.txt` into the project directory.
    pub fn init(&self, project_dir: &Path, force: bool) -> crate::Result<PathBuf> {
        let config_dir = project_dir.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).map_err(|e| crate::Error::CreateDir {
            path: config_dir.clone(),
            source: e,
        })?;

        let path = config_dir.join(DESCRIPTOR_FILE);
        if path.exists() && !force {
            return Err(crate::Error::AlreadyInitialized(path));
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| {
            crate::Error::InvalidDescriptor {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;
        std::fs::write(&path, json).map_err(|e| crate::Error::Write {
            path: path.clone(),
            source: e,
        })?;

        let readme = config_dir.join("README.txt");
        std::fs::write(&readme, README_TXT).map_err(|e| crate::Error::Write {
            path: readme,
            source: e,
        })?;

        Ok(config_dir)
    }
}

/// Return `<project>/.a0/builds`, creating `builds/` if needed.
pub fn build_output_dir(project_dir: &Path) -> crate::Result<PathBuf> {
    let config_dir = project_dir.join(CONFIG_DIR);
    if !config_dir.is_dir() {
        return Err(crate::Error::ConfigMissing { path: config_dir });
    }

    let builds = config_dir.join("builds");
    std::fs::create_dir_all(&builds).map_err(|e| crate::Error::CreateDir {
        path: builds.clone(),
        source: e,
    })?;
    Ok(builds)
}

fn validate_name(name: &str) -> crate::Result<()> {
    if name.is_empty() {
        return Err(crate::Error::InvalidAppName {
            name: name.to_owned(),
            reason: "name cannot be empty",
        });
    }
    if name.chars().any(char::is_whitespace) {
        return Err(crate::Error::InvalidAppName {
            name: name.to_owned(),
            reason: "name cannot contain spaces",
        });
    }
    Ok(())
}
