use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShipError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default project id, used when `--project` is not given and the
    /// project tree has no local project file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default = "default_environment")]
    pub default_environment: String,
    #[serde(default = "default_ssh_host")]
    pub ssh_host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<String>,
    #[serde(default = "default_rsync_binary")]
    pub rsync_binary: String,
    #[serde(default)]
    pub local: LocalConfig,
}

/// Layout of a project checkout on the local machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalConfig {
    /// Directory that marks the project root.
    #[serde(default = "default_config_dir")]
    pub config_dir: String,
    /// Per-application config file; each one found declares an application.
    #[serde(default = "default_app_config_file")]
    pub app_config_file: String,
    /// Relative to `config_dir`.
    #[serde(default = "default_applications_file")]
    pub applications_file: String,
    /// Relative to `config_dir`.
    #[serde(default = "default_services_file")]
    pub services_file: String,
    /// Relative to `config_dir`.
    #[serde(default = "default_project_file")]
    pub project_file: String,
    /// Staging directory for shared mounts, relative to the project root.
    #[serde(default = "default_shared_dir")]
    pub shared_dir: String,
}

fn default_environment() -> String {
    "main".to_string()
}

fn default_ssh_host() -> String {
    "ssh.shiphost.io".to_string()
}

fn default_rsync_binary() -> String {
    "rsync".to_string()
}

fn default_config_dir() -> String {
    ".platform".to_string()
}

fn default_app_config_file() -> String {
    ".platform.app.yaml".to_string()
}

fn default_applications_file() -> String {
    "applications.yaml".to_string()
}

fn default_services_file() -> String {
    "services.yaml".to_string()
}

fn default_project_file() -> String {
    "local/project.yaml".to_string()
}

fn default_shared_dir() -> String {
    ".platform/local/shared".to_string()
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            app_config_file: default_app_config_file(),
            applications_file: default_applications_file(),
            services_file: default_services_file(),
            project_file: default_project_file(),
            shared_dir: default_shared_dir(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project: None,
            default_environment: default_environment(),
            ssh_host: default_ssh_host(),
            ssh_key_path: None,
            rsync_binary: default_rsync_binary(),
            local: LocalConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            ShipError::Config("Could not determine the home directory".to_string())
        })?;
        Ok(home.join(".config").join("shipctl"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Load the user config. A missing file is not an error: every field
    /// has a default.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| ShipError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("SHIPCTL_SSH_HOST") {
            self.ssh_host = host;
        }
        if let Some(binary) = lookup("SHIPCTL_RSYNC") {
            self.rsync_binary = binary;
        }
        if let Some(key) = lookup("SHIPCTL_SSH_KEY") {
            self.ssh_key_path = Some(key);
        }
        if let Some(env) = lookup("SHIPCTL_ENVIRONMENT") {
            self.default_environment = env;
        }
        if self.project.is_none() {
            self.project = lookup("SHIPCTL_PROJECT");
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.ssh_host.trim().is_empty() {
            return Err(ShipError::Config("ssh_host must not be empty".to_string()));
        }

        if Path::new(&self.local.shared_dir).is_absolute() {
            return Err(ShipError::Config(format!(
                "local.shared_dir must be relative to the project root, got '{}'",
                self.local.shared_dir
            )));
        }

        if let Some(key) = self.resolved_ssh_key() {
            if !key.exists() {
                return Err(ShipError::Config(format!(
                    "SSH key not found at '{}'",
                    key.display()
                )));
            }
        }

        Ok(())
    }

    pub fn resolved_ssh_key(&self) -> Option<PathBuf> {
        self.ssh_key_path
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }

    /// Absolute path of a file inside the project's config directory.
    pub fn project_config_file(&self, project_root: &Path, name: &str) -> PathBuf {
        project_root.join(&self.local.config_dir).join(name)
    }
}
