//! Local project layout
//!
//! Finds the project root and the applications declared inside it. A
//! project may host several applications, each with its own config file
//! somewhere below the root, or listed in the shared applications file.

pub mod resolver;

pub use resolver::LocalPathResolver;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use walkdir::WalkDir;

use crate::config::AppConfig;
use crate::error::{Result, ShipError};

/// Directories never descended into when looking for applications.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "vendor"];

const MAX_SCAN_DEPTH: usize = 5;

/// An application found in the local project tree.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalApplication {
    pub name: String,
    /// Application root directory.
    pub root: PathBuf,
    /// The application's config document.
    pub config: Value,
}

/// Look for the project config directory in `start` or its ancestors.
pub fn find_project_root(start: &Path, config: &AppConfig) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(&config.local.config_dir).is_dir() {
            return Some(current);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

#[derive(Debug, Deserialize)]
struct LocalProjectFile {
    #[serde(default)]
    id: Option<String>,
}

/// Project id recorded in the project's local project file, if any.
pub fn local_project_id(project_root: &Path, config: &AppConfig) -> Result<Option<String>> {
    let path = config.project_config_file(project_root, &config.local.project_file);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)?;
    let file: LocalProjectFile = serde_yaml::from_str(&content)
        .map_err(|e| ShipError::Config(format!("Invalid {}: {}", path.display(), e)))?;
    Ok(file.id.filter(|id| !id.is_empty()))
}

/// Discovers applications within a project tree.
#[derive(Debug, Clone)]
pub struct ApplicationFinder {
    app_config_file: String,
    applications_file: PathBuf,
    shared_dir: PathBuf,
}

impl ApplicationFinder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            app_config_file: config.local.app_config_file.clone(),
            applications_file: PathBuf::from(&config.local.config_dir)
                .join(&config.local.applications_file),
            shared_dir: PathBuf::from(&config.local.shared_dir),
        }
    }

    /// All applications under `project_root`, ordered by root path.
    pub fn find_applications(&self, project_root: &Path) -> Result<Vec<LocalApplication>> {
        let mut apps = self.scan_app_config_files(project_root)?;
        apps.extend(self.read_applications_file(project_root)?);
        apps.sort_by(|a, b| a.root.cmp(&b.root).then_with(|| a.name.cmp(&b.name)));

        tracing::debug!(
            "Found {} local application(s) in {}",
            apps.len(),
            project_root.display()
        );
        Ok(apps)
    }

    fn scan_app_config_files(&self, project_root: &Path) -> Result<Vec<LocalApplication>> {
        let shared_dir = project_root.join(&self.shared_dir);
        let walker = WalkDir::new(project_root)
            .max_depth(MAX_SCAN_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if !entry.file_type().is_dir() || entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !IGNORED_DIRS.contains(&name.as_ref()) && entry.path() != shared_dir
            });

        let mut apps = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| ShipError::Other(e.into()))?;
            if !entry.file_type().is_file() || entry.file_name() != self.app_config_file.as_str()
            {
                continue;
            }

            let path = entry.path();
            let content = std::fs::read_to_string(path)?;
            let config: Value = serde_yaml::from_str(&content).map_err(|e| {
                ShipError::Config(format!("Invalid {}: {}", path.display(), e))
            })?;

            let root = path.parent().unwrap_or(project_root).to_path_buf();
            match declared_name(&config) {
                Some(name) => apps.push(LocalApplication { name, root, config }),
                None => tracing::warn!("Skipping {}: no application name", path.display()),
            }
        }

        Ok(apps)
    }

    fn read_applications_file(&self, project_root: &Path) -> Result<Vec<LocalApplication>> {
        let path = project_root.join(&self.applications_file);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)?;
        let document: Value = serde_yaml::from_str(&content)
            .map_err(|e| ShipError::Config(format!("Invalid {}: {}", path.display(), e)))?;

        let entries: Vec<(Option<String>, Value)> = match document {
            Value::Sequence(items) => items.into_iter().map(|item| (None, item)).collect(),
            Value::Mapping(map) => map
                .into_iter()
                .map(|(key, item)| (key.as_str().map(str::to_string), item))
                .collect(),
            Value::Null => Vec::new(),
            _ => {
                return Err(ShipError::Config(format!(
                    "{} must contain a list or a mapping of applications",
                    path.display()
                )))
            }
        };

        let mut apps = Vec::new();
        for (key, config) in entries {
            let Some(name) = key.or_else(|| declared_name(&config)) else {
                tracing::warn!("Skipping an application in {}: no name", path.display());
                continue;
            };

            let relative_root = config
                .get("source")
                .and_then(|source| source.get("root"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim_matches('/');
            let root = if relative_root.is_empty() {
                project_root.to_path_buf()
            } else {
                project_root.join(relative_root)
            };

            apps.push(LocalApplication { name, root, config });
        }

        Ok(apps)
    }
}

fn declared_name(config: &Value) -> Option<String> {
    config
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
