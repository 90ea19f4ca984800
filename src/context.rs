//! Per-invocation context
//!
//! Everything a command needs to know about how it was invoked. Built once
//! in `main` and passed by reference to resolvers and prompts; nothing here
//! is global.

use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::local::find_project_root;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => Verbosity::Quiet,
            (true, false) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }

    /// Default tracing directive for this level.
    pub fn log_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "shipctl=error",
            Verbosity::Normal => "shipctl=info",
            Verbosity::Verbose => "shipctl=debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// False when `--yes`/`--no-interaction` is given or no terminal is
    /// attached. Prompts then take their defaults and confirmations pass.
    pub interactive: bool,
    pub verbosity: Verbosity,
    pub config: AppConfig,
    pub cwd: PathBuf,
    pub project_root: Option<PathBuf>,
}

impl InvocationContext {
    pub fn new(config: AppConfig, interactive: bool, verbosity: Verbosity, cwd: PathBuf) -> Self {
        let project_root = find_project_root(&cwd, &config);
        match &project_root {
            Some(root) => tracing::debug!("Project root: {}", root.display()),
            None => tracing::debug!("No project root found above {}", cwd.display()),
        }

        Self {
            interactive,
            verbosity,
            config,
            cwd,
            project_root,
        }
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Resolve a user-supplied path: expand `~`, then anchor relative paths
    /// at the working directory.
    pub fn resolve_user_path(&self, input: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(input).as_ref());
        if expanded.is_absolute() {
            expanded
        } else {
            self.cwd.join(expanded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
    }

    #[test]
    fn test_context_discovers_project_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join(".platform")).unwrap();
        std::fs::create_dir_all(root.join("app/src")).unwrap();

        let ctx = InvocationContext::new(
            AppConfig::default(),
            false,
            Verbosity::Normal,
            root.join("app/src"),
        );
        assert_eq!(ctx.project_root(), Some(root));
    }

    #[test]
    fn test_resolve_user_path() {
        let ctx = InvocationContext {
            interactive: false,
            verbosity: Verbosity::Normal,
            config: AppConfig::default(),
            cwd: PathBuf::from("/work/project"),
            project_root: None,
        };
        assert_eq!(ctx.resolve_user_path("files"), PathBuf::from("/work/project/files"));
        assert_eq!(ctx.resolve_user_path("/srv/files"), PathBuf::from("/srv/files"));
    }
}
