//! Default local endpoints for remote mounts
//!
//! Given a remote container and one of its mounts, work out which local
//! directory a transfer should use when the user did not name one:
//!
//! 1. `<local app root>/<mount path>`, if that directory exists, so the
//!    local tree mirrors the remote one;
//! 2. `<shared dir>/<shared path>`, if the mount is backed by shared
//!    storage and that path exists;
//! 3. nothing, and the caller has to ask.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use crate::context::InvocationContext;
use crate::mount::MountTable;
use crate::remote::RemoteContainer;

use super::{ApplicationFinder, LocalApplication};

/// Resolves local paths for one invocation. The project tree is scanned
/// at most once, on first use.
#[derive(Debug)]
pub struct LocalPathResolver {
    project_root: Option<PathBuf>,
    shared_dir: PathBuf,
    finder: ApplicationFinder,
    apps: OnceCell<Vec<LocalApplication>>,
}

impl LocalPathResolver {
    pub fn new(ctx: &InvocationContext) -> Self {
        Self {
            project_root: ctx.project_root.clone(),
            shared_dir: PathBuf::from(&ctx.config.local.shared_dir),
            finder: ApplicationFinder::new(&ctx.config),
            apps: OnceCell::new(),
        }
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Local applications in the project, scanned on first call.
    pub fn local_apps(&self) -> &[LocalApplication] {
        self.apps.get_or_init(|| {
            let Some(root) = &self.project_root else {
                return Vec::new();
            };
            self.finder.find_applications(root).unwrap_or_else(|e| {
                tracing::warn!("Failed to scan local applications: {}", e);
                Vec::new()
            })
        })
    }

    pub fn find_app(&self, name: &str) -> Option<&LocalApplication> {
        self.local_apps().iter().find(|app| app.name == name)
    }

    /// Local root of the application matching `container`. Services have
    /// no local counterpart.
    pub fn local_app_path(&self, container: &RemoteContainer) -> Option<&Path> {
        match container {
            RemoteContainer::Application(_) => {
                self.find_app(container.name()).map(|app| app.root.as_path())
            }
            RemoteContainer::Service(_) => None,
        }
    }

    /// The local shared staging directory for `container`. With more than
    /// one local application, each gets its own subdirectory.
    pub fn shared_dir(&self, container: &RemoteContainer) -> Option<PathBuf> {
        let root = self.project_root.as_ref()?;
        let mut dir = root.join(&self.shared_dir);
        if self.local_apps().len() > 1 && dir.is_dir() {
            dir = dir.join(container.name());
        }

        dir.exists().then_some(dir)
    }

    pub fn default_target(
        &self,
        container: &RemoteContainer,
        mounts: &MountTable,
        mount_path: &str,
    ) -> Option<PathBuf> {
        let target = self.default_local_path(container, mounts, mount_path);
        tracing::debug!("Default download target for {}: {:?}", mount_path, target);
        target
    }

    pub fn default_source(
        &self,
        container: &RemoteContainer,
        mounts: &MountTable,
        mount_path: &str,
    ) -> Option<PathBuf> {
        let source = self.default_local_path(container, mounts, mount_path);
        tracing::debug!("Default upload source for {}: {:?}", mount_path, source);
        source
    }

    fn default_local_path(
        &self,
        container: &RemoteContainer,
        mounts: &MountTable,
        mount_path: &str,
    ) -> Option<PathBuf> {
        if let Some(app_path) = self.local_app_path(container) {
            let candidate = app_path.join(mount_path);
            if candidate.is_dir() {
                return Some(candidate);
            }
        }

        let shared_mounts = mounts.shared_file_mounts();
        let shared_path = shared_mounts.get(mount_path)?;
        let candidate = self.shared_dir(container)?.join(shared_path);
        candidate.exists().then_some(candidate)
    }
}
