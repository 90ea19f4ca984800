//! Remote containers
//!
//! A remote container is an application or service instance reachable over
//! SSH. Both kinds expose the same surface: a name, a config document
//! holding the raw `mounts` mapping, and an SSH endpoint.

use std::path::Path;

use serde_yaml::Value;

use crate::context::InvocationContext;
use crate::error::{Result, ShipError};
use crate::local::{local_project_id, LocalPathResolver};
use crate::mount::{mounts_from_config, MountTable};
use crate::prompt::Interaction;

/// Identity and config of one remote container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub config: Value,
    /// `user@host` for the SSH transport.
    pub ssh_url: String,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, config: Value, ssh_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config,
            ssh_url: ssh_url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteContainer {
    Application(ContainerSpec),
    Service(ContainerSpec),
}

impl RemoteContainer {
    fn spec(&self) -> &ContainerSpec {
        match self {
            RemoteContainer::Application(spec) | RemoteContainer::Service(spec) => spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec().name
    }

    pub fn config(&self) -> &Value {
        &self.spec().config
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RemoteContainer::Application(_) => "app",
            RemoteContainer::Service(_) => "service",
        }
    }

    /// SSH endpoint, optionally pinned to one instance of the container.
    pub fn ssh_endpoint(&self, instance: Option<&str>) -> String {
        match instance {
            Some(instance) => format!("{}.{}", instance, self.spec().ssh_url),
            None => self.spec().ssh_url.clone(),
        }
    }

    /// Normalized mounts declared in the container config.
    pub fn mounts(&self) -> Result<MountTable> {
        match mounts_from_config(self.config()) {
            Some(raw) => MountTable::normalize(raw),
            None => Ok(MountTable::default()),
        }
    }
}

/// Which container the user asked for.
#[derive(Debug, Clone, Default)]
pub struct ContainerSelection {
    pub project: Option<String>,
    pub environment: Option<String>,
    pub app: Option<String>,
    pub service: Option<String>,
    pub instance: Option<String>,
}

pub trait ContainerResolver {
    fn resolve(
        &self,
        interaction: &Interaction<'_>,
        selection: &ContainerSelection,
    ) -> Result<RemoteContainer>;
}

/// Resolves containers from the configuration checked into the local
/// project: application config files and the services file.
pub struct ProjectContainerResolver<'a> {
    ctx: &'a InvocationContext,
    local: &'a LocalPathResolver,
}

impl<'a> ProjectContainerResolver<'a> {
    pub fn new(ctx: &'a InvocationContext, local: &'a LocalPathResolver) -> Self {
        Self { ctx, local }
    }

    fn project_root(&self) -> Result<&Path> {
        self.local.project_root().ok_or_else(|| {
            ShipError::NotFound(format!(
                "No project found: no '{}' directory in {} or its parents",
                self.ctx.config.local.config_dir,
                self.ctx.cwd.display()
            ))
        })
    }

    fn ssh_url(&self, selection: &ContainerSelection, name: &str) -> Result<String> {
        let project = match selection.project.clone().or_else(|| self.ctx.config.project.clone())
        {
            Some(project) => project,
            None => local_project_id(self.project_root()?, &self.ctx.config)?.ok_or_else(|| {
                ShipError::Usage(
                    "No project specified. Use --project or set SHIPCTL_PROJECT.".to_string(),
                )
            })?,
        };
        let environment = selection
            .environment
            .as_deref()
            .unwrap_or(&self.ctx.config.default_environment);

        Ok(format!(
            "{}-{}--{}@{}",
            project, environment, name, self.ctx.config.ssh_host
        ))
    }

    fn resolve_application(
        &self,
        interaction: &Interaction<'_>,
        selection: &ContainerSelection,
    ) -> Result<RemoteContainer> {
        self.project_root()?;
        let apps = self.local.local_apps();

        let app = match selection.app.as_deref() {
            Some(name) => self.local.find_app(name).ok_or_else(|| {
                ShipError::NotFound(format!("Application not found: {}", name))
            })?,
            None => match apps {
                [] => {
                    return Err(ShipError::NotFound(
                        "No applications found in the project".to_string(),
                    ))
                }
                [only] => only,
                _ => {
                    let names: Vec<String> = apps.iter().map(|a| a.name.clone()).collect();
                    let index = interaction.choose("Choose an application", &names, "--app")?;
                    &apps[index]
                }
            },
        };

        tracing::debug!("Selected application {} at {}", app.name, app.root.display());
        let ssh_url = self.ssh_url(selection, &app.name)?;
        Ok(RemoteContainer::Application(ContainerSpec::new(
            app.name.clone(),
            app.config.clone(),
            ssh_url,
        )))
    }

    fn resolve_service(&self, selection: &ContainerSelection, name: &str) -> Result<RemoteContainer> {
        let path = self
            .ctx
            .config
            .project_config_file(self.project_root()?, &self.ctx.config.local.services_file);
        if !path.exists() {
            return Err(ShipError::NotFound(format!(
                "Service not found: {} (no {})",
                name,
                path.display()
            )));
        }

        let content = std::fs::read_to_string(&path)?;
        let services: Value = serde_yaml::from_str(&content)
            .map_err(|e| ShipError::Config(format!("Invalid {}: {}", path.display(), e)))?;
        let config = services
            .get(name)
            .cloned()
            .ok_or_else(|| ShipError::NotFound(format!("Service not found: {}", name)))?;

        let ssh_url = self.ssh_url(selection, name)?;
        Ok(RemoteContainer::Service(ContainerSpec::new(name, config, ssh_url)))
    }
}

impl ContainerResolver for ProjectContainerResolver<'_> {
    fn resolve(
        &self,
        interaction: &Interaction<'_>,
        selection: &ContainerSelection,
    ) -> Result<RemoteContainer> {
        match selection.service.as_deref() {
            Some(service) => self.resolve_service(selection, service),
            None => self.resolve_application(interaction, selection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::context::Verbosity;
    use crate::local::testing::{init_project, write_app};
    use crate::prompt::testing::ScriptedPrompter;

    fn ctx(root: &Path, interactive: bool) -> InvocationContext {
        InvocationContext {
            interactive,
            verbosity: Verbosity::Normal,
            config: AppConfig {
                project: Some("proj".to_string()),
                ..Default::default()
            },
            cwd: root.to_path_buf(),
            project_root: Some(root.to_path_buf()),
        }
    }

    #[test]
    fn test_ssh_endpoint_with_instance() {
        let container = RemoteContainer::Application(ContainerSpec::new(
            "app",
            Value::Null,
            "proj-main--app@ssh.shiphost.io",
        ));
        assert_eq!(container.ssh_endpoint(None), "proj-main--app@ssh.shiphost.io");
        assert_eq!(
            container.ssh_endpoint(Some("1")),
            "1.proj-main--app@ssh.shiphost.io"
        );
    }

    #[test]
    fn test_mounts_from_container_config() {
        let config: Value =
            serde_yaml::from_str("{name: app, mounts: {/web/uploads/: {source: local}}}").unwrap();
        let container = RemoteContainer::Application(ContainerSpec::new("app", config, "x"));
        let mounts = container.mounts().unwrap();
        assert_eq!(mounts.paths().collect::<Vec<_>>(), vec!["web/uploads"]);

        let bare = RemoteContainer::Service(ContainerSpec::new("db", Value::Null, "x"));
        assert!(bare.mounts().unwrap().is_empty());
        assert_eq!(bare.kind(), "service");
    }

    #[test]
    fn test_resolve_single_application() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        init_project(root);
        write_app(root, "app", "app", "{web/uploads: {}}");

        let ctx = ctx(root, false);
        let local = LocalPathResolver::new(&ctx);
        let prompter = ScriptedPrompter::default();
        let interaction = Interaction::new(&ctx, &prompter);

        let container = ProjectContainerResolver::new(&ctx, &local)
            .resolve(&interaction, &ContainerSelection::default())
            .unwrap();
        assert_eq!(container.name(), "app");
        assert_eq!(container.ssh_endpoint(None), "proj-main--app@ssh.shiphost.io");
        assert!(!container.mounts().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_multiple_applications_requires_choice() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        init_project(root);
        write_app(root, "api", "api", "{}");
        write_app(root, "web", "web", "{}");

        let batch = ctx(root, false);
        let local = LocalPathResolver::new(&batch);
        let prompter = ScriptedPrompter::default();
        let err = ProjectContainerResolver::new(&batch, &local)
            .resolve(&Interaction::new(&batch, &prompter), &ContainerSelection::default())
            .unwrap_err();
        assert!(err.to_string().contains("--app"));

        let tty = ctx(root, true);
        let local = LocalPathResolver::new(&tty);
        let prompter = ScriptedPrompter::default().select_answers(&[1]);
        let container = ProjectContainerResolver::new(&tty, &local)
            .resolve(&Interaction::new(&tty, &prompter), &ContainerSelection::default())
            .unwrap();
        assert_eq!(container.name(), "web");
    }

    #[test]
    fn test_resolve_named_application_and_environment() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        init_project(root);
        write_app(root, "api", "api", "{}");
        write_app(root, "web", "web", "{}");

        let ctx = ctx(root, false);
        let local = LocalPathResolver::new(&ctx);
        let prompter = ScriptedPrompter::default();
        let selection = ContainerSelection {
            app: Some("api".to_string()),
            environment: Some("staging".to_string()),
            ..Default::default()
        };
        let container = ProjectContainerResolver::new(&ctx, &local)
            .resolve(&Interaction::new(&ctx, &prompter), &selection)
            .unwrap();
        assert_eq!(
            container.ssh_endpoint(None),
            "proj-staging--api@ssh.shiphost.io"
        );

        let selection = ContainerSelection {
            app: Some("missing".to_string()),
            ..Default::default()
        };
        let err = ProjectContainerResolver::new(&ctx, &local)
            .resolve(&Interaction::new(&ctx, &prompter), &selection)
            .unwrap_err();
        assert!(matches!(err, ShipError::NotFound(_)));
    }

    #[test]
    fn test_resolve_project_id_from_local_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        init_project(root);
        write_app(root, "app", "app", "{}");
        std::fs::create_dir_all(root.join(".platform/local")).unwrap();
        std::fs::write(root.join(".platform/local/project.yaml"), "id: local42\n").unwrap();

        let mut ctx = ctx(root, false);
        ctx.config.project = None;
        let local = LocalPathResolver::new(&ctx);
        let prompter = ScriptedPrompter::default();
        let container = ProjectContainerResolver::new(&ctx, &local)
            .resolve(&Interaction::new(&ctx, &prompter), &ContainerSelection::default())
            .unwrap();
        assert!(container.ssh_endpoint(None).starts_with("local42-main--app@"));
    }

    #[test]
    fn test_resolve_without_project_id_is_usage_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        init_project(root);
        write_app(root, "app", "app", "{}");

        let mut ctx = ctx(root, false);
        ctx.config.project = None;
        let local = LocalPathResolver::new(&ctx);
        let prompter = ScriptedPrompter::default();
        let err = ProjectContainerResolver::new(&ctx, &local)
            .resolve(&Interaction::new(&ctx, &prompter), &ContainerSelection::default())
            .unwrap_err();
        assert!(matches!(err, ShipError::Usage(_)));
    }

    #[test]
    fn test_resolve_service() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        init_project(root);
        std::fs::write(
            root.join(".platform/services.yaml"),
            "files:\n  type: network-storage:2.0\n  mounts:\n    data: {source: service, service: files}\n",
        )
        .unwrap();

        let ctx = ctx(root, false);
        let local = LocalPathResolver::new(&ctx);
        let prompter = ScriptedPrompter::default();
        let selection = ContainerSelection {
            service: Some("files".to_string()),
            ..Default::default()
        };
        let container = ProjectContainerResolver::new(&ctx, &local)
            .resolve(&Interaction::new(&ctx, &prompter), &selection)
            .unwrap();
        assert!(matches!(container, RemoteContainer::Service(_)));
        assert_eq!(container.mounts().unwrap().len(), 1);

        let selection = ContainerSelection {
            service: Some("cache".to_string()),
            ..Default::default()
        };
        assert!(ProjectContainerResolver::new(&ctx, &local)
            .resolve(&Interaction::new(&ctx, &prompter), &selection)
            .is_err());
    }
}
