use std::path::Path;

use crate::context::InvocationContext;
use crate::error::{Result, ShipError};
use crate::local::LocalPathResolver;
use crate::mount::MountTable;
use crate::prompt::{Interaction, Prompter};
use crate::remote::{ContainerResolver, ContainerSelection, ProjectContainerResolver, RemoteContainer};
use crate::transfer::planner::{
    confirm_plan, execute_plan, resolve_local_path, select_mounts, BatchReport, MountSelection,
    TransferPlan,
};
use crate::transfer::{Direction, RsyncExecutor, TransferExecutor, TransferOptions, TransferUnit};
use crate::utils::{format_path_for_display, validate_directory};

use super::load_mounts;

#[derive(Debug, Clone, Default)]
pub struct DownloadRequest {
    pub all: bool,
    pub mount: Option<String>,
    pub target: Option<String>,
    /// With `all` and `target`: name subdirectories after source paths.
    pub source_path: bool,
    pub options: TransferOptions,
}

pub async fn execute(
    ctx: &InvocationContext,
    prompter: &dyn Prompter,
    selection: &ContainerSelection,
    request: DownloadRequest,
) -> Result<()> {
    let interaction = Interaction::new(ctx, prompter);
    let local = LocalPathResolver::new(ctx);
    let container = ProjectContainerResolver::new(ctx, &local).resolve(&interaction, selection)?;
    let executor = RsyncExecutor::new(&ctx.config)?;

    run(
        ctx,
        &interaction,
        &container,
        &local,
        &executor,
        selection.instance.as_deref(),
        request,
    )
    .await?
    .into_result()
}

pub async fn run(
    ctx: &InvocationContext,
    interaction: &Interaction<'_>,
    container: &RemoteContainer,
    local: &LocalPathResolver,
    executor: &dyn TransferExecutor,
    instance: Option<&str>,
    request: DownloadRequest,
) -> Result<BatchReport> {
    let endpoint = container.ssh_endpoint(instance);
    let mounts = load_mounts(container, &endpoint)?;

    let selection = select_mounts(
        interaction,
        &mounts,
        request.mount.as_deref(),
        request.all,
        Direction::Download,
    )?;

    let plan = match selection {
        MountSelection::One(mount_path) => {
            plan_one(ctx, interaction, container, local, &mounts, &mount_path, &request)?
        }
        MountSelection::All => plan_all(ctx, interaction, container, local, &mounts, &request)?,
    };

    confirm_plan(interaction, ctx, &plan)?;
    Ok(execute_plan(ctx, plan, &endpoint, executor).await)
}

fn plan_one(
    ctx: &InvocationContext,
    interaction: &Interaction<'_>,
    container: &RemoteContainer,
    local: &LocalPathResolver,
    mounts: &MountTable,
    mount_path: &str,
    request: &DownloadRequest,
) -> Result<TransferPlan> {
    let default = local.default_target(container, mounts, mount_path);
    let target = resolve_local_path(interaction, ctx, request.target.as_deref(), default, "Target")?;
    check_target(ctx, interaction, &target)?;

    let mut plan = TransferPlan::new(Direction::Download);
    plan.push(TransferUnit::download(
        mount_path,
        target,
        request.options.clone(),
    ));
    Ok(plan)
}

/// One unit per mount, in declaration order. With `--target`, each mount
/// gets a subdirectory of it; otherwise each mount's own default is used
/// and mounts without one are skipped. If no mount has a default, an
/// interactive run asks for a base directory instead.
fn plan_all(
    ctx: &InvocationContext,
    interaction: &Interaction<'_>,
    container: &RemoteContainer,
    local: &LocalPathResolver,
    mounts: &MountTable,
    request: &DownloadRequest,
) -> Result<TransferPlan> {
    if let Some(target) = request.target.as_deref().filter(|t| !t.trim().is_empty()) {
        let base = ctx.resolve_user_path(target);
        check_target(ctx, interaction, &base)?;
        return Ok(plan_under(&base, mounts, request));
    }

    let mut plan = TransferPlan::new(Direction::Download);
    for mount_path in mounts.paths() {
        match local.default_target(container, mounts, mount_path) {
            Some(target) => plan.push(TransferUnit::download(
                mount_path,
                target,
                request.options.clone(),
            )),
            None => plan.warn(format!(
                "No local directory found for mount {}, skipping it",
                mount_path
            )),
        }
    }

    if !plan.is_empty() {
        return Ok(plan);
    }

    if ctx.interactive {
        let base = resolve_local_path(interaction, ctx, None, Some(ctx.cwd.clone()), "Target")?;
        check_target(ctx, interaction, &base)?;
        return Ok(plan_under(&base, mounts, request));
    }

    Err(ShipError::Usage(
        "No local target could be determined for any mount. Use --target to specify one."
            .to_string(),
    ))
}

/// Every mount into a subdirectory of `base`, named after the mount path
/// or, with `--source-path`, after its source path.
fn plan_under(base: &Path, mounts: &MountTable, request: &DownloadRequest) -> TransferPlan {
    let mut plan = TransferPlan::new(Direction::Download);

    for (mount_path, definition) in mounts.iter() {
        let subdir = match (&definition.source_path, request.source_path) {
            (Some(source_path), true) => source_path.as_str(),
            (None, true) => {
                plan.warn(format!("No source path defined for mount {}", mount_path));
                mount_path
            }
            (_, false) => mount_path,
        };
        plan.push(TransferUnit::download(
            mount_path,
            base.join(subdir),
            request.options.clone(),
        ));
    }

    plan
}

/// A missing target is created on confirmation. An existing one must be a
/// writable directory.
fn check_target(ctx: &InvocationContext, interaction: &Interaction<'_>, target: &Path) -> Result<()> {
    if target.exists() {
        return validate_directory(target, true);
    }

    let question = format!(
        "Directory not found: {}. Do you want to create it?",
        format_path_for_display(target, &ctx.cwd)
    );
    if interaction.confirm(&question)? {
        Ok(())
    } else {
        Err(ShipError::Aborted)
    }
}
