use crate::context::InvocationContext;
use crate::error::{Result, ShipError};
use crate::local::LocalPathResolver;
use crate::prompt::{Interaction, Prompter};
use crate::remote::{ContainerResolver, ContainerSelection, ProjectContainerResolver, RemoteContainer};
use crate::transfer::planner::{
    confirm_plan, execute_plan, resolve_local_path, select_mounts, BatchReport, MountSelection,
    TransferPlan,
};
use crate::transfer::{Direction, RsyncExecutor, TransferExecutor, TransferOptions, TransferUnit};
use crate::utils::validate_directory;

use super::load_mounts;

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub source: Option<String>,
    pub mount: Option<String>,
    pub options: TransferOptions,
}

pub async fn execute(
    ctx: &InvocationContext,
    prompter: &dyn Prompter,
    selection: &ContainerSelection,
    request: UploadRequest,
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
    request: UploadRequest,
) -> Result<BatchReport> {
    let endpoint = container.ssh_endpoint(instance);
    let mounts = load_mounts(container, &endpoint)?;

    let mount_path = match select_mounts(
        interaction,
        &mounts,
        request.mount.as_deref(),
        false,
        Direction::Upload,
    )? {
        MountSelection::One(path) => path,
        MountSelection::All => {
            return Err(ShipError::Usage(
                "Uploading to all mounts at once is not supported.".to_string(),
            ))
        }
    };

    let default = local.default_source(container, &mounts, &mount_path);
    let source = resolve_local_path(interaction, ctx, request.source.as_deref(), default, "Source")?;
    validate_directory(&source, false)?;

    let mut plan = TransferPlan::new(Direction::Upload);
    plan.push(TransferUnit::upload(source, &mount_path, request.options));

    confirm_plan(interaction, ctx, &plan)?;
    Ok(execute_plan(ctx, plan, &endpoint, executor).await)
}
