use console::style;

use crate::context::InvocationContext;
use crate::error::Result;
use crate::local::LocalPathResolver;
use crate::mount::MountTable;
use crate::prompt::{Interaction, Prompter};
use crate::remote::{ContainerResolver, ContainerSelection, ProjectContainerResolver, RemoteContainer};
use crate::utils::truncate;

use super::load_mounts;

#[derive(Debug, Clone, Copy, Default)]
pub struct ListRequest {
    pub paths: bool,
    pub json: bool,
}

pub fn execute(
    ctx: &InvocationContext,
    prompter: &dyn Prompter,
    selection: &ContainerSelection,
    request: ListRequest,
) -> Result<()> {
    let interaction = Interaction::new(ctx, prompter);
    let local = LocalPathResolver::new(ctx);
    let container = ProjectContainerResolver::new(ctx, &local).resolve(&interaction, selection)?;

    let endpoint = container.ssh_endpoint(selection.instance.as_deref());
    let mounts = load_mounts(&container, &endpoint)?;

    if request.paths || request.json {
        println!("{}", render(&mounts, request)?);
    } else {
        print_table(&container, &mounts);
    }
    Ok(())
}

/// Machine-readable output: one path per line, or JSON.
fn render(mounts: &MountTable, request: ListRequest) -> Result<String> {
    if request.json {
        return Ok(serde_json::to_string_pretty(mounts)?);
    }
    Ok(mounts.paths().collect::<Vec<_>>().join("\n"))
}

fn print_table(container: &RemoteContainer, mounts: &MountTable) {
    println!();
    println!(
        "  {} {} {}",
        style("Mounts for").dim(),
        style(container.name()).cyan(),
        style(format!("({})", container.kind())).dim()
    );
    println!();
    println!(
        "  {} {} {}",
        style(format!("{:<32}", "PATH")).dim(),
        style(format!("{:<10}", "SOURCE")).dim(),
        style("SOURCE PATH").dim()
    );

    for (path, definition) in mounts.iter() {
        let source_path = match (&definition.source_path, &definition.service) {
            (Some(source_path), _) => source_path.clone(),
            (None, Some(service)) => format!("(service {})", service),
            (None, None) => "-".to_string(),
        };
        println!(
            "  {} {:<10} {}",
            style(format!("{:<32}", truncate(path, 32))).white(),
            definition.source.to_string(),
            style(source_path).dim()
        );
    }
    println!();
}
