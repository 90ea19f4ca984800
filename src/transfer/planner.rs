//! Transfer planning
//!
//! Turns user input into an ordered list of [`TransferUnit`]s and runs
//! them: mount selection, local path resolution, confirmation, then one
//! unit at a time in mount declaration order. A failing unit does not stop
//! the batch; the [`BatchReport`] decides the final status.

use std::path::PathBuf;

use console::style;

use crate::context::InvocationContext;
use crate::error::{Result, ShipError};
use crate::mount::{MountSource, MountTable};
use crate::prompt::{Interaction, MenuChoice};
use crate::utils::{format_path_for_display, mkdir};

use super::executor::host_normalizes_filenames;
use super::{Direction, TransferExecutor, TransferUnit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSelection {
    One(String),
    All,
}

/// Menu labels: the path for local mounts, `path: source` otherwise.
pub fn mount_menu_labels(mounts: &MountTable) -> Vec<String> {
    mounts
        .iter()
        .map(|(path, def)| match def.source {
            MountSource::Local => path.to_string(),
            _ => format!("{}: {}", path, def.describe()),
        })
        .collect()
}

/// Work out which mount(s) to transfer.
///
/// `--mount` is matched against the table. Without it, `--all` selects
/// every mount (downloads only). Otherwise an interactive menu is shown;
/// the download menu carries an extra "All mounts" entry.
pub fn select_mounts(
    interaction: &Interaction<'_>,
    mounts: &MountTable,
    requested: Option<&str>,
    all: bool,
    direction: Direction,
) -> Result<MountSelection> {
    if let Some(requested) = requested {
        if all {
            return Err(ShipError::Usage(
                "You cannot combine the --mount option with --all.".to_string(),
            ));
        }
        let path = mounts.match_path(requested)?;
        tracing::debug!("Matched mount '{}' to {}", requested, path);
        return Ok(MountSelection::One(path.to_string()));
    }

    if all {
        return Ok(MountSelection::All);
    }

    let paths: Vec<&str> = mounts.paths().collect();
    let labels = mount_menu_labels(mounts);
    let choice = match direction {
        Direction::Download => interaction.choose_one_or_all(
            "Choose a mount to download from",
            &labels,
            "All mounts",
            "--mount",
        )?,
        Direction::Upload => MenuChoice::One(interaction.choose(
            "Choose a mount to upload to",
            &labels,
            "--mount",
        )?),
    };

    match choice {
        MenuChoice::All => Ok(MountSelection::All),
        MenuChoice::One(index) => paths
            .get(index)
            .map(|path| MountSelection::One(path.to_string()))
            .ok_or_else(|| ShipError::Usage(format!("Invalid menu choice: {}", index))),
    }
}

/// Resolve a local directory. An explicit value wins; otherwise the user
/// is asked with `default` pre-filled. Non-interactive runs take the
/// default, and fail if there is none.
pub fn resolve_local_path(
    interaction: &Interaction<'_>,
    ctx: &InvocationContext,
    explicit: Option<&str>,
    default: Option<PathBuf>,
    label: &str,
) -> Result<PathBuf> {
    if let Some(explicit) = explicit.filter(|e| !e.trim().is_empty()) {
        return Ok(ctx.resolve_user_path(explicit));
    }

    let default = default.map(|path| format_path_for_display(&path, &ctx.cwd));
    let answer = interaction.ask(&format!("{} directory", label), default.as_deref())?;

    match answer {
        Some(answer) => Ok(ctx.resolve_user_path(&answer)),
        None => Err(ShipError::Usage(format!(
            "The {} directory must be specified.",
            label.to_lowercase()
        ))),
    }
}

/// Units to run, plus warnings collected while planning them.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub direction: Direction,
    pub units: Vec<TransferUnit>,
    pub warnings: Vec<String>,
}

impl TransferPlan {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            units: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push(&mut self, unit: TransferUnit) {
        self.units.push(unit);
    }

    /// Record a non-fatal problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The question asked before anything is transferred.
    pub fn confirm_text(&self, ctx: &InvocationContext) -> String {
        let display = |unit: &TransferUnit| format_path_for_display(&unit.local_path, &ctx.cwd);

        let summary = match (self.direction, self.units.as_slice()) {
            (Direction::Download, [unit]) => format!(
                "Downloading files from the remote mount {} to {}",
                style(&unit.remote_path).yellow(),
                style(display(unit)).yellow()
            ),
            (Direction::Upload, [unit]) => format!(
                "Uploading files from {} to the remote mount {}",
                style(display(unit)).yellow(),
                style(&unit.remote_path).yellow()
            ),
            (direction, units) => {
                let verb = match direction {
                    Direction::Download => "Downloading files from",
                    Direction::Upload => "Uploading files to",
                };
                let mut text = format!("{} {} remote mounts:", verb, units.len());
                for unit in units {
                    text.push_str(&format!(
                        "\n    {} {} {}",
                        style(&unit.remote_path).yellow(),
                        style("→").dim(),
                        style(display(unit)).yellow()
                    ));
                }
                text
            }
        };

        format!("{}\n\nAre you sure you want to continue?", summary)
    }
}

/// Ask before running `plan`. Declining aborts the command.
pub fn confirm_plan(
    interaction: &Interaction<'_>,
    ctx: &InvocationContext,
    plan: &TransferPlan,
) -> Result<()> {
    if interaction.confirm(&plan.confirm_text(ctx))? {
        Ok(())
    } else {
        Err(ShipError::Aborted)
    }
}

#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: TransferUnit,
    pub error: Option<ShipError>,
}

impl UnitOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-unit results of one run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<UnitOutcome>,
    pub warnings: Vec<String>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }

    /// Fold the report into the command result. A single failed unit is
    /// returned as-is so its exit status stays visible.
    pub fn into_result(mut self) -> Result<()> {
        let total = self.outcomes.len();
        match self.failed() {
            0 => Ok(()),
            1 if total == 1 => match self.outcomes.pop().and_then(|o| o.error) {
                Some(error) => Err(error),
                None => Ok(()),
            },
            failed => Err(ShipError::BatchFailed { failed, total }),
        }
    }
}

/// Turn on filename conversion when the host needs it and the tool
/// supports it. Warns otherwise.
pub async fn prepare_filename_conversion(
    plan: &mut TransferPlan,
    executor: &dyn TransferExecutor,
    host_normalizes: bool,
) {
    if !host_normalizes || plan.is_empty() {
        return;
    }

    if executor.supports_filename_conversion().await {
        tracing::debug!("Converting filenames with special characters (utf-8-mac to utf-8)");
        for unit in &mut plan.units {
            unit.options.convert_mac_filenames = true;
        }
    } else {
        plan.warn(
            "The installed version of rsync does not support converting filenames with \
             special characters (the --iconv flag). You may need to upgrade rsync.",
        );
    }
}

/// Run every unit of `plan` in order against `endpoint`.
///
/// Failures are recorded and the next unit is attempted.
pub async fn execute_plan(
    ctx: &InvocationContext,
    mut plan: TransferPlan,
    endpoint: &str,
    executor: &dyn TransferExecutor,
) -> BatchReport {
    tracing::debug!(
        "Running {} plan with {} unit(s) against {}",
        plan.direction,
        plan.units.len(),
        endpoint
    );
    prepare_filename_conversion(&mut plan, executor, host_normalizes_filenames()).await;

    let mut report = BatchReport {
        outcomes: Vec::with_capacity(plan.units.len()),
        warnings: plan.warnings,
    };

    for unit in plan.units {
        let local = format_path_for_display(&unit.local_path, &ctx.cwd);
        eprintln!();
        match unit.direction {
            Direction::Download => eprintln!(
                "  {} Downloading files from {} to {}",
                style("◐").cyan(),
                style(&unit.remote_path).white().bold(),
                style(&local).white()
            ),
            Direction::Upload => eprintln!(
                "  {} Uploading files from {} to {}",
                style("◐").cyan(),
                style(&local).white(),
                style(&unit.remote_path).white().bold()
            ),
        }

        let result = match unit.direction {
            Direction::Download => mkdir(&unit.local_path),
            Direction::Upload => Ok(()),
        };
        let result = match result {
            Ok(()) => executor.execute(endpoint, &unit).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => eprintln!("  {} {}", style("✓").green().bold(), unit.remote_path),
            Err(e) => eprintln!("  {} {}: {}", style("✕").red().bold(), unit.remote_path, e),
        }

        report.outcomes.push(UnitOutcome {
            unit,
            error: result.err(),
        });
    }

    for warning in &report.warnings {
        eprintln!("  {} {}", style("⚠").yellow().bold(), warning);
    }

    report
}
