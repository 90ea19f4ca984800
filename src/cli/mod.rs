pub mod commands;

use std::io::IsTerminal;

use clap::{ArgMatches, Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::context::{InvocationContext, Verbosity};
use crate::error::{Result, ShipError};
use crate::prompt::DialoguerPrompter;
use crate::remote::ContainerSelection;
use crate::transfer::{FilterRule, TransferOptions};

use commands::mount::{DownloadRequest, ListRequest, UploadRequest};

#[derive(Parser)]
#[command(name = "shipctl")]
#[command(version)]
#[command(about = "Move files between your machine and deployed application mounts")]
#[command(long_about = "Download from and upload to the writable mounts of a deployed application or service.\n\nTransfers run over SSH with rsync.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Answer "yes" to every confirmation (implies --no-interaction)
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Never ask questions; use defaults or fail
    #[arg(long, global = true)]
    pub no_interaction: bool,

    #[command(flatten)]
    pub container: ContainerArgs,
}

/// Which remote container to talk to.
#[derive(Args, Debug, Clone, Default)]
pub struct ContainerArgs {
    /// Project ID
    #[arg(short, long, global = true, env = "SHIPCTL_PROJECT")]
    pub project: Option<String>,

    /// Environment name
    #[arg(short, long, global = true)]
    pub environment: Option<String>,

    /// Application name
    #[arg(short = 'A', long, global = true)]
    pub app: Option<String>,

    /// Service name (instead of an application)
    #[arg(long, global = true)]
    pub service: Option<String>,

    /// Instance ID, for containers with more than one instance
    #[arg(short = 'I', long, global = true)]
    pub instance: Option<String>,
}

impl ContainerArgs {
    pub fn selection(&self) -> Result<ContainerSelection> {
        if self.app.is_some() && self.service.is_some() {
            return Err(ShipError::Usage(
                "You cannot combine the --app option with --service.".to_string(),
            ));
        }

        Ok(ContainerSelection {
            project: self.project.clone(),
            environment: self.environment.clone(),
            app: self.app.clone(),
            service: self.service.clone(),
            instance: self.instance.clone(),
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download files from a mount, using rsync
    #[command(name = "mount:download")]
    MountDownload {
        /// Download from all mounts
        #[arg(short, long)]
        all: bool,

        /// The mount (as an app-relative path)
        #[arg(short, long)]
        mount: Option<String>,

        /// The directory to which files will be downloaded. With --all, the mount path is appended
        #[arg(long)]
        target: Option<String>,

        /// Use the mount's source path (rather than the mount path) as a subdirectory of the target, with --all
        #[arg(long)]
        source_path: bool,

        /// Delete extraneous files in the target directory
        #[arg(long)]
        delete: bool,

        /// File(s) to exclude from the download (pattern)
        #[arg(long)]
        exclude: Vec<String>,

        /// File(s) to include in the download (pattern)
        #[arg(long)]
        include: Vec<String>,
    },

    /// Upload files to a mount, using rsync
    #[command(name = "mount:upload")]
    MountUpload {
        /// A directory containing files to upload
        #[arg(long)]
        source: Option<String>,

        /// The mount (as an app-relative path)
        #[arg(short, long)]
        mount: Option<String>,

        /// Delete extraneous files in the mount
        #[arg(long)]
        delete: bool,

        /// File(s) to exclude from the upload (pattern)
        #[arg(long)]
        exclude: Vec<String>,

        /// File(s) to include in the upload (pattern)
        #[arg(long)]
        include: Vec<String>,
    },

    /// List the mounts of an application or service
    #[command(name = "mount:list", visible_alias = "mounts")]
    MountList {
        /// Only print the mount paths, one per line
        #[arg(long)]
        paths: bool,

        /// Print the mounts as JSON
        #[arg(long, conflicts_with = "paths")]
        json: bool,
    },
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// Interactive only when not disabled by flags and a person is at
    /// the terminal.
    pub fn interactive(&self) -> bool {
        !(self.yes || self.no_interaction)
            && console::user_attended_stderr()
            && std::io::stdin().is_terminal()
    }

    /// `matches` must be the matches this `Cli` was built from; filter
    /// ordering is read from them.
    pub async fn execute(self, matches: &ArgMatches) -> Result<()> {
        let config = AppConfig::load()?;
        config.validate()?;

        let cwd = std::env::current_dir()?;
        let verbosity = self.verbosity();
        let ctx = InvocationContext::new(config, self.interactive(), verbosity, cwd);
        let selection = self.container.selection()?;
        let prompter = DialoguerPrompter;

        match self.command {
            Commands::MountDownload {
                all,
                mount,
                target,
                source_path,
                delete,
                ..
            } => {
                let request = DownloadRequest {
                    all,
                    mount,
                    target,
                    source_path,
                    options: transfer_options(matches, "mount:download", delete, verbosity),
                };
                commands::mount::download::execute(&ctx, &prompter, &selection, request).await
            }
            Commands::MountUpload {
                source,
                mount,
                delete,
                ..
            } => {
                let request = UploadRequest {
                    source,
                    mount,
                    options: transfer_options(matches, "mount:upload", delete, verbosity),
                };
                commands::mount::upload::execute(&ctx, &prompter, &selection, request).await
            }
            Commands::MountList { paths, json } => {
                let request = ListRequest { paths, json };
                commands::mount::list::execute(&ctx, &prompter, &selection, request)
            }
        }
    }
}

fn transfer_options(
    matches: &ArgMatches,
    subcommand: &str,
    delete: bool,
    verbosity: Verbosity,
) -> TransferOptions {
    TransferOptions {
        delete,
        filters: matches
            .subcommand_matches(subcommand)
            .map(FilterRule::from_matches)
            .unwrap_or_default(),
        verbosity,
        convert_mac_filenames: false,
    }
}
