//! Transfer executor
//!
//! Runs a planned transfer with the external `rsync` binary over SSH. The
//! trait is the seam the commands depend on, so tests can swap in a double.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex_lite::Regex;
use semver::Version;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::config::AppConfig;
use crate::context::Verbosity;
use crate::error::{Result, ShipError};

use super::{Direction, TransferOptions, TransferUnit};

/// First rsync release with `--iconv`.
const ICONV_MIN_VERSION: Version = Version::new(3, 0, 0);

/// Executes one transfer unit, blocking the caller until it is done.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Whether the installed tool can convert filename encodings.
    async fn supports_filename_conversion(&self) -> bool;

    /// Copy the contents of `remote_path` on `endpoint` into `local_dir`.
    async fn sync_down(
        &self,
        endpoint: &str,
        remote_path: &str,
        local_dir: &Path,
        options: &TransferOptions,
    ) -> Result<()>;

    /// Copy the contents of `local_dir` into `remote_path` on `endpoint`.
    async fn sync_up(
        &self,
        endpoint: &str,
        local_dir: &Path,
        remote_path: &str,
        options: &TransferOptions,
    ) -> Result<()>;

    async fn execute(&self, endpoint: &str, unit: &TransferUnit) -> Result<()> {
        match unit.direction {
            Direction::Download => {
                self.sync_down(endpoint, &unit.remote_path, &unit.local_path, &unit.options)
                    .await
            }
            Direction::Upload => {
                self.sync_up(endpoint, &unit.local_path, &unit.remote_path, &unit.options)
                    .await
            }
        }
    }
}

/// Whether the local filesystem stores filenames in decomposed form.
pub fn host_normalizes_filenames() -> bool {
    cfg!(target_os = "macos")
}

/// Extract the version from `rsync --version` output.
pub fn parse_rsync_version(output: &str) -> Option<Version> {
    let re = Regex::new(r"version\s+v?(\d+)\.(\d+)\.(\d+)").ok()?;
    let caps = re.captures(output)?;
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Build the rsync argument list for one transfer, excluding the remote
/// shell which is passed through `RSYNC_RSH`.
pub fn rsync_args(source: &str, destination: &str, options: &TransferOptions) -> Vec<String> {
    let mut args = vec![
        "--archive".to_string(),
        "--compress".to_string(),
        "--human-readable".to_string(),
    ];

    match options.verbosity {
        Verbosity::Quiet => args.push("--quiet".to_string()),
        Verbosity::Normal => args.push("-v".to_string()),
        Verbosity::Verbose => args.push("-vv".to_string()),
    }

    if options.convert_mac_filenames {
        args.push("--iconv=utf-8-mac,utf-8".to_string());
    }

    if options.delete {
        args.push("--delete".to_string());
    }

    args.extend(options.filters.iter().map(|rule| rule.to_arg()));

    args.push(source.to_string());
    args.push(destination.to_string());
    args
}

/// Source and destination operands. A trailing `/` on the source makes
/// rsync copy the directory's contents rather than the directory itself.
fn download_operands(endpoint: &str, remote_path: &str, local_dir: &Path) -> (String, String) {
    (
        format!("{}:{}/", endpoint, remote_path),
        local_dir.display().to_string(),
    )
}

fn upload_operands(endpoint: &str, local_dir: &Path, remote_path: &str) -> (String, String) {
    let local = local_dir.display().to_string();
    let source = if local.ends_with('/') {
        local
    } else {
        format!("{}/", local)
    };
    (source, format!("{}:{}", endpoint, remote_path))
}

/// [`TransferExecutor`] backed by the rsync binary.
pub struct RsyncExecutor {
    binary: PathBuf,
    ssh_command: String,
    version: OnceCell<Option<Version>>,
}

impl RsyncExecutor {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let binary = which::which(&config.rsync_binary).map_err(|_| {
            ShipError::Tool(format!(
                "'{}' not found in PATH. Install rsync to transfer files.",
                config.rsync_binary
            ))
        })?;

        let ssh_command = match config.resolved_ssh_key() {
            Some(key) => format!("ssh -i \"{}\" -o IdentitiesOnly=yes", key.display()),
            None => "ssh".to_string(),
        };

        tracing::debug!("Using {} with remote shell: {}", binary.display(), ssh_command);
        Ok(Self {
            binary,
            ssh_command,
            version: OnceCell::new(),
        })
    }

    async fn version(&self) -> Option<&Version> {
        self.version
            .get_or_init(|| async {
                let output = Command::new(&self.binary).arg("--version").output().await;
                match output {
                    Ok(output) => parse_rsync_version(&String::from_utf8_lossy(&output.stdout)),
                    Err(e) => {
                        tracing::debug!("Failed to query rsync version: {}", e);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    async fn run(&self, mount: &str, args: Vec<String>) -> Result<()> {
        tracing::debug!("Running {} {}", self.binary.display(), args.join(" "));

        let status = Command::new(&self.binary)
            .args(&args)
            .env("RSYNC_RSH", &self.ssh_command)
            .status()
            .await
            .map_err(|e| ShipError::Tool(format!("Failed to execute rsync: {}", e)))?;

        if !status.success() {
            return Err(ShipError::Transfer {
                mount: mount.to_string(),
                code: status.code(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl TransferExecutor for RsyncExecutor {
    async fn supports_filename_conversion(&self) -> bool {
        match self.version().await {
            Some(version) => *version >= ICONV_MIN_VERSION,
            None => {
                tracing::debug!("Unknown rsync version, assuming --iconv is supported");
                true
            }
        }
    }

    async fn sync_down(
        &self,
        endpoint: &str,
        remote_path: &str,
        local_dir: &Path,
        options: &TransferOptions,
    ) -> Result<()> {
        let (source, destination) = download_operands(endpoint, remote_path, local_dir);
        self.run(remote_path, rsync_args(&source, &destination, options))
            .await
    }

    async fn sync_up(
        &self,
        endpoint: &str,
        local_dir: &Path,
        remote_path: &str,
        options: &TransferOptions,
    ) -> Result<()> {
        let (source, destination) = upload_operands(endpoint, local_dir, remote_path);
        self.run(remote_path, rsync_args(&source, &destination, options))
            .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedCall {
        pub endpoint: String,
        pub unit: TransferUnit,
    }

    /// Records every transfer instead of running one. Mounts listed in
    /// `failing` fail with exit status 23.
    #[derive(Default)]
    pub struct RecordingExecutor {
        pub calls: Mutex<Vec<RecordedCall>>,
        failing: Vec<String>,
        no_iconv: bool,
    }

    impl RecordingExecutor {
        pub fn failing(mounts: &[&str]) -> Self {
            Self {
                failing: mounts.iter().map(|m| m.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn without_iconv(mut self) -> Self {
            self.no_iconv = true;
            self
        }

        pub fn remote_paths(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|call| call.unit.remote_path.clone())
                .collect()
        }

        pub fn units(&self) -> Vec<TransferUnit> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|call| call.unit.clone())
                .collect()
        }

        fn record(&self, endpoint: &str, unit: TransferUnit) -> Result<()> {
            let mount = unit.remote_path.clone();
            self.calls.lock().unwrap().push(RecordedCall {
                endpoint: endpoint.to_string(),
                unit,
            });
            if self.failing.contains(&mount) {
                return Err(ShipError::Transfer {
                    mount,
                    code: Some(23),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TransferExecutor for RecordingExecutor {
        async fn supports_filename_conversion(&self) -> bool {
            !self.no_iconv
        }

        async fn sync_down(
            &self,
            endpoint: &str,
            remote_path: &str,
            local_dir: &Path,
            options: &TransferOptions,
        ) -> Result<()> {
            self.record(
                endpoint,
                TransferUnit::download(remote_path, local_dir.to_path_buf(), options.clone()),
            )
        }

        async fn sync_up(
            &self,
            endpoint: &str,
            local_dir: &Path,
            remote_path: &str,
            options: &TransferOptions,
        ) -> Result<()> {
            self.record(
                endpoint,
                TransferUnit::upload(local_dir.to_path_buf(), remote_path, options.clone()),
            )
        }
    }
}
