//! File transfer between local directories and remote mounts
//!
//! A [`TransferUnit`] describes one sync of one mount. Units are planned by
//! [`planner`], run one at a time by a [`TransferExecutor`], and dropped.

pub mod executor;
pub mod planner;

pub use executor::{RsyncExecutor, TransferExecutor};

use std::fmt;
use std::path::PathBuf;

use clap::ArgMatches;

use crate::context::Verbosity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
        }
    }
}

/// One include or exclude pattern. The sync tool applies the first rule
/// that matches, so the order given on the command line is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRule {
    Include(String),
    Exclude(String),
}

impl FilterRule {
    pub fn to_arg(&self) -> String {
        match self {
            FilterRule::Include(pattern) => format!("--include={}", pattern),
            FilterRule::Exclude(pattern) => format!("--exclude={}", pattern),
        }
    }

    /// Merge `--include` and `--exclude` values back into command-line
    /// order. clap stores each option separately, so the interleaving is
    /// rebuilt from the argument indices.
    pub fn from_matches(matches: &ArgMatches) -> Vec<FilterRule> {
        let mut indexed: Vec<(usize, FilterRule)> = Vec::new();
        collect_rules(matches, "include", FilterRule::Include, &mut indexed);
        collect_rules(matches, "exclude", FilterRule::Exclude, &mut indexed);

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, rule)| rule).collect()
    }
}

fn collect_rules(
    matches: &ArgMatches,
    id: &str,
    make: fn(String) -> FilterRule,
    out: &mut Vec<(usize, FilterRule)>,
) {
    let values = matches.try_get_many::<String>(id).ok().flatten();
    let indices = matches.indices_of(id);
    if let (Some(values), Some(indices)) = (values, indices) {
        out.extend(indices.zip(values).map(|(index, value)| (index, make(value.clone()))));
    }
}

/// Options shared by every unit of one command run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferOptions {
    /// Remove destination files that do not exist at the source.
    pub delete: bool,
    pub filters: Vec<FilterRule>,
    pub verbosity: Verbosity,
    /// Convert decomposed (macOS) filenames to UTF-8 NFC on the wire.
    pub convert_mac_filenames: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferUnit {
    pub direction: Direction,
    pub local_path: PathBuf,
    /// Mount path relative to the application root.
    pub remote_path: String,
    pub options: TransferOptions,
}

impl TransferUnit {
    pub fn download(remote_path: &str, local_path: PathBuf, options: TransferOptions) -> Self {
        Self {
            direction: Direction::Download,
            local_path,
            remote_path: remote_path.to_string(),
            options,
        }
    }

    pub fn upload(local_path: PathBuf, remote_path: &str, options: TransferOptions) -> Self {
        Self {
            direction: Direction::Upload,
            local_path,
            remote_path: remote_path.to_string(),
            options,
        }
    }
}
