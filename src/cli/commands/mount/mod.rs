//! Mount commands
//!
//! `mount:download`, `mount:upload` and `mount:list`. Each command
//! resolves the remote container, loads its mounts, and hands off to the
//! transfer planner.

pub mod download;
pub mod list;
pub mod upload;

pub use download::DownloadRequest;
pub use list::ListRequest;
pub use upload::UploadRequest;

use crate::error::{Result, ShipError};
use crate::mount::MountTable;
use crate::remote::RemoteContainer;

/// Normalized mounts of `container`. Having none is an error.
fn load_mounts(container: &RemoteContainer, endpoint: &str) -> Result<MountTable> {
    let mounts = container.mounts()?;
    if mounts.is_empty() {
        return Err(ShipError::NotFound(format!(
            "No mounts found on host: {}",
            endpoint
        )));
    }

    tracing::debug!(
        "Found {} mount(s) on {} {}",
        mounts.len(),
        container.kind(),
        container.name()
    );
    Ok(mounts)
}
