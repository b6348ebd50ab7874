//! Fixed-delay periodic license check on the tokio runtime.

use crate::manager::LicenseManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Spawns a task calling [`LicenseManager::check_license_status`] every
/// `interval`, starting one interval from now. Abort the handle to stop it.
///
/// Must be called from within a tokio runtime.
pub fn spawn_periodic_check(manager: Arc<LicenseManager>, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "license scheduled check configured");
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            manager.check_license_status();
        }
    })
}

/// Like [`spawn_periodic_check`], using the manager's configured interval.
pub fn spawn_configured_check(manager: Arc<LicenseManager>) -> JoinHandle<()> {
    let interval = manager.config().check_interval();
    spawn_periodic_check(manager, interval)
}
