//! Process presence probe

use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Check whether a process with the given name is running.
///
/// Uses `pgrep -x` for an exact name match. Timeouts, spawn failures, and
/// non-zero exits all resolve to `false`; the caller treats this as
/// "not running" and the next poll re-checks.
pub async fn is_process_running(name: &str) -> bool {
    let probe = Command::new("pgrep").arg("-x").arg(name).output();

    match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
        Ok(Ok(output)) => output.status.success(),
        Ok(Err(e)) => {
            debug!(name, error = %e, "pgrep failed");
            false
        }
        Err(_) => {
            debug!(name, "pgrep timed out");
            false
        }
    }
}
