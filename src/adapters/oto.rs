//! Adapter for the oto recorder

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{AdapterError, SttAdapter};
use crate::system::{is_process_running, press_keyboard_shortcut};

const PROCESS_NAME: &str = "oto";
const LSOF_PATH: &str = "/usr/sbin/lsof";
const LSOF_TIMEOUT: Duration = Duration::from_secs(3);

pub struct OtoAdapter;

impl OtoAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OtoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SttAdapter for OtoAdapter {
    fn name(&self) -> &'static str {
        "oto"
    }

    fn key(&self) -> &'static str {
        "oto"
    }

    fn default_shortcut(&self) -> &'static str {
        "alt+f4"
    }

    async fn activate(&self, shortcut: &str) -> Result<(), AdapterError> {
        press_keyboard_shortcut(shortcut).await?;
        Ok(())
    }

    async fn deactivate(&self, shortcut: &str) -> Result<(), AdapterError> {
        press_keyboard_shortcut(shortcut).await?;
        Ok(())
    }

    /// oto holds a temp .wav open while capturing and deletes it when the
    /// recording completes, so an open .wav handle means recording.
    async fn is_recording(&self) -> Result<bool, AdapterError> {
        Ok(has_open_wav_handle().await)
    }

    async fn is_available(&self) -> Result<bool, AdapterError> {
        Ok(is_process_running(PROCESS_NAME).await)
    }
}

async fn has_open_wav_handle() -> bool {
    let scan = Command::new(LSOF_PATH).arg("-c").arg(PROCESS_NAME).output();

    match tokio::time::timeout(LSOF_TIMEOUT, scan).await {
        Ok(Ok(output)) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let found = stdout.contains(".wav");
            debug!(bytes = stdout.len(), found, "lsof scan");
            found
        }
        Ok(Ok(output)) => {
            // lsof exits non-zero when the process has no open files
            debug!(code = ?output.status.code(), "lsof exited non-zero");
            false
        }
        Ok(Err(e)) => {
            debug!(error = %e, "lsof failed");
            false
        }
        Err(_) => {
            debug!("lsof timed out");
            false
        }
    }
}
