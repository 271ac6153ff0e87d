//! Adapter for SuperWhisper

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{AdapterError, SttAdapter};
use crate::system::{is_process_running, press_keyboard_shortcut};

const PROCESS_NAME: &str = "superwhisper";

pub struct SuperWhisperAdapter {
    recordings_dir: PathBuf,
}

impl SuperWhisperAdapter {
    pub fn new() -> Self {
        let home = std::env::var("HOME").unwrap_or_default();
        Self {
            recordings_dir: PathBuf::from(home)
                .join("Documents")
                .join("superwhisper")
                .join("recordings"),
        }
    }
}

impl Default for SuperWhisperAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SttAdapter for SuperWhisperAdapter {
    fn name(&self) -> &'static str {
        "SuperWhisper"
    }

    fn key(&self) -> &'static str {
        "superwhisper"
    }

    fn default_shortcut(&self) -> &'static str {
        "f4"
    }

    async fn activate(&self, shortcut: &str) -> Result<(), AdapterError> {
        press_keyboard_shortcut(shortcut).await?;
        Ok(())
    }

    async fn deactivate(&self, shortcut: &str) -> Result<(), AdapterError> {
        press_keyboard_shortcut(shortcut).await?;
        Ok(())
    }

    /// SuperWhisper writes each recording into a timestamp-named folder.
    /// While capture is in progress the folder holds `output.wav` but no
    /// `meta.json` yet; the metadata file lands when the recording is done.
    async fn is_recording(&self) -> Result<bool, AdapterError> {
        Ok(latest_recording_in_progress(&self.recordings_dir).await)
    }

    async fn is_available(&self) -> Result<bool, AdapterError> {
        Ok(is_process_running(PROCESS_NAME).await)
    }
}

async fn latest_recording_in_progress(dir: &Path) -> bool {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(?dir, error = %e, "recordings dir not readable");
            return false;
        }
    };

    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }

    let Some(latest) = latest_recording_name(&names) else {
        return false;
    };

    let latest_dir = dir.join(latest);
    let has_wav = file_exists(&latest_dir.join("output.wav")).await;
    let has_meta = file_exists(&latest_dir.join("meta.json")).await;

    has_wav && !has_meta
}

/// Pick the newest timestamp-named entry. Names are epoch milliseconds and
/// therefore equal length, so the lexicographic maximum is the newest.
fn latest_recording_name(names: &[String]) -> Option<&String> {
    names
        .iter()
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .max()
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_recording_name_picks_newest() {
        let names = vec![
            "1699999999999".to_string(),
            "1700000000123".to_string(),
            "1700000000001".to_string(),
        ];
        assert_eq!(
            latest_recording_name(&names).unwrap(),
            "1700000000123"
        );
    }

    #[test]
    fn test_non_numeric_entries_ignored() {
        let names = vec![".DS_Store".to_string(), "1700000000123".to_string()];
        assert_eq!(
            latest_recording_name(&names).unwrap(),
            "1700000000123"
        );
    }

    #[test]
    fn test_no_numeric_entries() {
        let names = vec!["notes".to_string()];
        assert!(latest_recording_name(&names).is_none());
    }
}
