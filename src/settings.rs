//! Per-button settings schema and defaults
//!
//! Settings arrive from the host surface as JSON with camelCase keys.
//! Missing fields fall back to the fixed default table; a new settings
//! value fully replaces the old one.

use serde::{Deserialize, Serialize};

/// Application targeted when the host supplies no selection
pub const DEFAULT_APPLICATION: &str = "superwhisper";

/// Configuration for a single button instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonSettings {
    /// Key of the target speech-to-text application
    pub stt_application: String,
    /// Legacy composite shortcut string, e.g. "ctrl+alt+o"
    pub toggle_shortcut: String,
    /// Final key of the structured shortcut; empty means unset
    pub shortcut_key: String,
    pub shortcut_ctrl: bool,
    pub shortcut_alt: bool,
    pub shortcut_cmd: bool,
    pub shortcut_shift: bool,
    /// Reconciliation poll period in milliseconds (clamped by the reconciler)
    pub polling_interval: u64,
    pub recording_color: String,
    pub idle_color: String,
    pub show_rec_label: bool,
}

impl Default for ButtonSettings {
    fn default() -> Self {
        Self {
            stt_application: DEFAULT_APPLICATION.to_string(),
            toggle_shortcut: String::new(),
            shortcut_key: String::new(),
            shortcut_ctrl: false,
            shortcut_alt: false,
            shortcut_cmd: false,
            shortcut_shift: false,
            polling_interval: 1000,
            recording_color: "#FF3333".to_string(),
            idle_color: "#333333".to_string(),
            show_rec_label: true,
        }
    }
}

impl ButtonSettings {
    /// Build a shortcut string from the structured fields, if a key is set.
    ///
    /// Tokens are lowercase, modifiers (ctrl, alt, shift, cmd) precede the
    /// final key, joined by `+`.
    pub fn shortcut_from_fields(&self) -> Option<String> {
        let key = self.shortcut_key.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if self.shortcut_ctrl {
            parts.push("ctrl");
        }
        if self.shortcut_alt {
            parts.push("alt");
        }
        if self.shortcut_shift {
            parts.push("shift");
        }
        if self.shortcut_cmd {
            parts.push("cmd");
        }
        parts.push(&key);

        Some(parts.join("+"))
    }

    /// Resolve the shortcut to dispatch: structured fields first, then the
    /// legacy composite string, then the adapter's default.
    pub fn effective_shortcut(&self, adapter_default: &str) -> String {
        if let Some(shortcut) = self.shortcut_from_fields() {
            return shortcut;
        }
        if !self.toggle_shortcut.is_empty() {
            return self.toggle_shortcut.clone();
        }
        adapter_default.to_string()
    }
}
