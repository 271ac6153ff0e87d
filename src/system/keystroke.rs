//! Keyboard shortcut injection via AppleScript
//!
//! Translates a `+`-joined shortcut string into a System Events
//! `key code` or `keystroke` expression and runs it through `osascript`.
//! Function keys and other non-printing keys need `key code`; printable
//! single characters go through `keystroke`.

use std::time::Duration;

use tokio::process::Command;

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from shortcut dispatch
#[derive(Debug, thiserror::Error)]
pub enum KeystrokeError {
    #[error("unknown key \"{key}\" in shortcut \"{shortcut}\"")]
    UnknownKey { key: String, shortcut: String },

    #[error("osascript failed: {stderr}")]
    Script { stderr: String },

    #[error("osascript timed out")]
    Timeout,

    #[error("failed to launch osascript: {0}")]
    Spawn(#[from] std::io::Error),
}

fn modifier_token(part: &str) -> Option<&'static str> {
    match part {
        "cmd" | "command" => Some("command down"),
        "ctrl" | "control" => Some("control down"),
        "alt" | "option" => Some("option down"),
        "shift" => Some("shift down"),
        _ => None,
    }
}

/// macOS virtual key codes for keys `keystroke` cannot type
fn key_code(key: &str) -> Option<u16> {
    let code = match key {
        "f1" => 122,
        "f2" => 120,
        "f3" => 99,
        "f4" => 118,
        "f5" => 96,
        "f6" => 97,
        "f7" => 98,
        "f8" => 100,
        "f9" => 101,
        "f10" => 109,
        "f11" => 103,
        "f12" => 111,
        "f13" => 105,
        "f14" => 107,
        "f15" => 113,
        "f16" => 106,
        "f17" => 64,
        "f18" => 79,
        "f19" => 80,
        "f20" => 90,
        "space" => 49,
        "escape" => 53,
        "return" => 36,
        "tab" => 48,
        "delete" => 51,
        _ => return None,
    };
    Some(code)
}

/// Build the System Events expression for a shortcut string.
///
/// The last `+`-separated token is the key; everything before it that maps
/// to a modifier is collected into the `using {...}` clause. Unrecognized
/// modifier tokens are ignored, an unrecognized key is an error.
pub fn build_keystroke_script(shortcut: &str) -> Result<String, KeystrokeError> {
    let mut parts: Vec<String> = shortcut
        .to_lowercase()
        .split('+')
        .map(|s| s.trim().to_string())
        .collect();

    let key = parts.pop().unwrap_or_default();
    let modifiers: Vec<&str> = parts.iter().filter_map(|p| modifier_token(p)).collect();

    let using = if modifiers.is_empty() {
        String::new()
    } else {
        format!(" using {{{}}}", modifiers.join(", "))
    };

    if let Some(code) = key_code(&key) {
        Ok(format!(
            "tell application \"System Events\" to key code {code}{using}"
        ))
    } else if key.chars().count() == 1 {
        Ok(format!(
            "tell application \"System Events\" to keystroke \"{key}\"{using}"
        ))
    } else {
        Err(KeystrokeError::UnknownKey {
            key,
            shortcut: shortcut.to_string(),
        })
    }
}

/// Run an AppleScript expression, returning trimmed stdout.
pub async fn run_apple_script(script: &str) -> Result<String, KeystrokeError> {
    let run = Command::new("osascript").arg("-e").arg(script).output();

    let output = tokio::time::timeout(SCRIPT_TIMEOUT, run)
        .await
        .map_err(|_| KeystrokeError::Timeout)??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(KeystrokeError::Script { stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Press a keyboard shortcut like `ctrl+alt+o` or `f4`.
pub async fn press_keyboard_shortcut(shortcut: &str) -> Result<(), KeystrokeError> {
    let script = build_keystroke_script(shortcut)?;
    run_apple_script(&script).await?;
    Ok(())
}
