//! Thin wrappers around external OS mechanisms
//!
//! Process probing and keystroke injection. Both are best-effort: every
//! call carries its own timeout and probes resolve to a conservative
//! negative rather than hanging the caller.

mod keystroke;
mod process;

pub use keystroke::{press_keyboard_shortcut, run_apple_script, KeystrokeError};
pub use process::is_process_running;
