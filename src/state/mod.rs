//! Button state reconciliation
//!
//! Binds three unreliable signals — user toggles, external-process
//! polling, and the rendered display — into one consistent per-button
//! state.

mod reconciler;

pub use reconciler::{ButtonState, Reconciler};
