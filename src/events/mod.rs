//! Host-surface event types
//!
//! Lifecycle events delivered by the control surface and the display
//! updates sent back to it. Everything here is plain data; the reconciler
//! interprets it.

use serde::{Deserialize, Serialize};

use crate::settings::ButtonSettings;

/// Events consumed from the host surface, one per button lifecycle hook
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceEvent {
    /// Button became visible; initialize display and start polling
    WillAppear {
        id: String,
        #[serde(default)]
        settings: ButtonSettings,
    },

    /// Button left the screen; drop all cached state for it
    WillDisappear { id: String },

    /// Primary press (key pad)
    KeyDown {
        id: String,
        #[serde(default)]
        settings: ButtonSettings,
    },

    /// Secondary press (dial)
    DialDown {
        id: String,
        #[serde(default)]
        settings: ButtonSettings,
    },

    /// Settings were changed in the host's configuration UI
    DidReceiveSettings {
        id: String,
        #[serde(default)]
        settings: ButtonSettings,
    },
}

impl SurfaceEvent {
    /// The button instance this event targets
    pub fn id(&self) -> &str {
        match self {
            SurfaceEvent::WillAppear { id, .. }
            | SurfaceEvent::WillDisappear { id }
            | SurfaceEvent::KeyDown { id, .. }
            | SurfaceEvent::DialDown { id, .. }
            | SurfaceEvent::DidReceiveSettings { id, .. } => id,
        }
    }
}

impl std::fmt::Display for SurfaceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SurfaceEvent::WillAppear { .. } => "WILL_APPEAR",
            SurfaceEvent::WillDisappear { .. } => "WILL_DISAPPEAR",
            SurfaceEvent::KeyDown { .. } => "KEY_DOWN",
            SurfaceEvent::DialDown { .. } => "DIAL_DOWN",
            SurfaceEvent::DidReceiveSettings { .. } => "DID_RECEIVE_SETTINGS",
        };
        write!(f, "{} ({})", name, self.id())
    }
}

/// A rendered icon ready to be pushed to the host surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayUpdate {
    /// Button instance the image belongs to
    pub id: String,
    /// SVG data URI
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SurfaceEvent::WillDisappear {
            id: "btn1".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("will_disappear"));
        assert!(json.contains("btn1"));
    }

    #[test]
    fn test_event_deserialization_defaults_settings() {
        let json = r#"{"type":"key_down","id":"btn1","settings":{"sttApplication":"oto"}}"#;
        let event: SurfaceEvent = serde_json::from_str(json).unwrap();
        match event {
            SurfaceEvent::KeyDown { id, settings } => {
                assert_eq!(id, "btn1");
                assert_eq!(settings.stt_application, "oto");
                assert_eq!(settings.polling_interval, 1000);
            }
            other => panic!("unexpected event: {other}"),
        }
    }

    #[test]
    fn test_event_deserialization_without_settings() {
        let json = r#"{"type":"will_appear","id":"btn2"}"#;
        let event: SurfaceEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, SurfaceEvent::WillAppear { .. }));
        assert_eq!(event.id(), "btn2");
    }
}
