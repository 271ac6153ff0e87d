//! Button icon rendering
//!
//! Pure functions from a button state plus style settings to a 144x144
//! SVG icon, delivered as a base64 data URI. Deterministic for identical
//! inputs, which is what lets the reconciler de-duplicate image pushes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::settings::ButtonSettings;
use crate::state::ButtonState;

const ERROR_BG_COLOR: &str = "#CC8800";
const LABEL_COLOR: &str = "#FFFFFF";

/// Render the icon for a state as an SVG data URI.
pub fn render_state_image(state: ButtonState, settings: &ButtonSettings) -> String {
    let svg = render_button_svg(state, settings);
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

/// Build the SVG markup for a state.
fn render_button_svg(state: ButtonState, settings: &ButtonSettings) -> String {
    let (bg_color, mic_color, mic_opacity, label) = match state {
        ButtonState::Recording => {
            let label = if settings.show_rec_label { "REC" } else { "" };
            (settings.recording_color.as_str(), "#FFFFFF", 1.0, label)
        }
        ButtonState::Unavailable => (settings.idle_color.as_str(), "#888888", 0.5, ""),
        ButtonState::Error => (ERROR_BG_COLOR, "#FFFFFF", 1.0, "ERR"),
        ButtonState::Idle => (settings.idle_color.as_str(), "#AAAAAA", 1.0, ""),
    };

    let label_svg = if label.is_empty() {
        String::new()
    } else {
        format!(
            "<text x=\"72\" y=\"30\" text-anchor=\"middle\" font-family=\"Arial, Helvetica, sans-serif\" font-size=\"18\" font-weight=\"bold\" fill=\"{LABEL_COLOR}\">{label}</text>"
        )
    };

    // Mic capsule (filled), cradle arc, and stand, shifted up to leave
    // ~24px at the bottom for the surface's native title
    let mic_svg = format!(
        "<g opacity=\"{mic_opacity}\" transform=\"translate(72, 68)\" stroke-linecap=\"round\" stroke-linejoin=\"round\">\
<ellipse cx=\"0\" cy=\"-10\" rx=\"18\" ry=\"28\" fill=\"{mic_color}\" stroke=\"none\"/>\
<path d=\"M -28 0 C -28 18, -15 32, 0 32 C 15 32, 28 18, 28 0\" fill=\"none\" stroke=\"{mic_color}\" stroke-width=\"4.5\"/>\
<line x1=\"0\" y1=\"32\" x2=\"0\" y2=\"42\" stroke=\"{mic_color}\" stroke-width=\"4.5\"/>\
<line x1=\"-12\" y1=\"42\" x2=\"12\" y2=\"42\" stroke=\"{mic_color}\" stroke-width=\"4.5\"/>\
</g>"
    );

    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"144\" height=\"144\" viewBox=\"0 0 144 144\">\
<rect width=\"144\" height=\"144\" rx=\"16\" fill=\"{bg_color}\"/>\
{mic_svg}{label_svg}</svg>"
    )
}
