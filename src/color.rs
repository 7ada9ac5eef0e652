//! Output color correction for the physical strip.
//!
//! WS2812 LEDs are perceptually too bright in the low range and too strong
//! in green and blue relative to red. Each channel gets a gamma-2 response
//! curve, and green/blue are scaled by fixed bias constants measured for
//! the strip.

/// Green channel bias (0x88 / 255).
const GREEN_BIAS: f64 = 0x88 as f64 / 255.0;
/// Blue channel bias (0x66 / 255).
const BLUE_BIAS: f64 = 0x66 as f64 / 255.0;

/// Map one linear 0..255 RGB triple to the corrected 0..255 triple sent to
/// the hardware. Pure and bit-exact: the same input always yields the same
/// output.
pub fn fix_color(r: f64, g: f64, b: f64) -> [u8; 3] {
    [
        correct_channel(r, 1.0),
        correct_channel(g, GREEN_BIAS),
        correct_channel(b, BLUE_BIAS),
    ]
}

fn correct_channel(value: f64, bias: f64) -> u8 {
    let corrected = (value / 255.0).powi(2) * 255.0 * bias;
    corrected.clamp(0.0, 255.0) as u8
}
