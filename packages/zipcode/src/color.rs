//! Blue → green → orange display gradient over the grade range `[1, 3]`.

/// Gradient stops as RGB, evenly spaced.
const STOPS: [[u8; 3]; 3] = [
    [0, 0, 255],   // blue
    [0, 128, 0],   // green
    [255, 165, 0], // orange
];

const MIN_VALUE: f64 = 1.0;
const MAX_VALUE: f64 = 3.0;

/// Maps an average grade to a `#rrggbb` color.
///
/// Values are normalised over `[1, 3]` and clamped, so `1.0` is blue,
/// `2.0` is exactly the middle stop and `3.0` is orange. Non-finite input
/// maps to the first stop.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn gradient_color(value: f64) -> String {
    let t = if value.is_finite() {
        ((value - MIN_VALUE) / (MAX_VALUE - MIN_VALUE)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let segments = (STOPS.len() - 1) as f64;
    let scaled = t * segments;
    let segment = (scaled.floor() as usize).min(STOPS.len() - 2);
    let local = scaled - segment as f64;

    let from = STOPS[segment];
    let to = STOPS[segment + 1];
    let channel = |i: usize| -> u8 {
        let start = f64::from(from[i]);
        let end = f64::from(to[i]);
        (end - start).mul_add(local, start).round().clamp(0.0, 255.0) as u8
    };

    format!("#{:02x}{:02x}{:02x}", channel(0), channel(1), channel(2))
}
