use crate::types::{Label, SUSPICIOUS_THRESHOLD};

/// Rescale `raw` into `[0, 1]` against `[score_min, score_max]`.
///
/// A degenerate range clips `raw` directly. The result is clipped again
/// and rounded to four decimals.
pub fn normalize(raw: f64, score_min: f64, score_max: f64) -> f64 {
    let span = score_max - score_min;
    let score = if span > 0.0 {
        (raw - score_min) / span
    } else {
        raw.clamp(0.0, 1.0)
    };
    round4(score.clamp(0.0, 1.0))
}

pub fn label(score: f64) -> Label {
    if score > SUSPICIOUS_THRESHOLD {
        Label::Suspicious
    } else {
        Label::Normal
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
