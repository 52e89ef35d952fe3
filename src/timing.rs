//! Frame-rate derivation and timing helpers.
//!
//! The container stores per-frame capture timestamps rather than a nominal
//! frame rate, so the rate is recovered from the spacing of the timestamps
//! and every frame is assigned an expected presentation index relative to
//! the first frame.

use crate::entry::Timestamp;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Derive the recording frame rate from sorted frame timestamps.
///
/// Uses a running mean over positive deltas only, which stays numerically
/// stable for long recordings. Returns 0.0 when fewer than two frames (or
/// no positive deltas) are available.
pub fn frame_rate_from_timestamps(timestamps: &[Timestamp]) -> f64 {
    if timestamps.len() < 2 {
        return 0.0;
    }

    let mut avg_delta = 0.0f64;
    let mut valid = 0u64;

    for pair in timestamps.windows(2) {
        let delta = (pair[1] - pair[0]) as f64;
        if delta > 0.0 {
            valid += 1;
            avg_delta += (delta - avg_delta) / valid as f64;
        }
    }

    if valid == 0 {
        return 0.0;
    }

    NANOS_PER_SECOND / avg_delta
}

/// Expected presentation index of `timestamp` relative to `reference`.
///
/// Returns `None` for a non-positive frame rate or a timestamp before the
/// reference.
pub fn presentation_index(timestamp: Timestamp, reference: Timestamp, fps: f64) -> Option<i64> {
    if fps <= 0.0 {
        return None;
    }

    let delta = timestamp - reference;
    if delta < 0 {
        return None;
    }

    let nanos_per_frame = NANOS_PER_SECOND / fps;
    Some((delta as f64 / nanos_per_frame).round() as i64)
}

/// Reduce a floating-point frame rate to an integer fraction.
///
/// The numerator starts at `round(rate * base)` over `base` and is reduced
/// to lowest terms, e.g. `to_fraction(29.97, 1000)` yields `(2997, 100)`.
/// Non-positive rates reduce to `(0, 1)`.
pub fn to_fraction(rate: f64, base: i64) -> (i64, i64) {
    if rate <= 0.0 || base <= 0 {
        return (0, 1);
    }

    let numerator = (rate * base as f64).round() as i64;
    let divisor = gcd(numerator, base);

    (numerator / divisor, base / divisor)
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate_regular_30fps() {
        let timestamps: Vec<Timestamp> = (0..100).map(|i| i * 33_333_333).collect();
        let fps = frame_rate_from_timestamps(&timestamps);

        assert!((fps - 30.0).abs() < 0.01, "fps was {fps}");
    }

    #[test]
    fn test_frame_rate_needs_two_frames() {
        assert_eq!(frame_rate_from_timestamps(&[]), 0.0);
        assert_eq!(frame_rate_from_timestamps(&[1_000_000]), 0.0);
    }

    #[test]
    fn test_frame_rate_ignores_non_positive_deltas() {
        // A duplicated timestamp contributes no delta.
        let timestamps = vec![0, 33_333_333, 33_333_333, 66_666_666];
        let fps = frame_rate_from_timestamps(&timestamps);

        assert!((fps - 30.0).abs() < 0.01, "fps was {fps}");
    }

    #[test]
    fn test_frame_rate_all_duplicates() {
        let timestamps = vec![5, 5, 5];
        assert_eq!(frame_rate_from_timestamps(&timestamps), 0.0);
    }

    #[test]
    fn test_presentation_index_regular() {
        let fps = 30.0;
        assert_eq!(presentation_index(0, 0, fps), Some(0));
        assert_eq!(presentation_index(33_333_333, 0, fps), Some(1));
        assert_eq!(presentation_index(333_333_330, 0, fps), Some(10));
    }

    #[test]
    fn test_presentation_index_gap() {
        // A frame two slots late lands on index 3 after 0, 1.
        assert_eq!(presentation_index(100_000_000, 0, 29.97), Some(3));
    }

    #[test]
    fn test_presentation_index_invalid() {
        assert_eq!(presentation_index(10, 0, 0.0), None);
        assert_eq!(presentation_index(10, 0, -1.0), None);
        assert_eq!(presentation_index(0, 10, 30.0), None);
    }

    #[test]
    fn test_to_fraction_ntsc() {
        assert_eq!(to_fraction(29.97, 1000), (2997, 100));
    }

    #[test]
    fn test_to_fraction_integer_rates() {
        assert_eq!(to_fraction(30.0, 1000), (30, 1));
        assert_eq!(to_fraction(24.0, 1000), (24, 1));
        assert_eq!(to_fraction(25.0, 1000), (25, 1));
    }

    #[test]
    fn test_to_fraction_reduced_to_lowest_terms() {
        let (num, den) = to_fraction(23.976, 1000);
        assert_eq!((num, den), (2997, 125));
        assert_eq!(gcd(num, den), 1);
    }

    #[test]
    fn test_to_fraction_invalid() {
        assert_eq!(to_fraction(0.0, 1000), (0, 1));
        assert_eq!(to_fraction(-5.0, 1000), (0, 1));
        assert_eq!(to_fraction(30.0, 0), (0, 1));
    }
}
