//! Audio/video timeline alignment.
//!
//! The audio track and the video frames share the container's capture
//! clock but rarely start at the same instant. Before the audio blob is
//! written, the chunk list is aligned to the first video timestamp by
//! trimming leading samples or prepending silence.

use tracing::warn;

use crate::container::AudioChunk;
use crate::entry::Timestamp;

/// Largest tolerated start-offset between audio and video.
const MAX_DRIFT_MS: f64 = 1000.0;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Align `chunks` so the audio timeline starts at `video_t0`.
///
/// A drift above one second is assumed to be a broken recording and left
/// alone (logged); otherwise leading samples are removed when the audio
/// starts late, or a silence chunk is prepended when it starts early.
pub fn align_to_video(
    chunks: &mut Vec<AudioChunk>,
    video_t0: Timestamp,
    sample_rate: u32,
    channels: u32,
) {
    if chunks.is_empty() || sample_rate == 0 || channels == 0 {
        return;
    }

    let drift_ns = chunks[0].0 - video_t0;
    let drift_ms = drift_ns as f64 * 1e-6;

    if drift_ms.abs() > MAX_DRIFT_MS {
        warn!(drift_ms, "audio drift too large, not syncing audio");
        return;
    }

    if drift_ns > 0 {
        trim_head(chunks, drift_ns, sample_rate, channels);
    } else if drift_ns < 0 {
        prepend_silence(chunks, video_t0, -drift_ns, sample_rate, channels);
    }
}

fn trim_head(chunks: &mut Vec<AudioChunk>, drift_ns: i64, sample_rate: u32, channels: u32) {
    let frames_to_remove =
        (drift_ns as f64 * sample_rate as f64 / NANOS_PER_SECOND).round() as usize;
    let mut samples_to_remove = frames_to_remove * channels as usize;

    while samples_to_remove > 0 && !chunks.is_empty() {
        if chunks[0].1.len() <= samples_to_remove {
            samples_to_remove -= chunks[0].1.len();
            chunks.remove(0);
        } else {
            let (ref mut timestamp, ref mut samples) = chunks[0];
            samples.drain(0..samples_to_remove);

            let frames_removed = samples_to_remove / channels as usize;
            *timestamp +=
                (frames_removed as f64 * NANOS_PER_SECOND / sample_rate as f64).round() as i64;
            samples_to_remove = 0;
        }
    }
}

fn prepend_silence(
    chunks: &mut Vec<AudioChunk>,
    video_t0: Timestamp,
    gap_ns: i64,
    sample_rate: u32,
    channels: u32,
) {
    let silence_frames = (gap_ns as f64 * sample_rate as f64 / NANOS_PER_SECOND).round() as usize;
    let silence_samples = silence_frames * channels as usize;

    for (timestamp, _) in chunks.iter_mut() {
        *timestamp += gap_ns;
    }

    chunks.insert(0, (video_t0, vec![0i16; silence_samples]));
}
