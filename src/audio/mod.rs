//! Audio blob synthesis.
//!
//! At mount time the container's audio chunks are concatenated into a
//! single in-memory wave file aligned to the first video frame; reads of
//! the projected `audio.wav` are served straight from this blob.

mod bw64;
mod sync;

pub use bw64::Bw64Writer;
pub use sync::align_to_video;

use tracing::debug;

use crate::container::AudioChunk;
use crate::entry::Timestamp;
use crate::error::VfsError;
use crate::timing::to_fraction;

/// Build the complete wave blob for a recording.
///
/// Returns an empty vector when the recording has no audio chunks.
pub fn synthesize_audio(
    mut chunks: Vec<AudioChunk>,
    video_t0: Timestamp,
    channels: u32,
    sample_rate: u32,
    fps: f64,
) -> Result<Vec<u8>, VfsError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let (fps_num, fps_den) = to_fraction(fps, 1000);
    let mut writer = Bw64Writer::new(channels, sample_rate, fps_num, fps_den)?;

    align_to_video(&mut chunks, video_t0, sample_rate, channels);

    for (_, samples) in &chunks {
        writer.write(samples);
    }

    debug!(
        frames = writer.frames_written(),
        channels, sample_rate, "synthesized audio blob"
    );

    Ok(writer.finish())
}
