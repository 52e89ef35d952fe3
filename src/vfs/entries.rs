//! Mount-time entry construction.
//!
//! Frame entries are named by expected presentation index, not container
//! order: each physical frame lands on the slot its timestamp rounds to,
//! and any slots skipped since the previous frame are filled by
//! duplicating the current frame into the gap. The projected sequence is
//! therefore contiguous even when the recorder dropped frames.

use crate::entry::{Entry, Timestamp};
use crate::timing::presentation_index;

/// Zero-padding width of the frame index in projected file names.
const FRAME_INDEX_WIDTH: usize = 7;

/// `<base>-<zero-padded index>.dng`
pub(crate) fn frame_file_name(base_name: &str, index: i64) -> String {
    format!("{base_name}-{index:0width$}.dng", width = FRAME_INDEX_WIDTH)
}

pub(crate) struct FrameEntries {
    pub entries: Vec<Entry>,
    pub dropped_frames: u32,
}

/// Build the frame entry list for sorted `timestamps` at rate `fps`.
///
/// Every entry is declared at `dng_size` bytes regardless of what the
/// frame will actually encode to. When the rate is unknown (too few
/// frames), frames fall back to consecutive indices.
pub(crate) fn build_frame_entries(
    timestamps: &[Timestamp],
    fps: f64,
    base_name: &str,
    dng_size: u64,
) -> FrameEntries {
    let mut entries = Vec::with_capacity(timestamps.len() * 2);
    let mut dropped_frames = 0u32;
    let mut last_pts: i64 = -1;

    let reference = timestamps.first().copied().unwrap_or(0);

    for &timestamp in timestamps {
        let pts = presentation_index(timestamp, reference, fps).unwrap_or(last_pts + 1);

        dropped_frames += (pts - last_pts - 1).max(0) as u32;

        while last_pts < pts {
            last_pts += 1;
            entries.push(
                Entry::file(frame_file_name(base_name, last_pts), dng_size)
                    .with_user_data(timestamp),
            );
        }
    }

    FrameEntries {
        entries,
        dropped_frames,
    }
}
