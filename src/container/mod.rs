//! Container reader contract.
//!
//! Decoding the proprietary `.mcraw` container is delegated to an injected
//! implementation of [`ContainerDecoder`]; the core only depends on frame
//! enumeration, per-frame raw-pixel loading and audio-chunk loading. A
//! [`DecoderFactory`] opens one decoder per source path and is what the
//! I/O pool uses to keep a decoder alive per worker thread.

mod metadata;

pub use metadata::{CameraConfiguration, FrameMetadata};

use std::path::Path;

use crate::entry::Timestamp;
use crate::error::VfsError;

/// One audio chunk: capture timestamp plus interleaved 16-bit samples.
pub type AudioChunk = (Timestamp, Vec<i16>);

/// One decoded frame: raw Bayer pixels plus the frame's metadata document.
pub struct RawFrame {
    /// Unpacked sensor values, row-major, one `u16` per photosite.
    pub pixels: Vec<u16>,
    /// Per-frame metadata as shipped in the container.
    pub metadata: serde_json::Value,
}

/// Read access to one opened container.
///
/// Implementations are used from a single thread at a time; the decoder
/// pool hands each worker thread its own instance.
pub trait ContainerDecoder: Send {
    /// Capture timestamps of every video frame, in container order.
    fn frame_timestamps(&mut self) -> Result<Vec<Timestamp>, VfsError>;

    /// Load the raw pixels and metadata of the frame captured at `timestamp`.
    fn load_frame(&mut self, timestamp: Timestamp) -> Result<RawFrame, VfsError>;

    /// The container-level metadata document (calibration, device profile).
    fn container_metadata(&mut self) -> Result<serde_json::Value, VfsError>;

    /// All audio chunks, in capture order. Empty when the recording has no
    /// audio track.
    fn load_audio(&mut self) -> Result<Vec<AudioChunk>, VfsError>;

    /// Number of interleaved audio channels.
    fn audio_channels(&self) -> u32;

    /// Audio sample rate in Hz.
    fn audio_sample_rate_hz(&self) -> u32;
}

/// Opens containers by path.
pub trait DecoderFactory: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn ContainerDecoder>, VfsError>;
}
