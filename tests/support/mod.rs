//! Shared fixtures for integration tests: an in-memory container decoder
//! and a small TIFF reader for checking rendered DNGs.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use mcrawfs::cache::ContentCache;
use mcrawfs::container::{AudioChunk, ContainerDecoder, DecoderFactory, RawFrame};
use mcrawfs::error::VfsError;
use mcrawfs::pool::{DecoderPool, WorkerPool};
use mcrawfs::vfs::{McrawFileSystem, MountConfig};
use mcrawfs::Timestamp;

/// Recipe for an in-memory recording.
#[derive(Clone)]
pub struct TestClip {
    pub timestamps: Vec<Timestamp>,
    pub width: u32,
    pub height: u32,
    pub pixel_value: u16,
    pub black_level: f32,
    pub white_level: f32,
    pub sensor_arrangement: String,
    pub audio: Vec<AudioChunk>,
    pub audio_channels: u32,
    pub audio_sample_rate: u32,
    pub device_model: String,
}

impl Default for TestClip {
    fn default() -> Self {
        Self {
            timestamps: vec![0],
            width: 8,
            height: 8,
            pixel_value: 800,
            black_level: 64.0,
            white_level: 1023.0,
            sensor_arrangement: "rggb".to_string(),
            audio: Vec::new(),
            audio_channels: 1,
            audio_sample_rate: 48_000,
            device_model: "Test Device".to_string(),
        }
    }
}

pub struct TestClipDecoder {
    clip: TestClip,
}

impl ContainerDecoder for TestClipDecoder {
    fn frame_timestamps(&mut self) -> Result<Vec<Timestamp>, VfsError> {
        Ok(self.clip.timestamps.clone())
    }

    fn load_frame(&mut self, timestamp: Timestamp) -> Result<RawFrame, VfsError> {
        if !self.clip.timestamps.contains(&timestamp) {
            return Err(VfsError::NotFound(format!("frame {timestamp}")));
        }

        let count = (self.clip.width * self.clip.height) as usize;
        Ok(RawFrame {
            pixels: vec![self.clip.pixel_value; count],
            metadata: serde_json::json!({
                "width": self.clip.width,
                "height": self.clip.height,
                "originalWidth": self.clip.width,
                "originalHeight": self.clip.height,
                "iso": 200,
                "exposureTime": 10_000_000.0,
                "asShotNeutral": [0.6, 1.0, 0.7],
            }),
        })
    }

    fn container_metadata(&mut self) -> Result<serde_json::Value, VfsError> {
        let b = self.clip.black_level;
        Ok(serde_json::json!({
            "blackLevel": [b, b, b, b],
            "whiteLevel": self.clip.white_level,
            "sensorArrangement": self.clip.sensor_arrangement,
            "colorIlluminant1": "standarda",
            "colorIlluminant2": "d65",
            "deviceSpecificProfile": { "deviceModel": self.clip.device_model },
        }))
    }

    fn load_audio(&mut self) -> Result<Vec<AudioChunk>, VfsError> {
        Ok(self.clip.audio.clone())
    }

    fn audio_channels(&self) -> u32 {
        self.clip.audio_channels
    }

    fn audio_sample_rate_hz(&self) -> u32 {
        self.clip.audio_sample_rate
    }
}

pub struct TestClipFactory {
    pub clip: TestClip,
    pub opens: AtomicUsize,
}

impl TestClipFactory {
    pub fn new(clip: TestClip) -> Self {
        Self {
            clip,
            opens: AtomicUsize::new(0),
        }
    }
}

impl DecoderFactory for TestClipFactory {
    fn open(&self, _path: &Path) -> Result<Box<dyn ContainerDecoder>, VfsError> {
        self.opens.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(Box::new(TestClipDecoder {
            clip: self.clip.clone(),
        }))
    }
}

/// Build a core over `clip` with fresh pools and a roomy cache.
pub fn mount_clip(clip: TestClip, config: MountConfig) -> McrawFileSystem {
    let factory = Arc::new(TestClipFactory::new(clip));

    McrawFileSystem::new(
        Path::new("/clips/scene7.mcraw"),
        Arc::new(WorkerPool::new("io", 2).unwrap()),
        Arc::new(WorkerPool::new("proc", 2).unwrap()),
        Arc::new(ContentCache::new(64 * 1024 * 1024)),
        Arc::new(DecoderPool::new(factory)),
        config,
    )
    .unwrap()
}

/// Read a whole entry through the synchronous completion path.
pub fn read_all(fs: &McrawFileSystem, entry: &mcrawfs::Entry, len: usize) -> Vec<u8> {
    let (tx, rx) = std::sync::mpsc::channel();
    fs.read_file(
        entry,
        0,
        len,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
        false,
    )
    .unwrap();
    rx.recv().unwrap().unwrap()
}

// TIFF field types used by the reader.
const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;
const TYPE_SRATIONAL: u16 = 10;

/// A parsed single-IFD little-endian TIFF.
pub struct ParsedTiff {
    pub tags: HashMap<u16, (u16, u32, Vec<u8>)>,
    pub data: Vec<u8>,
}

impl ParsedTiff {
    pub fn parse(data: &[u8]) -> Self {
        assert_eq!(&data[0..4], &[0x49, 0x49, 0x2A, 0x00], "not a TIFF LE stream");
        let ifd = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
        let count = u16::from_le_bytes(data[ifd..ifd + 2].try_into().unwrap()) as usize;

        let mut tags = HashMap::new();
        for i in 0..count {
            let at = ifd + 2 + i * 12;
            let tag = u16::from_le_bytes(data[at..at + 2].try_into().unwrap());
            let field_type = u16::from_le_bytes(data[at + 2..at + 4].try_into().unwrap());
            let n = u32::from_le_bytes(data[at + 4..at + 8].try_into().unwrap());
            let type_size = match field_type {
                TYPE_BYTE | TYPE_ASCII => 1,
                TYPE_SHORT => 2,
                TYPE_LONG => 4,
                TYPE_RATIONAL | TYPE_SRATIONAL => 8,
                other => panic!("unexpected TIFF field type {other}"),
            };
            let len = type_size * n as usize;
            let value = if len <= 4 {
                data[at + 8..at + 8 + len].to_vec()
            } else {
                let off = u32::from_le_bytes(data[at + 8..at + 12].try_into().unwrap()) as usize;
                data[off..off + len].to_vec()
            };
            tags.insert(tag, (field_type, n, value));
        }

        ParsedTiff {
            tags,
            data: data.to_vec(),
        }
    }

    pub fn long(&self, tag: u16) -> u32 {
        let (_, _, bytes) = &self.tags[&tag];
        u32::from_le_bytes(bytes[0..4].try_into().unwrap())
    }

    pub fn short(&self, tag: u16) -> u16 {
        let (_, _, bytes) = &self.tags[&tag];
        u16::from_le_bytes(bytes[0..2].try_into().unwrap())
    }

    pub fn shorts(&self, tag: u16) -> Vec<u16> {
        let (_, _, bytes) = &self.tags[&tag];
        bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    pub fn ascii(&self, tag: u16) -> String {
        let (_, _, bytes) = &self.tags[&tag];
        String::from_utf8_lossy(&bytes[..bytes.len().saturating_sub(1)]).into_owned()
    }

    /// The pixel strip declared by StripOffsets/StripByteCounts.
    pub fn strip(&self) -> &[u8] {
        let offset = self.long(273) as usize;
        let count = self.long(279) as usize;
        &self.data[offset..offset + count]
    }

    /// Decode the strip as MSB-first packed samples of the given width.
    pub fn unpack_samples(&self, bits: u32, count: usize) -> Vec<u16> {
        let strip = self.strip();
        if bits == 16 {
            return strip
                .chunks_exact(2)
                .take(count)
                .map(|c| u16::from_le_bytes(c.try_into().unwrap()))
                .collect();
        }

        let mut out = Vec::with_capacity(count);
        let mut acc: u32 = 0;
        let mut acc_bits = 0u32;
        for &byte in strip {
            acc = (acc << 8) | byte as u32;
            acc_bits += 8;
            while acc_bits >= bits && out.len() < count {
                acc_bits -= bits;
                out.push(((acc >> acc_bits) & ((1 << bits) - 1)) as u16);
            }
        }
        out
    }
}
