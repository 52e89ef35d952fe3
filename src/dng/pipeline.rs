//! The on-demand DNG render pipeline.
//!
//! One frame's raw Bayer pixels go through linearization, optional
//! vignette correction, 2×2-preserving spatial decimation and bit packing,
//! then get wrapped in a TIFF/DNG stream carrying the container's
//! calibration metadata.

use tracing::debug;

use crate::container::{CameraConfiguration, FrameMetadata};
use crate::dng::cfa::{illuminant_code, CfaPattern};
use crate::dng::pack::{self, bits_needed, choose_sample_bits};
use crate::dng::shading::{normalize_shading_map, ShadingMap};
use crate::dng::tiff::{write_dng, DngFields};
use crate::dng::timecode::Timecode;
use crate::error::VfsError;
use crate::options::RenderOptions;

/// Value written to the DNG Software tag.
pub const SOFTWARE_TAG: &str = "MotionCam Tools";

/// Per-render parameters alongside the frame data.
pub struct RenderRequest<'a> {
    /// Recording frame rate, used for the timecode and FrameRate tag.
    pub fps: f64,
    /// Presentation index of the frame within the recording.
    pub frame_number: i64,
    pub options: RenderOptions,
    /// Spatial downscale in {1, 2, 4, 8}.
    pub scale: u32,
    /// Overrides the container's device model in UniqueCameraModel.
    pub camera_model_override: Option<&'a str>,
}

#[derive(Debug)]
pub(crate) struct Preprocessed {
    pub pixels: Vec<u16>,
    pub width: u32,
    pub height: u32,
    /// Per-position destination black level, CFA order.
    pub black_level: [u16; 4],
    pub white_level: u16,
}

/// Linearize, optionally shade-correct and decimate one frame.
pub(crate) fn preprocess(
    pixels: &[u16],
    frame: &FrameMetadata,
    config: &CameraConfiguration,
    cfa: CfaPattern,
    scale: u32,
    options: RenderOptions,
) -> Result<Preprocessed, VfsError> {
    let scale = if scale > 1 { (scale / 2) * 2 } else { 1 };

    let src_width = frame.width;
    let src_height = frame.height;

    if (pixels.len() as u64) < src_width as u64 * src_height as u64 {
        return Err(VfsError::InvalidFormat(format!(
            "frame buffer holds {} pixels, metadata claims {}x{}",
            pixels.len(),
            src_width,
            src_height
        )));
    }

    // Both dimensions aligned to 4: the Bayer period plus the 4-pixel
    // groups the 10/14-bit packing paths consume.
    let new_width = (src_width / scale) / 4 * 4;
    let new_height = (src_height / scale) / 4 * 4;

    if new_width == 0 || new_height == 0 {
        return Err(VfsError::InvalidFormat(format!(
            "frame too small to render: {src_width}x{src_height} at scale {scale}"
        )));
    }

    let src_black = config.black_level;
    let src_white = config.white_level.clamp(0.0, u16::MAX as f32);
    let src_bits = bits_needed(src_white as u16);

    let work_bits = if options.contains(RenderOptions::NORMALIZE_SHADING) {
        src_bits.max(14).min(16)
    } else if options.contains(RenderOptions::APPLY_VIGNETTE) {
        if src_bits < 14 {
            (src_bits + 2).min(14)
        } else {
            (src_bits + 2).min(16)
        }
    } else {
        src_bits
    };

    let dst_white = ((1u32 << work_bits) - 1) as u16;
    let shift = work_bits - src_bits;

    let mut dst_black = [0.0f32; 4];
    for c in 0..4 {
        dst_black[c] = (src_black[c] * (1u32 << shift) as f32).min(dst_white as f32 / 4.0);
    }

    // Normalizing mutates the map, so take a copy only in that case.
    let normalized;
    let map_channels: &[Vec<f32>] = if options.contains(RenderOptions::NORMALIZE_SHADING)
        && !frame.lens_shading_map.is_empty()
    {
        let mut channels = frame.lens_shading_map.clone();
        normalize_shading_map(&mut channels);
        normalized = channels;
        &normalized
    } else {
        &frame.lens_shading_map
    };

    let map = ShadingMap::new(
        map_channels,
        frame.lens_shading_map_width,
        frame.lens_shading_map_height,
    );
    let apply_vignette = options.contains(RenderOptions::APPLY_VIGNETTE) && !map.is_empty();

    // The shading map covers the full sensor; the frame may be a center crop.
    let full_width = frame.original_width.max(src_width).max(1);
    let full_height = frame.original_height.max(src_height).max(1);
    let crop_x = (full_width - src_width) / 2;
    let crop_y = (full_height - src_height) / 2;
    let map_scale_x = 1.0 / full_width as f32;
    let map_scale_y = 1.0 / full_height as f32;

    let mut out = vec![0u16; new_width as usize * new_height as usize];

    for y in (0..new_height).step_by(2) {
        let src_y = y * scale;
        for x in (0..new_width).step_by(2) {
            let src_x = x * scale;

            for i in 0..4usize {
                let dx = (i % 2) as u32;
                let dy = (i / 2) as u32;
                let c = cfa.channel(i) as usize;

                let raw = pixels[((src_y + dy) * src_width + src_x + dx) as usize] as f32;

                let mut v = raw - src_black[c];
                let range = src_white - src_black[c];
                if range > 0.0 {
                    v *= (dst_white as f32 - dst_black[c]) / range;
                }

                if apply_vignette {
                    let sx = (src_x + dx + crop_x) as f32 * map_scale_x;
                    let sy = (src_y + dy + crop_y) as f32 * map_scale_y;
                    let channel = if map.channel_count() >= 4 { i } else { c };
                    v *= map.sample(sx, sy, channel);
                }

                v = (v + dst_black[c]).clamp(0.0, dst_white as f32).round();
                out[((y + dy) * new_width + x + dx) as usize] = v as u16;
            }
        }
    }

    let mut black_by_position = [0u16; 4];
    for (i, slot) in black_by_position.iter_mut().enumerate() {
        *slot = dst_black[cfa.channel(i) as usize].round() as u16;
    }

    Ok(Preprocessed {
        pixels: out,
        width: new_width,
        height: new_height,
        black_level: black_by_position,
        white_level: dst_white,
    })
}

/// Render one frame to a complete DNG byte stream.
pub fn render_dng(
    pixels: &[u16],
    frame: &FrameMetadata,
    config: &CameraConfiguration,
    request: &RenderRequest<'_>,
) -> Result<Vec<u8>, VfsError> {
    let cfa = CfaPattern::from_sensor_arrangement(&config.sensor_arrangement)?;

    let processed = preprocess(pixels, frame, config, cfa, request.scale, request.options)?;

    let sample_bits = choose_sample_bits(processed.white_level, processed.width);
    let packed = pack::pack(&processed.pixels, processed.width, processed.height, sample_bits);

    debug!(
        width = processed.width,
        height = processed.height,
        sample_bits,
        black = ?processed.black_level,
        white = processed.white_level,
        "rendering frame {}",
        request.frame_number
    );

    let camera_model = match request.camera_model_override {
        Some(model) if !model.is_empty() => model,
        _ => config.device_specific_profile.device_model.as_str(),
    };

    let fields = DngFields {
        width: processed.width,
        height: processed.height,
        sample_bits,
        cfa,
        black_level: processed.black_level,
        white_level: processed.white_level,
        iso: frame.iso,
        exposure_seconds: frame.exposure_time / 1e9,
        as_shot_neutral: frame.as_shot_neutral,
        illuminant1: illuminant_code(&config.color_illuminant1),
        illuminant2: illuminant_code(&config.color_illuminant2),
        color_matrix1: config.color_matrix1,
        color_matrix2: config.color_matrix2,
        forward_matrix1: config.forward_matrix1,
        forward_matrix2: config.forward_matrix2,
        unique_camera_model: camera_model,
        software: SOFTWARE_TAG,
        frame_rate: request.fps,
        timecode: Timecode::for_frame(request.frame_number, request.fps).to_bytes(),
    };

    Ok(write_dng(&fields, &packed))
}
