//! On-demand DNG encoding.
//!
//! Turns one frame's raw Bayer pixels plus container calibration metadata
//! into a complete DNG byte stream: CFA resolution, linearization with
//! optional lens-shading correction, Bayer-preserving decimation, bit
//! packing at the narrowest width that fits, and TIFF assembly with SMPTE
//! timecode.

mod cfa;
mod pack;
mod pipeline;
mod shading;
mod tiff;
mod timecode;

pub use cfa::{illuminant_code, CfaPattern};
pub use pack::{bits_needed, choose_sample_bits};
pub use pipeline::{render_dng, RenderRequest, SOFTWARE_TAG};
pub use shading::{normalize_shading_map, ShadingMap};
pub use tiff::{write_dng, DngFields};
pub use timecode::Timecode;
