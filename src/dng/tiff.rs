//! TIFF/DNG byte assembly.
//!
//! Emits a little-endian, single-IFD, uncompressed DNG 1.4 (backward 1.1)
//! stream: an 8-byte TIFF header, the IFD with its entries in ascending
//! tag order, out-of-line values, then the packed pixel strip.

use crate::dng::cfa::CfaPattern;

// TIFF field types.
const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;
const TYPE_SRATIONAL: u16 = 10;

// Tags, ascending.
const TAG_NEW_SUBFILE_TYPE: u16 = 254;
const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;
const TAG_PLANAR_CONFIG: u16 = 284;
const TAG_SOFTWARE: u16 = 305;
const TAG_CFA_REPEAT_PATTERN_DIM: u16 = 33421;
const TAG_CFA_PATTERN: u16 = 33422;
const TAG_EXPOSURE_TIME: u16 = 33434;
const TAG_ISO_SPEED_RATINGS: u16 = 34855;
const TAG_DNG_VERSION: u16 = 50706;
const TAG_DNG_BACKWARD_VERSION: u16 = 50707;
const TAG_UNIQUE_CAMERA_MODEL: u16 = 50708;
const TAG_CFA_LAYOUT: u16 = 50711;
const TAG_BLACK_LEVEL_REPEAT_DIM: u16 = 50713;
const TAG_BLACK_LEVEL: u16 = 50714;
const TAG_WHITE_LEVEL: u16 = 50717;
const TAG_COLOR_MATRIX_1: u16 = 50721;
const TAG_COLOR_MATRIX_2: u16 = 50722;
const TAG_AS_SHOT_NEUTRAL: u16 = 50728;
const TAG_CALIBRATION_ILLUMINANT_1: u16 = 50778;
const TAG_CALIBRATION_ILLUMINANT_2: u16 = 50779;
const TAG_ACTIVE_AREA: u16 = 50829;
const TAG_FORWARD_MATRIX_1: u16 = 50964;
const TAG_FORWARD_MATRIX_2: u16 = 50965;
const TAG_TIME_CODES: u16 = 51043;
const TAG_FRAME_RATE: u16 = 51044;

const PHOTOMETRIC_CFA: u16 = 32803;
const COMPRESSION_NONE: u16 = 1;
const CFA_LAYOUT_RECTANGULAR: u16 = 1;

/// Denominator used when expressing calibration floats as rationals.
const MATRIX_DENOMINATOR: i32 = 10_000;

/// Everything the writer needs besides the packed pixel strip.
pub struct DngFields<'a> {
    pub width: u32,
    pub height: u32,
    pub sample_bits: u32,
    pub cfa: CfaPattern,
    /// Per-position black level, matching the CFA repeat pattern.
    pub black_level: [u16; 4],
    pub white_level: u16,
    pub iso: u32,
    /// Exposure time in seconds.
    pub exposure_seconds: f64,
    pub as_shot_neutral: [f32; 3],
    pub illuminant1: u16,
    pub illuminant2: u16,
    pub color_matrix1: [f32; 9],
    pub color_matrix2: [f32; 9],
    pub forward_matrix1: [f32; 9],
    pub forward_matrix2: [f32; 9],
    pub unique_camera_model: &'a str,
    pub software: &'a str,
    pub frame_rate: f64,
    pub timecode: [u8; 8],
}

struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    data: Vec<u8>,
}

impl IfdEntry {
    fn shorts(tag: u16, values: &[u16]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 2);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        IfdEntry {
            tag,
            field_type: TYPE_SHORT,
            count: values.len() as u32,
            data,
        }
    }

    fn longs(tag: u16, values: &[u32]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        IfdEntry {
            tag,
            field_type: TYPE_LONG,
            count: values.len() as u32,
            data,
        }
    }

    fn bytes(tag: u16, values: &[u8]) -> Self {
        IfdEntry {
            tag,
            field_type: TYPE_BYTE,
            count: values.len() as u32,
            data: values.to_vec(),
        }
    }

    fn ascii(tag: u16, text: &str) -> Self {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        IfdEntry {
            tag,
            field_type: TYPE_ASCII,
            count: data.len() as u32,
            data,
        }
    }

    fn rationals(tag: u16, values: &[(u32, u32)]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 8);
        for (num, den) in values {
            data.extend_from_slice(&num.to_le_bytes());
            data.extend_from_slice(&den.to_le_bytes());
        }
        IfdEntry {
            tag,
            field_type: TYPE_RATIONAL,
            count: values.len() as u32,
            data,
        }
    }

    fn srationals(tag: u16, values: &[(i32, i32)]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 8);
        for (num, den) in values {
            data.extend_from_slice(&num.to_le_bytes());
            data.extend_from_slice(&den.to_le_bytes());
        }
        IfdEntry {
            tag,
            field_type: TYPE_SRATIONAL,
            count: values.len() as u32,
            data,
        }
    }
}

fn signed_rational(value: f32) -> (i32, i32) {
    (
        (value as f64 * MATRIX_DENOMINATOR as f64).round() as i32,
        MATRIX_DENOMINATOR,
    )
}

fn matrix_rationals(matrix: &[f32; 9]) -> Vec<(i32, i32)> {
    matrix.iter().map(|&v| signed_rational(v)).collect()
}

/// Express a non-negative number of seconds as an unsigned rational.
fn seconds_rational(seconds: f64) -> (u32, u32) {
    let nanos = (seconds.max(0.0) * 1e9).round() as u64;
    let divisor = gcd_u64(nanos.max(1), 1_000_000_000);
    let num = nanos / divisor;
    let den = 1_000_000_000 / divisor;
    (num.min(u32::MAX as u64) as u32, den as u32)
}

fn gcd_u64(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a.max(1)
}

/// Assemble a complete DNG byte stream.
pub fn write_dng(fields: &DngFields<'_>, pixel_data: &[u8]) -> Vec<u8> {
    let neutral: Vec<(u32, u32)> = fields
        .as_shot_neutral
        .iter()
        .map(|&v| {
            let (num, den) = signed_rational(v);
            (num.max(0) as u32, den as u32)
        })
        .collect();

    let frame_rate = signed_rational(fields.frame_rate as f32);

    let mut entries = vec![
        IfdEntry::longs(TAG_NEW_SUBFILE_TYPE, &[0]),
        IfdEntry::longs(TAG_IMAGE_WIDTH, &[fields.width]),
        IfdEntry::longs(TAG_IMAGE_LENGTH, &[fields.height]),
        IfdEntry::shorts(TAG_BITS_PER_SAMPLE, &[fields.sample_bits as u16]),
        IfdEntry::shorts(TAG_COMPRESSION, &[COMPRESSION_NONE]),
        IfdEntry::shorts(TAG_PHOTOMETRIC, &[PHOTOMETRIC_CFA]),
        IfdEntry::longs(TAG_STRIP_OFFSETS, &[0]), // patched below
        IfdEntry::shorts(TAG_SAMPLES_PER_PIXEL, &[1]),
        IfdEntry::longs(TAG_ROWS_PER_STRIP, &[fields.height]),
        IfdEntry::longs(TAG_STRIP_BYTE_COUNTS, &[pixel_data.len() as u32]),
        IfdEntry::shorts(TAG_PLANAR_CONFIG, &[1]),
        IfdEntry::ascii(TAG_SOFTWARE, fields.software),
        IfdEntry::shorts(TAG_CFA_REPEAT_PATTERN_DIM, &[2, 2]),
        IfdEntry::bytes(TAG_CFA_PATTERN, &fields.cfa.0),
        IfdEntry::rationals(
            TAG_EXPOSURE_TIME,
            &[seconds_rational(fields.exposure_seconds)],
        ),
        IfdEntry::shorts(TAG_ISO_SPEED_RATINGS, &[fields.iso.min(u16::MAX as u32) as u16]),
        IfdEntry::bytes(TAG_DNG_VERSION, &[1, 4, 0, 0]),
        IfdEntry::bytes(TAG_DNG_BACKWARD_VERSION, &[1, 1, 0, 0]),
        IfdEntry::ascii(TAG_UNIQUE_CAMERA_MODEL, fields.unique_camera_model),
        IfdEntry::shorts(TAG_CFA_LAYOUT, &[CFA_LAYOUT_RECTANGULAR]),
        IfdEntry::shorts(TAG_BLACK_LEVEL_REPEAT_DIM, &[2, 2]),
        IfdEntry::shorts(TAG_BLACK_LEVEL, &fields.black_level),
        IfdEntry::longs(TAG_WHITE_LEVEL, &[fields.white_level as u32]),
        IfdEntry::srationals(TAG_COLOR_MATRIX_1, &matrix_rationals(&fields.color_matrix1)),
        IfdEntry::srationals(TAG_COLOR_MATRIX_2, &matrix_rationals(&fields.color_matrix2)),
        IfdEntry::rationals(TAG_AS_SHOT_NEUTRAL, &neutral),
        IfdEntry::shorts(TAG_CALIBRATION_ILLUMINANT_1, &[fields.illuminant1]),
        IfdEntry::shorts(TAG_CALIBRATION_ILLUMINANT_2, &[fields.illuminant2]),
        IfdEntry::longs(TAG_ACTIVE_AREA, &[0, 0, fields.height, fields.width]),
        IfdEntry::srationals(
            TAG_FORWARD_MATRIX_1,
            &matrix_rationals(&fields.forward_matrix1),
        ),
        IfdEntry::srationals(
            TAG_FORWARD_MATRIX_2,
            &matrix_rationals(&fields.forward_matrix2),
        ),
        IfdEntry::bytes(TAG_TIME_CODES, &fields.timecode),
        IfdEntry::srationals(TAG_FRAME_RATE, &[frame_rate]),
    ];

    entries.sort_by_key(|e| e.tag);

    // Layout: header, IFD, out-of-line values, pixel strip.
    let ifd_offset = 8u32;
    let values_offset = ifd_offset + 2 + entries.len() as u32 * 12 + 4;

    let mut overflow = 0u32;
    for entry in &entries {
        if entry.data.len() > 4 {
            overflow += (entry.data.len() as u32 + 1) & !1;
        }
    }

    let strip_offset = values_offset + overflow;
    if let Some(offsets) = entries.iter_mut().find(|e| e.tag == TAG_STRIP_OFFSETS) {
        offsets.data = strip_offset.to_le_bytes().to_vec();
    }

    let mut out = Vec::with_capacity(strip_offset as usize + pixel_data.len());

    // Header.
    out.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00]);
    out.extend_from_slice(&ifd_offset.to_le_bytes());

    // IFD.
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    let mut next_value_offset = values_offset;
    for entry in &entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.field_type.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.data.len()].copy_from_slice(&entry.data);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&next_value_offset.to_le_bytes());
            next_value_offset += (entry.data.len() as u32 + 1) & !1;
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes()); // no next IFD

    // Out-of-line values, word aligned.
    for entry in &entries {
        if entry.data.len() > 4 {
            out.extend_from_slice(&entry.data);
            if entry.data.len() % 2 != 0 {
                out.push(0);
            }
        }
    }

    debug_assert_eq!(out.len() as u32, strip_offset);
    out.extend_from_slice(pixel_data);

    out
}
